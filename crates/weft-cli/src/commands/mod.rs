pub mod check;
pub mod generate;
pub mod graph;

use colored::Colorize;
use weft_build::BuildError;

/// Print every collected problem, then hand back an error for the exit code
///
/// Errors other than an aborted run are passed through for `main` to print.
pub fn report_failure(error: BuildError) -> anyhow::Error {
    match error {
        BuildError::Aborted(diagnostics) => {
            let count = diagnostics.len();
            for error in diagnostics.errors() {
                eprintln!(
                    "{} {}",
                    "error:".red().bold(),
                    error.to_string().replace('\n', "\n       ")
                );
            }
            anyhow::anyhow!(
                "aborted due to {} error{}",
                count,
                if count == 1 { "" } else { "s" }
            )
        }
        other => other.into(),
    }
}
