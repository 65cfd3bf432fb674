//! External generator tools
//!
//! Code generation shells out to two tools: the reflection generator, which
//! reads a project's declarations and writes a registration unit, and the
//! parser generator, which turns a grammar into a source/header pair. The
//! [`ToolRunner`] trait keeps the rest of the crate independent of how they
//! are run.

use crate::error::{BuildError, BuildResult};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

/// Which tool an invocation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Reflection,
    ParserGenerator,
}

impl ToolKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reflection => "reflection generator",
            Self::ParserGenerator => "parser generator",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single tool run on behalf of a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub kind: ToolKind,
    /// Project the run belongs to
    pub project: String,
    pub inputs: Vec<PathBuf>,
    /// Files the tool is expected to write
    pub outputs: Vec<PathBuf>,
    pub working_dir: PathBuf,
}

impl ToolInvocation {
    /// Reflection over `sources`, written to `output`
    pub fn reflection(
        project: impl Into<String>,
        sources: Vec<PathBuf>,
        output: PathBuf,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kind: ToolKind::Reflection,
            project: project.into(),
            inputs: sources,
            outputs: vec![output],
            working_dir: working_dir.into(),
        }
    }

    /// Parser generation from `grammar` into a source and a header
    pub fn parser(
        project: impl Into<String>,
        grammar: PathBuf,
        source: PathBuf,
        header: PathBuf,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kind: ToolKind::ParserGenerator,
            project: project.into(),
            inputs: vec![grammar],
            outputs: vec![source, header],
            working_dir: working_dir.into(),
        }
    }

    /// Command line: every output as `--output <path>`, then the inputs
    pub fn arguments(&self) -> Vec<OsString> {
        let mut args = Vec::with_capacity(self.outputs.len() * 2 + self.inputs.len());
        for output in &self.outputs {
            args.push(OsString::from("--output"));
            args.push(output.clone().into_os_string());
        }
        args.extend(self.inputs.iter().map(|p| p.clone().into_os_string()));
        args
    }
}

/// Captured result of a tool run
#[derive(Debug)]
pub struct ToolOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub execution_time: Duration,
}

impl ToolOutput {
    /// Check if the tool succeeded
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get combined output
    pub fn output(&self) -> String {
        let mut output = String::new();
        if !self.stdout.is_empty() {
            output.push_str("STDOUT:\n");
            output.push_str(&self.stdout);
            output.push('\n');
        }
        if !self.stderr.is_empty() {
            output.push_str("STDERR:\n");
            output.push_str(&self.stderr);
        }
        output
    }
}

/// Runs generator tools
pub trait ToolRunner: Sync {
    /// Run `invocation`, failing unless the tool exits successfully
    fn run(&self, invocation: &ToolInvocation) -> BuildResult<ToolOutput>;
}

/// Runs tools as child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessToolRunner {
    reflection: Option<PathBuf>,
    parser_generator: Option<PathBuf>,
}

impl ProcessToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reflection(mut self, program: impl Into<PathBuf>) -> Self {
        self.reflection = Some(program.into());
        self
    }

    pub fn with_parser_generator(mut self, program: impl Into<PathBuf>) -> Self {
        self.parser_generator = Some(program.into());
        self
    }

    /// Configured executable for `kind`
    pub fn program(&self, kind: ToolKind) -> Option<&Path> {
        match kind {
            ToolKind::Reflection => self.reflection.as_deref(),
            ToolKind::ParserGenerator => self.parser_generator.as_deref(),
        }
    }
}

impl ToolRunner for ProcessToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> BuildResult<ToolOutput> {
        let tool = invocation.kind.name();
        let program = self
            .program(invocation.kind)
            .ok_or_else(|| BuildError::ToolNotConfigured {
                tool: tool.to_string(),
            })?;

        for output in &invocation.outputs {
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
            }
        }

        debug!(
            tool,
            project = %invocation.project,
            program = %program.display(),
            "running tool"
        );
        let start = Instant::now();

        let output = Command::new(program)
            .args(invocation.arguments())
            .current_dir(&invocation.working_dir)
            .env("WEFT_PROJECT", &invocation.project)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BuildError::ToolExecutionError {
                tool: tool.to_string(),
                error: e.to_string(),
            })?
            .wait_with_output()
            .map_err(|e| BuildError::ToolExecutionError {
                tool: tool.to_string(),
                error: e.to_string(),
            })?;

        let result = ToolOutput {
            exit_code: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            execution_time: start.elapsed(),
        };

        if !result.success() {
            return Err(BuildError::ToolFailed {
                tool: tool.to_string(),
                project: invocation.project.clone(),
                exit_code: result.exit_code,
                output: result.output(),
            });
        }

        debug!(
            tool,
            project = %invocation.project,
            elapsed_ms = result.execution_time.as_millis() as u64,
            "tool finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_arguments_layout() {
        let invocation = ToolInvocation::parser(
            "lang",
            PathBuf::from("expr.y"),
            PathBuf::from("out/expr.c"),
            PathBuf::from("out/expr.h"),
            ".",
        );
        let args: Vec<String> = invocation
            .arguments()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["--output", "out/expr.c", "--output", "out/expr.h", "expr.y"]
        );
    }

    #[test]
    fn test_unconfigured_tool() {
        let runner = ProcessToolRunner::new();
        let invocation =
            ToolInvocation::reflection("app", vec![], PathBuf::from("r.cpp"), ".");
        match runner.run(&invocation) {
            Err(BuildError::ToolNotConfigured { tool }) => {
                assert_eq!(tool, "reflection generator");
            }
            other => panic!("Expected ToolNotConfigured, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_program_is_execution_error() {
        let temp = TempDir::new().unwrap();
        let runner = ProcessToolRunner::new()
            .with_reflection(temp.path().join("does-not-exist"));
        let invocation = ToolInvocation::reflection(
            "app",
            vec![],
            temp.path().join("gen/r.cpp"),
            temp.path(),
        );
        assert!(matches!(
            runner.run(&invocation),
            Err(BuildError::ToolExecutionError { .. })
        ));
        // output directories are prepared before the tool runs
        assert!(temp.path().join("gen").is_dir());
    }

    #[test]
    fn test_output_combines_streams() {
        let output = ToolOutput {
            exit_code: 2,
            stdout: "parsed".to_string(),
            stderr: "conflict".to_string(),
            execution_time: Duration::ZERO,
        };
        assert!(!output.success());
        assert_eq!(output.output(), "STDOUT:\nparsed\nSTDERR:\nconflict");
    }
}
