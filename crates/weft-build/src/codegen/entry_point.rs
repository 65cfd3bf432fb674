//! Synthesized process entry points
//!
//! The generated `main` collects the command line, brings up the runtime
//! subsystems the application links against, hands control to the user's
//! code and tears the subsystems down again in reverse order.

use super::{GeneratedLayout, HEADER_BANNER};
use crate::solution::{NodeId, SolutionGraph, OBJECT_RUNTIME, SYSTEM_RUNTIME};
use std::fmt::Write as _;
use std::path::PathBuf;
use weft_manifest::ProjectType;

/// Name of the free function applications implement when no entry class is set
pub const DEFAULT_ENTRY_FUNCTION: &str = "weft_main";

/// Runtime subsystem started before user code runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Subsystem {
    System,
    Object,
    Window,
}

impl Subsystem {
    fn startup(&self) -> &'static str {
        match self {
            Self::System => "weft::system::startup(arguments);",
            Self::Object => "weft::object::startup();",
            Self::Window => "weft::window::startup();",
        }
    }

    fn shutdown(&self) -> &'static str {
        match self {
            Self::System => "weft::system::shutdown();",
            Self::Object => "weft::object::shutdown();",
            Self::Window => "weft::window::shutdown();",
        }
    }
}

/// What the entry point hands control to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delegate {
    /// Instantiate the class and call its `run`
    Class(String),
    /// Call a free function
    Function(String),
    /// Run every registered test
    TestRunner,
}

/// Planned entry point of an application node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub project: String,
    pub path: PathBuf,
    pub glue_include: String,
    /// Bring-up order; teardown runs in reverse
    pub subsystems: Vec<Subsystem>,
    pub delegate: Delegate,
    /// Use the windowed subsystem entry on platforms that distinguish it
    pub windowed: bool,
}

impl EntryPoint {
    /// Entry point for `id`, if the node gets one
    ///
    /// Applications get one when they ask for it; test applications always
    /// get one that runs the test framework.
    pub fn plan(graph: &SolutionGraph, id: NodeId, layout: &GeneratedLayout) -> Option<Self> {
        let node = graph.node(id);
        let (delegate, suffix) = match node.kind {
            ProjectType::TestApplication => (Delegate::TestRunner, ".test_main.cpp"),
            ProjectType::Application if node.flags.generate_main => {
                let delegate = match &node.entry_class {
                    Some(class) => Delegate::Class(class.clone()),
                    None => Delegate::Function(DEFAULT_ENTRY_FUNCTION.to_string()),
                };
                (delegate, ".main.cpp")
            }
            _ => return None,
        };

        let mut subsystems = Vec::new();
        if graph.depends_on(id, SYSTEM_RUNTIME) {
            subsystems.push(Subsystem::System);
        }
        if graph.depends_on(id, OBJECT_RUNTIME) {
            subsystems.push(Subsystem::Object);
        }
        if node.flags.window_subsystem {
            subsystems.push(Subsystem::Window);
        }

        Some(Self {
            project: node.name.clone(),
            path: layout.node_file(node, suffix),
            glue_include: GeneratedLayout::glue_header_name(node),
            subsystems,
            delegate,
            windowed: node.flags.window_subsystem,
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {}. Do not edit.", HEADER_BANNER, self.project);
        let _ = writeln!(out, "#include \"{}\"", self.glue_include);
        out.push_str("#include <string>\n#include <vector>\n\n");

        match &self.delegate {
            Delegate::Function(function) => {
                let _ = writeln!(
                    out,
                    "int {}(const std::vector<std::string>& arguments);\n",
                    function
                );
            }
            Delegate::TestRunner => {
                out.push_str(
                    "namespace weft { namespace test {\n\
                     int run_all(const std::vector<std::string>& arguments);\n\
                     } }\n\n",
                );
            }
            Delegate::Class(_) => {}
        }

        out.push_str("static int weft_entry(int argc, char** argv)\n{\n");
        out.push_str("    std::vector<std::string> arguments(argv + 1, argv + argc);\n");
        for subsystem in &self.subsystems {
            let _ = writeln!(out, "    {}", subsystem.startup());
        }
        match &self.delegate {
            Delegate::Class(class) => {
                let _ = writeln!(out, "    {} application;", class);
                out.push_str("    int result = application.run(arguments);\n");
            }
            Delegate::Function(function) => {
                let _ = writeln!(out, "    int result = {}(arguments);", function);
            }
            Delegate::TestRunner => {
                out.push_str("    int result = weft::test::run_all(arguments);\n");
            }
        }
        for subsystem in self.subsystems.iter().rev() {
            let _ = writeln!(out, "    {}", subsystem.shutdown());
        }
        out.push_str("    return result;\n}\n\n");

        if self.windowed {
            out.push_str(
                "#if defined(_WIN32)\n\
                 #include <windows.h>\n\
                 int WINAPI WinMain(HINSTANCE, HINSTANCE, LPSTR, int)\n\
                 {\n    return weft_entry(__argc, __argv);\n}\n\
                 #else\n",
            );
        }
        out.push_str("int main(int argc, char** argv)\n{\n    return weft_entry(argc, argv);\n}\n");
        if self.windowed {
            out.push_str("#endif\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(delegate: Delegate, subsystems: Vec<Subsystem>, windowed: bool) -> EntryPoint {
        EntryPoint {
            project: "game".to_string(),
            path: PathBuf::from("gen/game/game.main.cpp"),
            glue_include: "game.glue.h".to_string(),
            subsystems,
            delegate,
            windowed,
        }
    }

    #[test]
    fn test_teardown_reverses_bring_up() {
        let text = entry(
            Delegate::Function(DEFAULT_ENTRY_FUNCTION.to_string()),
            vec![Subsystem::System, Subsystem::Object],
            false,
        )
        .render();

        let pos = |needle: &str| text.find(needle).unwrap();
        assert!(pos("weft::system::startup") < pos("weft::object::startup"));
        assert!(pos("weft::object::startup") < pos("int result = weft_main(arguments);"));
        assert!(pos("int result = weft_main") < pos("weft::object::shutdown"));
        assert!(pos("weft::object::shutdown") < pos("weft::system::shutdown"));
        assert!(!text.contains("WinMain"));
    }

    #[test]
    fn test_class_delegate() {
        let text = entry(Delegate::Class("GameApp".to_string()), vec![], false).render();
        assert!(text.contains("    GameApp application;\n    int result = application.run(arguments);\n"));
        assert!(!text.contains("weft_main"));
    }

    #[test]
    fn test_windowed_entry() {
        let text = entry(
            Delegate::Function(DEFAULT_ENTRY_FUNCTION.to_string()),
            vec![Subsystem::Window],
            true,
        )
        .render();
        assert!(text.contains("int WINAPI WinMain"));
        assert!(text.contains("weft::window::startup();"));
        assert!(text.trim_end().ends_with("#endif"));
    }

    #[test]
    fn test_test_runner_entry() {
        let text = entry(Delegate::TestRunner, vec![], false).render();
        assert!(text.contains("int result = weft::test::run_all(arguments);"));
        assert!(text.contains("namespace weft { namespace test {"));
    }
}
