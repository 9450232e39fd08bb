/// Script assets compiled into the binary and the shell runner that executes them.
pub mod embedded_scripts;
pub mod library;
pub mod runner;

pub use library::ScriptLibrary;
pub use runner::{BashScriptRunner, ScriptOutput, ScriptRunner};
