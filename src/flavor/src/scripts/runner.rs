/// ScriptRunner - executes embedded scripts through a shell
/// The script body is fed on stdin (`bash -s <args...>`), so nothing is written to disk.
use super::library::ScriptLibrary;
use crate::error::ScriptError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Output of a successful script run
#[derive(Debug, Clone, Default)]
pub struct ScriptOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a named script with positional arguments.
///
/// Implementations block the caller until the script exits; there is no
/// timeout and no retry. A nonzero exit is reported as [`ScriptError::Failed`]
/// carrying the captured stderr.
#[async_trait]
pub trait ScriptRunner: Send + Sync + 'static {
    async fn run(&self, script: &str, args: &[String]) -> Result<ScriptOutput, ScriptError>;
}

pub struct BashScriptRunner {
    library: ScriptLibrary,
    shell: PathBuf,
}

impl BashScriptRunner {
    pub fn new(library: ScriptLibrary) -> Self {
        Self {
            library,
            shell: PathBuf::from("bash"),
        }
    }

    /// Use a different shell binary (must understand `-s`).
    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }
}

#[async_trait]
impl ScriptRunner for BashScriptRunner {
    async fn run(&self, script: &str, args: &[String]) -> Result<ScriptOutput, ScriptError> {
        let body = self.library.render(script)?;

        tracing::info!("[ScriptRunner] Running {} {:?}", script, args);

        let mut child = Command::new(&self.shell)
            .arg("-s")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ScriptError::Spawn {
                name: script.to_string(),
                source: e,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A script that exits early closes its stdin; the exit status below reports that.
            if let Err(e) = stdin.write_all(body.as_bytes()).await {
                tracing::debug!("[ScriptRunner] {} closed stdin early: {}", script, e);
            }
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ScriptError::Spawn {
                name: script.to_string(),
                source: e,
            })?;

        let result = ScriptOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!("[ScriptRunner] {} output: {:?}", script, result.stdout);

        if !output.status.success() {
            tracing::error!(
                "[ScriptRunner] Script {} failed ({}): {}",
                script,
                output.status,
                result.stderr
            );
            return Err(ScriptError::Failed {
                name: script.to_string(),
                status: output.status.to_string(),
                stdout: result.stdout,
                stderr: result.stderr,
            });
        }

        Ok(result)
    }
}
