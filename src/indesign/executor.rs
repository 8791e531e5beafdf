//! Script execution backends.
//!
//! The bridge only needs to hand a finished ExtendScript program to something
//! that runs it inside InDesign and reports stdout or an error message.
//! [`ScriptExecutor`] is that seam; [`OsascriptExecutor`] is the macOS backend.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::AutomationConfig;

/// Runs a generated script in the host application.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    /// Executes `script` and returns its textual result.
    ///
    /// # Errors
    ///
    /// Returns the raw failure message reported by the automation facility
    /// or the host application.
    async fn execute(&self, script: &str) -> Result<String, String>;
}

/// Escapes `s` for use inside a double-quoted AppleScript string literal.
///
/// AppleScript only recognises `\\` and `\"` as escapes that matter here;
/// line breaks are legal inside its string literals.
#[must_use]
pub fn escape_applescript_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Wraps an ExtendScript program in an AppleScript `do script` statement
/// addressed to `application`.
#[must_use]
pub fn applescript_do_script(application: &str, script: &str) -> String {
    format!(
        "tell application \"{}\" to do script \"{}\" language javascript\n",
        escape_applescript_string(application),
        escape_applescript_string(script),
    )
}

/// Executes scripts through macOS `osascript`.
///
/// The AppleScript program is written to the child's stdin (`osascript -`),
/// so no temporary script file is involved.
#[derive(Debug, Clone)]
pub struct OsascriptExecutor {
    /// Path or name of the `osascript` program.
    program: PathBuf,
    /// Target application name.
    application: String,
    /// Maximum time a script may run before the child is killed.
    timeout: Duration,
}

impl OsascriptExecutor {
    /// Creates an executor from automation settings.
    #[must_use]
    pub fn new(config: &AutomationConfig) -> Self {
        Self {
            program: config.osascript_path.clone(),
            application: config.application.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Returns the target application name.
    #[must_use]
    pub fn application(&self) -> &str {
        &self.application
    }

    /// Returns the execution timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, applescript: &str) -> Result<String, String> {
        let mut child = Command::new(&self.program)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("Failed to launch {}: {e}", self.program.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits early closes the pipe; its exit status
            // then carries the real failure.
            if let Err(e) = stdin.write_all(applescript.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(format!("Failed to send script to osascript: {e}"));
                }
            }
            // Dropping stdin closes the pipe so osascript starts executing.
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| format!("Failed to wait for osascript: {e}"))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() || !stderr.is_empty() {
            if stderr.is_empty() {
                return Err(format!("osascript exited with {}", output.status));
            }
            return Err(stderr);
        }

        Ok(strip_trailing_newline(String::from_utf8_lossy(&output.stdout).into_owned()))
    }
}

#[async_trait]
impl ScriptExecutor for OsascriptExecutor {
    async fn execute(&self, script: &str) -> Result<String, String> {
        let applescript = applescript_do_script(&self.application, script);

        tracing::trace!(application = %self.application, "Running osascript");

        // The child is killed on drop, so a timeout also stops osascript.
        match tokio::time::timeout(self.timeout, self.run(&applescript)).await {
            Ok(result) => result,
            Err(_) => Err(format!(
                "Script execution timed out after {} seconds",
                self.timeout.as_secs()
            )),
        }
    }
}

/// Removes the single line break `osascript` appends to its result.
///
/// Only one is removed; trailing whitespace in document text is preserved.
fn strip_trailing_newline(mut s: String) -> String {
    if s.ends_with('\n') {
        s.pop();
        if s.ends_with('\r') {
            s.pop();
        }
    }
    s
}
