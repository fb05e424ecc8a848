//! Plain process execution through `tokio::process`.

use super::CommandRunner;
use crate::installer::error::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Exit status and captured output of an external tool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }

    /// Turn a non-zero exit into [`Error::CommandFailed`].
    pub fn check(self, command: &str) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                command: command.to_string(),
                reason: format!(
                    "exit code {}: {}",
                    self.code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".into()),
                    self.stderr_lossy()
                ),
            })
        }
    }
}

/// Runs commands on the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput> {
        log::debug!("exec: {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::CommandFailed {
                command: program.to_string(),
                reason: format!("failed to execute: {}", e),
            })?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_reports_exit_code_and_stderr() {
        let err = ToolOutput::failed(3, "boom\n").check("codesign").unwrap_err();
        assert_eq!(err.to_string(), "codesign failed: exit code 3: boom");
    }

    #[tokio::test]
    async fn missing_program_is_a_command_failure() {
        let err = SystemCommandRunner
            .run("definitely-not-a-real-tool-macusb", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let out = SystemCommandRunner
            .run("sh", &["-c".into(), "echo hi; exit 4".into()])
            .await
            .unwrap();
        assert_eq!(out.code, Some(4));
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hi");
    }
}
