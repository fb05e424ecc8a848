//! Administrator authorization through AppleScript.

use super::PrivilegedRunner;
use async_trait::async_trait;
use tokio::process::Command;

/// Escape special characters for AppleScript string literals
///
/// Escapes backslashes and double quotes so that shell commands containing
/// quoted paths survive being embedded in `do shell script "..."`.
///
/// # Examples
/// ```
/// use macusb::installer::tools::escape_applescript_string;
/// assert_eq!(escape_applescript_string("My\"App"), "My\\\"App");
/// assert_eq!(escape_applescript_string("Path\\File"), "Path\\\\File");
/// ```
pub fn escape_applescript_string(s: &str) -> String {
    s.replace('\\', r"\\").replace('"', r#"\""#)
}

/// Runs commands via `osascript` with `with administrator privileges`, which
/// shows the standard macOS authorization dialog.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsascriptPrivileged;

#[async_trait]
impl PrivilegedRunner for OsascriptPrivileged {
    async fn run_privileged(&self, shell_command: &str) -> Result<(), String> {
        log::debug!("privileged exec: {}", shell_command);

        let script = format!(
            "do shell script \"{}\" with administrator privileges",
            escape_applescript_string(shell_command)
        );

        let output = Command::new("osascript")
            .arg("-e")
            .arg(&script)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("Failed to run osascript: {}", e))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            log::warn!("Privileged command failed: {}", stderr);
            if stderr.is_empty() {
                Err("Unknown AppleScript error".to_string())
            } else {
                Err(stderr)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_quotes_survive_applescript_embedding() {
        let cmd = r#"touch '/tmp/a b/auth_ok' && echo "done""#;
        assert_eq!(
            escape_applescript_string(cmd),
            r#"touch '/tmp/a b/auth_ok' && echo \"done\""#
        );
    }
}
