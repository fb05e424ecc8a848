//! Terminal hand-off for the long-running privileged steps.

use super::TerminalLauncher;
use crate::installer::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Opens a `.command` script in a terminal application with `open -a`.
#[derive(Clone, Debug)]
pub struct TerminalApp {
    application: String,
}

impl TerminalApp {
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
        }
    }
}

#[async_trait]
impl TerminalLauncher for TerminalApp {
    async fn launch(&self, script: &Path) -> Result<()> {
        log::info!("Opening {} in {}", script.display(), self.application);

        let output = Command::new("open")
            .arg("-a")
            .arg(&self.application)
            .arg(script)
            .output()
            .await
            .map_err(|e| Error::CommandFailed {
                command: "open".to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: format!("open -a {}", self.application),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}
