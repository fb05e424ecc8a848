//! Per-attempt scratch directory and signal files.

use super::{BuildPhase, BuildStrategy};
use crate::installer::error::Result;
use crate::installer::utils::fs;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const AUTH_SIGNAL: &str = "auth_ok";
pub const RUNNING_SIGNAL: &str = "terminal_running";
pub const DONE_SIGNAL: &str = "terminal_done";
pub const SCRIPT_NAME: &str = "start_install.command";
pub const RESTORE_IMAGE: &str = "InstallESD.dmg";

/// State of one build attempt. Owned by the orchestrator.
///
/// The attempt stages into its own directory, named after its id, below the
/// configured work dir. Only that directory is ever removed.
#[derive(Clone, Debug)]
pub struct BuildAttempt {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub strategy: BuildStrategy,
    pub phase: BuildPhase,
    work_dir: PathBuf,
    pub last_error: Option<String>,
}

impl BuildAttempt {
    pub fn new(strategy: BuildStrategy, base_dir: &Path) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            started_at: Utc::now(),
            strategy,
            phase: BuildPhase::Idle,
            work_dir: base_dir.join(id.to_string()),
            last_error: None,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn auth_signal(&self) -> PathBuf {
        self.work_dir.join(AUTH_SIGNAL)
    }

    pub fn running_signal(&self) -> PathBuf {
        self.work_dir.join(RUNNING_SIGNAL)
    }

    pub fn done_signal(&self) -> PathBuf {
        self.work_dir.join(DONE_SIGNAL)
    }

    pub fn script_path(&self) -> PathBuf {
        self.work_dir.join(SCRIPT_NAME)
    }

    pub fn restore_image(&self) -> PathBuf {
        self.work_dir.join(RESTORE_IMAGE)
    }

    /// Scratch location for a copied bundle.
    pub fn staged_app(&self, original: &Path) -> PathBuf {
        match original.file_name() {
            Some(name) => self.work_dir.join(name),
            None => self.work_dir.join("Installer.app"),
        }
    }

    /// Create the attempt directory and drop any stale signals in it.
    pub async fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.work_dir, false).await?;
        for stale in [self.auth_signal(), self.running_signal(), self.done_signal()] {
            fs::remove_file_if_exists(&stale).await?;
        }
        Ok(())
    }
}
