//! External collaborators.
//!
//! The engine never shells out directly: every macOS tool it relies on sits
//! behind one of the traits below, so the orchestration logic can be driven
//! by fakes in tests. [`Tools::system`] wires the real implementations.

mod detection;
mod hdiutil;
mod property_list;
mod privileged;
mod process;
mod terminal;
mod volumes;

use crate::installer::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use detection::{ToolStatus, detect_tools};
pub use hdiutil::{Hdiutil, parse_attach_output};
pub use property_list::PlistFileReader;
pub use privileged::{OsascriptPrivileged, escape_applescript_string};
pub use process::{SystemCommandRunner, ToolOutput};
pub use terminal::TerminalApp;
pub use volumes::{DiskDetails, SystemVolumes, VolumeInfo, parse_diskutil_info};

/// Run an external executable and collect its exit status and output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput>;
}

/// Attach and detach disk images.
#[async_trait]
pub trait DiskImageTool: Send + Sync {
    /// Attach read-only and return the mount points of the resulting volumes.
    async fn attach(&self, image: &Path) -> Result<Vec<PathBuf>>;

    /// Detach a mounted volume.
    async fn detach(&self, mount_point: &Path, force: bool) -> Result<()>;
}

/// Read a property list file into a dictionary.
#[async_trait]
pub trait PlistReader: Send + Sync {
    async fn read(&self, path: &Path) -> Result<plist::Dictionary>;
}

/// Enumerate mounted volumes.
#[async_trait]
pub trait VolumeLister: Send + Sync {
    async fn list(&self) -> Result<Vec<VolumeInfo>>;
}

/// Run a shell command with administrator privileges.
///
/// Returns `Err` with the OS-provided description when the user cancels the
/// authorization prompt, enters wrong credentials, or the command fails.
#[async_trait]
pub trait PrivilegedRunner: Send + Sync {
    async fn run_privileged(&self, shell_command: &str) -> std::result::Result<(), String>;
}

/// Hand an executable script to an interactive terminal session.
///
/// Returns once the session was asked to open the script; the script itself
/// keeps running on its own.
#[async_trait]
pub trait TerminalLauncher: Send + Sync {
    async fn launch(&self, script: &Path) -> Result<()>;
}

/// The full set of collaborators used by one engine instance.
#[derive(Clone)]
pub struct Tools {
    pub commands: Arc<dyn CommandRunner>,
    pub images: Arc<dyn DiskImageTool>,
    pub plist: Arc<dyn PlistReader>,
    pub volumes: Arc<dyn VolumeLister>,
    pub privileged: Arc<dyn PrivilegedRunner>,
    pub terminal: Arc<dyn TerminalLauncher>,
}

impl std::fmt::Debug for Tools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tools").finish_non_exhaustive()
    }
}

impl Tools {
    /// Real macOS implementations.
    pub fn system(terminal_app: &str) -> Self {
        let commands: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner);
        Self {
            images: Arc::new(Hdiutil::new(commands.clone())),
            volumes: Arc::new(SystemVolumes::new(commands.clone())),
            commands,
            plist: Arc::new(PlistFileReader),
            privileged: Arc::new(OsascriptPrivileged),
            terminal: Arc::new(TerminalApp::new(terminal_app)),
        }
    }
}
