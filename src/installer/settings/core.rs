//! Core Settings struct and implementations.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name used for scratch space under the system temp dir.
pub const WORK_DIR_NAME: &str = "macUSB_temp";

/// Enforced minimum drive capacity.
pub const MIN_CAPACITY_BYTES: u64 = 15_000_000_000;

/// Capacity requirement shown to users. Deliberately larger than the
/// enforced [`MIN_CAPACITY_BYTES`]; drives report slightly under their label.
pub const ADVERTISED_CAPACITY: &str = "16 GB";

/// Engine settings.
///
/// Constructed via [`SettingsBuilder`], optionally layered over a TOML
/// configuration file.
///
/// # Examples
///
/// ```no_run
/// use macusb::installer::SettingsBuilder;
/// use std::time::Duration;
///
/// # fn example() -> macusb::installer::Result<()> {
/// let settings = SettingsBuilder::new()
///     .work_dir("/tmp/macUSB_temp")
///     .completion_poll_interval(Duration::from_millis(500))
///     .build()?;
/// assert_eq!(settings.terminal_app(), "Terminal");
/// # Ok(())
/// # }
/// ```
///
/// [`SettingsBuilder`]: super::SettingsBuilder
#[derive(Clone, Debug)]
pub struct Settings {
    /// Parent of the per-attempt scratch directories. Never removed itself.
    pub(super) work_dir: PathBuf,

    /// Only mounts below this root are force-detached during cleanup.
    pub(super) volumes_root: PathBuf,

    pub(super) drive_poll_interval: Duration,
    pub(super) usb_watch_interval: Duration,
    pub(super) auth_poll_interval: Duration,
    pub(super) completion_poll_interval: Duration,

    /// Completion ticks to wait before a missing running marker counts as
    /// a closed terminal window.
    pub(super) completion_warmup_ticks: u32,

    pub(super) min_capacity_bytes: u64,
    pub(super) advertised_capacity: String,

    /// Application that hosts the generated script.
    pub(super) terminal_app: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join(WORK_DIR_NAME),
            volumes_root: PathBuf::from("/Volumes"),
            drive_poll_interval: Duration::from_millis(100),
            usb_watch_interval: Duration::from_millis(100),
            auth_poll_interval: Duration::from_millis(200),
            completion_poll_interval: Duration::from_secs(1),
            completion_warmup_ticks: 3,
            min_capacity_bytes: MIN_CAPACITY_BYTES,
            advertised_capacity: ADVERTISED_CAPACITY.to_string(),
            terminal_app: "Terminal".to_string(),
        }
    }
}

impl Settings {
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn volumes_root(&self) -> &Path {
        &self.volumes_root
    }

    pub fn drive_poll_interval(&self) -> Duration {
        self.drive_poll_interval
    }

    pub fn usb_watch_interval(&self) -> Duration {
        self.usb_watch_interval
    }

    pub fn auth_poll_interval(&self) -> Duration {
        self.auth_poll_interval
    }

    pub fn completion_poll_interval(&self) -> Duration {
        self.completion_poll_interval
    }

    pub fn completion_warmup_ticks(&self) -> u32 {
        self.completion_warmup_ticks
    }

    pub fn min_capacity_bytes(&self) -> u64 {
        self.min_capacity_bytes
    }

    pub fn advertised_capacity(&self) -> &str {
        &self.advertised_capacity
    }

    pub fn terminal_app(&self) -> &str {
        &self.terminal_app
    }
}
