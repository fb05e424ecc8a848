//! Builder for constructing Settings.

use super::{ConfigFile, Settings};
use crate::installer::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Builder for constructing [`Settings`].
///
/// Unset fields keep the [`Settings::default`] values. Later calls win, so
/// apply a [`ConfigFile`] first and command-line overrides after it.
#[derive(Default)]
pub struct SettingsBuilder {
    work_dir: Option<PathBuf>,
    volumes_root: Option<PathBuf>,
    drive_poll_interval: Option<Duration>,
    usb_watch_interval: Option<Duration>,
    auth_poll_interval: Option<Duration>,
    completion_poll_interval: Option<Duration>,
    completion_warmup_ticks: Option<u32>,
    min_capacity_bytes: Option<u64>,
    advertised_capacity: Option<String>,
    terminal_app: Option<String>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Takes every value present in a configuration file.
    pub fn config_file(mut self, file: ConfigFile) -> Self {
        let ms = |v: Option<u64>| v.map(Duration::from_millis);

        if file.work_dir.is_some() {
            self.work_dir = file.work_dir;
        }
        if file.volumes_root.is_some() {
            self.volumes_root = file.volumes_root;
        }
        self.drive_poll_interval = ms(file.drive_poll_ms).or(self.drive_poll_interval);
        self.usb_watch_interval = ms(file.usb_watch_ms).or(self.usb_watch_interval);
        self.auth_poll_interval = ms(file.auth_poll_ms).or(self.auth_poll_interval);
        self.completion_poll_interval =
            ms(file.completion_poll_ms).or(self.completion_poll_interval);
        self.completion_warmup_ticks = file
            .completion_warmup_ticks
            .or(self.completion_warmup_ticks);
        self.min_capacity_bytes = file.min_capacity_bytes.or(self.min_capacity_bytes);
        if file.advertised_capacity.is_some() {
            self.advertised_capacity = file.advertised_capacity;
        }
        if file.terminal_app.is_some() {
            self.terminal_app = file.terminal_app;
        }
        self
    }

    /// Sets the directory attempts stage below.
    ///
    /// Default: `<tmp>/macUSB_temp`
    pub fn work_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.work_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the root below which cleanup may force-detach mounts.
    ///
    /// Default: `/Volumes`
    pub fn volumes_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.volumes_root = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn drive_poll_interval(mut self, interval: Duration) -> Self {
        self.drive_poll_interval = Some(interval);
        self
    }

    pub fn usb_watch_interval(mut self, interval: Duration) -> Self {
        self.usb_watch_interval = Some(interval);
        self
    }

    pub fn auth_poll_interval(mut self, interval: Duration) -> Self {
        self.auth_poll_interval = Some(interval);
        self
    }

    pub fn completion_poll_interval(mut self, interval: Duration) -> Self {
        self.completion_poll_interval = Some(interval);
        self
    }

    pub fn completion_warmup_ticks(mut self, ticks: u32) -> Self {
        self.completion_warmup_ticks = Some(ticks);
        self
    }

    pub fn min_capacity_bytes(mut self, bytes: u64) -> Self {
        self.min_capacity_bytes = Some(bytes);
        self
    }

    pub fn advertised_capacity(mut self, label: impl Into<String>) -> Self {
        self.advertised_capacity = Some(label.into());
        self
    }

    pub fn terminal_app(mut self, app: impl Into<String>) -> Self {
        self.terminal_app = Some(app.into());
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if any polling interval is zero, since
    /// `tokio::time::interval` panics on a zero period.
    pub fn build(self) -> Result<Settings> {
        let defaults = Settings::default();

        let settings = Settings {
            work_dir: self.work_dir.unwrap_or(defaults.work_dir),
            volumes_root: self.volumes_root.unwrap_or(defaults.volumes_root),
            drive_poll_interval: self
                .drive_poll_interval
                .unwrap_or(defaults.drive_poll_interval),
            usb_watch_interval: self
                .usb_watch_interval
                .unwrap_or(defaults.usb_watch_interval),
            auth_poll_interval: self
                .auth_poll_interval
                .unwrap_or(defaults.auth_poll_interval),
            completion_poll_interval: self
                .completion_poll_interval
                .unwrap_or(defaults.completion_poll_interval),
            completion_warmup_ticks: self
                .completion_warmup_ticks
                .unwrap_or(defaults.completion_warmup_ticks),
            min_capacity_bytes: self
                .min_capacity_bytes
                .unwrap_or(defaults.min_capacity_bytes),
            advertised_capacity: self
                .advertised_capacity
                .unwrap_or(defaults.advertised_capacity),
            terminal_app: self.terminal_app.unwrap_or(defaults.terminal_app),
        };

        for (name, interval) in [
            ("drive_poll", settings.drive_poll_interval),
            ("usb_watch", settings.usb_watch_interval),
            ("auth_poll", settings.auth_poll_interval),
            ("completion_poll", settings.completion_poll_interval),
        ] {
            if interval.is_zero() {
                return Err(Error::GenericError(format!(
                    "{name} interval must be greater than zero"
                )));
            }
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = SettingsBuilder::new().build().unwrap();
        assert!(s.work_dir().ends_with("macUSB_temp"));
        assert_eq!(s.volumes_root(), Path::new("/Volumes"));
        assert_eq!(s.drive_poll_interval(), Duration::from_millis(100));
        assert_eq!(s.usb_watch_interval(), Duration::from_millis(100));
        assert_eq!(s.auth_poll_interval(), Duration::from_millis(200));
        assert_eq!(s.completion_poll_interval(), Duration::from_secs(1));
        assert_eq!(s.completion_warmup_ticks(), 3);
        assert_eq!(s.min_capacity_bytes(), 15_000_000_000);
        assert_eq!(s.advertised_capacity(), "16 GB");
        assert_eq!(s.terminal_app(), "Terminal");
    }

    #[test]
    fn explicit_values_override_config_file() {
        let file = ConfigFile {
            work_dir: Some("/from/file".into()),
            completion_poll_ms: Some(250),
            ..Default::default()
        };
        let s = SettingsBuilder::new()
            .config_file(file)
            .work_dir("/from/flag")
            .build()
            .unwrap();
        assert_eq!(s.work_dir(), Path::new("/from/flag"));
        assert_eq!(s.completion_poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = SettingsBuilder::new()
            .auth_poll_interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("auth_poll"));
    }
}
