//! On-disk configuration.

use crate::installer::error::{ErrorExt, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Contents of `config.toml`. Every key is optional; durations are milliseconds.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub work_dir: Option<PathBuf>,
    pub volumes_root: Option<PathBuf>,
    pub drive_poll_ms: Option<u64>,
    pub usb_watch_ms: Option<u64>,
    pub auth_poll_ms: Option<u64>,
    pub completion_poll_ms: Option<u64>,
    pub completion_warmup_ticks: Option<u32>,
    pub min_capacity_bytes: Option<u64>,
    pub advertised_capacity: Option<String>,
    pub terminal_app: Option<String>,
}

impl ConfigFile {
    /// `<config dir>/macusb/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("macusb").join("config.toml"))
    }

    /// Parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).fs_context("reading configuration", path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Load the default file if one exists.
    pub fn load_default() -> Result<Option<Self>> {
        match Self::default_path() {
            Some(path) if path.is_file() => {
                log::debug!("Loading configuration from {}", path.display());
                Self::load(&path).map(Some)
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let cfg: ConfigFile = toml::from_str(
            r#"
            completion_poll_ms = 500
            terminal_app = "iTerm"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.completion_poll_ms, Some(500));
        assert_eq!(cfg.terminal_app.as_deref(), Some("iTerm"));
        assert_eq!(cfg.work_dir, None);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(toml::from_str::<ConfigFile>("poll_forever = true").is_err());
    }

    #[test]
    fn load_reports_missing_file_with_path() {
        let err = ConfigFile::load(Path::new("/definitely/missing/config.toml")).unwrap_err();
        assert!(err.to_string().contains("/definitely/missing/config.toml"));
    }
}
