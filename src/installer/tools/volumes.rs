//! Mounted volume enumeration.

use super::{CommandRunner, VolumeLister};
use crate::installer::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One mounted volume as reported by the OS.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VolumeInfo {
    pub name: Option<String>,
    pub is_removable: bool,
    /// `None` when the OS was not asked or did not say.
    pub is_internal: Option<bool>,
    pub capacity_bytes: Option<u64>,
    pub path: PathBuf,
    /// BSD device name such as `disk4s1`.
    pub device: Option<String>,
}

/// What `diskutil info` adds to a sysinfo record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiskDetails {
    pub device: Option<String>,
    pub internal: Option<bool>,
}

/// Pull the device identifier and the internal flag out of
/// `diskutil info -plist` output.
pub fn parse_diskutil_info(stdout: &[u8]) -> std::result::Result<DiskDetails, String> {
    let value = plist::Value::from_reader(Cursor::new(stdout)).map_err(|e| e.to_string())?;
    let dict = value
        .as_dictionary()
        .ok_or_else(|| "diskutil output is not a dictionary".to_string())?;

    Ok(DiskDetails {
        device: dict
            .get("DeviceIdentifier")
            .and_then(|v| v.as_string())
            .map(str::to_string),
        internal: dict.get("Internal").and_then(|v| v.as_boolean()),
    })
}

/// Lists volumes with `sysinfo`, then asks `diskutil` about the removable
/// ones.
#[derive(Clone)]
pub struct SystemVolumes {
    commands: Arc<dyn CommandRunner>,
}

impl SystemVolumes {
    pub fn new(commands: Arc<dyn CommandRunner>) -> Self {
        Self { commands }
    }

    async fn details(&self, mount_point: &Path) -> DiskDetails {
        let args = vec![
            "info".to_string(),
            "-plist".to_string(),
            mount_point.display().to_string(),
        ];
        let output = match self.commands.run("diskutil", &args).await {
            Ok(output) if output.success() => output,
            Ok(output) => {
                log::debug!(
                    "diskutil info {} failed: {}",
                    mount_point.display(),
                    output.stderr_lossy()
                );
                return DiskDetails::default();
            }
            Err(e) => {
                log::debug!("diskutil unavailable: {}", e);
                return DiskDetails::default();
            }
        };

        parse_diskutil_info(&output.stdout).unwrap_or_else(|reason| {
            log::debug!("Unreadable diskutil output for {}: {}", mount_point.display(), reason);
            DiskDetails::default()
        })
    }
}

impl std::fmt::Debug for SystemVolumes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemVolumes").finish_non_exhaustive()
    }
}

#[async_trait]
impl VolumeLister for SystemVolumes {
    async fn list(&self) -> Result<Vec<VolumeInfo>> {
        let mut volumes = tokio::task::spawn_blocking(|| {
            let disks = sysinfo::Disks::new_with_refreshed_list();
            disks
                .list()
                .iter()
                .map(|disk| {
                    let name = disk.name().to_string_lossy().trim().to_string();
                    let total = disk.total_space();
                    VolumeInfo {
                        name: (!name.is_empty()).then_some(name),
                        is_removable: disk.is_removable(),
                        is_internal: None,
                        capacity_bytes: (total > 0).then_some(total),
                        path: disk.mount_point().to_path_buf(),
                        device: None,
                    }
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| Error::GenericError(format!("volume listing task panicked: {}", e)))?;

        for volume in volumes.iter_mut().filter(|v| v.is_removable) {
            let details = self.details(&volume.path).await;
            volume.device = details.device;
            volume.is_internal = details.internal;
        }
        Ok(volumes)
    }
}
