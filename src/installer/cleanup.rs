//! Best-effort teardown of a build attempt.

use crate::installer::tools::DiskImageTool;
use crate::installer::utils::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Unmounts source images and removes scratch space.
///
/// Nothing here fails: every step logs and moves on, and repeating a call or
/// calling with paths that never existed is a no-op.
#[derive(Clone)]
pub struct CleanupManager {
    images: Arc<dyn DiskImageTool>,
    volumes_root: PathBuf,
}

impl CleanupManager {
    pub fn new(images: Arc<dyn DiskImageTool>, volumes_root: impl Into<PathBuf>) -> Self {
        Self {
            images,
            volumes_root: volumes_root.into(),
        }
    }

    /// Force-detach `mounts` and remove `temp_dir`.
    pub async fn cleanup(&self, mounts: &[PathBuf], temp_dir: &Path) {
        log::info!("Cleaning up");

        self.release_mounts(mounts).await;

        if let Err(e) = fs::remove_dir_all(temp_dir).await {
            log::warn!("Failed to remove {}: {}", temp_dir.display(), e);
        }
    }

    pub async fn release_mounts(&self, mounts: &[PathBuf]) {
        for mount in mounts {
            self.release_mount(mount).await;
        }
    }

    /// Force-detach a mount if it lives under the volumes root.
    pub async fn release_mount(&self, mount_point: &Path) {
        if !self.is_external_mount(mount_point) {
            log::debug!(
                "Not detaching {}: outside {}",
                mount_point.display(),
                self.volumes_root.display()
            );
            return;
        }
        if let Err(e) = self.images.detach(mount_point, true).await {
            log::warn!("Failed to detach {}: {}", mount_point.display(), e);
        }
    }

    fn is_external_mount(&self, path: &Path) -> bool {
        path != self.volumes_root && path.starts_with(&self.volumes_root)
    }
}

impl std::fmt::Debug for CleanupManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupManager")
            .field("volumes_root", &self.volumes_root)
            .finish_non_exhaustive()
    }
}
