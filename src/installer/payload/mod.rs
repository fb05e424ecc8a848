//! Turning a user-supplied file into an [`InstallerPayload`].
//!
//! Accepts an installer `.app` bundle directly, or a `.dmg` that contains
//! one. A disk image stays mounted after a successful inspection; whoever
//! builds from the payload owns the unmount.

mod app;
mod disk_image;

use crate::installer::error::{InspectError, Result};
use crate::installer::tools::{DiskImageTool, PlistReader};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identity and location of an installer application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InstallerPayload {
    /// `CFBundleDisplayName`, or the bundle's file name.
    pub display_name: String,
    /// `CFBundleShortVersionString`, or `"?"`.
    pub raw_version: String,
    /// The `.app` bundle.
    pub payload_root: PathBuf,
    /// Set when the bundle lives on a volume this tool attached.
    pub mount_point: Option<PathBuf>,
    /// Other volumes mounted by the same attach.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sibling_mounts: Vec<PathBuf>,
}

impl InstallerPayload {
    pub fn from_disk_image(&self) -> bool {
        self.mount_point.is_some()
    }

    /// Every volume held for this payload, the installer's own last.
    pub fn attached_volumes(&self) -> Vec<PathBuf> {
        self.sibling_mounts
            .iter()
            .chain(&self.mount_point)
            .cloned()
            .collect()
    }
}

/// Inspects payloads, keeping at most one disk image attached at a time.
pub struct PayloadInspector {
    images: Arc<dyn DiskImageTool>,
    plist: Arc<dyn PlistReader>,
    session_mounts: Vec<PathBuf>,
}

impl PayloadInspector {
    pub fn new(images: Arc<dyn DiskImageTool>, plist: Arc<dyn PlistReader>) -> Self {
        Self {
            images,
            plist,
            session_mounts: Vec::new(),
        }
    }

    /// Dispatch on the file extension.
    pub async fn inspect(&mut self, path: &Path) -> Result<InstallerPayload> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("app") => self.inspect_app(path).await,
            Some(ext) if ext.eq_ignore_ascii_case("dmg") => self.inspect_disk_image(path).await,
            _ => Err(InspectError::UnsupportedFileType {
                path: path.to_path_buf(),
            }
            .into()),
        }
    }

    pub async fn inspect_app(&self, path: &Path) -> Result<InstallerPayload> {
        app::read_bundle(self.plist.as_ref(), path).await
    }

    /// Attach `path` and find the installer inside. Volumes left over from a
    /// previous inspection are force-detached first.
    pub async fn inspect_disk_image(&mut self, path: &Path) -> Result<InstallerPayload> {
        self.release().await;

        let payload = disk_image::scan(self.images.as_ref(), self.plist.as_ref(), path).await?;
        self.session_mounts = payload.attached_volumes();
        Ok(payload)
    }

    /// The volumes currently held by this inspector.
    pub fn session_mounts(&self) -> &[PathBuf] {
        &self.session_mounts
    }

    /// Stop tracking the current volumes; the caller now owns their unmount.
    pub fn hand_off(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.session_mounts)
    }

    /// Force-detach the current volumes, if any. Best-effort.
    pub async fn release(&mut self) {
        for mount in std::mem::take(&mut self.session_mounts) {
            log::debug!("Releasing previous mount {}", mount.display());
            if let Err(e) = self.images.detach(&mount, true).await {
                log::warn!("Failed to detach {}: {}", mount.display(), e);
            }
        }
    }
}

impl std::fmt::Debug for PayloadInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadInspector")
            .field("session_mounts", &self.session_mounts)
            .finish_non_exhaustive()
    }
}
