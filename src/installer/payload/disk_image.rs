//! Finding the installer inside a disk image.

use super::{InstallerPayload, app};
use crate::installer::error::{InspectError, Result};
use crate::installer::tools::{DiskImageTool, PlistReader};
use std::path::{Path, PathBuf};

/// Attach `image` and return the first readable installer found at the top
/// level of its volumes.
///
/// Each volume contributes at most its first `.app` entry (sorted by name).
/// An unreadable bundle moves on to the next volume. The other volumes of the
/// image are recorded on the payload so they are released along with it.
/// When nothing is found the volumes are detached again before
/// [`InspectError::NoInstallerFound`].
pub async fn scan(
    images: &dyn DiskImageTool,
    plist: &dyn PlistReader,
    image: &Path,
) -> Result<InstallerPayload> {
    let mount_points = images.attach(image).await?;

    for mount_point in &mount_points {
        let Some(bundle) = first_app(mount_point).await else {
            continue;
        };
        match app::read_bundle(plist, &bundle).await {
            Ok(payload) => {
                log::info!(
                    "Found {} ({}) in {}",
                    payload.display_name,
                    payload.raw_version,
                    mount_point.display()
                );
                let sibling_mounts = mount_points
                    .iter()
                    .filter(|m| *m != mount_point)
                    .cloned()
                    .collect();
                return Ok(InstallerPayload {
                    mount_point: Some(mount_point.clone()),
                    sibling_mounts,
                    ..payload
                });
            }
            Err(e) => log::debug!("Skipping {}: {}", bundle.display(), e),
        }
    }

    for mount_point in &mount_points {
        if let Err(e) = images.detach(mount_point, true).await {
            log::warn!("Failed to detach {}: {}", mount_point.display(), e);
        }
    }

    Err(InspectError::NoInstallerFound {
        path: image.to_path_buf(),
    }
    .into())
}

async fn first_app(dir: &Path) -> Option<PathBuf> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cannot list {}: {}", dir.display(), e);
            return None;
        }
    };

    let mut apps = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "app") {
            apps.push(path);
        }
    }
    apps.sort();
    apps.into_iter().next()
}
