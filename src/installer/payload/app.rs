//! Reading identity from an application bundle.

use super::InstallerPayload;
use crate::installer::error::{InspectError, Result};
use crate::installer::tools::PlistReader;
use std::path::Path;

/// Read `<app>/Contents/Info.plist` into a payload with no mount point.
///
/// The display name falls back to the bundle's file name and the version to
/// `"?"`. Any read or parse failure is [`InspectError::NotAPackage`].
pub async fn read_bundle(plist: &dyn PlistReader, app: &Path) -> Result<InstallerPayload> {
    let info_plist = app.join("Contents").join("Info.plist");
    let dict = plist.read(&info_plist).await.map_err(|e| {
        log::debug!("{} unreadable: {}", info_plist.display(), e);
        InspectError::NotAPackage {
            path: app.to_path_buf(),
        }
    })?;

    let display_name = dict
        .get("CFBundleDisplayName")
        .and_then(|v| v.as_string())
        .map(str::to_string)
        .unwrap_or_else(|| {
            app.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
    let raw_version = dict
        .get("CFBundleShortVersionString")
        .and_then(|v| v.as_string())
        .unwrap_or("?")
        .to_string();

    Ok(InstallerPayload {
        display_name,
        raw_version,
        payload_root: app.to_path_buf(),
        mount_point: None,
        sibling_mounts: Vec::new(),
    })
}
