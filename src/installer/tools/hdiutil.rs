//! Disk image attach/detach through `hdiutil`.

use super::{CommandRunner, DiskImageTool};
use crate::installer::error::{Error, InspectError, Result};
use async_trait::async_trait;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `hdiutil` backed [`DiskImageTool`].
#[derive(Clone)]
pub struct Hdiutil {
    commands: Arc<dyn CommandRunner>,
}

impl Hdiutil {
    pub fn new(commands: Arc<dyn CommandRunner>) -> Self {
        Self { commands }
    }
}

/// Extract mount points from the `-plist` output of `hdiutil attach`.
///
/// The output is a dictionary whose `system-entities` array lists one entry
/// per partition; only entries with a `mount-point` are volumes.
pub fn parse_attach_output(stdout: &[u8]) -> std::result::Result<Vec<PathBuf>, String> {
    let value = plist::Value::from_reader(Cursor::new(stdout)).map_err(|e| e.to_string())?;
    let entities = value
        .as_dictionary()
        .and_then(|d| d.get("system-entities"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| "missing system-entities".to_string())?;

    Ok(entities
        .iter()
        .filter_map(|e| e.as_dictionary())
        .filter_map(|d| d.get("mount-point"))
        .filter_map(|m| m.as_string())
        .map(PathBuf::from)
        .collect())
}

#[async_trait]
impl DiskImageTool for Hdiutil {
    async fn attach(&self, image: &Path) -> Result<Vec<PathBuf>> {
        log::info!("Attaching {}", image.display());

        let args = vec![
            "attach".to_string(),
            image.display().to_string(),
            "-plist".to_string(),
            "-nobrowse".to_string(),
            "-readonly".to_string(),
        ];
        let output = self.commands.run("hdiutil", &args).await?;

        if !output.success() {
            return Err(InspectError::MountFailed {
                path: image.to_path_buf(),
                reason: output.stderr_lossy(),
            }
            .into());
        }

        let mount_points = parse_attach_output(&output.stdout).map_err(|reason| {
            Error::from(InspectError::MountFailed {
                path: image.to_path_buf(),
                reason,
            })
        })?;

        log::debug!("hdiutil mount points: {:?}", mount_points);
        Ok(mount_points)
    }

    async fn detach(&self, mount_point: &Path, force: bool) -> Result<()> {
        log::debug!("Detaching {}", mount_point.display());

        let mut args = vec!["detach".to_string(), mount_point.display().to_string()];
        if force {
            args.push("-force".to_string());
        }

        self.commands
            .run("hdiutil", &args)
            .await?
            .check("hdiutil detach")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATTACH_OUTPUT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>system-entities</key>
    <array>
        <dict>
            <key>content-hint</key>
            <string>GUID_partition_scheme</string>
            <key>dev-entry</key>
            <string>/dev/disk4</string>
        </dict>
        <dict>
            <key>content-hint</key>
            <string>Apple_HFS</string>
            <key>dev-entry</key>
            <string>/dev/disk4s1</string>
            <key>mount-point</key>
            <string>/Volumes/Install macOS Big Sur</string>
        </dict>
    </array>
</dict>
</plist>
"#;

    #[test]
    fn picks_only_entities_with_mount_points() {
        let mounts = parse_attach_output(ATTACH_OUTPUT.as_bytes()).unwrap();
        assert_eq!(mounts, vec![PathBuf::from("/Volumes/Install macOS Big Sur")]);
    }

    #[test]
    fn garbage_output_is_rejected() {
        assert!(parse_attach_output(b"hdiutil: attach failed").is_err());
    }

    #[test]
    fn dictionary_without_entities_is_rejected() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0"><dict><key>other</key><string>x</string></dict></plist>"#;
        let err = parse_attach_output(xml.as_bytes()).unwrap_err();
        assert!(err.contains("system-entities"));
    }
}
