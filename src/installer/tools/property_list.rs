//! Info.plist reading.

use super::PlistReader;
use crate::installer::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;

/// Reads XML or binary property lists from disk with the `plist` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlistFileReader;

#[async_trait]
impl PlistReader for PlistFileReader {
    async fn read(&self, path: &Path) -> Result<plist::Dictionary> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let value = plist::Value::from_file(&path)?;
            value.into_dictionary().ok_or_else(|| {
                Error::GenericError(format!("{} is not a dictionary", path.display()))
            })
        })
        .await
        .map_err(|e| Error::GenericError(format!("plist read task panicked: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_xml_dictionary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Info.plist");
        std::fs::write(
            &path,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0"><dict>
<key>CFBundleDisplayName</key><string>Install macOS Ventura</string>
<key>CFBundleShortVersionString</key><string>18.7.04</string>
</dict></plist>"#,
        )
        .unwrap();

        let dict = PlistFileReader.read(&path).await.unwrap();
        assert_eq!(
            dict.get("CFBundleDisplayName").and_then(|v| v.as_string()),
            Some("Install macOS Ventura")
        );
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PlistFileReader.read(&dir.path().join("nope.plist")).await.is_err());
    }

    #[tokio::test]
    async fn non_dictionary_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Array.plist");
        std::fs::write(
            &path,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0"><array><string>x</string></array></plist>"#,
        )
        .unwrap();
        assert!(PlistFileReader.read(&path).await.is_err());
    }
}
