//! File system utilities for staging installer payloads.
//!
//! Copies preserve symlinks, which application bundles rely on for their
//! framework layout. Removals are idempotent.

use crate::installer::error::{Error, ErrorExt, Result};
use std::{
    io::{self},
    path::Path,
};
use tokio::fs;

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }

    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}

/// Removes a file if it exists.
pub async fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing file", path),
    }
}

/// Makes a symbolic link.
#[cfg(unix)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.is_file() {
        return Err(Error::GenericError(format!("{from:?} is not a file")));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying file", from)?;
    Ok(())
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Preserves symlinks. Fails if the source path is not a directory or
/// doesn't exist, or if the destination path already exists.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is not a directory")));
    }
    if to.exists() {
        return Err(Error::GenericError(format!("{to:?} already exists")));
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
        }

        for entry in walkdir::WalkDir::new(&from) {
            let entry = entry.map_err(|e| Error::GenericError(e.to_string()))?;
            let rel_path = entry
                .path()
                .strip_prefix(&from)
                .map_err(|e| Error::GenericError(e.to_string()))?;
            let dest_path = to.join(rel_path);

            if entry.file_type().is_symlink() {
                let target = std::fs::read_link(entry.path()).fs_context("reading link", entry.path())?;
                symlink(&target, &dest_path).fs_context("creating link", &dest_path)?;
            } else if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest_path).fs_context("creating directory", &dest_path)?;
            } else {
                std::fs::copy(entry.path(), &dest_path).fs_context("copying file", entry.path())?;
            }
        }

        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("Directory copy task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copy_dir_preserves_nested_files_and_links() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("Install.app");
        std::fs::create_dir_all(src.join("Contents/Resources")).unwrap();
        std::fs::write(src.join("Contents/Info.plist"), b"plist").unwrap();
        std::fs::write(src.join("Contents/Resources/createinstallmedia"), b"bin").unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink("Resources", src.join("Contents/Current")).unwrap();

        let dst = tmp.path().join("scratch/Install.app");
        copy_dir(&src, &dst).await.unwrap();

        assert_eq!(std::fs::read(dst.join("Contents/Info.plist")).unwrap(), b"plist");
        assert!(dst.join("Contents/Resources/createinstallmedia").is_file());
        #[cfg(unix)]
        assert!(
            std::fs::symlink_metadata(dst.join("Contents/Current"))
                .unwrap()
                .file_type()
                .is_symlink()
        );
    }

    #[tokio::test]
    async fn copy_dir_refuses_existing_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a");
        let dst = tmp.path().join("b");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        assert!(copy_dir(&src, &dst).await.is_err());
    }

    #[tokio::test]
    async fn removals_are_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        remove_dir_all(&missing).await.unwrap();
        remove_file_if_exists(&missing).await.unwrap();

        let marker = tmp.path().join("terminal_done");
        std::fs::write(&marker, b"").unwrap();
        remove_file_if_exists(&marker).await.unwrap();
        assert!(!marker.exists());
    }
}
