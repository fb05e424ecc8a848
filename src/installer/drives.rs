//! Removable drive tracking.
//!
//! The registry keeps the latest snapshot of external removable volumes and
//! the user's target selection. Removable-media notifications are not
//! available, so callers refresh on a short fixed interval, either directly
//! or through [`spawn_poller`].

use crate::installer::error::{Error, Result};
use crate::installer::settings::MIN_CAPACITY_BYTES;
use crate::installer::tools::{VolumeInfo, VolumeLister};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Placeholder when a volume's BSD device cannot be resolved.
pub const UNKNOWN_DEVICE: &str = "unknown";

/// A candidate target volume.
#[derive(Clone, Debug, Eq, Serialize)]
pub struct UsbDrive {
    pub display_name: String,
    pub device_identifier: String,
    pub capacity_bytes: u64,
    pub volume_path: PathBuf,
}

impl PartialEq for UsbDrive {
    fn eq(&self, other: &Self) -> bool {
        self.volume_path == other.volume_path
    }
}

impl UsbDrive {
    fn from_volume(volume: VolumeInfo) -> Option<Self> {
        if !volume.is_removable || volume.is_internal == Some(true) {
            return None;
        }
        Some(Self {
            display_name: volume.name?,
            capacity_bytes: volume.capacity_bytes?,
            device_identifier: volume.device.unwrap_or_else(|| UNKNOWN_DEVICE.to_string()),
            volume_path: volume.path,
        })
    }
}

/// Keep only removable volumes not known to be internal that report both a
/// name and a capacity.
pub fn usb_drives(volumes: Vec<VolumeInfo>) -> Vec<UsbDrive> {
    volumes.into_iter().filter_map(UsbDrive::from_volume).collect()
}

/// True iff the drive reports at least `minimum_bytes`.
pub fn check_capacity(drive: &UsbDrive, minimum_bytes: u64) -> bool {
    drive.capacity_bytes >= minimum_bytes
}

/// Whether `path` is still among the mounted USB drives.
pub async fn is_reachable(volumes: &dyn VolumeLister, path: &Path) -> Result<bool> {
    Ok(usb_drives(volumes.list().await?)
        .iter()
        .any(|d| d.volume_path == path))
}

/// Snapshot of available drives plus the current selection.
pub struct DriveRegistry {
    volumes: Arc<dyn VolumeLister>,
    min_capacity_bytes: u64,
    drives: Vec<UsbDrive>,
    selected: Option<UsbDrive>,
    capacity_ok: Option<bool>,
}

impl DriveRegistry {
    pub fn new(volumes: Arc<dyn VolumeLister>) -> Self {
        Self {
            volumes,
            min_capacity_bytes: MIN_CAPACITY_BYTES,
            drives: Vec::new(),
            selected: None,
            capacity_ok: None,
        }
    }

    pub fn with_min_capacity(mut self, bytes: u64) -> Self {
        self.min_capacity_bytes = bytes;
        self
    }

    /// List volumes and apply the result.
    pub async fn refresh(&mut self) -> Result<&[UsbDrive]> {
        let drives = usb_drives(self.volumes.list().await?);
        self.apply_snapshot(drives);
        Ok(&self.drives)
    }

    /// Replace the snapshot. Returns `true` when this cleared the selection.
    ///
    /// A selected drive whose path is gone is deselected and its capacity
    /// result discarded. A selected drive that is still present is replaced
    /// by its fresh value, and its capacity result is recomputed.
    pub fn apply_snapshot(&mut self, drives: Vec<UsbDrive>) -> bool {
        self.drives = drives;

        let Some(current) = self.selected.take() else {
            return false;
        };

        match self.drives.iter().find(|d| **d == current) {
            Some(fresh) => {
                if self.capacity_ok.is_some() {
                    self.capacity_ok = Some(check_capacity(fresh, self.min_capacity_bytes));
                }
                self.selected = Some(fresh.clone());
                false
            }
            None => {
                log::info!(
                    "Selected drive {} disappeared",
                    current.volume_path.display()
                );
                self.clear_selection();
                true
            }
        }
    }

    pub fn drives(&self) -> &[UsbDrive] {
        &self.drives
    }

    pub fn selected(&self) -> Option<&UsbDrive> {
        self.selected.as_ref()
    }

    /// Result of the last capacity check on the selection, if still valid.
    pub fn capacity_ok(&self) -> Option<bool> {
        self.capacity_ok
    }

    /// Select the drive mounted at `path` from the current snapshot.
    pub fn select(&mut self, path: &Path) -> Result<&UsbDrive> {
        let drive = self
            .drives
            .iter()
            .find(|d| d.volume_path == path)
            .cloned()
            .ok_or_else(|| {
                Error::GenericError(format!("{} is not a removable drive", path.display()))
            })?;

        if self.selected.as_ref() != Some(&drive) {
            self.capacity_ok = None;
        }
        Ok(self.selected.insert(drive))
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.capacity_ok = None;
    }

    /// Check the selection against the enforced minimum and remember the result.
    pub fn verify_selection(&mut self) -> Result<UsbDrive> {
        let drive = self
            .selected
            .clone()
            .ok_or_else(|| Error::GenericError("no drive selected".to_string()))?;

        let ok = check_capacity(&drive, self.min_capacity_bytes);
        self.capacity_ok = Some(ok);
        if !ok {
            return Err(Error::InsufficientCapacity {
                drive: drive.display_name,
                capacity: drive.capacity_bytes,
                required: self.min_capacity_bytes,
            });
        }
        Ok(drive)
    }
}

impl std::fmt::Debug for DriveRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveRegistry")
            .field("drives", &self.drives)
            .field("selected", &self.selected)
            .field("capacity_ok", &self.capacity_ok)
            .finish_non_exhaustive()
    }
}

/// Publish a fresh drive list every `interval` until `cancel` fires.
///
/// Only changed snapshots are sent. Listing errors are logged and the
/// previous snapshot is kept.
pub fn spawn_poller(
    volumes: Arc<dyn VolumeLister>,
    interval: Duration,
    cancel: CancellationToken,
) -> (watch::Receiver<Vec<UsbDrive>>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(Vec::new());

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match volumes.list().await {
                Ok(list) => {
                    let drives = usb_drives(list);
                    tx.send_if_modified(|current| {
                        let changed = !same_snapshot(current, &drives);
                        if changed {
                            *current = drives;
                        }
                        changed
                    });
                }
                Err(e) => log::warn!("Drive refresh failed: {}", e),
            }

            if tx.is_closed() {
                break;
            }
        }
        log::debug!("Drive poller stopped");
    });

    (rx, handle)
}

fn same_snapshot(a: &[UsbDrive], b: &[UsbDrive]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.volume_path == y.volume_path
                && x.display_name == y.display_name
                && x.capacity_bytes == y.capacity_bytes
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn volume(name: &str, capacity: u64) -> VolumeInfo {
        VolumeInfo {
            name: Some(name.to_string()),
            is_removable: true,
            is_internal: Some(false),
            capacity_bytes: Some(capacity),
            path: PathBuf::from("/Volumes").join(name),
            device: Some("disk4s1".to_string()),
        }
    }

    fn drive(name: &str, capacity: u64) -> UsbDrive {
        UsbDrive::from_volume(volume(name, capacity)).unwrap()
    }

    struct FakeVolumes(Mutex<Vec<VolumeInfo>>);

    #[async_trait]
    impl VolumeLister for FakeVolumes {
        async fn list(&self) -> Result<Vec<VolumeInfo>> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    #[test]
    fn capacity_gate_is_exact_at_fifteen_billion() {
        assert!(!check_capacity(&drive("USB", 14_999_999_999), MIN_CAPACITY_BYTES));
        assert!(check_capacity(&drive("USB", 15_000_000_000), MIN_CAPACITY_BYTES));
    }

    #[test]
    fn filter_requires_external_removable_named_sized_volumes() {
        let internal = VolumeInfo {
            is_internal: Some(true),
            ..volume("Macintosh HD", 500_000_000_000)
        };
        let fixed = VolumeInfo {
            is_removable: false,
            ..volume("Backup", 1_000_000_000_000)
        };
        let unnamed = VolumeInfo {
            name: None,
            ..volume("NONAME", 32_000_000_000)
        };
        let no_capacity = VolumeInfo {
            capacity_bytes: None,
            ..volume("Card", 8_000_000_000)
        };
        let no_device = VolumeInfo {
            device: None,
            is_internal: None,
            ..volume("KINGSTON", 16_000_000_000)
        };

        let drives = usb_drives(vec![
            internal,
            fixed,
            unnamed,
            no_capacity,
            volume("SANDISK", 32_000_000_000),
            no_device,
        ]);
        let names: Vec<_> = drives.iter().map(|d| d.display_name.as_str()).collect();
        assert_eq!(names, ["SANDISK", "KINGSTON"]);
        assert_eq!(drives[1].device_identifier, UNKNOWN_DEVICE);
    }

    #[test]
    fn drives_compare_by_volume_path() {
        let mut renamed = drive("USB", 16_000_000_000);
        renamed.display_name = "Other".into();
        renamed.capacity_bytes = 1;
        assert_eq!(renamed, drive("USB", 16_000_000_000));
    }

    #[tokio::test]
    async fn disappearing_selection_is_cleared_with_capacity_state() {
        let lister = Arc::new(FakeVolumes(Mutex::new(vec![volume("USB", 16_000_000_000)])));
        let mut registry = DriveRegistry::new(lister.clone());
        registry.refresh().await.unwrap();
        registry.select(Path::new("/Volumes/USB")).unwrap();
        registry.verify_selection().unwrap();
        assert_eq!(registry.capacity_ok(), Some(true));

        lister.0.lock().unwrap().clear();
        registry.refresh().await.unwrap();

        assert!(registry.selected().is_none());
        assert_eq!(registry.capacity_ok(), None);
    }

    #[test]
    fn surviving_selection_picks_up_new_capacity() {
        let mut registry = DriveRegistry::new(Arc::new(FakeVolumes(Mutex::default())));
        registry.apply_snapshot(vec![drive("USB", 16_000_000_000)]);
        registry.select(Path::new("/Volumes/USB")).unwrap();
        registry.verify_selection().unwrap();

        let cleared = registry.apply_snapshot(vec![drive("USB", 8_000_000_000)]);
        assert!(!cleared);
        assert_eq!(registry.selected().unwrap().capacity_bytes, 8_000_000_000);
        assert_eq!(registry.capacity_ok(), Some(false));
    }

    #[test]
    fn undersized_selection_is_refused() {
        let mut registry = DriveRegistry::new(Arc::new(FakeVolumes(Mutex::default())));
        registry.apply_snapshot(vec![drive("TINY", 8_000_000_000)]);
        registry.select(Path::new("/Volumes/TINY")).unwrap();

        let err = registry.verify_selection().unwrap_err();
        assert!(matches!(err, Error::InsufficientCapacity { required: MIN_CAPACITY_BYTES, .. }));
        assert_eq!(registry.capacity_ok(), Some(false));
    }

    #[test]
    fn selecting_unknown_path_fails() {
        let mut registry = DriveRegistry::new(Arc::new(FakeVolumes(Mutex::default())));
        assert!(registry.select(Path::new("/Volumes/Nope")).is_err());
    }

    #[tokio::test]
    async fn poller_publishes_changes_and_stops_on_cancel() {
        let lister = Arc::new(FakeVolumes(Mutex::new(vec![volume("USB", 16_000_000_000)])));
        let cancel = CancellationToken::new();
        let (mut rx, handle) =
            spawn_poller(lister.clone(), Duration::from_millis(5), cancel.clone());

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 1);

        lister.0.lock().unwrap().clear();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn reachability_follows_the_volume_list() {
        let lister = FakeVolumes(Mutex::new(vec![volume("USB", 16_000_000_000)]));
        assert!(is_reachable(&lister, Path::new("/Volumes/USB")).await.unwrap());
        lister.0.lock().unwrap().clear();
        assert!(!is_reachable(&lister, Path::new("/Volumes/USB")).await.unwrap());
    }
}
