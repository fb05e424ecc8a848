//! In-memory stand-ins for every macOS tool the engine drives.

#![allow(dead_code)]

use async_trait::async_trait;
use macusb::installer::tools::{
    CommandRunner, DiskImageTool, PlistFileReader, PrivilegedRunner, TerminalLauncher, ToolOutput,
    VolumeInfo, VolumeLister,
};
use macusb::installer::{
    BuildPhase, InstallerPayload, ProgressSink, Result, Settings, SettingsBuilder,
    SystemClassification, Tools, UsbDrive,
};
use macusb::installer::builder::{DONE_SIGNAL, RUNNING_SIGNAL};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
pub struct Commands {
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl Commands {
    pub fn programs(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }
}

#[async_trait]
impl CommandRunner for Commands {
    async fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));
        Ok(ToolOutput::ok(Vec::new()))
    }
}

#[derive(Default)]
pub struct Images {
    pub detached: Mutex<Vec<PathBuf>>,
}

impl Images {
    pub fn detach_count(&self) -> usize {
        self.detached.lock().unwrap().len()
    }
}

#[async_trait]
impl DiskImageTool for Images {
    async fn attach(&self, _image: &Path) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    async fn detach(&self, mount_point: &Path, _force: bool) -> Result<()> {
        self.detached.lock().unwrap().push(mount_point.to_path_buf());
        Ok(())
    }
}

#[derive(Default)]
pub struct Volumes {
    pub mounted: Mutex<Vec<VolumeInfo>>,
}

impl Volumes {
    pub fn with_drive(drive: &UsbDrive) -> Self {
        let volumes = Self::default();
        volumes.mounted.lock().unwrap().push(VolumeInfo {
            name: Some(drive.display_name.clone()),
            is_removable: true,
            is_internal: Some(false),
            capacity_bytes: Some(drive.capacity_bytes),
            path: drive.volume_path.clone(),
            device: Some(drive.device_identifier.clone()),
        });
        volumes
    }

    pub fn unplug_all(&self) {
        self.mounted.lock().unwrap().clear();
    }
}

#[async_trait]
impl VolumeLister for Volumes {
    async fn list(&self) -> Result<Vec<VolumeInfo>> {
        Ok(self.mounted.lock().unwrap().clone())
    }
}

/// Administrator prompt. Denying dismisses it; granting runs the leading
/// `touch` of the command and then takes a while, like a real image scan.
#[derive(Default)]
pub struct Prompt {
    pub grants: bool,
    pub commands: Mutex<Vec<String>>,
}

impl Prompt {
    pub fn granting() -> Self {
        Self {
            grants: true,
            ..Self::default()
        }
    }
}

/// First path the command touches, unquoted.
fn touched_path(shell_command: &str) -> PathBuf {
    let rest = shell_command.strip_prefix("touch ").unwrap();
    let end = rest.find(" && ").unwrap();
    PathBuf::from(rest[..end].trim_matches('\''))
}

#[async_trait]
impl PrivilegedRunner for Prompt {
    async fn run_privileged(&self, shell_command: &str) -> std::result::Result<(), String> {
        self.commands.lock().unwrap().push(shell_command.to_string());
        if !self.grants {
            return Err("User canceled. (-128)".to_string());
        }
        std::fs::write(touched_path(shell_command), b"").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(())
    }
}

/// What the fake terminal does with the script it is handed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Script {
    /// Runs to the end: both markers written.
    Completes,
    /// Window closed mid-run: the running marker is written and removed.
    WindowClosed,
    /// Still running: the running marker stays until someone stops the build.
    KeepsRunning,
}

pub struct Terminal {
    pub behaviour: Script,
    pub launched: Mutex<Vec<PathBuf>>,
    /// Contents of each launched script, read before cleanup removes it.
    pub scripts: Mutex<Vec<String>>,
}

impl Terminal {
    pub fn new(behaviour: Script) -> Self {
        Self {
            behaviour,
            launched: Mutex::new(Vec::new()),
            scripts: Mutex::new(Vec::new()),
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launched.lock().unwrap().len()
    }

    pub fn last_script(&self) -> String {
        self.scripts.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl TerminalLauncher for Terminal {
    async fn launch(&self, script: &Path) -> Result<()> {
        self.launched.lock().unwrap().push(script.to_path_buf());
        self.scripts
            .lock()
            .unwrap()
            .push(std::fs::read_to_string(script).unwrap());

        let work_dir = script.parent().unwrap().to_path_buf();
        let running = work_dir.join(RUNNING_SIGNAL);
        match self.behaviour {
            Script::Completes => {
                std::fs::write(&running, b"").unwrap();
                std::fs::write(work_dir.join(DONE_SIGNAL), b"").unwrap();
            }
            Script::WindowClosed => {
                std::fs::write(&running, b"").unwrap();
                std::fs::remove_file(&running).unwrap();
            }
            Script::KeepsRunning => std::fs::write(&running, b"").unwrap(),
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct Recorder {
    pub phases: Mutex<Vec<BuildPhase>>,
}

impl Recorder {
    pub fn phases(&self) -> Vec<BuildPhase> {
        self.phases.lock().unwrap().clone()
    }

    pub fn saw(&self, phase: BuildPhase) -> bool {
        self.phases().contains(&phase)
    }

    /// Index of the first occurrence of `phase`.
    pub fn position(&self, phase: BuildPhase) -> Option<usize> {
        self.phases().iter().position(|p| *p == phase)
    }
}

impl ProgressSink for Recorder {
    fn phase(&self, phase: BuildPhase) {
        self.phases.lock().unwrap().push(phase);
    }
}

/// A temporary `/Volumes` lookalike with a scratch directory beside it.
pub struct Sandbox {
    pub root: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("Volumes")).unwrap();
        Self { root }
    }

    pub fn volumes_root(&self) -> PathBuf {
        self.root.path().join("Volumes")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.path().join("macUSB_temp")
    }

    /// Whatever attempts left behind in the work dir.
    pub fn scratch_entries(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.work_dir()) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn settings(&self) -> Settings {
        SettingsBuilder::new()
            .work_dir(self.work_dir())
            .volumes_root(self.volumes_root())
            .usb_watch_interval(Duration::from_millis(10))
            .auth_poll_interval(Duration::from_millis(10))
            .completion_poll_interval(Duration::from_millis(10))
            .completion_warmup_ticks(3)
            .build()
            .unwrap()
    }

    pub fn drive(&self) -> UsbDrive {
        UsbDrive {
            display_name: "USB".to_string(),
            device_identifier: "disk4s1".to_string(),
            capacity_bytes: 32_000_000_000,
            volume_path: self.volumes_root().join("USB"),
        }
    }

    /// An installer bundle on a mounted image under the volumes root.
    pub fn mounted_installer(&self, name: &str, version: &str) -> InstallerPayload {
        let mount = self.volumes_root().join(name);
        let app = mount.join(format!("{name}.app"));
        let resources = app.join("Contents/Resources");
        std::fs::create_dir_all(&resources).unwrap();
        std::fs::write(resources.join("createinstallmedia"), b"#!/bin/sh\n").unwrap();

        InstallerPayload {
            display_name: name.to_string(),
            raw_version: version.to_string(),
            payload_root: app,
            mount_point: Some(mount),
            sibling_mounts: Vec::new(),
        }
    }

    /// An installer bundle on local storage, outside the volumes root.
    pub fn local_installer(&self, name: &str, version: &str) -> InstallerPayload {
        let app = self.root.path().join("Applications").join(format!("{name}.app"));
        let resources = app.join("Contents/Resources");
        std::fs::create_dir_all(&resources).unwrap();
        std::fs::write(resources.join("createinstallmedia"), b"#!/bin/sh\n").unwrap();

        InstallerPayload {
            display_name: name.to_string(),
            raw_version: version.to_string(),
            payload_root: app,
            mount_point: None,
            sibling_mounts: Vec::new(),
        }
    }

    /// A restore-only installer with its `InstallESD.dmg`.
    pub fn restore_installer(&self) -> InstallerPayload {
        let app = self.root.path().join("Install Mac OS X Lion.app");
        Self::restore_bundle(&app);

        InstallerPayload {
            display_name: "Install Mac OS X Lion".to_string(),
            raw_version: "10.7.5".to_string(),
            payload_root: app,
            mount_point: None,
            sibling_mounts: Vec::new(),
        }
    }

    /// The restore-only installer, found on a mounted image.
    pub fn mounted_restore_installer(&self) -> InstallerPayload {
        let mount = self.volumes_root().join("Mac OS X Install ESD");
        let app = mount.join("Install Mac OS X Lion.app");
        Self::restore_bundle(&app);

        InstallerPayload {
            display_name: "Install Mac OS X Lion".to_string(),
            raw_version: "10.7.5".to_string(),
            payload_root: app,
            mount_point: Some(mount),
            sibling_mounts: Vec::new(),
        }
    }

    fn restore_bundle(app: &Path) {
        let shared = app.join("Contents/SharedSupport");
        std::fs::create_dir_all(&shared).unwrap();
        std::fs::write(shared.join("InstallESD.dmg"), b"image").unwrap();
    }
}

pub fn classify(payload: &InstallerPayload) -> SystemClassification {
    SystemClassification::classify(&payload.display_name, &payload.raw_version)
}

/// Collaborators for one test, with handles kept for assertions.
pub struct Fakes {
    pub commands: Arc<Commands>,
    pub images: Arc<Images>,
    pub volumes: Arc<Volumes>,
    pub privileged: Arc<Prompt>,
    pub terminal: Arc<Terminal>,
}

impl Fakes {
    pub fn new(drive: &UsbDrive, behaviour: Script) -> Self {
        Self {
            commands: Arc::new(Commands::default()),
            images: Arc::new(Images::default()),
            volumes: Arc::new(Volumes::with_drive(drive)),
            privileged: Arc::new(Prompt::default()),
            terminal: Arc::new(Terminal::new(behaviour)),
        }
    }

    /// The administrator prompt is answered with the right password.
    pub fn granting_authorization(mut self) -> Self {
        self.privileged = Arc::new(Prompt::granting());
        self
    }

    pub fn tools(&self) -> Tools {
        Tools {
            commands: self.commands.clone(),
            images: self.images.clone(),
            plist: Arc::new(PlistFileReader),
            volumes: self.volumes.clone(),
            privileged: self.privileged.clone(),
            terminal: self.terminal.clone(),
        }
    }
}
