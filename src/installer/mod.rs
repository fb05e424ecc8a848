//! Bootable macOS installer media engine.
//!
//! Takes an installer application, either as a `.app` bundle or inside a
//! `.dmg`, and writes it to a removable drive:
//!
//! 1. [`PayloadInspector`] reads the installer's name and version, mounting
//!    the disk image when needed.
//! 2. [`SystemClassification`] decides which installer generation it is.
//! 3. [`DriveRegistry`] tracks the removable drives and the chosen target.
//! 4. [`BuildOrchestrator`] stages and prepares the payload, then hands the
//!    privileged write to a terminal script and follows it to completion.
//! 5. [`CleanupManager`] unmounts and removes scratch space afterwards.
//!
//! All macOS tools sit behind the traits in [`tools`].

pub mod builder;
pub mod classify;
pub mod cleanup;
pub mod drives;
pub mod error;
pub mod payload;
pub mod settings;
pub mod tools;
pub mod utils;

pub use builder::{
    BuildAttempt, BuildOrchestrator, BuildOutcome, BuildPhase, BuildRequest, BuildStrategy,
    LogSink, ProgressSink,
};
pub use classify::{Fact, SystemClassification, marketing_label};
pub use cleanup::CleanupManager;
pub use drives::{DriveRegistry, UsbDrive, check_capacity};
pub use error::{Context, Error, ErrorExt, InspectError, Result};
pub use payload::{InstallerPayload, PayloadInspector};
pub use settings::{ConfigFile, Settings, SettingsBuilder};
pub use tools::Tools;
