//! Engine configuration.
//!
//! [`Settings`] holds scratch locations, polling cadence, capacity gates and
//! the terminal host. [`SettingsBuilder`] layers a [`ConfigFile`] and
//! explicit overrides over the defaults.

mod builder;
mod core;
mod file;

pub use builder::SettingsBuilder;
pub use core::{ADVERTISED_CAPACITY, MIN_CAPACITY_BYTES, Settings, WORK_DIR_NAME};
pub use file::ConfigFile;
