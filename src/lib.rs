//! Bootable macOS installer USB creator
//!
//! This library provides the engine behind the `macusb` tool:
//! - Installer inspection (`.app` bundles and `.dmg` images)
//! - Installer generation classification
//! - Removable drive tracking
//! - Build orchestration through a generated terminal script
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod cli;
pub mod error;
pub mod installer;

// Re-export commonly used types
pub use error::{AppError, CliError, Result};
