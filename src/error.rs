//! Application-level error types.
//!
//! Engine failures are [`crate::installer::Error`]; this module wraps them
//! together with CLI and configuration problems for the command line front end.

use thiserror::Error;

/// Result type alias for application operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Main error type for the command line application
#[derive(Error, Debug)]
pub enum AppError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Engine errors
    #[error("{0}")]
    Installer(#[from] crate::installer::Error),

    /// Generic errors from anyhow
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl AppError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        use crate::installer::{Error, InspectError};

        match self {
            AppError::Installer(Error::Inspect(InspectError::UnsupportedFileType { .. })) => {
                vec!["Select an installer .app bundle or a .dmg containing one".to_string()]
            }
            AppError::Installer(Error::Inspect(InspectError::NoInstallerFound { .. })) => {
                vec!["Check that the disk image contains an \"Install macOS\" application".to_string()]
            }
            AppError::Installer(Error::InsufficientCapacity { .. }) => vec![format!(
                "Use a drive of at least {}",
                crate::installer::settings::ADVERTISED_CAPACITY
            )],
            AppError::Installer(Error::SessionLocked) => {
                vec!["Restart macusb to start over".to_string()]
            }
            AppError::Installer(Error::Config(_)) => {
                vec!["Check the configuration file; unknown keys are rejected".to_string()]
            }
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
