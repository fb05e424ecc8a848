//! Error types for installer inspection and media building.
//!
//! Every fallible engine operation returns [`Result`]. Filesystem errors carry
//! the path they happened on via [`ErrorExt::fs_context`], and any error can be
//! wrapped with a human description via [`Context`].

use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures while turning a user-supplied file into an [`InstallerPayload`].
///
/// [`InstallerPayload`]: crate::installer::InstallerPayload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InspectError {
    /// The bundle's `Contents/Info.plist` is missing or unreadable.
    #[error("{path} is not a readable application bundle")]
    NotAPackage {
        /// Bundle that was inspected
        path: PathBuf,
    },

    /// `hdiutil attach` failed or its property-list output could not be parsed.
    #[error("failed to mount disk image {path}: {reason}")]
    MountFailed {
        /// Disk image that was attached
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The mounted image has no `.app` bundle at the top level of any volume.
    #[error("no installer application found inside {path}")]
    NoInstallerFound {
        /// Disk image that was scanned
        path: PathBuf,
    },

    /// Only `.app` bundles and `.dmg` images are accepted.
    #[error("unsupported file type: {path} (expected .app or .dmg)")]
    UnsupportedFileType {
        /// Rejected path
        path: PathBuf,
    },
}

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// IO error with the operation and path that triggered it
    #[error("{context} ({path}): {source}")]
    Fs {
        /// Operation being performed
        context: String,
        /// Path being operated on
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Property-list parse errors
    #[error("property list error: {0}")]
    Plist(#[from] plist::Error),

    /// Configuration file parse errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Payload inspection errors
    #[error(transparent)]
    Inspect(#[from] InspectError),

    /// An external tool could not be launched or reported failure
    #[error("{command} failed: {reason}")]
    CommandFailed {
        /// Command line that failed
        command: String,
        /// Reason for the failure
        reason: String,
    },

    /// The restore flow needs `Contents/SharedSupport/InstallESD.dmg`
    #[error("InstallESD.dmg not found at {0}")]
    MissingRestoreAsset(PathBuf),

    /// The payload did not match any known installer generation
    #[error("{message}")]
    Unsupported {
        /// User-facing explanation
        message: String,
        /// True when the payload is a Sierra build other than 12.6.06
        sierra_variant: bool,
    },

    /// A build attempt is already running
    #[error("a build is already in progress")]
    BuildInProgress,

    /// The target drive vanished; nothing more can run in this session
    #[error("the USB drive was disconnected; restart the application to continue")]
    SessionLocked,

    /// The selected drive is smaller than the enforced minimum
    #[error("{drive} is too small: {capacity} bytes available, {required} required")]
    InsufficientCapacity {
        /// Drive display name
        drive: String,
        /// Reported capacity
        capacity: u64,
        /// Enforced minimum
        required: u64,
    },

    /// Wrapped error with an extra description
    #[error("{context}: {source}")]
    Context {
        /// Description of what was being done
        context: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// Anything else
    #[error("{0}")]
    GenericError(String),
}

/// Attach a path to raw IO errors.
pub trait ErrorExt<T> {
    /// Convert an IO error into [`Error::Fs`] naming the operation and path.
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for io::Result<T> {
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| Error::Fs {
            context: context.to_string(),
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

/// Add a description to a failure, or turn a missing value into an error.
pub trait Context<T> {
    /// Wrap with a static description.
    fn context<C: Display>(self, context: C) -> Result<T>;

    /// Wrap with a lazily built description.
    fn with_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T>;
}

impl<T> Context<T> for Result<T> {
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.map_err(|e| Error::Context {
            context: context.to_string(),
            source: Box::new(e),
        })
    }

    fn with_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.map_err(|e| Error::Context {
            context: f().to_string(),
            source: Box::new(e),
        })
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

impl Error {
    /// Message shown to the user, without the wrapping chain noise.
    pub fn user_message(&self) -> String {
        match self {
            Error::Context { source, .. } => source.user_message(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_context_keeps_path_and_operation() {
        let err: Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
            .fs_context("reading Info.plist", "/tmp/x.app/Contents/Info.plist");
        let msg = err.unwrap_err().to_string();
        assert!(msg.contains("reading Info.plist"));
        assert!(msg.contains("/tmp/x.app/Contents/Info.plist"));
    }

    #[test]
    fn user_message_unwraps_context_chain() {
        let inner: Result<()> = Err(Error::MissingRestoreAsset(PathBuf::from("/a/InstallESD.dmg")));
        let wrapped = inner.context("preparing restore").unwrap_err();
        assert_eq!(
            wrapped.user_message(),
            "InstallESD.dmg not found at /a/InstallESD.dmg"
        );
    }

    #[test]
    fn option_context_becomes_generic_error() {
        let missing: Option<u8> = None;
        let err = missing.context("drive has no name").unwrap_err();
        assert!(matches!(err, Error::GenericError(ref m) if m == "drive has no name"));
    }
}
