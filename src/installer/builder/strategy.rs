//! Choosing how a payload is written to the drive.

use crate::installer::classify::SystemClassification;
use crate::installer::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// The build flow for one payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildStrategy {
    /// Lion and Mountain Lion: restore `InstallESD.dmg` onto the drive with `asr`.
    Restore,
    /// The patched Sierra build: copy, bump its version, re-sign `createinstallmedia`.
    Sierra,
    /// `createinstallmedia` against the drive.
    Generic {
        catalina: bool,
        needs_codesign: bool,
        /// Pass `--applicationpath` (Yosemite and El Capitan).
        legacy_app_path: bool,
    },
}

impl BuildStrategy {
    /// Pick the flow for a classification. First match wins: restore-only,
    /// then supported Sierra, then the generic flow.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] when the classification is not recognized.
    pub fn select(classification: &SystemClassification) -> Result<Self> {
        if !classification.is_recognized {
            return Err(Error::Unsupported {
                message: classification.unsupported_message().to_string(),
                sierra_variant: classification.is_sierra_unsupported_variant,
            });
        }

        if classification.is_legacy_restore_only {
            Ok(Self::Restore)
        } else if classification.is_sierra_supported {
            Ok(Self::Sierra)
        } else {
            Ok(Self::Generic {
                catalina: classification.is_catalina,
                needs_codesign: classification.needs_codesign,
                legacy_app_path: classification.is_legacy_no_codesign,
            })
        }
    }

    /// Whether the payload must be staged in the work dir before use.
    ///
    /// Modern and legacy bundles on local storage are used in place.
    pub fn copies_payload(&self, from_mounted_volume: bool) -> bool {
        match *self {
            Self::Restore => false,
            Self::Sierra => true,
            Self::Generic {
                catalina,
                needs_codesign,
                ..
            } => from_mounted_volume || catalina || needs_codesign,
        }
    }

    /// Whether the fixed framework list is re-signed after staging.
    pub fn signs_components(&self) -> bool {
        matches!(
            *self,
            Self::Generic {
                catalina: true,
                ..
            } | Self::Generic {
                needs_codesign: true,
                ..
            }
        )
    }

    /// Whether `createinstallmedia` gets `--applicationpath`.
    pub fn passes_application_path(&self) -> bool {
        matches!(
            *self,
            Self::Sierra
                | Self::Generic {
                    legacy_app_path: true,
                    ..
                }
        )
    }

    pub fn is_catalina(&self) -> bool {
        matches!(*self, Self::Generic { catalina: true, .. })
    }
}

impl fmt::Display for BuildStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restore => write!(f, "restore"),
            Self::Sierra => write!(f, "sierra"),
            Self::Generic {
                catalina: true, ..
            } => write!(f, "createinstallmedia (catalina)"),
            Self::Generic {
                needs_codesign: true,
                ..
            } => write!(f, "createinstallmedia (re-signed)"),
            Self::Generic {
                legacy_app_path: true,
                ..
            } => write!(f, "createinstallmedia (legacy)"),
            Self::Generic { .. } => write!(f, "createinstallmedia"),
        }
    }
}
