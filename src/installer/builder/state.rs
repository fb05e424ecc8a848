//! Build phases, outcomes, and progress reporting.

use serde::Serialize;
use std::fmt;

/// Where a build attempt is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    Idle,
    Copying,
    Modifying,
    AwaitingAuthorization,
    RunningExternalTool,
    RollbackAfterAuthDenied,
    /// The generated script is running in the terminal host.
    TerminalWorking,
    Succeeded,
    Cancelled,
    UsbDisconnected,
    Error,
}

impl BuildPhase {
    /// Phases that end an attempt for good.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Cancelled | Self::UsbDisconnected | Self::Error
        )
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Idle => "idle",
            Self::Copying => "copying files",
            Self::Modifying => "modifying files",
            Self::AwaitingAuthorization => "waiting for administrator password",
            Self::RunningExternalTool => "preparing image",
            Self::RollbackAfterAuthDenied => "authorization cancelled",
            Self::TerminalWorking => "writing installer in terminal",
            Self::Succeeded => "succeeded",
            Self::Cancelled => "cancelled",
            Self::UsbDisconnected => "USB drive disconnected",
            Self::Error => "failed",
        };
        f.write_str(text)
    }
}

/// How a build attempt ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BuildOutcome {
    /// Final phase. [`BuildPhase::Idle`] after an authorization rollback.
    pub phase: BuildPhase,
    /// User-facing explanation, absent on success.
    pub message: Option<String>,
    /// Whether the user may retry without restarting.
    pub resumable: bool,
}

impl BuildOutcome {
    pub fn succeeded() -> Self {
        Self {
            phase: BuildPhase::Succeeded,
            message: None,
            resumable: false,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            phase: BuildPhase::Cancelled,
            message: Some(
                "The build was interrupted before the installer was finished. \
                 Restart the application to try again."
                    .to_string(),
            ),
            resumable: false,
        }
    }

    pub fn usb_disconnected() -> Self {
        Self {
            phase: BuildPhase::UsbDisconnected,
            message: Some(
                "The USB drive was disconnected. Restart the application to continue.".to_string(),
            ),
            resumable: false,
        }
    }

    pub fn authorization_denied() -> Self {
        Self {
            phase: BuildPhase::Idle,
            message: Some("Authorization cancelled. You can try again.".to_string()),
            resumable: true,
        }
    }

    /// Failure before the terminal hand-off; the message is surfaced verbatim.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            phase: BuildPhase::Error,
            message: Some(message.into()),
            resumable: true,
        }
    }

    pub fn is_success(&self) -> bool {
        self.phase == BuildPhase::Succeeded
    }
}

/// Receives state changes from the orchestrator.
///
/// Calls arrive from the build task; implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn phase(&self, phase: BuildPhase);

    /// Free-form progress detail.
    fn detail(&self, _text: &str) {}
}

/// Writes progress to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn phase(&self, phase: BuildPhase) {
        log::info!("Phase: {}", phase);
    }

    fn detail(&self, text: &str) {
        log::info!("{}", text);
    }
}
