//! Build orchestration and coordination.
//!
//! Main types:
//! - [`BuildOrchestrator`] - runs one attempt at a time
//! - [`BuildStrategy`] - restore, Sierra, or generic media creation
//! - [`BuildOutcome`] - how an attempt ended

mod monitor;
mod orchestrator;
pub mod script;
pub mod signing;
mod state;
mod strategy;
mod workspace;

pub use monitor::{Completion, wait_for_signal, watch_completion, watch_drive};
pub use orchestrator::{BuildOrchestrator, BuildRequest};
pub use state::{BuildOutcome, BuildPhase, LogSink, ProgressSink};
pub use strategy::BuildStrategy;
pub use workspace::{
    AUTH_SIGNAL, BuildAttempt, DONE_SIGNAL, RESTORE_IMAGE, RUNNING_SIGNAL, SCRIPT_NAME,
};
