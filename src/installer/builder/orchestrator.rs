//! Build orchestration.
//!
//! This module provides the [`BuildOrchestrator`] that runs one build attempt
//! from a classified payload to a bootable drive.
//!
//! In-process work is limited to staging: copying the bundle, patching and
//! re-signing it, and for the restore flow the authorized image scan. Everything
//! that writes the drive runs in a generated script handed to a terminal, and
//! the orchestrator follows it through marker files.

use super::{
    BuildAttempt, BuildOutcome, BuildPhase, BuildStrategy, ProgressSink,
    monitor::{self, Completion},
    script::{self, CatalinaRecovery, ScriptAction, ScriptPlan},
    signing,
};
use crate::installer::{
    InstallerPayload, SystemClassification, UsbDrive,
    cleanup::CleanupManager,
    drives,
    error::{Error, Result},
    settings::Settings,
    tools::Tools,
    utils::fs,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// Everything one attempt builds from. Snapshots; the orchestrator never
/// changes them.
#[derive(Clone, Debug)]
pub struct BuildRequest {
    pub payload: InstallerPayload,
    pub classification: SystemClassification,
    pub drive: UsbDrive,
}

/// Result of the in-process part of an attempt.
enum Prepared {
    Script(ScriptAction),
    AuthorizationDenied,
    Cancelled,
}

/// Runs build attempts, one at a time.
///
/// After a USB disconnection the orchestrator is locked for the rest of the
/// session and refuses further builds.
///
/// # Examples
///
/// ```no_run
/// use macusb::installer::{
///     BuildOrchestrator, BuildRequest, LogSink, Settings, Tools,
/// };
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(request: BuildRequest) -> macusb::installer::Result<()> {
/// let settings = Settings::default();
/// let tools = Tools::system(settings.terminal_app());
/// let orchestrator = BuildOrchestrator::new(settings, tools, Arc::new(LogSink));
///
/// let outcome = orchestrator.run(request, CancellationToken::new()).await?;
/// println!("finished in phase {}", outcome.phase);
/// # Ok(())
/// # }
/// ```
pub struct BuildOrchestrator {
    settings: Settings,
    tools: Tools,
    cleanup: CleanupManager,
    sink: Arc<dyn ProgressSink>,
    busy: AtomicBool,
    locked: AtomicBool,
}

impl std::fmt::Debug for BuildOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOrchestrator")
            .field("settings", &self.settings)
            .field("busy", &self.busy)
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}

/// Clears the busy flag when an attempt ends, however it ends.
struct Flight<'a>(&'a AtomicBool);

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BuildOrchestrator {
    pub fn new(settings: Settings, tools: Tools, sink: Arc<dyn ProgressSink>) -> Self {
        let cleanup = CleanupManager::new(tools.images.clone(), settings.volumes_root());
        Self {
            settings,
            tools,
            cleanup,
            sink,
            busy: AtomicBool::new(false),
            locked: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// A build is running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// The session is locked after a USB disconnection.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    /// Watch the target drive while no build is running.
    ///
    /// Returns the disconnection outcome once the drive disappears, after
    /// locking the session and releasing `mounts` once. Returns `None` when
    /// `cancel` fires first.
    pub async fn guard_drive(
        &self,
        drive: &UsbDrive,
        mounts: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Option<BuildOutcome> {
        let lost = monitor::watch_drive(
            self.tools.volumes.as_ref(),
            &drive.volume_path,
            self.settings.usb_watch_interval(),
            cancel,
        )
        .await;

        if !lost {
            return None;
        }
        Some(self.disconnect(mounts, None).await)
    }

    /// Release a payload's volumes outside any build attempt.
    pub async fn abandon(&self, mounts: &[PathBuf]) {
        self.cleanup.release_mounts(mounts).await;
    }

    async fn disconnect(&self, mounts: &[PathBuf], scratch: Option<&Path>) -> BuildOutcome {
        self.locked.store(true, Ordering::SeqCst);
        self.sink.phase(BuildPhase::UsbDisconnected);
        match scratch {
            Some(dir) => self.cleanup.cleanup(mounts, dir).await,
            None => self.abandon(mounts).await,
        }
        BuildOutcome::usb_disconnected()
    }

    /// Run one build attempt to its end.
    ///
    /// `cancel` stands for the user closing the application mid-build: the
    /// attempt ends as [`BuildPhase::Cancelled`] with cleanup.
    ///
    /// # Errors
    ///
    /// Only refusals to start: [`Error::SessionLocked`],
    /// [`Error::BuildInProgress`] and [`Error::Unsupported`]. Every failure
    /// after the start is reported through the returned [`BuildOutcome`].
    pub async fn run(&self, request: BuildRequest, cancel: CancellationToken) -> Result<BuildOutcome> {
        if self.is_locked() {
            return Err(Error::SessionLocked);
        }
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(Error::BuildInProgress);
        }
        let _flight = Flight(&self.busy);

        let strategy = BuildStrategy::select(&request.classification)?;
        let mut attempt = BuildAttempt::new(strategy, self.settings.work_dir());

        log::info!(
            "Build {} started at {} for {} onto {} using {}",
            attempt.id,
            attempt.started_at.to_rfc3339(),
            request.classification.label,
            request.drive.volume_path.display(),
            strategy
        );
        log::debug!("Classification: {:?}", request.classification.facts());

        let outcome = self.run_attempt(&mut attempt, &request, &cancel).await;

        attempt.last_error = outcome.message.clone().filter(|_| !outcome.is_success());
        log::info!(
            "Build {} ended in {} after {}s",
            attempt.id,
            outcome.phase,
            (chrono::Utc::now() - attempt.started_at).num_seconds()
        );
        Ok(outcome)
    }

    fn enter(&self, attempt: &mut BuildAttempt, phase: BuildPhase) {
        log::debug!("Build {}: {} -> {}", attempt.id, attempt.phase, phase);
        attempt.phase = phase;
        self.sink.phase(phase);
    }

    async fn finish(
        &self,
        attempt: &mut BuildAttempt,
        request: &BuildRequest,
        outcome: BuildOutcome,
    ) -> BuildOutcome {
        self.enter(attempt, outcome.phase);
        self.cleanup
            .cleanup(&request.payload.attached_volumes(), attempt.work_dir())
            .await;
        outcome
    }

    async fn run_attempt(
        &self,
        attempt: &mut BuildAttempt,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> BuildOutcome {
        let action = match self.prepare(attempt, request, cancel).await {
            Ok(Prepared::Script(action)) => action,
            Ok(Prepared::AuthorizationDenied) => {
                self.enter(attempt, BuildPhase::RollbackAfterAuthDenied);
                // A retry stages into a fresh directory; the source stays mounted.
                self.cleanup.cleanup(&[], attempt.work_dir()).await;
                self.enter(attempt, BuildPhase::Idle);
                return BuildOutcome::authorization_denied();
            }
            Ok(Prepared::Cancelled) => {
                return self.finish(attempt, request, BuildOutcome::cancelled()).await;
            }
            Err(e) => return self.fail(attempt, request, e).await,
        };

        if cancel.is_cancelled() {
            return self.finish(attempt, request, BuildOutcome::cancelled()).await;
        }

        match drives::is_reachable(self.tools.volumes.as_ref(), &request.drive.volume_path).await {
            Ok(true) => {}
            Ok(false) => {
                attempt.phase = BuildPhase::UsbDisconnected;
                return self
                    .disconnect(&request.payload.attached_volumes(), Some(attempt.work_dir()))
                    .await;
            }
            Err(e) => log::warn!("Could not confirm the drive is still present: {}", e),
        }

        if let Err(e) = self.hand_off(attempt, request, action).await {
            return self.fail(attempt, request, e).await;
        }
        self.enter(attempt, BuildPhase::TerminalWorking);

        let completion = monitor::watch_completion(
            &attempt.running_signal(),
            &attempt.done_signal(),
            self.settings.completion_poll_interval(),
            self.settings.completion_warmup_ticks(),
            cancel,
        )
        .await;

        let outcome = match completion {
            Completion::Done => BuildOutcome::succeeded(),
            Completion::WindowClosed | Completion::Cancelled => BuildOutcome::cancelled(),
        };
        self.finish(attempt, request, outcome).await
    }

    /// Failure before the hand-off. Tears down like any other terminal
    /// phase; a retry starts from a fresh inspection.
    async fn fail(
        &self,
        attempt: &mut BuildAttempt,
        request: &BuildRequest,
        error: Error,
    ) -> BuildOutcome {
        log::error!("Build {} failed: {}", attempt.id, error);
        self.enter(attempt, BuildPhase::Error);
        self.cleanup
            .cleanup(&request.payload.attached_volumes(), attempt.work_dir())
            .await;
        BuildOutcome::failed(error.user_message())
    }

    async fn prepare(
        &self,
        attempt: &mut BuildAttempt,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> Result<Prepared> {
        attempt.prepare().await?;

        match attempt.strategy {
            BuildStrategy::Restore => self.prepare_restore(attempt, request, cancel).await,
            strategy => self.prepare_media(attempt, request, strategy, cancel).await,
        }
    }

    async fn stage_app(&self, attempt: &mut BuildAttempt, original: &Path) -> Result<PathBuf> {
        self.enter(attempt, BuildPhase::Copying);
        let staged = attempt.staged_app(original);
        log::info!("Copying {} to {}", original.display(), staged.display());
        fs::remove_dir_all(&staged).await?;
        fs::copy_dir(original, &staged).await?;
        Ok(staged)
    }

    async fn prepare_media(
        &self,
        attempt: &mut BuildAttempt,
        request: &BuildRequest,
        strategy: BuildStrategy,
        cancel: &CancellationToken,
    ) -> Result<Prepared> {
        let original = &request.payload.payload_root;
        let from_mounted_volume = request.payload.from_disk_image()
            || original.starts_with(self.settings.volumes_root());

        let app = if strategy.copies_payload(from_mounted_volume) {
            let staged = self.stage_app(attempt, original).await?;
            if cancel.is_cancelled() {
                return Ok(Prepared::Cancelled);
            }

            if strategy == BuildStrategy::Sierra {
                self.enter(attempt, BuildPhase::Modifying);
                signing::prepare_sierra(self.tools.commands.as_ref(), &staged).await?;
            } else if strategy.signs_components() {
                self.enter(attempt, BuildPhase::Modifying);
                let signed =
                    signing::sign_components(self.tools.commands.as_ref(), &staged).await;
                self.sink.detail(&format!("Re-signed {} installer components", signed));
            }
            staged
        } else {
            log::info!("Using {} in place", original.display());
            original.clone()
        };

        let catalina = if strategy.is_catalina() {
            Some(CatalinaRecovery::resolve(original, self.settings.volumes_root()).await)
        } else {
            None
        };

        Ok(Prepared::Script(ScriptAction::CreateMedia {
            tool: app.join(signing::CREATE_INSTALL_MEDIA),
            application_path: strategy.passes_application_path().then(|| app.clone()),
            catalina,
        }))
    }

    async fn prepare_restore(
        &self,
        attempt: &mut BuildAttempt,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> Result<Prepared> {
        let source = request
            .payload
            .payload_root
            .join("Contents/SharedSupport")
            .join(super::workspace::RESTORE_IMAGE);
        if !source.is_file() {
            return Err(Error::MissingRestoreAsset(source));
        }

        self.enter(attempt, BuildPhase::Copying);
        let image = attempt.restore_image();
        fs::remove_file_if_exists(&image).await?;
        fs::copy_file(&source, &image).await?;
        if cancel.is_cancelled() {
            return Ok(Prepared::Cancelled);
        }

        self.enter(attempt, BuildPhase::AwaitingAuthorization);
        let auth_signal = attempt.auth_signal();
        let command = format!(
            "touch {} && chmod u+w {} && /usr/sbin/asr imagescan --source {}",
            script::quote(&auth_signal.to_string_lossy()),
            script::quote(&image.to_string_lossy()),
            script::quote(&image.to_string_lossy()),
        );
        log::debug!("Image scan command: {}", command);

        let auth_cancel = cancel.child_token();
        let privileged = self.tools.privileged.run_privileged(&command);
        let auth_wait = monitor::wait_for_signal(
            &auth_signal,
            self.settings.auth_poll_interval(),
            &auth_cancel,
        );
        tokio::pin!(privileged, auth_wait);

        let mut auth_settled = false;
        let result = loop {
            tokio::select! {
                res = &mut privileged => break Some(res),
                _ = cancel.cancelled() => break None,
                granted = &mut auth_wait, if !auth_settled => {
                    auth_settled = true;
                    if granted {
                        self.enter(attempt, BuildPhase::RunningExternalTool);
                    }
                }
            }
        };
        auth_cancel.cancel();

        match result {
            None => Ok(Prepared::Cancelled),
            Some(Err(reason)) => {
                log::warn!("Authorization failed: {}", reason);
                Ok(Prepared::AuthorizationDenied)
            }
            Some(Ok(())) => {
                log::info!("Image scan finished");
                Ok(Prepared::Script(ScriptAction::Restore { image }))
            }
        }
    }

    async fn hand_off(
        &self,
        attempt: &mut BuildAttempt,
        request: &BuildRequest,
        action: ScriptAction,
    ) -> Result<()> {
        let running = attempt.running_signal();
        let done = attempt.done_signal();
        let content = script::render(&ScriptPlan {
            label: &request.classification.label,
            terminal_app: self.settings.terminal_app(),
            volume: &request.drive.volume_path,
            running_signal: &running,
            done_signal: &done,
            action,
        })?;

        let path = attempt.script_path();
        script::write(&path, &content).await?;
        log::info!("Handing {} to {}", path.display(), self.settings.terminal_app());
        self.tools.terminal.launch(&path).await
    }
}
