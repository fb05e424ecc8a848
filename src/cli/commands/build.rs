//! `macusb build`
//!
//! The command is the coordinating side of a build: it resolves the payload
//! and the drive, keeps watching the drive until the user confirms, then runs
//! the orchestrator with Ctrl-C wired to cancellation.

use super::{format_capacity, print_classification};
use crate::cli::RuntimeConfig;
use crate::error::Result;
use crate::installer::{
    BuildOrchestrator, BuildOutcome, BuildRequest, BuildStrategy, DriveRegistry,
    PayloadInspector, ProgressSink, Settings, SystemClassification, Tools, UsbDrive,
    tools::detect_tools,
};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn execute(
    config: &RuntimeConfig,
    settings: Settings,
    path: &Path,
    drive: &Path,
    yes: bool,
) -> Result<i32> {
    for missing in detect_tools().iter().filter(|s| !s.available()) {
        config.warn(&format!("{} not found; the build may fail", missing.name))?;
    }

    let tools = Tools::system(settings.terminal_app());
    let mut inspector = PayloadInspector::new(tools.images.clone(), tools.plist.clone());
    let payload = inspector.inspect(path).await?;
    let classification =
        SystemClassification::classify(&payload.display_name, &payload.raw_version);

    config.section(&payload.display_name)?;
    print_classification(config, &classification)?;

    let target = match preflight(&tools, &settings, &classification, drive).await {
        Ok(target) => target,
        Err(e) => {
            inspector.release().await;
            return Err(e);
        }
    };
    config.kv(
        "Target",
        &format!(
            "{} ({}, {})",
            target.display_name,
            target.device_identifier,
            format_capacity(target.capacity_bytes)
        ),
    )?;

    let sink: Arc<dyn ProgressSink> = Arc::new(*config.output());
    let orchestrator = BuildOrchestrator::new(settings, tools, sink);
    let mounts = payload.attached_volumes();

    if !yes {
        let output = *config.output();
        let question = format!("All data on {} will be erased. Continue?", target.display_name);
        let prompt = tokio::task::spawn_blocking(move || output.confirm(&question));
        let watch_cancel = CancellationToken::new();

        let confirmed = tokio::select! {
            answer = prompt => match answer {
                Ok(answer) => answer?,
                Err(e) => {
                    log::debug!("Confirmation prompt failed: {}", e);
                    false
                }
            },
            lost = orchestrator.guard_drive(&target, &mounts, &watch_cancel) => {
                // The guard released the image along with the scratch space.
                inspector.hand_off();
                if let Some(outcome) = lost {
                    report(config, &outcome)?;
                }
                return Ok(1);
            }
            _ = tokio::signal::ctrl_c() => false,
        };
        watch_cancel.cancel();

        if !confirmed {
            orchestrator.abandon(&inspector.hand_off()).await;
            config.warn("Nothing was written")?;
            return Ok(1);
        }
    }

    inspector.hand_off();

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, stopping the build");
                cancel.cancel();
            }
        })
    };

    let request = BuildRequest {
        payload,
        classification,
        drive: target,
    };
    let result = orchestrator.run(request, cancel).await;
    interrupt.abort();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            orchestrator.abandon(&mounts).await;
            return Err(e.into());
        }
    };

    // Terminal phases tore everything down. An authorization rollback ends
    // in Idle with the source volumes still attached.
    if !outcome.phase.is_terminal() {
        orchestrator.abandon(&mounts).await;
    }

    report(config, &outcome)?;
    Ok(if outcome.is_success() { 0 } else { 1 })
}

/// Everything that can refuse the build before the drive is touched.
async fn preflight(
    tools: &Tools,
    settings: &Settings,
    classification: &SystemClassification,
    volume: &Path,
) -> Result<UsbDrive> {
    BuildStrategy::select(classification)?;

    let mut registry =
        DriveRegistry::new(tools.volumes.clone()).with_min_capacity(settings.min_capacity_bytes());
    registry.refresh().await?;
    registry.select(volume)?;
    Ok(registry.verify_selection()?)
}

fn report(config: &RuntimeConfig, outcome: &BuildOutcome) -> io::Result<()> {
    if outcome.is_success() {
        return config.success("The installer drive is ready");
    }
    if let Some(message) = &outcome.message {
        config.error(message)?;
    }
    if outcome.resumable {
        config.indent("You can run the build again.")?;
    }
    Ok(())
}
