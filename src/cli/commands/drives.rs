//! `macusb drives`

use super::format_capacity;
use crate::cli::RuntimeConfig;
use crate::error::Result;
use crate::installer::{DriveRegistry, Settings, Tools, UsbDrive, check_capacity, drives};
use std::io;
use tokio_util::sync::CancellationToken;

pub async fn execute(
    config: &RuntimeConfig,
    settings: &Settings,
    watch: bool,
    json: bool,
) -> Result<i32> {
    let tools = Tools::system(settings.terminal_app());
    let mut registry =
        DriveRegistry::new(tools.volumes.clone()).with_min_capacity(settings.min_capacity_bytes());
    let current = registry.refresh().await?.to_vec();

    if json {
        config.println(&serde_json::to_string_pretty(&current)?)?;
        return Ok(0);
    }

    print_drives(config, settings, &current)?;
    if watch {
        watch_drives(config, settings, tools).await?;
    }
    Ok(0)
}

async fn watch_drives(config: &RuntimeConfig, settings: &Settings, tools: Tools) -> Result<()> {
    let cancel = CancellationToken::new();
    let (mut rx, poller) =
        drives::spawn_poller(tools.volumes, settings.drive_poll_interval(), cancel.clone());
    config.progress("Watching for drive changes, press Ctrl-C to stop")?;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                config.section(&format!("{} removable drive(s)", snapshot.len()))?;
                print_drives(config, settings, &snapshot)?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    cancel.cancel();
    if let Err(e) = poller.await {
        log::debug!("Drive poller ended abnormally: {}", e);
    }
    Ok(())
}

fn print_drives(config: &RuntimeConfig, settings: &Settings, list: &[UsbDrive]) -> io::Result<()> {
    if list.is_empty() {
        return config.warn("No removable drives found");
    }

    for drive in list {
        let line = format!(
            "{}  ({}, {})  {}",
            drive.display_name,
            drive.device_identifier,
            format_capacity(drive.capacity_bytes),
            drive.volume_path.display()
        );
        if check_capacity(drive, settings.min_capacity_bytes()) {
            config.println(&line)?;
        } else {
            config.println(&format!(
                "{}  [too small, {} required]",
                line,
                settings.advertised_capacity()
            ))?;
        }
    }
    Ok(())
}
