//! Polling loops for signal files and drive reachability.
//!
//! Each loop owns one ticker and checks its cancellation token on every
//! tick, so nothing keeps polling once the attempt has ended.

use crate::installer::drives;
use crate::installer::tools::VolumeLister;
use std::path::Path;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Result of watching the terminal script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The done marker appeared.
    Done,
    /// The running marker vanished without a done marker.
    WindowClosed,
    /// The token fired first.
    Cancelled,
}

fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Wait for `signal` to exist. Returns `false` if cancelled first.
pub async fn wait_for_signal(signal: &Path, period: Duration, cancel: &CancellationToken) -> bool {
    let mut ticks = ticker(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = ticks.tick() => {
                if exists(signal).await {
                    log::debug!("Signal {} received", signal.display());
                    return true;
                }
            }
        }
    }
}

/// Poll the script's markers until it finishes or its window goes away.
///
/// The first `warmup_ticks` ticks only look for the done marker, giving the
/// script time to create its running marker.
pub async fn watch_completion(
    running: &Path,
    done: &Path,
    period: Duration,
    warmup_ticks: u32,
    cancel: &CancellationToken,
) -> Completion {
    let mut ticks = ticker(period);
    let mut warmup = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Completion::Cancelled,
            _ = ticks.tick() => {}
        }

        if exists(done).await {
            log::info!("Terminal reported completion");
            return Completion::Done;
        }

        if warmup < warmup_ticks {
            warmup += 1;
        } else if !exists(running).await {
            log::info!("Running marker gone without completion; terminal window was closed");
            return Completion::WindowClosed;
        }
    }
}

/// Poll until the drive at `volume` is no longer listed. Returns `false` if
/// cancelled first. Listing errors count as still reachable.
pub async fn watch_drive(
    volumes: &dyn VolumeLister,
    volume: &Path,
    period: Duration,
    cancel: &CancellationToken,
) -> bool {
    let mut ticks = ticker(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = ticks.tick() => {}
        }

        match drives::is_reachable(volumes, volume).await {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("USB drive {} is no longer reachable", volume.display());
                return true;
            }
            Err(e) => log::debug!("Reachability check failed: {}", e),
        }
    }
}
