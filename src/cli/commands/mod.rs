//! Subcommand implementations.
//!
//! Each command returns the process exit code; errors bubble up to
//! [`crate::cli::run`] and are printed there.

pub mod build;
pub mod classify;
pub mod drives;
pub mod inspect;
pub mod tools;

use super::RuntimeConfig;
use crate::installer::{BuildStrategy, SystemClassification};
use std::io;

/// Label, facts and chosen method of a classification.
pub(crate) fn print_classification(
    config: &RuntimeConfig,
    classification: &SystemClassification,
) -> io::Result<()> {
    config.kv("System", &classification.label)?;

    let facts: Vec<String> = classification
        .facts()
        .iter()
        .map(|fact| format!("{:?}", fact))
        .collect();
    if !facts.is_empty() {
        config.kv("Facts", &facts.join(", "))?;
    }

    match BuildStrategy::select(classification) {
        Ok(strategy) => config.kv("Method", &strategy.to_string()),
        Err(e) => config.warn(&e.to_string()),
    }
}

/// Decimal gigabytes, the unit drive vendors advertise in.
pub(crate) fn format_capacity(bytes: u64) -> String {
    format!("{:.1} GB", bytes as f64 / 1_000_000_000.0)
}
