//! `macusb classify`

use super::print_classification;
use crate::cli::RuntimeConfig;
use crate::error::Result;
use crate::installer::{BuildStrategy, SystemClassification};

pub fn execute(config: &RuntimeConfig, name: &str, raw_version: &str, json: bool) -> Result<i32> {
    let classification = SystemClassification::classify(name, raw_version);

    if json {
        let report = serde_json::json!({
            "classification": classification,
            "strategy": BuildStrategy::select(&classification).ok(),
            "unsupported": (!classification.is_recognized)
                .then(|| classification.unsupported_message()),
        });
        config.println(&serde_json::to_string_pretty(&report)?)?;
        return Ok(0);
    }

    print_classification(config, &classification)?;
    Ok(0)
}
