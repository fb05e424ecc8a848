//! `macusb inspect`

use super::print_classification;
use crate::cli::RuntimeConfig;
use crate::error::Result;
use crate::installer::{BuildStrategy, PayloadInspector, Settings, SystemClassification, Tools};
use std::path::Path;

pub async fn execute(
    config: &RuntimeConfig,
    settings: &Settings,
    path: &Path,
    json: bool,
) -> Result<i32> {
    let tools = Tools::system(settings.terminal_app());
    let mut inspector = PayloadInspector::new(tools.images.clone(), tools.plist.clone());

    config.verbose_println(&format!("Inspecting {}", path.display()))?;
    let inspected = inspector.inspect(path).await;
    // Nothing is built from here, so the image never outlives the command.
    inspector.release().await;
    let payload = inspected?;

    let classification =
        SystemClassification::classify(&payload.display_name, &payload.raw_version);

    if json {
        let report = serde_json::json!({
            "payload": payload,
            "classification": classification,
            "strategy": BuildStrategy::select(&classification).ok(),
        });
        config.println(&serde_json::to_string_pretty(&report)?)?;
        return Ok(0);
    }

    config.section("Installer")?;
    config.kv("Name", &payload.display_name)?;
    config.kv("Version", &payload.raw_version)?;
    config.kv("Application", &payload.payload_root.display().to_string())?;
    for mount in payload.attached_volumes() {
        config.kv("Mounted at", &mount.display().to_string())?;
    }
    print_classification(config, &classification)?;
    Ok(0)
}
