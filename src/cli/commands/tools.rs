//! `macusb tools`

use crate::cli::RuntimeConfig;
use crate::error::Result;
use crate::installer::tools::detect_tools;

pub fn execute(config: &RuntimeConfig) -> Result<i32> {
    let statuses = detect_tools();

    for status in &statuses {
        match &status.path {
            Some(path) => config.success(&format!("{:<10} {}", status.name, path.display()))?,
            None => config.warn(&format!("{:<10} not found", status.name))?,
        }
    }

    let missing = statuses.iter().filter(|s| !s.available()).count();
    if missing > 0 {
        config.warn(&format!(
            "{} tool(s) missing; builds that need them will fail",
            missing
        ))?;
    }
    Ok(0)
}
