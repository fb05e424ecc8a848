//! Command line interface for macusb.
//!
//! Parses arguments, loads settings and dispatches to the subcommands in
//! [`commands`]. The CLI is also the progress sink the engine reports to.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, RuntimeConfig};
pub use output::OutputManager;

use crate::error::{CliError, Result};
use crate::installer::{ConfigFile, Settings, SettingsBuilder};
use anyhow::Context as _;

/// Main CLI entry point
pub async fn run(mut args: Args) -> Result<i32> {
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;
    args.absolutize()?;

    let config = RuntimeConfig::from(&args);

    match &args.command {
        Command::Classify {
            name,
            raw_version,
            json,
        } => commands::classify::execute(&config, name, raw_version, *json),
        Command::Inspect { path, json } => {
            let settings = load_settings(&args)?;
            commands::inspect::execute(&config, &settings, path, *json).await
        }
        Command::Drives { watch, json } => {
            let settings = load_settings(&args)?;
            commands::drives::execute(&config, &settings, *watch, *json).await
        }
        Command::Tools => commands::tools::execute(&config),
        Command::Build { path, drive, yes } => {
            let settings = load_settings(&args)?;
            commands::build::execute(&config, settings, path, drive, *yes).await
        }
    }
}

/// Settings from the configuration file, with command line overrides on top.
pub fn load_settings(args: &Args) -> anyhow::Result<Settings> {
    let file = match &args.config {
        Some(path) => Some(
            ConfigFile::load(path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?,
        ),
        None => ConfigFile::load_default().context("failed to load default configuration")?,
    };

    let mut builder = SettingsBuilder::new();
    if let Some(file) = file {
        builder = builder.config_file(file);
    }
    if let Some(work_dir) = &args.work_dir {
        builder = builder.work_dir(work_dir);
    }
    Ok(builder.build()?)
}

/// Parse arguments without executing (for testing)
pub fn parse_args() -> Args {
    Args::parse_args()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn work_dir_flag_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "work_dir = \"/tmp/from-file\"\nauth_poll_ms = 500").unwrap();

        let args = Args::try_parse_from([
            "macusb",
            "--config",
            file.path().to_str().unwrap(),
            "--work-dir",
            "/tmp/from-flag",
            "tools",
        ])
        .unwrap();
        let settings = load_settings(&args).unwrap();

        assert_eq!(settings.work_dir(), std::path::Path::new("/tmp/from-flag"));
        assert_eq!(settings.auth_poll_interval().as_millis(), 500);
    }

    #[test]
    fn unknown_config_keys_fail_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "colour = \"red\"").unwrap();

        let args =
            Args::try_parse_from(["macusb", "--config", file.path().to_str().unwrap(), "tools"])
                .unwrap();
        let err = load_settings(&args).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to load configuration"));
    }
}
