//! Command line argument parsing and validation.
//!
//! This module provides the clap definitions for every subcommand, plus the
//! runtime configuration derived from the global flags.

use clap::{Parser, Subcommand};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Bootable macOS installer USB creator
#[derive(Parser, Debug)]
#[command(
    name = "macusb",
    version,
    about = "Create bootable macOS installer USB drives",
    long_about = "Writes a macOS installer application (.app, or a .dmg containing one) to a removable drive.

The installer generation decides the method: asr restore for Lion and Mountain Lion,
createinstallmedia for everything newer, with the extra preparation older installers need.
The privileged write runs in a Terminal window you can watch.

Usage:
  macusb classify --name \"Install macOS Big Sur\" --version 16.1.02
  macusb inspect ~/Downloads/InstallOS.dmg
  macusb drives --watch
  macusb build \"/Applications/Install macOS Sonoma.app\" --drive /Volumes/USB

Exit code 0 = the drive was written successfully."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors and requested data
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (default: <config dir>/macusb/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory under which each build gets its own scratch folder
    #[arg(long, global = true, env = "MACUSB_WORK_DIR", value_name = "DIR")]
    pub work_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify an installer by name and version without touching any file
    Classify {
        /// Installer display name, e.g. "Install macOS Ventura"
        #[arg(long, value_name = "NAME")]
        name: String,

        /// CFBundleShortVersionString of the installer
        #[arg(long = "version", value_name = "RAW")]
        raw_version: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Read an installer .app or .dmg and report what it contains
    Inspect {
        /// Installer application or disk image
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// List removable drives
    Drives {
        /// Keep listing until interrupted
        #[arg(short, long)]
        watch: bool,

        /// Print JSON
        #[arg(long, conflicts_with = "watch")]
        json: bool,
    },

    /// Report which of the required system tools are available
    Tools,

    /// Write an installer to a drive, erasing it
    Build {
        /// Installer application or disk image
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Mount point of the target drive, e.g. /Volumes/USB
        #[arg(short, long, value_name = "VOLUME")]
        drive: PathBuf,

        /// Do not ask before erasing the drive
        #[arg(short, long)]
        yes: bool,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Classify { name, .. } if name.trim().is_empty() => {
                Err("Installer name cannot be empty".to_string())
            }
            Command::Build { path, drive, .. } if path == drive => {
                Err("The installer and the target drive must differ".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Make every path argument absolute against the current directory.
    pub fn absolutize(&mut self) -> std::io::Result<()> {
        fn abs(path: &mut PathBuf) -> std::io::Result<()> {
            *path = Path::new(path.as_path()).absolutize()?.into_owned();
            Ok(())
        }

        if let Some(config) = self.config.as_mut() {
            abs(config)?;
        }
        if let Some(work_dir) = self.work_dir.as_mut() {
            abs(work_dir)?;
        }
        match &mut self.command {
            Command::Inspect { path, .. } => abs(path)?,
            Command::Build { path, drive, .. } => {
                abs(path)?;
                abs(drive)?;
            }
            Command::Classify { .. } | Command::Drives { .. } | Command::Tools => {}
        }
        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    pub fn verbose_println(&self, message: &str) -> std::io::Result<()> {
        self.output.verbose(message)
    }

    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.output.success(message)
    }

    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.output.warn(message)
    }

    pub fn error(&self, message: &str) -> std::io::Result<()> {
        self.output.error(message)
    }

    pub fn progress(&self, message: &str) -> std::io::Result<()> {
        self.output.progress(message)
    }

    pub fn section(&self, title: &str) -> std::io::Result<()> {
        self.output.section(title)
    }

    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.output.indent(message)
    }

    pub fn kv(&self, key: &str, value: &str) -> std::io::Result<()> {
        self.output.kv(key, value)
    }

    pub fn println(&self, message: &str) -> std::io::Result<()> {
        self.output.println(message)
    }
}
