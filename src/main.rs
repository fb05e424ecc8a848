//! macusb - bootable macOS installer USB creator.
//!
//! This binary writes macOS installer applications to removable drives
//! with proper cleanup on every exit path.

use macusb::cli;
use std::process;

#[tokio::main]
async fn main() {
    let args = cli::parse_args();

    // Initialize logging
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        logger.filter_module("macusb", log::LevelFilter::Debug);
    } else if args.quiet {
        logger.filter_level(log::LevelFilter::Warn);
    }
    logger.init();

    // Run CLI and get exit code
    let exit_code = match cli::run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            for suggestion in e.recovery_suggestions() {
                eprintln!("  hint: {}", suggestion);
            }
            1
        }
    };

    process::exit(exit_code);
}
