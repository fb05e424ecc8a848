//! Terminal output for the command line front end.

use console::{Term, style};
use std::io;

/// Styled, verbosity-aware printing to stdout and stderr.
#[derive(Debug, Clone, Copy)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
}

impl OutputManager {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }

    /// Plain line on stdout. Always printed; data output ignores `--quiet`.
    pub fn println(&self, message: &str) -> io::Result<()> {
        Term::stdout().write_line(message)
    }

    /// Dimmed line shown only with `--verbose`.
    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if !self.is_verbose() {
            return Ok(());
        }
        Term::stdout().write_line(&style(message).dim().to_string())
    }

    pub fn success(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        Term::stdout().write_line(&format!("{} {}", style("✓").green().bold(), message))
    }

    pub fn warn(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        Term::stderr().write_line(&format!("{} {}", style("⚠").yellow().bold(), message))
    }

    /// Errors are printed even with `--quiet`.
    pub fn error(&self, message: &str) -> io::Result<()> {
        Term::stderr().write_line(&format!("{} {}", style("✗").red().bold(), message))
    }

    pub fn progress(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        Term::stdout().write_line(&format!("{} {}", style("→").cyan().bold(), message))
    }

    pub fn section(&self, title: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let term = Term::stdout();
        term.write_line("")?;
        term.write_line(&style(title).bold().underlined().to_string())
    }

    pub fn indent(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        Term::stdout().write_line(&format!("  {}", message))
    }

    /// Ask a yes/no question on the terminal. Blocks until a line is read;
    /// anything but `y` or `yes` is a no.
    pub fn confirm(&self, question: &str) -> io::Result<bool> {
        let term = Term::stdout();
        term.write_str(&format!("{} {} [y/N] ", style("?").yellow().bold(), question))?;
        let answer = term.read_line()?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }

    /// `  key: value` with a dimmed key.
    pub fn kv(&self, key: &str, value: &str) -> io::Result<()> {
        Term::stdout().write_line(&format!("  {}: {}", style(key).dim(), value))
    }
}

impl crate::installer::ProgressSink for OutputManager {
    fn phase(&self, phase: crate::installer::BuildPhase) {
        use crate::installer::BuildPhase;

        let text = format!("Build {}", phase);
        let printed = match phase {
            BuildPhase::Succeeded => self.success(&text),
            BuildPhase::Cancelled | BuildPhase::UsbDisconnected | BuildPhase::Error => {
                self.error(&text)
            }
            BuildPhase::RollbackAfterAuthDenied | BuildPhase::Idle => self.warn(&text),
            _ => self.progress(&text),
        };
        if let Err(e) = printed {
            log::debug!("Could not print progress: {}", e);
        }
    }

    fn detail(&self, text: &str) {
        if let Err(e) = self.indent(text) {
            log::debug!("Could not print progress: {}", e);
        }
    }
}
