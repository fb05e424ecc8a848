//! Generation of the terminal-hosted installer script.
//!
//! The script carries every long-running privileged step. It reports back
//! only through two marker files: the running marker exists while the shell
//! is alive (removed by an `EXIT` trap) and the done marker is written after
//! the last step, whatever its exit code.

use crate::installer::error::{Error, ErrorExt, Result};
use crate::installer::tools::escape_applescript_string;
use handlebars::Handlebars;
use serde::Serialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

const TEMPLATE: &str = include_str!("templates/start_install.command.hbs");

/// Name `createinstallmedia` gives a freshly written Catalina volume.
pub const CATALINA_VOLUME_NAME: &str = "Install macOS Catalina";

/// What the script does between the markers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptAction {
    /// `asr restore` of a prepared image onto the volume, erasing it.
    Restore { image: PathBuf },
    /// `createinstallmedia` from a bundle.
    CreateMedia {
        tool: PathBuf,
        application_path: Option<PathBuf>,
        catalina: Option<CatalinaRecovery>,
    },
}

/// Replaces the truncated installer Catalina leaves on the new volume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalinaRecovery {
    /// The user's original bundle, symlinks resolved.
    pub source: PathBuf,
    /// Bundle path on the renamed volume.
    pub target: PathBuf,
}

impl CatalinaRecovery {
    pub async fn resolve(original: &Path, volumes_root: &Path) -> Self {
        let source = tokio::fs::canonicalize(original)
            .await
            .unwrap_or_else(|_| original.to_path_buf());
        let target = volumes_root
            .join(CATALINA_VOLUME_NAME)
            .join(format!("{CATALINA_VOLUME_NAME}.app"));
        Self { source, target }
    }
}

/// Inputs for one script.
#[derive(Clone, Debug)]
pub struct ScriptPlan<'a> {
    pub label: &'a str,
    pub terminal_app: &'a str,
    pub volume: &'a Path,
    pub running_signal: &'a Path,
    pub done_signal: &'a Path,
    pub action: ScriptAction,
}

#[derive(Serialize)]
struct RestoreData {
    image: String,
}

#[derive(Serialize)]
struct CatalinaData {
    source: String,
    target: String,
}

#[derive(Serialize)]
struct MediaData {
    tool: String,
    application_path: Option<String>,
    catalina: Option<CatalinaData>,
}

#[derive(Serialize)]
struct ScriptData {
    header: &'static str,
    label: String,
    terminal_app: String,
    volume: String,
    running_signal: String,
    done_signal: String,
    restore: Option<RestoreData>,
    media: Option<MediaData>,
}

/// Quote for a POSIX shell.
pub fn quote(text: &str) -> String {
    shell_escape::unix::escape(Cow::Borrowed(text)).into_owned()
}

fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy())
}

/// Render the script.
pub fn render(plan: &ScriptPlan<'_>) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
        .register_template_string(super::workspace::SCRIPT_NAME, TEMPLATE)
        .map_err(|e| Error::GenericError(format!("failed to register script template: {}", e)))?;

    let (header, restore, media) = match &plan.action {
        ScriptAction::Restore { image } => (
            "STAGE: Restoring the installer onto the USB drive",
            Some(RestoreData {
                image: quote_path(image),
            }),
            None,
        ),
        ScriptAction::CreateMedia {
            tool,
            application_path,
            catalina,
        } => (
            if catalina.is_some() {
                "STAGE: Writing the installer to the USB drive - stage 1/2"
            } else {
                "STAGE: Writing the installer to the USB drive"
            },
            None,
            Some(MediaData {
                tool: quote_path(tool),
                application_path: application_path.as_deref().map(quote_path),
                catalina: catalina.as_ref().map(|c| CatalinaData {
                    source: quote_path(&c.source),
                    target: quote_path(&c.target),
                }),
            }),
        ),
    };

    let data = ScriptData {
        header,
        label: quote(plan.label),
        // Lands inside a single-quoted AppleScript one-liner.
        terminal_app: escape_applescript_string(plan.terminal_app).replace('\'', r"'\''"),
        volume: quote_path(plan.volume),
        running_signal: quote_path(plan.running_signal),
        done_signal: quote_path(plan.done_signal),
        restore,
        media,
    };

    handlebars
        .render(super::workspace::SCRIPT_NAME, &data)
        .map_err(|e| Error::GenericError(format!("failed to render script template: {}", e)))
}

/// Write the script with mode 0755.
pub async fn write(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .fs_context("writing installer script", path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .await
            .fs_context("making installer script executable", path)?;
    }

    Ok(())
}
