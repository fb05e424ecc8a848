//! Ad-hoc re-signing of staged installer bundles.
//!
//! Per-file signing is best-effort: failures are logged and the build goes on.
//! Whether the drive was written is decided by `createinstallmedia` alone.

use crate::installer::error::{Context, Result};
use crate::installer::tools::CommandRunner;
use std::path::{Path, PathBuf};

const IAESD: &str = "Contents/Frameworks/OSInstallerSetup.framework/Versions/A/Frameworks/IAESD.framework/Versions/A";

/// Media-creation executable inside an installer bundle.
pub const CREATE_INSTALL_MEDIA: &str = "Contents/Resources/createinstallmedia";

/// Version written into the staged Sierra bundle so its self-check passes.
pub const SIERRA_PATCHED_VERSION: &str = "12.6.03";

/// Binaries re-signed for Catalina, Mojave and High Sierra, relative to the bundle.
pub fn framework_components(app: &Path) -> Vec<PathBuf> {
    let iaesd = app.join(IAESD);
    vec![
        iaesd.join("Frameworks/IAInstallerUtilities.framework/Versions/A/IAInstallerUtilities"),
        iaesd.join("Frameworks/IAMiniSoftwareUpdate.framework/Versions/A/IAMiniSoftwareUpdate"),
        iaesd.join("Frameworks/IAPackageKit.framework/Versions/A/IAPackageKit"),
        iaesd.join("IAESD"),
        app.join(CREATE_INSTALL_MEDIA),
    ]
}

fn arg(path: &Path) -> String {
    path.display().to_string()
}

/// Run a tool whose failure must not stop the build.
async fn best_effort(commands: &dyn CommandRunner, program: &str, args: Vec<String>) -> bool {
    match commands.run(program, &args).await {
        Ok(out) if out.success() => true,
        Ok(out) => {
            log::warn!(
                "{} {} exited with {:?}, continuing: {}",
                program,
                args.join(" "),
                out.code,
                out.stderr_lossy()
            );
            false
        }
        Err(e) => {
            log::warn!("{} could not run, continuing: {}", program, e);
            false
        }
    }
}

async fn codesign(commands: &dyn CommandRunner, component: &Path) -> bool {
    best_effort(
        commands,
        "codesign",
        vec!["-s".into(), "-".into(), "-f".into(), arg(component)],
    )
    .await
}

/// Strip extended attributes and ad-hoc sign every framework component that
/// exists in `app`. Returns how many were signed successfully.
pub async fn sign_components(commands: &dyn CommandRunner, app: &Path) -> usize {
    log::info!("Re-signing installer components in {}", app.display());
    best_effort(commands, "xattr", vec!["-cr".into(), arg(app)]).await;

    let mut signed = 0;
    for component in framework_components(app) {
        if !component.exists() {
            log::debug!("Skipping missing component {}", component.display());
            continue;
        }
        log::debug!(
            "Signing {}",
            component.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        );
        if codesign(commands, &component).await {
            signed += 1;
        }
    }
    signed
}

/// Patch a staged Sierra bundle: version bump, quarantine removal, and a
/// fresh signature on `createinstallmedia`.
///
/// # Errors
///
/// Fails only when the version patch fails; the bundle would otherwise be
/// rejected by its own self-check.
pub async fn prepare_sierra(commands: &dyn CommandRunner, app: &Path) -> Result<()> {
    let info_plist = app.join("Contents/Info.plist");
    log::info!(
        "Setting CFBundleShortVersionString to {} in {}",
        SIERRA_PATCHED_VERSION,
        info_plist.display()
    );
    let args = vec![
        "-replace".to_string(),
        "CFBundleShortVersionString".to_string(),
        "-string".to_string(),
        SIERRA_PATCHED_VERSION.to_string(),
        arg(&info_plist),
    ];
    commands
        .run("plutil", &args)
        .await?
        .check("plutil")
        .context("patching Sierra installer version")?;

    best_effort(
        commands,
        "xattr",
        vec!["-dr".into(), "com.apple.quarantine".into(), arg(app)],
    )
    .await;

    codesign(commands, &app.join(CREATE_INSTALL_MEDIA)).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::tools::ToolOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records invocations; `codesign` fails on IAPackageKit.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        plutil_fails: bool,
    }

    #[async_trait]
    impl CommandRunner for Recorder {
        async fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput> {
            let line = format!("{} {}", program, args.join(" "));
            self.calls.lock().unwrap().push(line.clone());
            if program == "codesign" && line.contains("IAPackageKit") {
                return Ok(ToolOutput::failed(1, "resource fork not allowed"));
            }
            if program == "plutil" && self.plutil_fails {
                return Ok(ToolOutput::failed(1, "no such file"));
            }
            Ok(ToolOutput::ok(""))
        }
    }

    fn fake_bundle(root: &Path) -> PathBuf {
        let app = root.join("Install macOS Catalina.app");
        for component in framework_components(&app) {
            std::fs::create_dir_all(component.parent().unwrap()).unwrap();
            std::fs::write(&component, b"macho").unwrap();
        }
        app
    }

    #[tokio::test]
    async fn one_failing_component_does_not_stop_the_rest() {
        let tmp = tempfile::tempdir().unwrap();
        let app = fake_bundle(tmp.path());
        let recorder = Recorder::default();

        let signed = sign_components(&recorder, &app).await;

        assert_eq!(signed, 4);
        let calls = recorder.calls.lock().unwrap();
        assert!(calls[0].starts_with("xattr -cr "));
        assert_eq!(calls.iter().filter(|c| c.starts_with("codesign -s - -f ")).count(), 5);
        assert!(calls.last().unwrap().ends_with("Contents/Resources/createinstallmedia"));
    }

    #[tokio::test]
    async fn missing_components_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let app = tmp.path().join("Install macOS Mojave.app");
        let cim = app.join(CREATE_INSTALL_MEDIA);
        std::fs::create_dir_all(cim.parent().unwrap()).unwrap();
        std::fs::write(&cim, b"macho").unwrap();
        let recorder = Recorder::default();

        assert_eq!(sign_components(&recorder, &app).await, 1);
    }

    #[tokio::test]
    async fn sierra_patch_order() {
        let recorder = Recorder::default();
        prepare_sierra(&recorder, Path::new("/tmp/w/Install macOS Sierra.app"))
            .await
            .unwrap();

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            "plutil -replace CFBundleShortVersionString -string 12.6.03 /tmp/w/Install macOS Sierra.app/Contents/Info.plist"
        );
        assert_eq!(
            calls[1],
            "xattr -dr com.apple.quarantine /tmp/w/Install macOS Sierra.app"
        );
        assert_eq!(
            calls[2],
            "codesign -s - -f /tmp/w/Install macOS Sierra.app/Contents/Resources/createinstallmedia"
        );
    }

    #[tokio::test]
    async fn sierra_version_patch_failure_is_fatal() {
        let recorder = Recorder {
            plutil_fails: true,
            ..Default::default()
        };
        let err = prepare_sierra(&recorder, Path::new("/tmp/w/Install macOS Sierra.app"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("patching Sierra installer version"));
        assert_eq!(recorder.calls.lock().unwrap().len(), 1);
    }
}
