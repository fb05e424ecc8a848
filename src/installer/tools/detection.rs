//! External tool availability checking.
//!
//! Nothing here is fatal: a missing tool is reported and the build fails
//! later at the step that needs it, with that tool's own error.

use serde::Serialize;
use std::path::PathBuf;

/// Every executable the build flows call, directly or from the generated script.
pub const REQUIRED_TOOLS: &[&str] = &[
    "hdiutil",
    "diskutil",
    "codesign",
    "xattr",
    "plutil",
    "asr",
    "osascript",
    "open",
    "ditto",
];

/// Where (or whether) a tool was found.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub name: &'static str,
    pub path: Option<PathBuf>,
}

impl ToolStatus {
    pub fn available(&self) -> bool {
        self.path.is_some()
    }
}

/// Look up every required tool on `PATH` plus `/usr/sbin`.
pub fn detect_tools() -> Vec<ToolStatus> {
    REQUIRED_TOOLS
        .iter()
        .map(|name| {
            let path = which::which(name)
                .or_else(|_| which::which(format!("/usr/sbin/{}", name)))
                .ok();
            match &path {
                Some(p) => log::debug!("Found {} at: {}", name, p.display()),
                None => log::warn!("{} not found in PATH", name),
            }
            ToolStatus { name, path }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_required_tool_once() {
        let statuses = detect_tools();
        assert_eq!(statuses.len(), REQUIRED_TOOLS.len());
        for (status, name) in statuses.iter().zip(REQUIRED_TOOLS) {
            assert_eq!(status.name, *name);
        }
    }
}
