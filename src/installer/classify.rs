//! Installer generation detection.
//!
//! Maps the `(display name, CFBundleShortVersionString)` pair of an installer
//! application to the facts that decide how a bootable drive is produced.
//! Matching is driven by the [`RULES`] table: each row contributes one fact when
//! its pattern matches, and a fact holds when any of its rows match.
//!
//! Installer application versions do not follow the OS version: the Sierra
//! installer reports `12.x`, High Sierra `13.x`, Mojave `14.x`, Catalina `15.x`
//! and Tahoe `21.x`. The guards on the `12.`–`15.` rows exist to keep those
//! older installers out of the modern bucket.

use serde::Serialize;

/// Installer build known to work around the stock Sierra installer defect.
pub const SIERRA_SUPPORTED_VERSION: &str = "12.6.06";

/// Label forced for the supported Sierra build.
pub const SIERRA_LABEL: &str = "macOS Sierra 10.12";

/// Marketing names and their canonical short versions, most specific first.
pub const LEXICON: &[(&str, &str)] = &[
    ("tahoe", "26"),
    ("sequoia", "15"),
    ("sonoma", "14"),
    ("ventura", "13"),
    ("monterey", "12"),
    ("big sur", "11"),
    ("catalina", "10.15"),
    ("mojave", "10.14"),
    ("high sierra", "10.13"),
    ("sierra", "10.12"),
    ("el capitan", "10.11"),
    ("yosemite", "10.10"),
    ("mavericks", "10.9"),
    ("mountain lion", "10.8"),
    ("lion", "10.7"),
];

/// One classification fact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fact {
    Catalina,
    SierraSupported,
    Modern,
    OldSupportedNeedsCodesign,
    LegacyNoCodesign,
    LegacyRestoreOnly,
}

/// Extra condition on the display name for version-prefix rows.
#[derive(Clone, Copy, Debug)]
pub enum NameGuard {
    Contains(&'static str),
    Lacks(&'static str),
    /// Not named plain "Sierra" (High Sierra passes).
    NotPlainSierra,
}

/// What a rule row matches against.
#[derive(Clone, Copy, Debug)]
pub enum Pattern {
    /// Lower-cased name contains the text.
    Name(&'static str),
    /// Raw version starts with the prefix.
    Version(&'static str),
    /// Raw version equals the text and the name passes the guard.
    VersionExact(&'static str, NameGuard),
    /// Raw version starts with the prefix and the name passes the guard.
    VersionWhen(&'static str, NameGuard),
}

/// A single row of the classification table.
#[derive(Clone, Copy, Debug)]
pub struct Rule {
    pub fact: Fact,
    pub pattern: Pattern,
}

const fn rule(fact: Fact, pattern: Pattern) -> Rule {
    Rule { fact, pattern }
}

use Fact::*;
use NameGuard::*;
use Pattern::*;

/// The classification table.
pub const RULES: &[Rule] = &[
    rule(Catalina, Name("catalina")),
    rule(Catalina, Version("10.15")),
    rule(SierraSupported, VersionExact(SIERRA_SUPPORTED_VERSION, Lacks("high"))),
    rule(Modern, Name("tahoe")),
    rule(Modern, Name("sur")),
    rule(Modern, Name("monterey")),
    rule(Modern, Name("ventura")),
    rule(Modern, Name("sonoma")),
    rule(Modern, Name("sequoia")),
    rule(Modern, Version("21.")),
    rule(Modern, Version("11.")),
    rule(Modern, VersionWhen("12.", NotPlainSierra)),
    rule(Modern, VersionWhen("13.", Lacks("high"))),
    rule(Modern, VersionWhen("14.", Lacks("mojave"))),
    rule(Modern, VersionWhen("15.", NotPlainSierra)),
    rule(OldSupportedNeedsCodesign, Name("mojave")),
    rule(OldSupportedNeedsCodesign, Name("high sierra")),
    rule(OldSupportedNeedsCodesign, Version("10.14")),
    rule(OldSupportedNeedsCodesign, Version("10.13")),
    rule(OldSupportedNeedsCodesign, VersionWhen("14.", Contains("mojave"))),
    rule(OldSupportedNeedsCodesign, VersionWhen("13.", Contains("high"))),
    rule(LegacyNoCodesign, Name("yosemite")),
    rule(LegacyNoCodesign, Name("el capitan")),
    rule(LegacyNoCodesign, Version("10.10")),
    rule(LegacyNoCodesign, Version("10.11")),
    rule(LegacyRestoreOnly, Name("mountain lion")),
    rule(LegacyRestoreOnly, Name("lion")),
    rule(LegacyRestoreOnly, Version("10.8")),
    rule(LegacyRestoreOnly, Version("10.7")),
];

fn is_plain_sierra(name: &str) -> bool {
    name.contains("sierra") && !name.contains("high")
}

impl NameGuard {
    fn passes(self, name: &str) -> bool {
        match self {
            Contains(text) => name.contains(text),
            Lacks(text) => !name.contains(text),
            NotPlainSierra => !is_plain_sierra(name),
        }
    }
}

impl Pattern {
    fn matches(self, name: &str, version: &str) -> bool {
        match self {
            Name(text) => name.contains(text),
            Version(prefix) => version.starts_with(prefix),
            VersionExact(text, guard) => version == text && guard.passes(name),
            VersionWhen(prefix, guard) => version.starts_with(prefix) && guard.passes(name),
        }
    }
}

/// Facts derived from an installer's name and version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SystemClassification {
    pub is_catalina: bool,
    pub is_sierra_supported: bool,
    pub is_sierra_unsupported_variant: bool,
    pub is_modern: bool,
    pub is_old_supported_needs_codesign: bool,
    pub is_legacy_no_codesign: bool,
    pub is_legacy_restore_only: bool,
    pub is_recognized: bool,
    /// Generic ad-hoc re-signing of the installer frameworks is required.
    pub needs_codesign: bool,
    /// Marketing label, e.g. "macOS Big Sur 11".
    pub label: String,
}

impl SystemClassification {
    /// Classify an installer. Pure and deterministic.
    pub fn classify(display_name: &str, raw_version: &str) -> Self {
        let name = display_name.to_lowercase();
        let holds = |fact: Fact| {
            RULES
                .iter()
                .filter(|r| r.fact == fact)
                .any(|r| r.pattern.matches(&name, raw_version))
        };

        let is_catalina = holds(Catalina);
        let is_sierra_supported = holds(SierraSupported);
        let is_modern = holds(Modern);
        let is_old_supported_needs_codesign = holds(OldSupportedNeedsCodesign);
        let is_legacy_no_codesign = holds(LegacyNoCodesign);
        let is_legacy_restore_only = holds(LegacyRestoreOnly);
        let is_sierra_unsupported_variant = is_plain_sierra(&name) && !is_sierra_supported;

        let is_recognized = is_modern
            || is_old_supported_needs_codesign
            || is_legacy_no_codesign
            || is_legacy_restore_only
            || is_catalina
            || is_sierra_supported;

        let (needs_codesign, label) = if is_sierra_supported {
            (false, SIERRA_LABEL.to_string())
        } else {
            (
                is_old_supported_needs_codesign && !is_modern && !is_legacy_no_codesign,
                marketing_label(display_name, raw_version),
            )
        };

        Self {
            is_catalina,
            is_sierra_supported,
            is_sierra_unsupported_variant,
            is_modern,
            is_old_supported_needs_codesign,
            is_legacy_no_codesign,
            is_legacy_restore_only,
            is_recognized,
            needs_codesign,
            label,
        }
    }

    /// Facts that hold, in table order.
    pub fn facts(&self) -> Vec<Fact> {
        [
            (Catalina, self.is_catalina),
            (SierraSupported, self.is_sierra_supported),
            (Modern, self.is_modern),
            (OldSupportedNeedsCodesign, self.is_old_supported_needs_codesign),
            (LegacyNoCodesign, self.is_legacy_no_codesign),
            (LegacyRestoreOnly, self.is_legacy_restore_only),
        ]
        .into_iter()
        .filter_map(|(fact, on)| on.then_some(fact))
        .collect()
    }

    /// Message for the "unsupported system" state.
    pub fn unsupported_message(&self) -> &'static str {
        if self.is_sierra_unsupported_variant {
            "This version of macOS Sierra is not supported. A newer installer build is required."
        } else {
            "The selected system is not supported."
        }
    }
}

/// Canonical short version for a marketing name, or the raw version.
pub fn marketing_version(display_name: &str, raw_version: &str) -> String {
    let name = display_name.to_lowercase();
    LEXICON
        .iter()
        .find(|(marketing, _)| match *marketing {
            "sierra" => is_plain_sierra(&name),
            other => name.contains(other),
        })
        .map(|(_, short)| short.to_string())
        .unwrap_or_else(|| raw_version.to_string())
}

/// "macOS Big Sur 11" style label built from the bundle display name.
pub fn marketing_label(display_name: &str, raw_version: &str) -> String {
    let clean = display_name
        .replace("Install ", "")
        .replace("macOS ", "")
        .replace("Mac OS X ", "")
        .replace("OS X ", "");
    let prefix = if display_name.contains("macOS") {
        "macOS"
    } else if display_name.contains("OS X") {
        "OS X"
    } else {
        "macOS"
    };
    format!(
        "{} {} {}",
        prefix,
        clean,
        marketing_version(display_name, raw_version)
    )
}
