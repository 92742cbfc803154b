//! CMI element vocabulary for both protocol generations.
//!
//! Every element the RTE accepts is described here: expected value type,
//! read/write access, maximum length, and the protocol-defined default that
//! GetValue returns when nothing was stored. Validation happens once at this
//! boundary instead of scattered coercions.

use crate::duration;

/// Protocol generation of a content package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScormVersion {
    V12,
    V2004,
}

impl ScormVersion {
    pub fn from_str(raw: &str) -> Self {
        if raw.trim().starts_with("2004") {
            Self::V2004
        } else {
            Self::V12
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V12 => "1.2",
            Self::V2004 => "2004",
        }
    }
}

/// Read/write access from the content package's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Expected value shape, validated on SetValue.
#[derive(Debug, Clone, Copy)]
pub enum ElementKind {
    Text,
    /// Decimal with optional inclusive bounds.
    Decimal(Option<f64>, Option<f64>),
    /// Closed vocabulary.
    Vocab(&'static [&'static str]),
    /// Duration in the version-appropriate encoding.
    Time,
}

/// Static description of one dotted element name.
#[derive(Debug, Clone, Copy)]
pub struct ElementSpec {
    pub name: &'static str,
    pub kind: ElementKind,
    pub access: Access,
    pub max_len: usize,
    /// Protocol-defined default for GetValue on an unset element.
    pub default: &'static str,
    /// Bookmark elements stay writable before Initialize so non-compliant
    /// packages cannot lose resume state.
    pub bookmark: bool,
}

pub const LESSON_STATUS_VOCAB: &[&str] = &[
    "passed",
    "failed",
    "completed",
    "incomplete",
    "browsed",
    "not attempted",
];
pub const COMPLETION_STATUS_VOCAB: &[&str] =
    &["completed", "incomplete", "not attempted", "unknown"];
pub const SUCCESS_STATUS_VOCAB: &[&str] = &["passed", "failed", "unknown"];
const EXIT_VOCAB_12: &[&str] = &["", "time-out", "suspend", "logout"];
const EXIT_VOCAB_2004: &[&str] = &["", "time-out", "suspend", "logout", "normal"];
const CREDIT_VOCAB: &[&str] = &["credit", "no-credit"];
const ENTRY_VOCAB: &[&str] = &["", "ab-initio", "resume"];
const MODE_VOCAB: &[&str] = &["normal", "browse", "review"];

const SPECS_12: &[ElementSpec] = &[
    spec("cmi.core.student_id", ElementKind::Text, Access::ReadOnly, 255, "", false),
    spec("cmi.core.student_name", ElementKind::Text, Access::ReadOnly, 255, "", false),
    spec("cmi.core.lesson_location", ElementKind::Text, Access::ReadWrite, 255, "", true),
    spec("cmi.core.credit", ElementKind::Vocab(CREDIT_VOCAB), Access::ReadOnly, 16, "credit", false),
    spec("cmi.core.lesson_status", ElementKind::Vocab(LESSON_STATUS_VOCAB), Access::ReadWrite, 16, "not attempted", false),
    spec("cmi.core.entry", ElementKind::Vocab(ENTRY_VOCAB), Access::ReadOnly, 16, "ab-initio", false),
    spec("cmi.core.score.raw", ElementKind::Decimal(Some(0.0), Some(100.0)), Access::ReadWrite, 32, "", false),
    spec("cmi.core.score.max", ElementKind::Decimal(Some(0.0), Some(100.0)), Access::ReadWrite, 32, "", false),
    spec("cmi.core.score.min", ElementKind::Decimal(Some(0.0), Some(100.0)), Access::ReadWrite, 32, "", false),
    spec("cmi.core.total_time", ElementKind::Time, Access::ReadOnly, 32, "0000:00:00", false),
    spec("cmi.core.lesson_mode", ElementKind::Vocab(MODE_VOCAB), Access::ReadOnly, 16, "normal", false),
    spec("cmi.core.exit", ElementKind::Vocab(EXIT_VOCAB_12), Access::WriteOnly, 16, "", false),
    spec("cmi.core.session_time", ElementKind::Time, Access::WriteOnly, 32, "", false),
    spec("cmi.suspend_data", ElementKind::Text, Access::ReadWrite, 4096, "", true),
    spec("cmi.launch_data", ElementKind::Text, Access::ReadOnly, 4096, "", false),
    spec("cmi.comments", ElementKind::Text, Access::ReadWrite, 4096, "", false),
    spec("cmi.student_data.mastery_score", ElementKind::Decimal(Some(0.0), Some(100.0)), Access::ReadOnly, 32, "", false),
];

const SPECS_2004: &[ElementSpec] = &[
    spec("cmi.learner_id", ElementKind::Text, Access::ReadOnly, 255, "", false),
    spec("cmi.learner_name", ElementKind::Text, Access::ReadOnly, 255, "", false),
    spec("cmi.location", ElementKind::Text, Access::ReadWrite, 1000, "", true),
    spec("cmi.credit", ElementKind::Vocab(CREDIT_VOCAB), Access::ReadOnly, 16, "credit", false),
    spec("cmi.completion_status", ElementKind::Vocab(COMPLETION_STATUS_VOCAB), Access::ReadWrite, 16, "unknown", false),
    spec("cmi.success_status", ElementKind::Vocab(SUCCESS_STATUS_VOCAB), Access::ReadWrite, 16, "unknown", false),
    spec("cmi.entry", ElementKind::Vocab(ENTRY_VOCAB), Access::ReadOnly, 16, "ab-initio", false),
    spec("cmi.exit", ElementKind::Vocab(EXIT_VOCAB_2004), Access::WriteOnly, 16, "", false),
    spec("cmi.mode", ElementKind::Vocab(MODE_VOCAB), Access::ReadOnly, 16, "normal", false),
    spec("cmi.score.raw", ElementKind::Decimal(None, None), Access::ReadWrite, 32, "", false),
    spec("cmi.score.min", ElementKind::Decimal(None, None), Access::ReadWrite, 32, "", false),
    spec("cmi.score.max", ElementKind::Decimal(None, None), Access::ReadWrite, 32, "", false),
    spec("cmi.score.scaled", ElementKind::Decimal(Some(-1.0), Some(1.0)), Access::ReadWrite, 32, "", false),
    spec("cmi.progress_measure", ElementKind::Decimal(Some(0.0), Some(1.0)), Access::ReadWrite, 32, "", false),
    spec("cmi.session_time", ElementKind::Time, Access::WriteOnly, 32, "", false),
    spec("cmi.total_time", ElementKind::Time, Access::ReadOnly, 32, "PT0H0M0S", false),
    spec("cmi.suspend_data", ElementKind::Text, Access::ReadWrite, 64000, "", true),
];

const fn spec(
    name: &'static str,
    kind: ElementKind,
    access: Access,
    max_len: usize,
    default: &'static str,
    bookmark: bool,
) -> ElementSpec {
    ElementSpec {
        name,
        kind,
        access,
        max_len,
        default,
        bookmark,
    }
}

/// Look up an element in the version's vocabulary.
pub fn lookup(version: ScormVersion, element: &str) -> Option<&'static ElementSpec> {
    let table = match version {
        ScormVersion::V12 => SPECS_12,
        ScormVersion::V2004 => SPECS_2004,
    };
    table.iter().find(|s| s.name == element)
}

/// Validate a value against an element's expected shape. Returns the stored
/// form on success.
pub fn validate_value(spec: &ElementSpec, value: &str) -> Option<String> {
    if value.len() > spec.max_len {
        return None;
    }
    match spec.kind {
        ElementKind::Text => Some(value.to_string()),
        ElementKind::Decimal(min, max) => {
            let parsed: f64 = value.trim().parse().ok()?;
            if !parsed.is_finite() {
                return None;
            }
            if let Some(min) = min {
                if parsed < min {
                    return None;
                }
            }
            if let Some(max) = max {
                if parsed > max {
                    return None;
                }
            }
            Some(value.trim().to_string())
        }
        ElementKind::Vocab(vocab) => {
            let v = value.trim();
            vocab.iter().any(|&allowed| allowed == v).then(|| v.to_string())
        }
        ElementKind::Time => {
            duration::parse_duration(value)?;
            Some(value.trim().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_vocabularies_resolve_their_elements() {
        assert!(lookup(ScormVersion::V12, "cmi.core.lesson_status").is_some());
        assert!(lookup(ScormVersion::V12, "cmi.completion_status").is_none());
        assert!(lookup(ScormVersion::V2004, "cmi.completion_status").is_some());
        assert!(lookup(ScormVersion::V2004, "cmi.core.lesson_status").is_none());
    }

    #[test]
    fn decimal_validation_enforces_ranges() {
        let scaled = lookup(ScormVersion::V2004, "cmi.score.scaled").unwrap();
        assert_eq!(validate_value(scaled, "0.85").as_deref(), Some("0.85"));
        assert_eq!(validate_value(scaled, "-1"), Some("-1".to_string()));
        assert!(validate_value(scaled, "1.5").is_none());
        assert!(validate_value(scaled, "abc").is_none());

        let raw12 = lookup(ScormVersion::V12, "cmi.core.score.raw").unwrap();
        assert!(validate_value(raw12, "101").is_none());
        assert!(validate_value(raw12, "85").is_some());
    }

    #[test]
    fn vocab_validation_rejects_unknown_tokens() {
        let status = lookup(ScormVersion::V12, "cmi.core.lesson_status").unwrap();
        assert!(validate_value(status, "passed").is_some());
        assert!(validate_value(status, "done").is_none());
    }

    #[test]
    fn time_validation_uses_the_duration_codec() {
        let st = lookup(ScormVersion::V12, "cmi.core.session_time").unwrap();
        assert!(validate_value(st, "00:12:30").is_some());
        assert!(validate_value(st, "nonsense").is_none());
        let st = lookup(ScormVersion::V2004, "cmi.session_time").unwrap();
        assert!(validate_value(st, "PT12M30S").is_some());
    }

    #[test]
    fn max_length_is_enforced() {
        let sd = lookup(ScormVersion::V12, "cmi.suspend_data").unwrap();
        assert!(validate_value(sd, &"x".repeat(4096)).is_some());
        assert!(validate_value(sd, &"x".repeat(4097)).is_none());
    }

    #[test]
    fn version_parsing() {
        assert_eq!(ScormVersion::from_str("1.2"), ScormVersion::V12);
        assert_eq!(ScormVersion::from_str("2004 4th Edition"), ScormVersion::V2004);
    }
}
