//! Format detector: classifies decoded suspend text into an authoring-tool
//! profile. The classification only decides which extraction heuristics are
//! tried first; extraction falls through to every other profile, so a wrong
//! guess degrades gracefully.

/// Authoring-tool profiles with distinct suspend-data conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Storyline,
    Captivate,
    Ispring,
    Generic,
}

impl Profile {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Storyline => "storyline",
            Self::Captivate => "captivate",
            Self::Ispring => "ispring",
            Self::Generic => "generic",
        }
    }
}

/// Tool-tag hints mapped to profiles. Checked before content signatures.
const HINTS: &[(&str, Profile)] = &[
    ("storyline", Profile::Storyline),
    ("articulate", Profile::Storyline),
    ("captivate", Profile::Captivate),
    ("adobe", Profile::Captivate),
    ("ispring", Profile::Ispring),
    ("rise", Profile::Ispring),
];

/// Content substring signatures, most specific first.
const SIGNATURES: &[(&str, Profile)] = &[
    ("cpquizinfo", Profile::Captivate),
    ("cpinfo", Profile::Captivate),
    ("quiz_done", Profile::Storyline),
    ("quizdone", Profile::Storyline),
    ("#state", Profile::Storyline),
    ("\"finished\"", Profile::Ispring),
    ("ispring", Profile::Ispring),
];

/// Classify decoded suspend text, preferring the package's authoring-tool
/// hint when one is known.
pub fn detect(text: &str, tool_hint: Option<&str>) -> Profile {
    if let Some(hint) = tool_hint {
        let hint = hint.to_ascii_lowercase();
        for (needle, profile) in HINTS {
            if hint.contains(needle) {
                return *profile;
            }
        }
    }
    let lower = text.to_ascii_lowercase();
    for (needle, profile) in SIGNATURES {
        if lower.contains(needle) {
            return *profile;
        }
    }
    Profile::Generic
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_wins_over_content() {
        assert_eq!(
            detect("cpQuizInfoPointsscored=90", Some("Articulate Storyline 3")),
            Profile::Storyline
        );
    }

    #[test]
    fn content_signatures_classify() {
        assert_eq!(detect("cpQuizInfoPassFail=pass", None), Profile::Captivate);
        assert_eq!(detect("2Xquiz_done=true;qs=80", None), Profile::Storyline);
        assert_eq!(detect(r#"{"finished": true}"#, None), Profile::Ispring);
    }

    #[test]
    fn falls_back_to_generic() {
        assert_eq!(detect("page=4;visited=1,2,3", None), Profile::Generic);
        assert_eq!(detect("", Some("unknown tool")), Profile::Generic);
    }
}
