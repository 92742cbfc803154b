//! Score and completion extractor.
//!
//! Works from ordered, per-profile pattern tables. Phase 1 looks for
//! completion evidence; without it extraction stops and reports nothing,
//! never inventing a score for content that shows no sign of being finished.
//! Phase 2 tries score patterns in priority order, with the explicit named
//! fields ahead of short ambiguous spellings. A score key that is present
//! but syntactically empty counts as 100 when completion evidence exists:
//! several tools omit the value entirely on full-score attempts.

use std::sync::LazyLock;

use regex::Regex;

use crate::detect::Profile;

/// Outcome of running the heuristics over decoded suspend text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extraction {
    /// No completion marker anywhere. Hard stop; no score reported.
    NoEvidence,
    /// Completion evidence found. `score` is `None` when no numeric value
    /// (and no empty-value score key) matched; the caller may still mark the
    /// attempt completed without a score.
    Completed { score: Option<f64> },
}

struct ProfileTable {
    profile: Profile,
    markers: Vec<Regex>,
    scores: Vec<Regex>,
    /// Score keys whose delimiter is followed directly by a separator or the
    /// end of input. Only these count as "present but empty"; a non-numeric
    /// value after the delimiter is not a score at all.
    empty_scores: Vec<Regex>,
    /// Values at or below 10 are assumed "out of 10" and rescaled.
    rescale_out_of_ten: bool,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("pattern table entry must compile"))
        .collect()
}

const STORYLINE_MARKERS: &[&str] = &[
    r"(?i)\bquiz[_-]?done\b",
    r"(?i)\bresults?\.passed\b",
    r"(?i)\bqd\s*[:=]\s*(?:true|1)\b",
];
const STORYLINE_SCORES: &[&str] = &[
    r#"(?i)\bquiz[_-]?score["']?\s*[:=]\s*["']?(\d+(?:\.\d+)?)"#,
    r#"(?i)\bpoints["']?\s*[:=]\s*["']?(\d+(?:\.\d+)?)"#,
    r#"(?i)\bqs\s*[:=]\s*(\d+(?:\.\d+)?)"#,
];
const STORYLINE_EMPTY: &[&str] = &[
    r#"(?i)\bquiz[_-]?score["']?\s*[:=]\s*(?:""|'')?\s*(?:[;,}]|$)"#,
    r#"(?i)\bpoints["']?\s*[:=]\s*(?:""|'')?\s*(?:[;,}]|$)"#,
];

const CAPTIVATE_MARKERS: &[&str] = &[
    r"(?i)cpQuizInfoPassFail\s*[:=]\s*(?:pass|true|1)\b",
    r"(?i)\bquiz(?:Completed|_complete(?:d)?)\b",
];
const CAPTIVATE_SCORES: &[&str] = &[
    r"(?i)cpQuizInfoPointsscored\s*[:=]\s*(\d+(?:\.\d+)?)",
    r"(?i)\bscorePercent\s*[:=]\s*(\d+(?:\.\d+)?)",
];
const CAPTIVATE_EMPTY: &[&str] = &[
    r"(?i)cpQuizInfoPointsscored\s*[:=]\s*(?:[;,}]|$)",
    r"(?i)\bscorePercent\s*[:=]\s*(?:[;,}]|$)",
];

const ISPRING_MARKERS: &[&str] = &[
    r#"(?i)"finished"\s*:\s*true"#,
    r"(?i)\bquiz\s+finished\b",
];
const ISPRING_SCORES: &[&str] = &[
    r#"(?i)"score"\s*:\s*"?(\d+(?:\.\d+)?)"#,
    r#"(?i)"earned"\s*:\s*"?(\d+(?:\.\d+)?)"#,
];
const ISPRING_EMPTY: &[&str] =
    &[r#"(?i)"(?:score|earned)"\s*:\s*(?:""|null)?\s*(?:[,}]|$)"#];

const GENERIC_MARKERS: &[&str] = &[r"(?i)\b(?:completed?|finished|passed)\b"];
const GENERIC_SCORES: &[&str] = &[
    r#"(?i)\bscore["']?\s*[:=]\s*["']?(\d+(?:\.\d+)?)"#,
    r#"(?i)\b(?:pct|percent)\s*[:=]\s*["']?(\d+(?:\.\d+)?)"#,
];
const GENERIC_EMPTY: &[&str] = &[
    r#"(?i)\bscore["']?\s*[:=]\s*(?:""|'')?\s*(?:[;,}]|$)"#,
    r#"(?i)\b(?:pct|percent)\s*[:=]\s*(?:""|'')?\s*(?:[;,}]|$)"#,
];

static TABLES: LazyLock<Vec<ProfileTable>> = LazyLock::new(|| {
    vec![
        ProfileTable {
            profile: Profile::Storyline,
            markers: compile(STORYLINE_MARKERS),
            scores: compile(STORYLINE_SCORES),
            empty_scores: compile(STORYLINE_EMPTY),
            rescale_out_of_ten: true,
        },
        ProfileTable {
            profile: Profile::Captivate,
            markers: compile(CAPTIVATE_MARKERS),
            scores: compile(CAPTIVATE_SCORES),
            empty_scores: compile(CAPTIVATE_EMPTY),
            rescale_out_of_ten: false,
        },
        ProfileTable {
            profile: Profile::Ispring,
            markers: compile(ISPRING_MARKERS),
            scores: compile(ISPRING_SCORES),
            empty_scores: compile(ISPRING_EMPTY),
            rescale_out_of_ten: false,
        },
        ProfileTable {
            profile: Profile::Generic,
            markers: compile(GENERIC_MARKERS),
            scores: compile(GENERIC_SCORES),
            empty_scores: compile(GENERIC_EMPTY),
            rescale_out_of_ten: false,
        },
    ]
});

/// Tables reordered so the preferred profile is tried first. Generic stays
/// last unless it is the preferred profile itself.
fn ordered(preferred: Profile) -> Vec<&'static ProfileTable> {
    let mut out: Vec<&ProfileTable> = Vec::with_capacity(TABLES.len());
    for t in TABLES.iter().filter(|t| t.profile == preferred) {
        out.push(t);
    }
    for t in TABLES.iter().filter(|t| t.profile != preferred) {
        out.push(t);
    }
    out
}

/// Run the two-phase extraction over decoded text.
pub fn extract(text: &str, preferred: Profile) -> Extraction {
    let tables = ordered(preferred);

    // Phase 1: completion evidence gate.
    let evidence = tables
        .iter()
        .any(|t| t.markers.iter().any(|m| m.is_match(text)));
    if !evidence {
        return Extraction::NoEvidence;
    }

    // Phase 2: first in-range numeric value wins; remember any score key
    // whose value slot is syntactically empty for the full-marks fallback.
    // A key with a non-numeric value matches neither set and is ignored.
    let mut saw_empty_score_key = false;
    for table in &tables {
        for pattern in &table.scores {
            for caps in pattern.captures_iter(text) {
                let Ok(mut value) = caps[1].parse::<f64>() else {
                    continue;
                };
                if table.rescale_out_of_ten && value <= 10.0 {
                    value *= 10.0;
                }
                if (0.0..=100.0).contains(&value) {
                    return Extraction::Completed { score: Some(value) };
                }
            }
        }
        if !saw_empty_score_key {
            saw_empty_score_key = table.empty_scores.iter().any(|p| p.is_match(text));
        }
    }

    if saw_empty_score_key {
        // Observed real-world behavior: full-score attempts sometimes write
        // the key and omit the value.
        return Extraction::Completed { score: Some(100.0) };
    }
    Extraction::Completed { score: None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_marker_means_no_evidence_even_with_numbers() {
        let text = "page=4;score_like_junk;loc=85";
        assert_eq!(extract(text, Profile::Generic), Extraction::NoEvidence);
        assert_eq!(extract("", Profile::Storyline), Extraction::NoEvidence);
    }

    #[test]
    fn marker_plus_value_yields_that_score() {
        let text = "quiz_done=true;quiz_score=85;loc=12";
        assert_eq!(
            extract(text, Profile::Storyline),
            Extraction::Completed { score: Some(85.0) }
        );
    }

    #[test]
    fn empty_score_key_with_evidence_is_exactly_100() {
        let text = "quiz_done=true;quiz_score=;loc=12";
        assert_eq!(
            extract(text, Profile::Storyline),
            Extraction::Completed { score: Some(100.0) }
        );
        // quoted-empty and trailing forms count too
        assert_eq!(
            extract(r#"{"finished": true, "score": ""}"#, Profile::Ispring),
            Extraction::Completed { score: Some(100.0) }
        );
        assert_eq!(
            extract("quiz_done=true;quiz_score=", Profile::Storyline),
            Extraction::Completed { score: Some(100.0) }
        );
    }

    #[test]
    fn nonnumeric_score_value_is_not_a_full_score() {
        // a score key with garbage after the delimiter is no score at all
        let text = "quiz_done=true;quiz_score=abc;loc=12";
        assert_eq!(
            extract(text, Profile::Storyline),
            Extraction::Completed { score: None }
        );
        assert_eq!(
            extract("finished scorePercent=n/a", Profile::Captivate),
            Extraction::Completed { score: None }
        );
    }

    #[test]
    fn storyline_small_values_rescale_out_of_ten() {
        let text = "quiz_done=1;quiz_score=8.5";
        assert_eq!(
            extract(text, Profile::Storyline),
            Extraction::Completed { score: Some(85.0) }
        );
    }

    #[test]
    fn captivate_values_do_not_rescale() {
        let text = "cpQuizInfoPassFail=pass cpQuizInfoPointsscored=9";
        assert_eq!(
            extract(text, Profile::Captivate),
            Extraction::Completed { score: Some(9.0) }
        );
    }

    #[test]
    fn out_of_range_values_are_skipped() {
        let text = "finished cpQuizInfoPointsscored=250 scorePercent=70";
        assert_eq!(
            extract(text, Profile::Captivate),
            Extraction::Completed { score: Some(70.0) }
        );
    }

    #[test]
    fn misdetection_falls_through_to_other_profiles() {
        // Preferred profile finds nothing; iSpring table still matches.
        let text = r#"{"finished": true, "score": 64}"#;
        assert_eq!(
            extract(text, Profile::Captivate),
            Extraction::Completed { score: Some(64.0) }
        );
    }

    #[test]
    fn evidence_without_score_reports_completed_no_score() {
        let text = "results.passed;bookmark=slide9";
        assert_eq!(
            extract(text, Profile::Storyline),
            Extraction::Completed { score: None }
        );
    }
}
