//! RTE session state machine.
//!
//! Holds one attempt's in-flight protocol state and enforces the
//! Initialize -> (Get/Set/Commit)* -> Terminate lifecycle. The machine is
//! sans-IO: callers persist the snapshot it produces on Commit/Terminate and
//! feed accepted session-time writes to the time accumulator.
//!
//! Protocol errors are part of the normal call contract: every call sets the
//! last-error code, and the boolean/string result mirrors the wire API.

use std::collections::{HashMap, HashSet};

use chrono::Utc;

use crate::duration;
use crate::elements::{self, Access, ScormVersion};
use crate::error::ErrorCode;
use crate::models::{Attempt, PackageMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Terminated,
}

pub struct RteSession {
    version: ScormVersion,
    state: SessionState,
    attempt: Attempt,
    mastery_score: Option<f64>,
    cmi: HashMap<String, String>,
    dirty: HashSet<String>,
    last_error: ErrorCode,
    diagnostic: String,
    status_set_explicitly: bool,
    pending_session_seconds: Option<i64>,
}

impl RteSession {
    pub fn new(attempt: Attempt, package: &PackageMeta, cmi: HashMap<String, String>) -> Self {
        let version = ScormVersion::from_str(&package.scorm_version);
        let mut session = Self {
            version,
            state: SessionState::Uninitialized,
            attempt,
            mastery_score: package.mastery_score,
            cmi,
            dirty: HashSet::new(),
            last_error: ErrorCode::NoError,
            diagnostic: String::new(),
            status_set_explicitly: false,
            pending_session_seconds: None,
        };
        session.seed_identity();
        session
    }

    /// Identity and progress values the content package may read but never
    /// set. These come from the attempt, not from prior SetValue calls.
    fn seed_identity(&mut self) {
        let a = &self.attempt;
        let seeds: Vec<(&str, String)> = match self.version {
            ScormVersion::V12 => vec![
                ("cmi.core.student_id", a.learner_id.clone()),
                ("cmi.core.lesson_location", a.lesson_location.clone()),
                ("cmi.core.lesson_status", a.lesson_status.clone()),
                ("cmi.core.entry", a.entry.clone()),
                ("cmi.core.total_time", a.total_time.clone()),
                ("cmi.suspend_data", a.suspend_data.clone()),
                (
                    "cmi.student_data.mastery_score",
                    self.mastery_score.map(fmt_decimal).unwrap_or_default(),
                ),
            ],
            ScormVersion::V2004 => vec![
                ("cmi.learner_id", a.learner_id.clone()),
                ("cmi.location", a.lesson_location.clone()),
                ("cmi.completion_status", a.completion_status.clone()),
                ("cmi.success_status", a.success_status.clone()),
                ("cmi.entry", a.entry.clone()),
                ("cmi.total_time", a.total_time.clone()),
                ("cmi.suspend_data", a.suspend_data.clone()),
            ],
        };
        for (element, value) in seeds {
            if !value.is_empty() {
                self.cmi.insert(element.to_string(), value);
            }
        }
        for (element, value) in [
            (score_element(self.version, "raw"), a.score_raw),
            (score_element(self.version, "max"), a.score_max),
            (score_element(self.version, "min"), a.score_min),
        ] {
            if let Some(v) = value {
                self.cmi.insert(element.to_string(), fmt_decimal(v));
            }
        }
        if self.version == ScormVersion::V2004 {
            if let Some(v) = a.score_scaled {
                self.cmi.insert("cmi.score.scaled".to_string(), fmt_decimal(v));
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn version(&self) -> ScormVersion {
        self.version
    }

    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    pub fn mastery_score(&self) -> Option<f64> {
        self.mastery_score
    }

    fn ok(&mut self) -> bool {
        self.last_error = ErrorCode::NoError;
        self.diagnostic.clear();
        true
    }

    fn fail(&mut self, code: ErrorCode, diagnostic: impl Into<String>) -> bool {
        self.last_error = code;
        self.diagnostic = diagnostic.into();
        false
    }

    /// Initialize("") — computes `entry` from existing resume state and must
    /// not erase it. Returns false if already initialized or terminated.
    pub fn initialize(&mut self) -> bool {
        if self.state != SessionState::Uninitialized {
            return self.fail(ErrorCode::GeneralException, "already initialized");
        }
        self.state = SessionState::Initialized;
        let resuming =
            !self.attempt.lesson_location.is_empty() || !self.attempt.suspend_data.is_empty();
        self.attempt.entry = if resuming { "resume" } else { "ab-initio" }.to_string();
        let entry_el = match self.version {
            ScormVersion::V12 => "cmi.core.entry",
            ScormVersion::V2004 => "cmi.entry",
        };
        self.cmi.insert(entry_el.to_string(), self.attempt.entry.clone());
        if self.attempt.started_at.is_none() {
            self.attempt.started_at = Some(Utc::now());
        }
        self.ok()
    }

    /// GetValue(element). Empty result with an error code on failure; the
    /// protocol-defined default when the element was never set.
    pub fn get_value(&mut self, element: &str) -> String {
        let Some(spec) = elements::lookup(self.version, element) else {
            self.fail(ErrorCode::NotImplemented, format!("unknown element '{element}'"));
            return String::new();
        };
        if self.state != SessionState::Initialized {
            // Bookmark elements are not an error before Initialize, merely
            // invisible until it completes.
            if !spec.bookmark {
                self.fail(ErrorCode::NotInitialized, "");
            } else {
                self.ok();
            }
            return String::new();
        }
        if spec.access == Access::WriteOnly {
            self.fail(ErrorCode::WriteOnlyElement, "");
            return String::new();
        }
        self.ok();
        match self.cmi.get(element) {
            Some(v) if !v.is_empty() => v.clone(),
            _ => spec.default.to_string(),
        }
    }

    /// SetValue(element, value). Bookmark elements are writable even before
    /// Initialize so non-compliant packages cannot lose resume state.
    pub fn set_value(&mut self, element: &str, value: &str) -> bool {
        let Some(spec) = elements::lookup(self.version, element) else {
            return self.fail(ErrorCode::NotImplemented, format!("unknown element '{element}'"));
        };
        if self.state == SessionState::Terminated {
            return self.fail(ErrorCode::NotInitialized, "session terminated");
        }
        if self.state == SessionState::Uninitialized && !spec.bookmark {
            return self.fail(ErrorCode::NotInitialized, "");
        }
        if spec.access == Access::ReadOnly {
            return self.fail(ErrorCode::ReadOnlyElement, "");
        }
        let Some(stored) = elements::validate_value(spec, value) else {
            return self.fail(
                ErrorCode::TypeMismatch,
                format!("'{value}' is not valid for {element}"),
            );
        };
        if let Err(code) = self.apply_typed(element, &stored) {
            return self.fail(code, format!("'{stored}' rejected for {element}"));
        }
        self.cmi.insert(element.to_string(), stored);
        self.dirty.insert(element.to_string());
        self.ok()
    }

    /// Route a validated value into the typed attempt fields and derived
    /// state. Returns the protocol error when a model invariant would break.
    fn apply_typed(&mut self, element: &str, value: &str) -> Result<(), ErrorCode> {
        match (self.version, element) {
            (ScormVersion::V12, "cmi.core.lesson_location")
            | (ScormVersion::V2004, "cmi.location") => {
                self.attempt.lesson_location = value.to_string();
            }
            (_, "cmi.suspend_data") => {
                self.attempt.suspend_data = value.to_string();
            }
            (ScormVersion::V12, "cmi.core.lesson_status") => {
                self.attempt.lesson_status = value.to_string();
                self.status_set_explicitly = true;
            }
            (ScormVersion::V2004, "cmi.completion_status") => {
                self.attempt.completion_status = value.to_string();
                self.status_set_explicitly = true;
            }
            (ScormVersion::V2004, "cmi.success_status") => {
                self.attempt.success_status = value.to_string();
                self.status_set_explicitly = true;
            }
            (ScormVersion::V12, "cmi.core.exit") | (ScormVersion::V2004, "cmi.exit") => {
                self.attempt.exit_mode = value.to_string();
            }
            (ScormVersion::V12, "cmi.core.score.raw") | (ScormVersion::V2004, "cmi.score.raw") => {
                let parsed = parse_decimal(value)?;
                self.check_score_bounds(Some(parsed), self.attempt.score_min, self.attempt.score_max)?;
                self.attempt.score_raw = Some(parsed);
                self.derive_scaled();
            }
            (ScormVersion::V12, "cmi.core.score.max") | (ScormVersion::V2004, "cmi.score.max") => {
                let parsed = parse_decimal(value)?;
                self.check_score_bounds(self.attempt.score_raw, self.attempt.score_min, Some(parsed))?;
                self.attempt.score_max = Some(parsed);
                self.derive_scaled();
            }
            (ScormVersion::V12, "cmi.core.score.min") | (ScormVersion::V2004, "cmi.score.min") => {
                let parsed = parse_decimal(value)?;
                self.check_score_bounds(self.attempt.score_raw, Some(parsed), self.attempt.score_max)?;
                self.attempt.score_min = Some(parsed);
                self.derive_scaled();
            }
            (ScormVersion::V2004, "cmi.score.scaled") => {
                self.attempt.score_scaled = Some(parse_decimal(value)?);
            }
            (ScormVersion::V12, "cmi.core.session_time")
            | (ScormVersion::V2004, "cmi.session_time") => {
                // Validated by the codec already; stash the delta for the
                // accumulator.
                let seconds = duration::parse_duration(value).ok_or(ErrorCode::TypeMismatch)?;
                self.attempt.session_time = value.to_string();
                self.pending_session_seconds = Some(seconds);
            }
            _ => {}
        }
        Ok(())
    }

    /// score_raw must sit inside [score_min, score_max] when all three are
    /// present.
    fn check_score_bounds(
        &self,
        raw: Option<f64>,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<(), ErrorCode> {
        if let (Some(raw), Some(min), Some(max)) = (raw, min, max) {
            if raw < min || raw > max {
                return Err(ErrorCode::TypeMismatch);
            }
        }
        Ok(())
    }

    /// 2004 rollup: derive score_scaled from raw/min/max when the package
    /// sets raw but never scaled. A directly-set scaled value always wins.
    fn derive_scaled(&mut self) {
        if self.version != ScormVersion::V2004 || self.cmi.contains_key("cmi.score.scaled") {
            return;
        }
        if let (Some(raw), max) = (self.attempt.score_raw, self.attempt.score_max) {
            let min = self.attempt.score_min.unwrap_or(0.0);
            let max = max.unwrap_or(100.0);
            if max > min {
                self.attempt.score_scaled = Some(((raw - min) / (max - min)).clamp(-1.0, 1.0));
            }
        }
    }

    /// Take the session-time delta accepted by the last SetValue, if any.
    /// The caller feeds it to the time accumulator.
    pub fn take_session_seconds(&mut self) -> Option<i64> {
        self.pending_session_seconds.take()
    }

    /// Absorb the running total the accumulator wrote through, so a later
    /// Commit persists the fresh value instead of the one loaded at session
    /// start. Keeps the readable total_time element in step.
    pub fn apply_accumulated_total(&mut self, total_seconds: i64) {
        if total_seconds < self.attempt.total_time_seconds {
            return;
        }
        self.attempt.total_time_seconds = total_seconds;
        let (element, formatted) = match self.version {
            ScormVersion::V12 => (
                "cmi.core.total_time",
                duration::format_timespan(total_seconds),
            ),
            ScormVersion::V2004 => ("cmi.total_time", duration::format_iso8601(total_seconds)),
        };
        self.attempt.total_time = formatted.clone();
        self.cmi.insert(element.to_string(), formatted);
    }

    /// Commit("") — returns the snapshot to persist, or None with the error
    /// code set. The caller must invoke `mark_persisted` after the durable
    /// write succeeds so each element is persisted exactly once.
    pub fn commit(&mut self) -> Option<CommitSnapshot> {
        if self.state != SessionState::Initialized {
            self.fail(ErrorCode::NotInitialized, "");
            return None;
        }
        self.ok();
        Some(self.snapshot())
    }

    /// Terminate("") — derives a status from the score and mastery threshold
    /// when the package never set one, then seals the session.
    pub fn terminate(&mut self, default_mastery: f64) -> Option<CommitSnapshot> {
        if self.state != SessionState::Initialized {
            self.fail(ErrorCode::NotInitialized, "");
            return None;
        }
        if !self.status_set_explicitly && !self.attempt.has_terminal_status() {
            let mastery = self.mastery_score.unwrap_or(default_mastery);
            match self.attempt.score_raw {
                Some(raw) if raw >= mastery => self.set_derived_status("passed"),
                Some(_) => self.set_derived_status("failed"),
                None => self.set_derived_status("incomplete"),
            }
        }
        self.attempt.finished_at = Some(Utc::now());
        self.state = SessionState::Terminated;
        self.ok();
        Some(self.snapshot())
    }

    fn set_derived_status(&mut self, status: &str) {
        match self.version {
            ScormVersion::V12 => {
                self.attempt.lesson_status = status.to_string();
                self.cmi
                    .insert("cmi.core.lesson_status".to_string(), status.to_string());
                self.dirty.insert("cmi.core.lesson_status".to_string());
            }
            ScormVersion::V2004 => {
                let (completion, success) = match status {
                    "passed" => ("completed", "passed"),
                    "failed" => ("completed", "failed"),
                    _ => ("incomplete", "unknown"),
                };
                self.attempt.completion_status = completion.to_string();
                self.attempt.success_status = success.to_string();
                self.cmi
                    .insert("cmi.completion_status".to_string(), completion.to_string());
                self.cmi
                    .insert("cmi.success_status".to_string(), success.to_string());
                self.dirty.insert("cmi.completion_status".to_string());
                self.dirty.insert("cmi.success_status".to_string());
            }
        }
    }

    fn snapshot(&self) -> CommitSnapshot {
        CommitSnapshot {
            attempt: self.attempt.clone(),
            dirty_cmi: self
                .dirty
                .iter()
                .filter_map(|el| self.cmi.get(el).map(|v| (el.clone(), v.clone())))
                .collect(),
        }
    }

    /// Clear the dirty set after a successful durable write.
    pub fn mark_persisted(&mut self) {
        self.dirty.clear();
    }

    pub fn last_error(&self) -> ErrorCode {
        self.last_error
    }

    pub fn error_string(&self, code: u16) -> &'static str {
        ErrorCode::from_code(code).map(ErrorCode::message).unwrap_or("")
    }

    /// GetDiagnostic(code). An empty argument, or the last error's own code,
    /// returns the diagnostic captured by the last call; any other known
    /// code echoes that code's message; unknown codes return empty.
    pub fn diagnostic(&self, code: &str) -> String {
        let code = code.trim();
        if code.is_empty() || code == self.last_error.code().to_string() {
            return self.diagnostic.clone();
        }
        code.parse::<u16>()
            .ok()
            .and_then(ErrorCode::from_code)
            .map(|ec| ec.message().to_string())
            .unwrap_or_default()
    }
}

/// State handed to the persistence layer on Commit/Terminate.
#[derive(Debug, Clone)]
pub struct CommitSnapshot {
    pub attempt: Attempt,
    pub dirty_cmi: HashMap<String, String>,
}

fn score_element(version: ScormVersion, part: &str) -> &'static str {
    match (version, part) {
        (ScormVersion::V12, "raw") => "cmi.core.score.raw",
        (ScormVersion::V12, "max") => "cmi.core.score.max",
        (ScormVersion::V12, "min") => "cmi.core.score.min",
        (ScormVersion::V2004, "raw") => "cmi.score.raw",
        (ScormVersion::V2004, "max") => "cmi.score.max",
        _ => "cmi.score.min",
    }
}

fn parse_decimal(value: &str) -> Result<f64, ErrorCode> {
    value.trim().parse().map_err(|_| ErrorCode::TypeMismatch)
}

fn fmt_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn package(version: &str, mastery: Option<f64>) -> PackageMeta {
        PackageMeta {
            id: Uuid::new_v4(),
            title: "Course".to_string(),
            scorm_version: version.to_string(),
            mastery_score: mastery,
            authoring_tool: None,
            launch_href: "index.html".to_string(),
            created_at: Utc::now(),
        }
    }

    fn fresh_session() -> RteSession {
        let pkg = package("1.2", Some(80.0));
        let attempt = Attempt::new("learner-1", pkg.id, 1);
        RteSession::new(attempt, &pkg, HashMap::new())
    }

    #[test]
    fn initialize_twice_fails() {
        let mut s = fresh_session();
        assert!(s.initialize());
        assert!(!s.initialize());
        assert_eq!(s.last_error(), ErrorCode::GeneralException);
    }

    #[test]
    fn get_before_initialize_is_not_initialized_except_bookmarks() {
        let mut s = fresh_session();
        assert_eq!(s.get_value("cmi.core.lesson_status"), "");
        assert_eq!(s.last_error(), ErrorCode::NotInitialized);
        // bookmark element: empty but no error
        assert_eq!(s.get_value("cmi.core.lesson_location"), "");
        assert_eq!(s.last_error(), ErrorCode::NoError);
    }

    #[test]
    fn bookmark_set_before_initialize_is_visible_after() {
        let mut s = fresh_session();
        assert!(s.set_value("cmi.core.lesson_location", "page-7"));
        assert!(s.set_value("cmi.suspend_data", "state-blob"));
        assert!(!s.set_value("cmi.core.score.raw", "50"));
        assert_eq!(s.last_error(), ErrorCode::NotInitialized);

        assert!(s.initialize());
        assert_eq!(s.get_value("cmi.core.lesson_location"), "page-7");
        assert_eq!(s.get_value("cmi.suspend_data"), "state-blob");
        // resume state present at session start means entry = resume
        assert_eq!(s.get_value("cmi.core.entry"), "resume");
    }

    #[test]
    fn entry_is_ab_initio_without_resume_state() {
        let mut s = fresh_session();
        s.initialize();
        assert_eq!(s.get_value("cmi.core.entry"), "ab-initio");
    }

    #[test]
    fn get_value_returns_protocol_defaults() {
        let mut s = fresh_session();
        s.initialize();
        assert_eq!(s.get_value("cmi.core.lesson_mode"), "normal");
        assert_eq!(s.get_value("cmi.core.credit"), "credit");
        assert_eq!(s.get_value("cmi.core.lesson_status"), "not attempted");
        assert_eq!(s.get_value("cmi.core.total_time"), "0000:00:00");
    }

    #[test]
    fn access_rules_are_enforced() {
        let mut s = fresh_session();
        s.initialize();
        assert!(!s.set_value("cmi.core.student_id", "someone-else"));
        assert_eq!(s.last_error(), ErrorCode::ReadOnlyElement);
        assert_eq!(s.get_value("cmi.core.session_time"), "");
        assert_eq!(s.last_error(), ErrorCode::WriteOnlyElement);
        assert!(!s.set_value("cmi.no.such.element", "x"));
        assert_eq!(s.last_error(), ErrorCode::NotImplemented);
    }

    #[test]
    fn set_value_validates_types() {
        let mut s = fresh_session();
        s.initialize();
        assert!(!s.set_value("cmi.core.score.raw", "ninety"));
        assert_eq!(s.last_error(), ErrorCode::TypeMismatch);
        assert!(!s.set_value("cmi.core.lesson_status", "done"));
        assert_eq!(s.last_error(), ErrorCode::TypeMismatch);
        assert!(s.set_value("cmi.core.score.raw", "85"));
        assert_eq!(s.attempt().score_raw, Some(85.0));
    }

    #[test]
    fn score_raw_outside_declared_bounds_is_rejected() {
        let mut s = fresh_session();
        s.initialize();
        assert!(s.set_value("cmi.core.score.min", "0"));
        assert!(s.set_value("cmi.core.score.max", "50"));
        assert!(!s.set_value("cmi.core.score.raw", "85"));
        assert_eq!(s.last_error(), ErrorCode::TypeMismatch);
        assert!(s.set_value("cmi.core.score.raw", "40"));
    }

    #[test]
    fn session_time_stashes_delta_for_accumulator() {
        let mut s = fresh_session();
        s.initialize();
        assert!(s.set_value("cmi.core.session_time", "00:05:30"));
        assert_eq!(s.take_session_seconds(), Some(330));
        assert_eq!(s.take_session_seconds(), None);
    }

    #[test]
    fn commit_requires_initialized() {
        let mut s = fresh_session();
        assert!(s.commit().is_none());
        assert_eq!(s.last_error(), ErrorCode::NotInitialized);
        s.initialize();
        assert!(s.commit().is_some());
    }

    #[test]
    fn commit_snapshot_carries_only_dirty_elements() {
        let mut s = fresh_session();
        s.initialize();
        s.set_value("cmi.core.score.raw", "85");
        let snap = s.commit().unwrap();
        assert_eq!(snap.dirty_cmi.len(), 1);
        assert_eq!(snap.dirty_cmi.get("cmi.core.score.raw").unwrap(), "85");
        s.mark_persisted();
        let snap = s.commit().unwrap();
        assert!(snap.dirty_cmi.is_empty());
    }

    #[test]
    fn terminate_derives_passed_from_mastery() {
        let mut s = fresh_session();
        s.initialize();
        s.set_value("cmi.core.score.raw", "85");
        let snap = s.terminate(60.0).unwrap();
        assert_eq!(snap.attempt.lesson_status, "passed");
        assert!(snap.attempt.finished_at.is_some());
        assert_eq!(s.state(), SessionState::Terminated);
    }

    #[test]
    fn terminate_derives_failed_below_mastery() {
        let mut s = fresh_session();
        s.initialize();
        s.set_value("cmi.core.score.raw", "42");
        let snap = s.terminate(60.0).unwrap();
        assert_eq!(snap.attempt.lesson_status, "failed");
    }

    #[test]
    fn terminate_without_score_is_incomplete() {
        let mut s = fresh_session();
        s.initialize();
        let snap = s.terminate(60.0).unwrap();
        assert_eq!(snap.attempt.lesson_status, "incomplete");
    }

    #[test]
    fn explicit_status_survives_terminate() {
        let mut s = fresh_session();
        s.initialize();
        s.set_value("cmi.core.lesson_status", "completed");
        let snap = s.terminate(60.0).unwrap();
        assert_eq!(snap.attempt.lesson_status, "completed");
    }

    #[test]
    fn calls_after_terminate_fail() {
        let mut s = fresh_session();
        s.initialize();
        s.terminate(60.0);
        assert!(!s.set_value("cmi.core.lesson_location", "x"));
        assert_eq!(s.last_error(), ErrorCode::NotInitialized);
        assert!(s.commit().is_none());
    }

    #[test]
    fn scorm_2004_vocabulary_and_scaled_rollup() {
        let pkg = package("2004 3rd Edition", None);
        let attempt = Attempt::new("learner-2", pkg.id, 1);
        let mut s = RteSession::new(attempt, &pkg, HashMap::new());
        s.initialize();
        assert_eq!(s.get_value("cmi.completion_status"), "unknown");
        assert!(s.set_value("cmi.score.min", "0"));
        assert!(s.set_value("cmi.score.max", "200"));
        assert!(s.set_value("cmi.score.raw", "150"));
        assert_eq!(s.attempt().score_scaled, Some(0.75));
        assert!(s.set_value("cmi.score.scaled", "0.9"));
        assert_eq!(s.attempt().score_scaled, Some(0.9));
        assert!(!s.set_value("cmi.score.scaled", "2"));
        assert_eq!(s.last_error(), ErrorCode::TypeMismatch);
        assert!(s.set_value("cmi.session_time", "PT10M"));
        assert_eq!(s.take_session_seconds(), Some(600));
    }

    #[test]
    fn error_strings_are_exposed() {
        let s = fresh_session();
        assert_eq!(s.error_string(0), "No error");
        assert_eq!(s.error_string(301), "Not initialized");
        assert_eq!(s.error_string(999), "");
    }

    #[test]
    fn diagnostic_reports_last_call_or_requested_code() {
        let mut s = fresh_session();
        s.initialize();
        assert!(!s.set_value("cmi.core.score.raw", "ninety"));

        // empty argument and the current code both give the captured detail
        assert!(s.diagnostic("").contains("ninety"));
        assert!(s.diagnostic("405").contains("ninety"));
        // other known codes echo their message; unknown codes are empty
        assert_eq!(s.diagnostic("301"), "Not initialized");
        assert_eq!(s.diagnostic("999"), "");
    }
}
