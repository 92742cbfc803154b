use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One learner's run of one content package. Mutated only through the
/// session state machine and the synchronization service.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Attempt {
    pub id: Uuid,
    pub learner_id: String,
    pub package_id: Uuid,
    /// Superseding new-attempt actions increment this; the current attempt
    /// is the highest number per (learner, package).
    pub attempt_number: i32,
    pub lesson_status: String,
    pub completion_status: String,
    pub success_status: String,
    pub entry: String,
    pub exit_mode: String,
    pub score_raw: Option<f64>,
    pub score_max: Option<f64>,
    pub score_min: Option<f64>,
    pub score_scaled: Option<f64>,
    pub lesson_location: String,
    pub suspend_data: String,
    pub session_time: String,
    pub total_time: String,
    /// Integer-seconds mirror of total_time; monotonically non-decreasing.
    pub total_time_seconds: i64,
    /// Set when a session-time delta could only be stashed in the pending
    /// cache; cleared by the replay sweep.
    pub needs_time_replay: bool,
    pub synced_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attempt {
    pub fn new(learner_id: &str, package_id: Uuid, attempt_number: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            learner_id: learner_id.to_string(),
            package_id,
            attempt_number,
            lesson_status: "not attempted".to_string(),
            completion_status: "unknown".to_string(),
            success_status: "unknown".to_string(),
            entry: "ab-initio".to_string(),
            exit_mode: String::new(),
            score_raw: None,
            score_max: None,
            score_min: None,
            score_scaled: None,
            lesson_location: String::new(),
            suspend_data: String::new(),
            session_time: String::new(),
            total_time: "0000:00:00".to_string(),
            total_time_seconds: 0,
            needs_time_replay: false,
            synced_at: None,
            started_at: Some(now),
            finished_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the attempt carries a terminal status in either vocabulary.
    pub fn has_terminal_status(&self) -> bool {
        matches!(self.lesson_status.as_str(), "passed" | "failed" | "completed")
            || self.completion_status == "completed"
            || matches!(self.success_status.as_str(), "passed" | "failed")
    }

    /// Whether the attempt counts as completed for progress purposes.
    pub fn is_completed(&self) -> bool {
        matches!(self.lesson_status.as_str(), "passed" | "completed")
            || self.completion_status == "completed"
            || self.success_status == "passed"
    }
}

/// Cross-subsystem summary of a learner's standing on a package. This core
/// owns only the SCORM-derived fields; writes are always field-scoped.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub learner_id: String,
    pub package_id: Uuid,
    pub last_score: Option<f64>,
    /// Running maximum across attempts.
    pub best_score: Option<f64>,
    pub completed: bool,
    /// "native", "synchronized", or "manual".
    pub completion_method: Option<String>,
    pub total_time_spent_seconds: i64,
    pub updated_at: DateTime<Utc>,
}

/// Field-scoped progress update: only the populated fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressPatch {
    pub last_score: Option<f64>,
    pub best_score: Option<f64>,
    pub completed: Option<bool>,
    pub completion_method: Option<String>,
    pub total_time_spent_seconds: Option<i64>,
}

impl ProgressPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Read-only package metadata supplied by content ingestion.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct PackageMeta {
    pub id: Uuid,
    pub title: String,
    /// "1.2" or "2004".
    pub scorm_version: String,
    pub mastery_score: Option<f64>,
    /// Authoring-tool hint for the format detector.
    pub authoring_tool: Option<String>,
    pub launch_href: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateAttemptReq {
    pub learner_id: String,
    pub package_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RuntimeSetReq {
    pub element: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RuntimeGetReq {
    pub element: String,
}

/// What the delivery layer needs to launch a content package.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BootstrapResp {
    pub attempt_id: Uuid,
    pub scorm_version: String,
    pub entry: String,
    pub lesson_location: String,
    pub suspend_data: String,
    pub lesson_status: String,
    pub completion_status: String,
    pub success_status: String,
    pub score_raw: Option<f64>,
    pub score_max: Option<f64>,
    pub score_min: Option<f64>,
    pub total_time: String,
    pub launch_href: String,
}
