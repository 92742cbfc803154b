//! Score synchronization service.
//!
//! The single place where "is this attempt complete, and what is the
//! authoritative score" gets decided. Invoked as a post-persist hook after
//! every Commit/Terminate and re-driven by the consistency validator. All
//! steps for one attempt run inside one row-locked store transaction, so
//! concurrent runs on the same attempt serialize and the whole reconciliation
//! is idempotent: re-running it on an unchanged attempt writes nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::detect;
use crate::elements::ScormVersion;
use crate::error::{Result, RteError};
use crate::extract::{self, Extraction};
use crate::models::{Attempt, PackageMeta, ProgressPatch, ProgressRecord};
use crate::store::{RteStore, SyncTxn};
use crate::suspend;

/// Suspend blobs shorter than this carry no extractable state.
const MIN_SUSPEND_LEN: usize = 8;

const MAX_CONFLICT_RETRIES: u32 = 5;
const CONFLICT_BACKOFF_MS: u64 = 25;

/// Fallback mastery threshold when neither the package nor the deployment
/// configures one.
pub const DEFAULT_MASTERY: f64 = 80.0;

/// What a synchronization pass did for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Attempt and progress record already agreed; nothing written.
    Verified,
    /// Something was missing and has been repaired.
    Repaired,
    /// The attempt shows activity but no completion evidence could be
    /// found; left untouched for a later pass.
    StillInconsistent,
}

pub struct SyncService {
    store: Arc<dyn RteStore>,
    default_mastery: f64,
}

impl SyncService {
    pub fn new(store: Arc<dyn RteStore>, default_mastery: f64) -> Self {
        Self {
            store,
            default_mastery,
        }
    }

    /// Reconcile one attempt with its progress record. Retries after lock
    /// conflicts; never resolves a race by last-write-wins.
    pub async fn synchronize(&self, attempt_id: Uuid) -> Result<SyncOutcome> {
        let mut tries = 0;
        loop {
            match self.synchronize_once(attempt_id).await {
                Err(RteError::SyncConflict(id)) if tries < MAX_CONFLICT_RETRIES => {
                    tries += 1;
                    tracing::debug!(attempt_id = %id, tries, "sync lock busy; retrying");
                    tokio::time::sleep(Duration::from_millis(CONFLICT_BACKOFF_MS * tries as u64))
                        .await;
                }
                other => return other,
            }
        }
    }

    async fn synchronize_once(&self, attempt_id: Uuid) -> Result<SyncOutcome> {
        let Some(mut txn) = self.store.begin_sync(attempt_id).await? else {
            return Err(RteError::AttemptNotFound(attempt_id));
        };

        let package = self
            .store
            .get_package(txn.attempt().package_id)
            .await?
            .ok_or(RteError::PackageNotFound(txn.attempt().package_id))?;

        // Step 1: a native score with a terminal status is authoritative.
        if txn.attempt().score_raw.is_some() && txn.attempt().has_terminal_status() {
            let outcome = self.propagate(&mut txn, "native").await?;
            txn.commit().await?;
            return Ok(outcome);
        }

        // Step 2: interrogate the suspend blob.
        let suspend = txn.attempt().suspend_data.clone();
        if suspend.trim().len() < MIN_SUSPEND_LEN {
            txn.commit().await?;
            return Ok(SyncOutcome::Verified);
        }

        let decoded = suspend::decode(&suspend);
        let profile = detect::detect(&decoded, package.authoring_tool.as_deref());
        match extract::extract(&decoded, profile) {
            Extraction::NoEvidence => {
                tracing::debug!(
                    %attempt_id,
                    profile = profile.as_str(),
                    "no completion evidence in suspend data"
                );
                let finished = txn.attempt().finished_at.is_some();
                txn.commit().await?;
                // A finished attempt with opaque state we could not read is
                // worth revisiting; an in-flight one is simply not done yet.
                Ok(if finished {
                    SyncOutcome::StillInconsistent
                } else {
                    SyncOutcome::Verified
                })
            }
            Extraction::Completed { score } => {
                if let Some(score) = score {
                    let mastery = package
                        .mastery_score
                        .unwrap_or(self.default_mastery);
                    let passed = score >= mastery;
                    apply_extracted_score(txn.attempt_mut(), &package, score, passed);
                    tracing::info!(
                        %attempt_id,
                        score,
                        passed,
                        profile = profile.as_str(),
                        "adopted score extracted from suspend data"
                    );
                } else {
                    apply_extracted_completion(txn.attempt_mut(), &package);
                    tracing::info!(
                        %attempt_id,
                        profile = profile.as_str(),
                        "suspend data shows completion without a score"
                    );
                }
                txn.attempt_mut().synced_at = Some(Utc::now());
                txn.save_attempt().await?;
                self.propagate(&mut txn, "synchronized").await?;
                txn.commit().await?;
                Ok(SyncOutcome::Repaired)
            }
        }
    }

    /// Step 3: field-scoped propagation into the progress record. Completed
    /// only ever transitions false -> true from this path; a record completed
    /// manually elsewhere is never downgraded, and best_score never drops.
    async fn propagate(
        &self,
        txn: &mut Box<dyn SyncTxn>,
        method: &str,
    ) -> Result<SyncOutcome> {
        let existing = txn.progress().await?;
        let total_time = txn.total_time_all_attempts().await?;
        let attempt = txn.attempt().clone();

        let patch = build_patch(&attempt, existing.as_ref(), method, total_time);
        if patch.is_empty() {
            return Ok(SyncOutcome::Verified);
        }
        txn.upsert_progress(&patch).await?;
        Ok(SyncOutcome::Repaired)
    }
}

fn build_patch(
    attempt: &Attempt,
    existing: Option<&ProgressRecord>,
    method: &str,
    total_time: i64,
) -> ProgressPatch {
    let mut patch = ProgressPatch::default();

    if let Some(score) = attempt.score_raw {
        if existing.and_then(|p| p.last_score) != Some(score) {
            patch.last_score = Some(score);
        }
        let best = existing.and_then(|p| p.best_score).unwrap_or(f64::MIN);
        if score > best {
            patch.best_score = Some(score);
        }
    }

    if attempt.is_completed() {
        let already = existing.map(|p| p.completed).unwrap_or(false);
        if !already {
            patch.completed = Some(true);
            patch.completion_method = Some(method.to_string());
        }
    }

    let existing_time = existing.map(|p| p.total_time_spent_seconds).unwrap_or(0);
    if total_time != existing_time {
        patch.total_time_spent_seconds = Some(total_time);
    }

    patch
}

/// Set an extracted score as authoritative on the attempt, choosing the
/// version-appropriate status fields.
fn apply_extracted_score(attempt: &mut Attempt, package: &PackageMeta, score: f64, passed: bool) {
    attempt.score_raw = Some(score);
    if attempt.score_max.is_none() {
        attempt.score_max = Some(100.0);
    }
    if attempt.score_min.is_none() {
        attempt.score_min = Some(0.0);
    }
    match ScormVersion::from_str(&package.scorm_version) {
        ScormVersion::V12 => {
            attempt.lesson_status = if passed { "passed" } else { "failed" }.to_string();
        }
        ScormVersion::V2004 => {
            attempt.completion_status = "completed".to_string();
            attempt.success_status = if passed { "passed" } else { "failed" }.to_string();
            attempt.score_scaled = Some((score / 100.0).clamp(-1.0, 1.0));
        }
    }
}

fn apply_extracted_completion(attempt: &mut Attempt, package: &PackageMeta) {
    match ScormVersion::from_str(&package.scorm_version) {
        ScormVersion::V12 => attempt.lesson_status = "completed".to_string(),
        ScormVersion::V2004 => attempt.completion_status = "completed".to_string(),
    }
}
