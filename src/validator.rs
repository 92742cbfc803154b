//! Consistency validator: batch sweep that re-drives synchronization over a
//! population of attempts, for backfill and periodic self-healing. Safe to
//! run repeatedly and alongside live traffic; it rides on the same
//! per-attempt locking as the sync service.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::accumulate::TimeAccumulator;
use crate::error::Result;
use crate::store::{RteStore, SweepFilter};
use crate::sync::{SyncOutcome, SyncService};

/// Aggregated sweep results.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationReport {
    pub scanned: usize,
    pub verified: usize,
    pub repaired: usize,
    pub still_inconsistent: usize,
    pub errors: usize,
    /// Stashed time deltas written through at the start of the sweep.
    pub replayed_time_deltas: usize,
    pub cancelled: bool,
}

pub struct ConsistencyValidator {
    store: Arc<dyn RteStore>,
    sync: Arc<SyncService>,
    accumulator: Arc<TimeAccumulator>,
}

impl ConsistencyValidator {
    pub fn new(
        store: Arc<dyn RteStore>,
        sync: Arc<SyncService>,
        accumulator: Arc<TimeAccumulator>,
    ) -> Self {
        Self {
            store,
            sync,
            accumulator,
        }
    }

    /// Sweep every attempt matching the filter. The stop flag is checked
    /// between attempts so large populations can be cancelled cooperatively.
    pub async fn run(&self, filter: &SweepFilter, stop: &AtomicBool) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        report.replayed_time_deltas = self.accumulator.replay_pending().await?;

        let ids = self.store.list_attempt_ids(filter).await?;
        tracing::info!(attempts = ids.len(), "consistency sweep started");

        for id in ids {
            if stop.load(Ordering::Relaxed) {
                report.cancelled = true;
                tracing::info!(scanned = report.scanned, "consistency sweep cancelled");
                break;
            }
            report.scanned += 1;
            match self.sync.synchronize(id).await {
                Ok(SyncOutcome::Verified) => report.verified += 1,
                Ok(SyncOutcome::Repaired) => report.repaired += 1,
                Ok(SyncOutcome::StillInconsistent) => report.still_inconsistent += 1,
                Err(err) => {
                    report.errors += 1;
                    tracing::warn!(attempt_id = %id, error = %err, "sweep sync failed");
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            verified = report.verified,
            repaired = report.repaired,
            still_inconsistent = report.still_inconsistent,
            errors = report.errors,
            "consistency sweep finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulate::PendingDeltas;
    use crate::models::{Attempt, PackageMeta};
    use crate::store::MemoryStore;
    use crate::sync::DEFAULT_MASTERY;
    use chrono::Utc;
    use uuid::Uuid;

    fn fixture(store: &MemoryStore) -> ConsistencyValidator {
        let store: Arc<dyn RteStore> = Arc::new(store.clone());
        let sync = Arc::new(SyncService::new(store.clone(), DEFAULT_MASTERY));
        let accumulator = Arc::new(TimeAccumulator::new(store.clone(), PendingDeltas::new()));
        ConsistencyValidator::new(store, sync, accumulator)
    }

    async fn seed_package(store: &MemoryStore) -> PackageMeta {
        let pkg = PackageMeta {
            id: Uuid::new_v4(),
            title: "Course".to_string(),
            scorm_version: "1.2".to_string(),
            mastery_score: Some(60.0),
            authoring_tool: None,
            launch_href: "index.html".to_string(),
            created_at: Utc::now(),
        };
        store.add_package(pkg.clone()).await;
        pkg
    }

    fn envelope(text: &str) -> String {
        let data: Vec<i64> = text.chars().map(|c| c as i64).collect();
        serde_json::json!({ "version": 1, "data": data }).to_string()
    }

    #[tokio::test]
    async fn classifies_sweep_outcomes() {
        let store = MemoryStore::new();
        let pkg = seed_package(&store).await;

        // verified: native score already propagated by a prior sync
        let mut done = Attempt::new("a", pkg.id, 1);
        done.score_raw = Some(90.0);
        done.lesson_status = "passed".to_string();
        store.insert_attempt(&done).await.unwrap();

        // repaired: unsynced suspend data with a score
        let mut fixable = Attempt::new("b", pkg.id, 1);
        fixable.suspend_data = envelope("quiz_done=true;quiz_score=75");
        store.insert_attempt(&fixable).await.unwrap();

        // still inconsistent: finished but unreadable state
        let mut opaque = Attempt::new("c", pkg.id, 1);
        opaque.suspend_data = "page=9;scroll=40".to_string();
        opaque.finished_at = Some(Utc::now());
        store.insert_attempt(&opaque).await.unwrap();

        let validator = fixture(&store);
        let sync = SyncService::new(Arc::new(store.clone()), DEFAULT_MASTERY);
        sync.synchronize(done.id).await.unwrap();

        let report = validator
            .run(&SweepFilter::default(), &AtomicBool::new(false))
            .await
            .unwrap();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.verified, 1);
        assert_eq!(report.repaired, 1);
        assert_eq!(report.still_inconsistent, 1);
        assert_eq!(report.errors, 0);
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn repeat_sweeps_converge_to_verified() {
        let store = MemoryStore::new();
        let pkg = seed_package(&store).await;
        let mut attempt = Attempt::new("a", pkg.id, 1);
        attempt.suspend_data = envelope("quiz_done=true;quiz_score=75");
        store.insert_attempt(&attempt).await.unwrap();

        let validator = fixture(&store);
        let first = validator
            .run(&SweepFilter::default(), &AtomicBool::new(false))
            .await
            .unwrap();
        assert_eq!(first.repaired, 1);
        let second = validator
            .run(&SweepFilter::default(), &AtomicBool::new(false))
            .await
            .unwrap();
        assert_eq!(second.repaired, 0);
        assert_eq!(second.verified, 1);
    }

    #[tokio::test]
    async fn stop_flag_cancels_between_attempts() {
        let store = MemoryStore::new();
        let pkg = seed_package(&store).await;
        for learner in ["a", "b", "c"] {
            store
                .insert_attempt(&Attempt::new(learner, pkg.id, 1))
                .await
                .unwrap();
        }
        let validator = fixture(&store);
        let stop = AtomicBool::new(true);
        let report = validator.run(&SweepFilter::default(), &stop).await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.scanned, 0);
    }

    #[tokio::test]
    async fn filter_narrows_the_population() {
        let store = MemoryStore::new();
        let pkg = seed_package(&store).await;
        store.insert_attempt(&Attempt::new("a", pkg.id, 1)).await.unwrap();
        store.insert_attempt(&Attempt::new("b", pkg.id, 1)).await.unwrap();

        let validator = fixture(&store);
        let filter = SweepFilter {
            learner_id: Some("a".to_string()),
            ..Default::default()
        };
        let report = validator.run(&filter, &AtomicBool::new(false)).await.unwrap();
        assert_eq!(report.scanned, 1);
    }
}
