//! Storage interfaces and backends.
//!
//! Everything durable goes through [`RteStore`]. Synchronization runs inside
//! a [`SyncTxn`], which holds a row-level lock on one attempt so concurrent
//! runs on the same attempt serialize and the authoritative check stays
//! race-free.

pub mod memory;
pub mod postgres;

pub use self::memory::MemoryStore;
pub use self::postgres::PostgresStore;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::elements::ScormVersion;
use crate::error::Result;
use crate::models::{Attempt, PackageMeta, ProgressPatch, ProgressRecord};

/// Filter for validator sweeps over the attempt population.
#[derive(Debug, Clone, Default)]
pub struct SweepFilter {
    /// Only attempts updated at or after this time.
    pub since: Option<DateTime<Utc>>,
    /// Only attempts updated before this time.
    pub until: Option<DateTime<Utc>>,
    pub learner_id: Option<String>,
    pub package_id: Option<Uuid>,
}

#[async_trait]
pub trait RteStore: Send + Sync {
    async fn get_package(&self, id: Uuid) -> Result<Option<PackageMeta>>;

    async fn get_attempt(&self, id: Uuid) -> Result<Option<Attempt>>;

    /// Highest-numbered attempt for (learner, package), if any.
    async fn current_attempt(
        &self,
        learner_id: &str,
        package_id: Uuid,
    ) -> Result<Option<Attempt>>;

    async fn insert_attempt(&self, attempt: &Attempt) -> Result<()>;

    /// Full key/value map for GetValue resolution at session start.
    async fn load_cmi(&self, attempt_id: Uuid) -> Result<HashMap<String, String>>;

    /// Persist attempt fields and the dirty cmi entries in one transaction.
    /// Called exactly once per Commit/Terminate.
    async fn persist_session(
        &self,
        attempt: &Attempt,
        dirty: &HashMap<String, String>,
    ) -> Result<()>;

    /// Atomic read-modify-write on the attempt's running total. Returns the
    /// new total in seconds. Two concurrent writers must never
    /// double-accumulate the same delta.
    async fn accumulate_time(
        &self,
        attempt_id: Uuid,
        delta_seconds: i64,
        version: ScormVersion,
    ) -> Result<i64>;

    async fn set_needs_time_replay(&self, attempt_id: Uuid, flag: bool) -> Result<()>;

    async fn get_progress(
        &self,
        learner_id: &str,
        package_id: Uuid,
    ) -> Result<Option<ProgressRecord>>;

    /// Open a row-locked transaction on one attempt for synchronization.
    /// Returns `None` when the attempt does not exist. A concurrent holder
    /// surfaces as [`crate::error::RteError::SyncConflict`].
    async fn begin_sync(&self, attempt_id: Uuid) -> Result<Option<Box<dyn SyncTxn>>>;

    async fn list_attempt_ids(&self, filter: &SweepFilter) -> Result<Vec<Uuid>>;
}

/// One synchronization transaction over a locked attempt row. Nothing is
/// visible to other readers until `commit`.
#[async_trait]
pub trait SyncTxn: Send {
    fn attempt(&self) -> &Attempt;

    fn attempt_mut(&mut self) -> &mut Attempt;

    async fn progress(&mut self) -> Result<Option<ProgressRecord>>;

    /// Stage the (possibly modified) attempt for write.
    async fn save_attempt(&mut self) -> Result<()>;

    /// Field-scoped progress upsert: only populated patch fields are
    /// written, so co-owned fields on the same record survive.
    async fn upsert_progress(&mut self, patch: &ProgressPatch) -> Result<()>;

    /// Sum of total_time_seconds across every attempt of this learner on
    /// this package, for the progress record's time field.
    async fn total_time_all_attempts(&mut self) -> Result<i64>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
