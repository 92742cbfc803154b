//! In-memory store. Used by the test suites and for embedding the engine
//! without a database. Per-attempt async mutexes stand in for row locks;
//! `try_lock` failure maps to `SyncConflict` exactly like the Postgres
//! backend's `FOR UPDATE NOWAIT`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::duration;
use crate::elements::ScormVersion;
use crate::error::{Result, RteError};
use crate::models::{Attempt, PackageMeta, ProgressPatch, ProgressRecord};
use crate::store::{RteStore, SweepFilter, SyncTxn};

#[derive(Default)]
struct Inner {
    packages: HashMap<Uuid, PackageMeta>,
    attempts: HashMap<Uuid, Attempt>,
    cmi: HashMap<Uuid, HashMap<String, String>>,
    progress: HashMap<(String, Uuid), ProgressRecord>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    attempt_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
    progress_writes: Arc<AtomicU64>,
    fail_time_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_package(&self, package: PackageMeta) {
        self.inner.lock().await.packages.insert(package.id, package);
    }

    /// Seed a progress record directly, e.g. one completed manually by
    /// another subsystem.
    pub async fn seed_progress(&self, record: ProgressRecord) {
        self.inner
            .lock()
            .await
            .progress
            .insert((record.learner_id.clone(), record.package_id), record);
    }

    /// Number of progress upserts performed, for idempotency assertions.
    pub fn progress_write_count(&self) -> u64 {
        self.progress_writes.load(Ordering::SeqCst)
    }

    /// Make `accumulate_time` fail, to exercise the degraded-durability path.
    pub fn set_fail_time_writes(&self, fail: bool) {
        self.fail_time_writes.store(fail, Ordering::SeqCst);
    }

    async fn lock_for(&self, attempt_id: Uuid) -> Arc<Mutex<()>> {
        self.attempt_locks
            .lock()
            .await
            .entry(attempt_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn apply_patch(record: &mut ProgressRecord, patch: &ProgressPatch) {
    if let Some(v) = patch.last_score {
        record.last_score = Some(v);
    }
    if let Some(v) = patch.best_score {
        record.best_score = Some(v);
    }
    if let Some(v) = patch.completed {
        record.completed = v;
    }
    if let Some(v) = &patch.completion_method {
        record.completion_method = Some(v.clone());
    }
    if let Some(v) = patch.total_time_spent_seconds {
        record.total_time_spent_seconds = v;
    }
    record.updated_at = Utc::now();
}

#[async_trait]
impl RteStore for MemoryStore {
    async fn get_package(&self, id: Uuid) -> Result<Option<PackageMeta>> {
        Ok(self.inner.lock().await.packages.get(&id).cloned())
    }

    async fn get_attempt(&self, id: Uuid) -> Result<Option<Attempt>> {
        Ok(self.inner.lock().await.attempts.get(&id).cloned())
    }

    async fn current_attempt(
        &self,
        learner_id: &str,
        package_id: Uuid,
    ) -> Result<Option<Attempt>> {
        Ok(self
            .inner
            .lock()
            .await
            .attempts
            .values()
            .filter(|a| a.learner_id == learner_id && a.package_id == package_id)
            .max_by_key(|a| a.attempt_number)
            .cloned())
    }

    async fn insert_attempt(&self, attempt: &Attempt) -> Result<()> {
        self.inner
            .lock()
            .await
            .attempts
            .insert(attempt.id, attempt.clone());
        Ok(())
    }

    async fn load_cmi(&self, attempt_id: Uuid) -> Result<HashMap<String, String>> {
        Ok(self
            .inner
            .lock()
            .await
            .cmi
            .get(&attempt_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn persist_session(
        &self,
        attempt: &Attempt,
        dirty: &HashMap<String, String>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.attempts.contains_key(&attempt.id) {
            return Err(RteError::AttemptNotFound(attempt.id));
        }
        let mut stored = attempt.clone();
        stored.updated_at = Utc::now();
        inner.attempts.insert(attempt.id, stored);
        let map = inner.cmi.entry(attempt.id).or_default();
        for (element, value) in dirty {
            map.insert(element.clone(), value.clone());
        }
        Ok(())
    }

    async fn accumulate_time(
        &self,
        attempt_id: Uuid,
        delta_seconds: i64,
        version: ScormVersion,
    ) -> Result<i64> {
        if self.fail_time_writes.load(Ordering::SeqCst) {
            return Err(RteError::database("accumulate_time", "injected failure"));
        }
        let lock = self.lock_for(attempt_id).await;
        let _guard = lock.lock().await;
        let mut inner = self.inner.lock().await;
        let attempt = inner
            .attempts
            .get_mut(&attempt_id)
            .ok_or(RteError::AttemptNotFound(attempt_id))?;
        attempt.total_time_seconds += delta_seconds.max(0);
        attempt.total_time = match version {
            ScormVersion::V12 => duration::format_timespan(attempt.total_time_seconds),
            ScormVersion::V2004 => duration::format_iso8601(attempt.total_time_seconds),
        };
        attempt.updated_at = Utc::now();
        Ok(attempt.total_time_seconds)
    }

    async fn set_needs_time_replay(&self, attempt_id: Uuid, flag: bool) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let attempt = inner
            .attempts
            .get_mut(&attempt_id)
            .ok_or(RteError::AttemptNotFound(attempt_id))?;
        attempt.needs_time_replay = flag;
        Ok(())
    }

    async fn get_progress(
        &self,
        learner_id: &str,
        package_id: Uuid,
    ) -> Result<Option<ProgressRecord>> {
        Ok(self
            .inner
            .lock()
            .await
            .progress
            .get(&(learner_id.to_string(), package_id))
            .cloned())
    }

    async fn begin_sync(&self, attempt_id: Uuid) -> Result<Option<Box<dyn SyncTxn>>> {
        let lock = self.lock_for(attempt_id).await;
        let guard = lock
            .try_lock_owned()
            .map_err(|_| RteError::SyncConflict(attempt_id))?;
        let attempt = match self.inner.lock().await.attempts.get(&attempt_id) {
            Some(a) => a.clone(),
            None => return Ok(None),
        };
        Ok(Some(Box::new(MemSyncTxn {
            _guard: guard,
            inner: self.inner.clone(),
            progress_writes: self.progress_writes.clone(),
            attempt,
            attempt_dirty: false,
            patches: Vec::new(),
        })))
    }

    async fn list_attempt_ids(&self, filter: &SweepFilter) -> Result<Vec<Uuid>> {
        let inner = self.inner.lock().await;
        let mut matched: Vec<&Attempt> = inner
            .attempts
            .values()
            .filter(|a| {
                filter.since.map_or(true, |t| a.updated_at >= t)
                    && filter.until.map_or(true, |t| a.updated_at < t)
                    && filter.learner_id.as_deref().map_or(true, |l| a.learner_id == l)
                    && filter.package_id.map_or(true, |p| a.package_id == p)
            })
            .collect();
        matched.sort_by_key(|a| a.updated_at);
        Ok(matched.iter().map(|a| a.id).collect())
    }
}

struct MemSyncTxn {
    _guard: OwnedMutexGuard<()>,
    inner: Arc<Mutex<Inner>>,
    progress_writes: Arc<AtomicU64>,
    attempt: Attempt,
    attempt_dirty: bool,
    patches: Vec<ProgressPatch>,
}

#[async_trait]
impl SyncTxn for MemSyncTxn {
    fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    fn attempt_mut(&mut self) -> &mut Attempt {
        &mut self.attempt
    }

    async fn progress(&mut self) -> Result<Option<ProgressRecord>> {
        Ok(self
            .inner
            .lock()
            .await
            .progress
            .get(&(self.attempt.learner_id.clone(), self.attempt.package_id))
            .cloned())
    }

    async fn save_attempt(&mut self) -> Result<()> {
        self.attempt_dirty = true;
        Ok(())
    }

    async fn upsert_progress(&mut self, patch: &ProgressPatch) -> Result<()> {
        self.patches.push(patch.clone());
        Ok(())
    }

    async fn total_time_all_attempts(&mut self) -> Result<i64> {
        Ok(self
            .inner
            .lock()
            .await
            .attempts
            .values()
            .filter(|a| {
                a.learner_id == self.attempt.learner_id
                    && a.package_id == self.attempt.package_id
            })
            .map(|a| a.total_time_seconds)
            .sum())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if self.attempt_dirty {
            let mut stored = self.attempt.clone();
            stored.updated_at = Utc::now();
            inner.attempts.insert(stored.id, stored);
        }
        for patch in &self.patches {
            let key = (self.attempt.learner_id.clone(), self.attempt.package_id);
            let record = inner.progress.entry(key).or_insert_with(|| ProgressRecord {
                learner_id: self.attempt.learner_id.clone(),
                package_id: self.attempt.package_id,
                last_score: None,
                best_score: None,
                completed: false,
                completion_method: None,
                total_time_spent_seconds: 0,
                updated_at: Utc::now(),
            });
            apply_patch(record, patch);
            self.progress_writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
