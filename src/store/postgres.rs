//! PostgreSQL-backed store. Row-level locking via `SELECT .. FOR UPDATE`;
//! a `NOWAIT` lock failure maps to `SyncConflict` so callers retry after
//! the holder releases instead of silently racing.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::duration;
use crate::elements::ScormVersion;
use crate::error::{Result, RteError};
use crate::models::{Attempt, PackageMeta, ProgressPatch, ProgressRecord};
use crate::store::{RteStore, SweepFilter, SyncTxn};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Postgres "lock not available", raised by FOR UPDATE NOWAIT.
const LOCK_NOT_AVAILABLE: &str = "55P03";

fn map_lock_error(err: sqlx::Error, attempt_id: Uuid) -> RteError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(LOCK_NOT_AVAILABLE) {
            return RteError::SyncConflict(attempt_id);
        }
    }
    err.into()
}

async fn update_attempt_row(
    tx: &mut Transaction<'static, Postgres>,
    attempt: &Attempt,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE attempts SET
            lesson_status = $2, completion_status = $3, success_status = $4,
            entry = $5, exit_mode = $6,
            score_raw = $7, score_max = $8, score_min = $9, score_scaled = $10,
            lesson_location = $11, suspend_data = $12,
            session_time = $13, total_time = $14, total_time_seconds = $15,
            needs_time_replay = $16, synced_at = $17,
            started_at = $18, finished_at = $19, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(attempt.id)
    .bind(&attempt.lesson_status)
    .bind(&attempt.completion_status)
    .bind(&attempt.success_status)
    .bind(&attempt.entry)
    .bind(&attempt.exit_mode)
    .bind(attempt.score_raw)
    .bind(attempt.score_max)
    .bind(attempt.score_min)
    .bind(attempt.score_scaled)
    .bind(&attempt.lesson_location)
    .bind(&attempt.suspend_data)
    .bind(&attempt.session_time)
    .bind(&attempt.total_time)
    .bind(attempt.total_time_seconds)
    .bind(attempt.needs_time_replay)
    .bind(attempt.synced_at)
    .bind(attempt.started_at)
    .bind(attempt.finished_at)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RteError::AttemptNotFound(attempt.id));
    }
    Ok(())
}

#[async_trait]
impl RteStore for PostgresStore {
    async fn get_package(&self, id: Uuid) -> Result<Option<PackageMeta>> {
        let pkg = sqlx::query_as::<_, PackageMeta>("SELECT * FROM packages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(pkg)
    }

    async fn get_attempt(&self, id: Uuid) -> Result<Option<Attempt>> {
        let attempt = sqlx::query_as::<_, Attempt>("SELECT * FROM attempts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attempt)
    }

    async fn current_attempt(
        &self,
        learner_id: &str,
        package_id: Uuid,
    ) -> Result<Option<Attempt>> {
        let attempt = sqlx::query_as::<_, Attempt>(
            r#"
            SELECT * FROM attempts
            WHERE learner_id = $1 AND package_id = $2
            ORDER BY attempt_number DESC
            LIMIT 1
            "#,
        )
        .bind(learner_id)
        .bind(package_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn insert_attempt(&self, attempt: &Attempt) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO attempts (
                id, learner_id, package_id, attempt_number,
                lesson_status, completion_status, success_status,
                entry, exit_mode,
                score_raw, score_max, score_min, score_scaled,
                lesson_location, suspend_data,
                session_time, total_time, total_time_seconds,
                needs_time_replay, synced_at, started_at, finished_at,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24
            )
            "#,
        )
        .bind(attempt.id)
        .bind(&attempt.learner_id)
        .bind(attempt.package_id)
        .bind(attempt.attempt_number)
        .bind(&attempt.lesson_status)
        .bind(&attempt.completion_status)
        .bind(&attempt.success_status)
        .bind(&attempt.entry)
        .bind(&attempt.exit_mode)
        .bind(attempt.score_raw)
        .bind(attempt.score_max)
        .bind(attempt.score_min)
        .bind(attempt.score_scaled)
        .bind(&attempt.lesson_location)
        .bind(&attempt.suspend_data)
        .bind(&attempt.session_time)
        .bind(&attempt.total_time)
        .bind(attempt.total_time_seconds)
        .bind(attempt.needs_time_replay)
        .bind(attempt.synced_at)
        .bind(attempt.started_at)
        .bind(attempt.finished_at)
        .bind(attempt.created_at)
        .bind(attempt.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_cmi(&self, attempt_id: Uuid) -> Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT element, value FROM cmi_values WHERE attempt_id = $1")
            .bind(attempt_id)
            .fetch_all(&self.pool)
            .await?;
        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            let element: String = row.try_get("element")?;
            let value: Option<String> = row.try_get("value")?;
            map.insert(element, value.unwrap_or_default());
        }
        Ok(map)
    }

    async fn persist_session(
        &self,
        attempt: &Attempt,
        dirty: &HashMap<String, String>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        update_attempt_row(&mut tx, attempt).await?;
        for (element, value) in dirty {
            sqlx::query(
                r#"
                INSERT INTO cmi_values (attempt_id, element, value)
                VALUES ($1, $2, $3)
                ON CONFLICT (attempt_id, element)
                DO UPDATE SET value = EXCLUDED.value, updated_at = now()
                "#,
            )
            .bind(attempt.id)
            .bind(element)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn accumulate_time(
        &self,
        attempt_id: Uuid,
        delta_seconds: i64,
        version: ScormVersion,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT total_time_seconds FROM attempts WHERE id = $1 FOR UPDATE")
            .bind(attempt_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RteError::AttemptNotFound(attempt_id))?;
        let current: i64 = row.try_get("total_time_seconds")?;
        let total = current + delta_seconds.max(0);
        let formatted = match version {
            ScormVersion::V12 => duration::format_timespan(total),
            ScormVersion::V2004 => duration::format_iso8601(total),
        };
        sqlx::query(
            r#"
            UPDATE attempts
            SET total_time_seconds = $2, total_time = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(attempt_id)
        .bind(total)
        .bind(&formatted)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(total)
    }

    async fn set_needs_time_replay(&self, attempt_id: Uuid, flag: bool) -> Result<()> {
        let result =
            sqlx::query("UPDATE attempts SET needs_time_replay = $2, updated_at = now() WHERE id = $1")
                .bind(attempt_id)
                .bind(flag)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RteError::AttemptNotFound(attempt_id));
        }
        Ok(())
    }

    async fn get_progress(
        &self,
        learner_id: &str,
        package_id: Uuid,
    ) -> Result<Option<ProgressRecord>> {
        let rec = sqlx::query_as::<_, ProgressRecord>(
            "SELECT * FROM progress_records WHERE learner_id = $1 AND package_id = $2",
        )
        .bind(learner_id)
        .bind(package_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rec)
    }

    async fn begin_sync(&self, attempt_id: Uuid) -> Result<Option<Box<dyn SyncTxn>>> {
        let mut tx = self.pool.begin().await?;
        let attempt = sqlx::query_as::<_, Attempt>(
            "SELECT * FROM attempts WHERE id = $1 FOR UPDATE NOWAIT",
        )
        .bind(attempt_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_lock_error(e, attempt_id))?;

        match attempt {
            Some(attempt) => Ok(Some(Box::new(PgSyncTxn { tx, attempt }))),
            None => Ok(None),
        }
    }

    async fn list_attempt_ids(&self, filter: &SweepFilter) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM attempts
            WHERE ($1::timestamptz IS NULL OR updated_at >= $1)
              AND ($2::timestamptz IS NULL OR updated_at < $2)
              AND ($3::text IS NULL OR learner_id = $3)
              AND ($4::uuid IS NULL OR package_id = $4)
            ORDER BY updated_at
            "#,
        )
        .bind(filter.since)
        .bind(filter.until)
        .bind(filter.learner_id.as_deref())
        .bind(filter.package_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| row.try_get("id").map_err(Into::into))
            .collect()
    }
}

struct PgSyncTxn {
    tx: Transaction<'static, Postgres>,
    attempt: Attempt,
}

#[async_trait]
impl SyncTxn for PgSyncTxn {
    fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    fn attempt_mut(&mut self) -> &mut Attempt {
        &mut self.attempt
    }

    async fn progress(&mut self) -> Result<Option<ProgressRecord>> {
        let rec = sqlx::query_as::<_, ProgressRecord>(
            "SELECT * FROM progress_records WHERE learner_id = $1 AND package_id = $2 FOR UPDATE",
        )
        .bind(&self.attempt.learner_id)
        .bind(self.attempt.package_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(rec)
    }

    async fn save_attempt(&mut self) -> Result<()> {
        let attempt = self.attempt.clone();
        update_attempt_row(&mut self.tx, &attempt).await
    }

    async fn upsert_progress(&mut self, patch: &ProgressPatch) -> Result<()> {
        // COALESCE keeps unset patch fields at their existing values so the
        // record's co-owned fields are never clobbered.
        sqlx::query(
            r#"
            INSERT INTO progress_records (
                learner_id, package_id, last_score, best_score, completed,
                completion_method, total_time_spent_seconds, updated_at
            ) VALUES ($1, $2, $3, $4, COALESCE($5, false), $6, COALESCE($7, 0), now())
            ON CONFLICT (learner_id, package_id) DO UPDATE SET
                last_score = COALESCE($3, progress_records.last_score),
                best_score = COALESCE($4, progress_records.best_score),
                completed = COALESCE($5, progress_records.completed),
                completion_method = COALESCE($6, progress_records.completion_method),
                total_time_spent_seconds = COALESCE($7, progress_records.total_time_spent_seconds),
                updated_at = now()
            "#,
        )
        .bind(&self.attempt.learner_id)
        .bind(self.attempt.package_id)
        .bind(patch.last_score)
        .bind(patch.best_score)
        .bind(patch.completed)
        .bind(patch.completion_method.as_deref())
        .bind(patch.total_time_spent_seconds)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn total_time_all_attempts(&mut self) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(total_time_seconds), 0)::bigint AS total
            FROM attempts WHERE learner_id = $1 AND package_id = $2
            "#,
        )
        .bind(&self.attempt.learner_id)
        .bind(self.attempt.package_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.try_get("total")?)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
