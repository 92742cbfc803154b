use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::accumulate::{Durability, PendingDeltas, TimeAccumulator};
use crate::models::*;
use crate::session::RteSession;
use crate::store::{RteStore, SweepFilter};
use crate::sync::SyncService;
use crate::validator::{ConsistencyValidator, ValidationReport};

/// Shared application state: the store plus the live protocol sessions.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppInner>,
}

struct AppInner {
    store: Arc<dyn RteStore>,
    sessions: Mutex<HashMap<Uuid, Arc<Mutex<RteSession>>>>,
    accumulator: Arc<TimeAccumulator>,
    sync: Arc<SyncService>,
    validator: ConsistencyValidator,
    default_mastery: f64,
}

impl AppState {
    pub fn new(store: Arc<dyn RteStore>, default_mastery: f64) -> Self {
        let accumulator = Arc::new(TimeAccumulator::new(store.clone(), PendingDeltas::new()));
        let sync = Arc::new(SyncService::new(store.clone(), default_mastery));
        let validator =
            ConsistencyValidator::new(store.clone(), sync.clone(), accumulator.clone());
        Self {
            inner: Arc::new(AppInner {
                store,
                sessions: Mutex::new(HashMap::new()),
                accumulator,
                sync,
                validator,
                default_mastery,
            }),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // attempt lifecycle + delivery-layer bootstrap
        .route("/api/attempts", post(create_attempt))
        .route("/api/attempts/:attempt_id/new", post(new_attempt))
        .route("/api/attempts/:attempt_id/bootstrap", get(bootstrap))
        // consistency sweep
        .route("/api/validate", post(run_validation))
        // runtime protocol surface
        .route("/runtime/:attempt_id/initialize", post(rt_initialize))
        .route("/runtime/:attempt_id/get", post(rt_get))
        .route("/runtime/:attempt_id/set", post(rt_set))
        .route("/runtime/:attempt_id/commit", post(rt_commit))
        .route("/runtime/:attempt_id/terminate", post(rt_terminate))
        .route("/runtime/:attempt_id/last_error", post(rt_last_error))
        .with_state(state)
}

// --- attempt management ---

async fn create_attempt(
    State(state): State<AppState>,
    Json(req): Json<CreateAttemptReq>,
) -> Result<Json<Attempt>, (StatusCode, String)> {
    let inner = &state.inner;
    if inner.store.get_package(req.package_id).await.map_err(e500)?.is_none() {
        return Err(e400("package not found"));
    }
    if let Some(existing) = inner
        .store
        .current_attempt(&req.learner_id, req.package_id)
        .await
        .map_err(e500)?
    {
        return Ok(Json(existing));
    }
    let attempt = Attempt::new(&req.learner_id, req.package_id, 1);
    inner.store.insert_attempt(&attempt).await.map_err(e500)?;
    Ok(Json(attempt))
}

/// Supersede the current attempt: the old one is kept, a fresh one with the
/// next attempt number becomes current.
async fn new_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<Attempt>, (StatusCode, String)> {
    let inner = &state.inner;
    let old = inner
        .store
        .get_attempt(attempt_id)
        .await
        .map_err(e500)?
        .ok_or(e400("attempt not found"))?;
    let fresh = Attempt::new(&old.learner_id, old.package_id, old.attempt_number + 1);
    inner.store.insert_attempt(&fresh).await.map_err(e500)?;
    Ok(Json(fresh))
}

async fn bootstrap(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<BootstrapResp>, (StatusCode, String)> {
    let inner = &state.inner;
    let attempt = inner
        .store
        .get_attempt(attempt_id)
        .await
        .map_err(e500)?
        .ok_or(e400("attempt not found"))?;
    let package = inner
        .store
        .get_package(attempt.package_id)
        .await
        .map_err(e500)?
        .ok_or(e400("package not found"))?;

    let resuming = !attempt.lesson_location.is_empty() || !attempt.suspend_data.is_empty();
    Ok(Json(BootstrapResp {
        attempt_id: attempt.id,
        scorm_version: package.scorm_version,
        entry: if resuming { "resume" } else { "ab-initio" }.to_string(),
        lesson_location: attempt.lesson_location,
        suspend_data: attempt.suspend_data,
        lesson_status: attempt.lesson_status,
        completion_status: attempt.completion_status,
        success_status: attempt.success_status,
        score_raw: attempt.score_raw,
        score_max: attempt.score_max,
        score_min: attempt.score_min,
        total_time: attempt.total_time,
        launch_href: package.launch_href,
    }))
}

#[derive(Deserialize)]
struct ValidateReq {
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    learner_id: Option<String>,
    package_id: Option<Uuid>,
}

async fn run_validation(
    State(state): State<AppState>,
    Json(req): Json<ValidateReq>,
) -> Result<Json<ValidationReport>, (StatusCode, String)> {
    let filter = SweepFilter {
        since: req.since,
        until: req.until,
        learner_id: req.learner_id,
        package_id: req.package_id,
    };
    // HTTP-triggered sweeps run to completion; embedders pass their own flag.
    let stop = AtomicBool::new(false);
    let report = state
        .inner
        .validator
        .run(&filter, &stop)
        .await
        .map_err(e500)?;
    Ok(Json(report))
}

// --- runtime protocol endpoints ---

/// Get the live session for an attempt, creating an uninitialized one from
/// stored state on first touch. Bookmark writes are legal before Initialize,
/// so session creation cannot wait for it.
async fn ensure_session(
    state: &AppState,
    attempt_id: Uuid,
) -> Result<Arc<Mutex<RteSession>>, (StatusCode, String)> {
    let inner = &state.inner;
    if let Some(session) = inner.sessions.lock().await.get(&attempt_id) {
        return Ok(session.clone());
    }
    // Load outside the map lock so one slow fetch cannot stall other
    // attempts' first requests. Racing first touches both load; the entry
    // API keeps whichever session landed first.
    let attempt = inner
        .store
        .get_attempt(attempt_id)
        .await
        .map_err(e500)?
        .ok_or(e400("attempt not found"))?;
    let package = inner
        .store
        .get_package(attempt.package_id)
        .await
        .map_err(e500)?
        .ok_or(e400("package not found"))?;
    let cmi = inner.store.load_cmi(attempt_id).await.map_err(e500)?;
    let mut sessions = inner.sessions.lock().await;
    let session = sessions
        .entry(attempt_id)
        .or_insert_with(|| Arc::new(Mutex::new(RteSession::new(attempt, &package, cmi))))
        .clone();
    Ok(session)
}

fn api_result(result: impl Into<String>, session: &RteSession) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "result": result.into(),
        "error_code": session.last_error().code().to_string(),
    }))
}

fn api_bool(ok: bool, session: &RteSession) -> Json<serde_json::Value> {
    api_result(if ok { "true" } else { "false" }, session)
}

async fn rt_initialize(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let session = ensure_session(&state, attempt_id).await?;
    let mut session = session.lock().await;
    let ok = session.initialize();
    Ok(api_bool(ok, &session))
}

async fn rt_get(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
    Json(req): Json<RuntimeGetReq>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let session = ensure_session(&state, attempt_id).await?;
    let mut session = session.lock().await;
    let value = session.get_value(&req.element);
    Ok(api_result(value, &session))
}

async fn rt_set(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
    Json(req): Json<RuntimeSetReq>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let session = ensure_session(&state, attempt_id).await?;
    let mut session = session.lock().await;
    let ok = session.set_value(&req.element, &req.value);
    if ok {
        if let Some(seconds) = session.take_session_seconds() {
            let version = session.version();
            match state
                .inner
                .accumulator
                .add_session_seconds(attempt_id, seconds, version)
                .await
            {
                Ok(Durability::Durable(total)) => session.apply_accumulated_total(total),
                Ok(Durability::Degraded) => {}
                Err(err) => {
                    tracing::error!(
                        %attempt_id,
                        element = %req.element,
                        value = %req.value,
                        error = %err,
                        "session time write failed"
                    );
                    return Ok(Json(serde_json::json!({
                        "result": "false",
                        "error_code": "101",
                    })));
                }
            }
        }
    }
    Ok(api_bool(ok, &session))
}

async fn rt_commit(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let session = ensure_session(&state, attempt_id).await?;
    let mut session = session.lock().await;
    let Some(snapshot) = session.commit() else {
        return Ok(api_bool(false, &session));
    };
    persist_and_sync(&state, attempt_id, &snapshot, &mut session).await
}

async fn rt_terminate(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let session_handle = ensure_session(&state, attempt_id).await?;
    let mut session = session_handle.lock().await;
    let Some(snapshot) = session.terminate(state.inner.default_mastery) else {
        return Ok(api_bool(false, &session));
    };
    let resp = persist_and_sync(&state, attempt_id, &snapshot, &mut session).await;
    drop(session);
    // Terminated sessions are gone; a relaunch starts from stored state.
    state.inner.sessions.lock().await.remove(&attempt_id);
    resp
}

async fn persist_and_sync(
    state: &AppState,
    attempt_id: Uuid,
    snapshot: &crate::session::CommitSnapshot,
    session: &mut RteSession,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if let Err(err) = state
        .inner
        .store
        .persist_session(&snapshot.attempt, &snapshot.dirty_cmi)
        .await
    {
        tracing::error!(%attempt_id, error = %err, "commit persist failed");
        return Ok(Json(serde_json::json!({
            "result": "false",
            "error_code": "101",
        })));
    }
    session.mark_persisted();

    // Post-persist hook, exactly once per successful commit. A sync failure
    // does not fail the protocol call: the validator sweep will catch up.
    if let Err(err) = state.inner.sync.synchronize(attempt_id).await {
        tracing::warn!(%attempt_id, error = %err, "post-commit synchronization failed");
    }
    Ok(api_bool(true, session))
}

#[derive(Deserialize)]
struct LastErrorQuery {
    /// Optional error code for GetDiagnostic; empty means the last call.
    code: Option<String>,
}

async fn rt_last_error(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
    Query(query): Query<LastErrorQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let session = ensure_session(&state, attempt_id).await?;
    let session = session.lock().await;
    let code = session.last_error().code();
    Ok(Json(serde_json::json!({
        "code": code.to_string(),
        "message": session.error_string(code),
        "diagnostic": session.diagnostic(query.code.as_deref().unwrap_or("")),
    })))
}

// --- helpers ---

fn e400<T: Into<String>>(msg: T) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, msg.into())
}

fn e500<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    tracing::error!(error=%e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
