//! Debug session endpoints.
//!
//! Sessions are created from an inline workflow and then driven by ID.
//! Every endpoint answers with the session snapshot after the operation.

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;
use workflow_core::workflow::debug::DebugSession;
use workflow_core::workflow::executor::{BoxTaskExecutor, MockExecutor};
use workflow_types::debug::SessionSnapshot;

use super::WorkflowRequest;
use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

type SnapshotResponse = Result<Json<ApiResponse<SessionSnapshot>>, AppError>;

fn respond(snapshot: SessionSnapshot, start: Instant) -> SnapshotResponse {
    let request_id = Uuid::now_v7().to_string();
    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(snapshot, request_id, elapsed)))
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(flatten)]
    pub request: WorkflowRequest,
    /// Canned executor responses keyed by taskRef.
    #[serde(default)]
    pub mocks: Option<Value>,
    #[serde(default)]
    pub breakpoints: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BreakpointRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct ContextUpdate {
    pub path: String,
    pub value: Value,
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// POST /api/v1/debug/sessions - Create a session in `ready` state.
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionSnapshot>>), AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let request = body.request.parse()?;
    let responses = body.mocks.unwrap_or_else(|| json!({}));
    if !responses.is_object() {
        return Err(AppError::BadRequest(
            "mocks must be an object keyed by taskRef".to_string(),
        ));
    }
    let executor = Arc::new(BoxTaskExecutor::new(MockExecutor::from_responses(&responses)));

    let mut session = DebugSession::create(
        request.workflow,
        request.tasks.unwrap_or_default(),
        request.input,
        executor,
    )?;
    for task_id in &body.breakpoints {
        session.add_breakpoint(task_id);
    }
    let snapshot = state.sessions.insert(session);

    let elapsed = start.elapsed().as_millis() as u64;
    let href = format!("/api/v1/debug/sessions/{}", snapshot.id);
    let resp = ApiResponse::success(snapshot, request_id, elapsed).with_link("self", &href);
    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/debug/sessions - Snapshots of all live sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SessionSnapshot>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let mut snapshots = Vec::with_capacity(state.sessions.len());
    for id in state.sessions.ids() {
        // A session deleted between `ids()` and here is simply skipped.
        if let Ok(snapshot) = state.sessions.snapshot(id).await {
            snapshots.push(snapshot);
        }
    }

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(snapshots, request_id, elapsed)))
}

/// GET /api/v1/debug/sessions/{id}
pub async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> SnapshotResponse {
    let start = Instant::now();
    respond(state.sessions.snapshot(id).await?, start)
}

/// DELETE /api/v1/debug/sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    state.sessions.remove(id)?;
    tracing::info!(session_id = %id, "debug session deleted");

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        json!({ "deleted": id }),
        request_id,
        elapsed,
    )))
}

// ---------------------------------------------------------------------------
// Execution control
// ---------------------------------------------------------------------------

/// POST /api/v1/debug/sessions/{id}/start
pub async fn start_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> SnapshotResponse {
    let start = Instant::now();
    respond(state.sessions.start(id).await?, start)
}

/// POST /api/v1/debug/sessions/{id}/step
pub async fn step_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> SnapshotResponse {
    let start = Instant::now();
    respond(state.sessions.step(id).await?, start)
}

/// POST /api/v1/debug/sessions/{id}/continue
pub async fn continue_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> SnapshotResponse {
    let start = Instant::now();
    respond(state.sessions.continue_run(id).await?, start)
}

/// POST /api/v1/debug/sessions/{id}/stop
pub async fn stop_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> SnapshotResponse {
    let start = Instant::now();
    respond(state.sessions.stop(id).await?, start)
}

// ---------------------------------------------------------------------------
// Breakpoints, context, mocks
// ---------------------------------------------------------------------------

/// PUT /api/v1/debug/sessions/{id}/breakpoints/{task_id}
///
/// An empty body adds (or resets) the breakpoint; `{"enabled": bool}`
/// toggles an existing one.
pub async fn put_breakpoint(
    State(state): State<AppState>,
    Path((id, task_id)): Path<(Uuid, String)>,
    body: Bytes,
) -> SnapshotResponse {
    let start = Instant::now();

    let snapshot = if body.iter().all(u8::is_ascii_whitespace) {
        state.sessions.add_breakpoint(id, &task_id).await?
    } else {
        let request: BreakpointRequest = serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("invalid breakpoint body: {e}")))?;
        state
            .sessions
            .set_breakpoint_enabled(id, &task_id, request.enabled)
            .await?
    };
    respond(snapshot, start)
}

/// DELETE /api/v1/debug/sessions/{id}/breakpoints/{task_id}
pub async fn delete_breakpoint(
    State(state): State<AppState>,
    Path((id, task_id)): Path<(Uuid, String)>,
) -> SnapshotResponse {
    let start = Instant::now();
    respond(state.sessions.remove_breakpoint(id, &task_id).await?, start)
}

/// PUT /api/v1/debug/sessions/{id}/context - Overwrite a context value.
pub async fn put_context(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<ContextUpdate>,
) -> SnapshotResponse {
    let start = Instant::now();
    respond(
        state
            .sessions
            .set_context_value(id, &update.path, update.value)
            .await?,
        start,
    )
}

/// PUT /api/v1/debug/sessions/{id}/mocks/{task_ref} - Body is the canned output.
pub async fn put_mock(
    State(state): State<AppState>,
    Path((id, task_ref)): Path<(Uuid, String)>,
    Json(response): Json<Value>,
) -> SnapshotResponse {
    let start = Instant::now();
    respond(
        state.sessions.set_mock_response(id, &task_ref, response).await?,
        start,
    )
}

/// DELETE /api/v1/debug/sessions/{id}/mocks/{task_ref}
pub async fn delete_mock(
    State(state): State<AppState>,
    Path((id, task_ref)): Path<(Uuid, String)>,
) -> SnapshotResponse {
    let start = Instant::now();
    respond(state.sessions.clear_mock_response(id, &task_ref).await?, start)
}
