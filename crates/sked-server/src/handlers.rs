//! HTTP handlers for the task API.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sked_core::{Task, TaskDraft};
use sked_engine::{EngineError, TaskService, DEFAULT_LIST_LIMIT};

use crate::auth::{AuthGate, TOKEN_COOKIE};
use crate::error::ApiError;

/// Shared state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TaskService>,
    pub auth: Arc<AuthGate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdParams {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextDateParams {
    pub now: Option<String>,
    pub date: Option<String>,
    pub repeat: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<Task>,
}

type JsonResult = Result<Json<Value>, ApiError>;

fn empty() -> Json<Value> {
    Json(json!({}))
}

// ── Tasks ──

pub async fn add_task(
    State(state): State<AppState>,
    payload: Result<Json<TaskDraft>, JsonRejection>,
) -> JsonResult {
    let Json(draft) = payload?;
    let id = state.service.create(&draft)?;
    Ok(Json(json!({ "id": id.get() })))
}

pub async fn get_task(
    State(state): State<AppState>,
    params: Result<Query<IdParams>, QueryRejection>,
) -> Result<Json<Task>, ApiError> {
    let Query(params) = params?;
    Ok(Json(state.service.get(&params.id)?))
}

pub async fn update_task(
    State(state): State<AppState>,
    payload: Result<Json<TaskDraft>, JsonRejection>,
) -> JsonResult {
    let Json(draft) = payload?;
    state.service.update(&draft)?;
    Ok(empty())
}

pub async fn delete_task(
    State(state): State<AppState>,
    params: Result<Query<IdParams>, QueryRejection>,
) -> JsonResult {
    let Query(params) = params?;
    state.service.delete(&params.id)?;
    Ok(empty())
}

pub async fn task_done(
    State(state): State<AppState>,
    params: Result<Query<IdParams>, QueryRejection>,
) -> JsonResult {
    let Query(params) = params?;
    state.service.mark_done(&params.id)?;
    Ok(empty())
}

pub async fn list_tasks(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<TasksResponse>, ApiError> {
    let Query(params) = params?;
    let tasks = state.service.search(&params.search, DEFAULT_LIST_LIMIT)?;
    Ok(Json(TasksResponse { tasks }))
}

// ── Recurrence preview (plain text) ──

pub async fn next_date(
    State(state): State<AppState>,
    Query(params): Query<NextDateParams>,
) -> Result<String, (StatusCode, String)> {
    let bad_request = |msg: String| (StatusCode::BAD_REQUEST, msg);

    let date = params
        .date
        .filter(|d| !d.is_empty())
        .ok_or_else(|| bad_request("missing date parameter".into()))?;
    let repeat = params
        .repeat
        .filter(|r| !r.is_empty())
        .ok_or_else(|| bad_request("missing repeat parameter".into()))?;

    state
        .service
        .preview(params.now.as_deref(), &date, &repeat)
        .map_err(|e: EngineError| bad_request(e.to_string()))
}

// ── Auth ──

pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let token = state.auth.sign_in(&request.password)?;

    let cookie = Cookie::build((TOKEN_COOKIE, token.clone())).path("/").build();
    Ok((jar.add(cookie), Json(json!({ "token": token }))))
}

// ── System ──

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.list(0) {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "healthy" }))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "error": e.to_string() })),
        ),
    }
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
