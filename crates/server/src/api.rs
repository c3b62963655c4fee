use crate::{ACTIVE_RUNS, HISTORY_WRITE_FAILURES, RUNS_TOTAL};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use switchblade_common::models::{
    HistoryRecord, HistoryStatus, Outcome, QueryPayload, QueryRequest, ResultSet,
};
use switchblade_core::{HistoryWrite, Pipeline, PipelineRun};
use switchblade_error::{ErrorCategory, ErrorCode, SwitchbladeError};
use uuid::Uuid;

const MAX_LIST_LIMIT: u32 = 1000;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    default_list_limit: u32,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, default_list_limit: u32) -> Self {
        Self {
            pipeline,
            default_list_limit,
        }
    }
}

pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .merge(create_query_router(state.clone()))
        .merge(create_history_router(state))
}

pub fn create_query_router(state: AppState) -> Router {
    Router::new()
        .route("/query", post(run_query))
        .with_state(state)
}

pub fn create_history_router(state: AppState) -> Router {
    Router::new()
        .route("/history/{user_id}", get(list_history))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub query_id: Uuid,
    pub status: HistoryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ResultSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub history: HistoryWrite,
}

impl From<PipelineRun> for QueryResponse {
    fn from(run: PipelineRun) -> Self {
        let status = run.outcome.status();
        let (sql, explanation, results, error) = match run.outcome {
            Outcome::Completed {
                sql,
                explanation,
                results,
            } => (Some(sql), explanation, Some(results), None),
            Outcome::Error { code, message } => (None, None, None, Some(ErrorBody { code, message })),
        };
        Self {
            query_id: run.request_id,
            status,
            sql,
            explanation,
            results,
            error,
            history: run.history,
        }
    }
}

/// A `SwitchbladeError` rendered as an HTTP response.
pub struct ApiError(pub SwitchbladeError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.code.category() {
            ErrorCategory::Input => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self.0)).into_response()
    }
}

impl From<SwitchbladeError> for ApiError {
    fn from(err: SwitchbladeError) -> Self {
        Self(err)
    }
}

/// Every well-formed request gets a run and a 200; the outcome is in the body.
async fn run_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryPayload>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        SwitchbladeError::new(
            ErrorCode::InvalidRequestBody,
            format!("Invalid request body: {}", rejection.body_text()),
        )
        .with_hint("Send JSON like {\"userId\": \"...\", \"question\": \"...\"}")
    })?;

    // The run owns its task so a dropped connection cannot cancel it between
    // the outcome and the history write.
    let request = QueryRequest::from(payload);
    let pipeline = state.pipeline.clone();
    let run = tokio::spawn(async move {
        let _active = ActiveRunGuard::enter();
        let run = pipeline.run(request).await;
        RUNS_TOTAL
            .with_label_values(&[run.outcome.status().as_str()])
            .inc();
        if matches!(run.history, HistoryWrite::Failed { .. }) {
            HISTORY_WRITE_FAILURES.inc();
        }
        run
    })
    .await
    .map_err(|e| {
        SwitchbladeError::new(
            ErrorCode::Unknown,
            format!("Pipeline task failed to complete: {}", e),
        )
    })?;

    Ok(Json(QueryResponse::from(run)))
}

/// Holds one slot of the active-runs gauge for as long as it lives.
struct ActiveRunGuard;

impl ActiveRunGuard {
    fn enter() -> Self {
        ACTIVE_RUNS.inc();
        Self
    }
}

impl Drop for ActiveRunGuard {
    fn drop(&mut self) {
        ACTIVE_RUNS.dec();
    }
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<u32>,
}

async fn list_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(state.default_list_limit)
        .clamp(1, MAX_LIST_LIMIT);
    let records = state.pipeline.recorder().list(&user_id, limit).await?;
    Ok(Json(records))
}
