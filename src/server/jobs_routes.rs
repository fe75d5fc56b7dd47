//! Admin routes over the background job scheduler.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::background_jobs::{JobError, SchedulerHandle};
use crate::server::state::{OptionalSchedulerHandle, ServerState};
use crate::server::stats_routes::ErrorResponse;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_history_limit() -> usize {
    20
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn get_scheduler(handle: &OptionalSchedulerHandle) -> Result<&SchedulerHandle, Response> {
    handle
        .as_ref()
        .ok_or_else(|| error(StatusCode::SERVICE_UNAVAILABLE, "Job scheduler not available"))
}

/// GET /jobs
async fn list_jobs(State(handle): State<OptionalSchedulerHandle>) -> Response {
    let scheduler = match get_scheduler(&handle) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match scheduler.list_jobs().await {
        Ok(jobs) => Json(jobs).into_response(),
        Err(e) => {
            warn!("Failed to list jobs: {}", e);
            error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list jobs")
        }
    }
}

/// GET /jobs/{id}
async fn get_job(
    State(handle): State<OptionalSchedulerHandle>,
    Path(job_id): Path<String>,
) -> Response {
    let scheduler = match get_scheduler(&handle) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match scheduler.get_job(&job_id).await {
        Ok(Some(job)) => Json(job).into_response(),
        Ok(None) => error(StatusCode::NOT_FOUND, format!("job {} not found", job_id)),
        Err(e) => {
            warn!("Failed to get job {}: {}", job_id, e);
            error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to get job")
        }
    }
}

/// POST /jobs/{id}/trigger
async fn trigger_job(
    State(handle): State<OptionalSchedulerHandle>,
    Path(job_id): Path<String>,
) -> Response {
    let scheduler = match get_scheduler(&handle) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match scheduler.trigger_job(&job_id).await {
        Ok(()) => {
            info!("Job {} triggered manually", job_id);
            StatusCode::ACCEPTED.into_response()
        }
        Err(JobError::NotFound) => {
            error(StatusCode::NOT_FOUND, format!("job {} not found", job_id))
        }
        Err(JobError::AlreadyRunning) => error(
            StatusCode::CONFLICT,
            format!("job {} is already running", job_id),
        ),
        Err(e) => {
            warn!("Failed to trigger job {}: {}", job_id, e);
            error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /jobs/{id}/history?limit=
async fn get_job_history(
    State(handle): State<OptionalSchedulerHandle>,
    Path(job_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let scheduler = match get_scheduler(&handle) {
        Ok(s) => s,
        Err(e) => return e,
    };
    if !scheduler.job_exists(&job_id).await {
        return error(StatusCode::NOT_FOUND, format!("job {} not found", job_id));
    }
    match scheduler.get_job_history(&job_id, query.limit) {
        Ok(history) => Json(history).into_response(),
        Err(e) => {
            warn!("Failed to read history of job {}: {}", job_id, e);
            error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read job history")
        }
    }
}

/// GET /jobs/{id}/audit?limit=&offset=
async fn get_job_audit(
    State(handle): State<OptionalSchedulerHandle>,
    Path(job_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let scheduler = match get_scheduler(&handle) {
        Ok(s) => s,
        Err(e) => return e,
    };
    if !scheduler.job_exists(&job_id).await {
        return error(StatusCode::NOT_FOUND, format!("job {} not found", job_id));
    }
    match scheduler.get_job_audit_log_by_job(&job_id, query.limit, query.offset) {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => {
            warn!("Failed to read audit log of job {}: {}", job_id, e);
            error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read job audit log")
        }
    }
}

/// Routes nested under `/v1/admin`.
pub fn jobs_routes() -> Router<ServerState> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/trigger", post(trigger_job))
        .route("/jobs/{id}/history", get(get_job_history))
        .route("/jobs/{id}/audit", get(get_job_audit))
}
