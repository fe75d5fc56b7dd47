use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::jobs_routes::jobs_routes;
use super::metrics::metrics_handler;
use super::state::*;
use super::stats_routes::stats_routes;
use super::{log_requests, ServerConfig};
use crate::background_jobs::SchedulerHandle;
use crate::stats::{RankingService, SearchCountRecorder, StatsSynchronizer};
use std::sync::Arc;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub version: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    Json(stats)
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        synchronizer: Arc<StatsSynchronizer>,
        rankings: Arc<RankingService>,
        search_counts: Arc<SearchCountRecorder>,
        scheduler_handle: Option<SchedulerHandle>,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            synchronizer,
            rankings,
            search_counts,
            scheduler_handle,
            hash: env!("STATS_SERVER_GIT_HASH").to_owned(),
        }
    }
}

pub fn make_app(state: ServerState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/metrics", get(metrics_handler))
        .nest("/v1/stats", stats_routes())
        .nest("/v1/admin", jobs_routes())
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

/// Serves `state` on `port` until `shutdown_token` is cancelled.
pub async fn run_server(
    state: ServerState,
    shutdown_token: CancellationToken,
) -> Result<()> {
    let port = state.config.port;
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await?;
    Ok(())
}
