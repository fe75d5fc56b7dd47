//! Stats HTTP routes.
//!
//! Single-entity sync (PUT), point lookups, rankings, search counting and batch sync.
//! Every failure is answered with `{"error": "..."}` and a status derived from
//! [`StatsError`].

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::server::state::{GuardedRankings, GuardedSearchCounts, GuardedSynchronizer, ServerState};
use crate::stats::{StatsError, DEFAULT_RANKING_LIMIT};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for StatsError {
    fn into_response(self) -> Response {
        let status = match &self {
            StatsError::NotFound(_) => StatusCode::NOT_FOUND,
            StatsError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            StatsError::Validation(_) => StatusCode::BAD_REQUEST,
            StatsError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub limit: Option<i64>,
}

impl RankingQuery {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_RANKING_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncArtistBody {
    pub artist_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncContentBody {
    pub content_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCommunityBody {
    pub community_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSearchBody {
    pub artist_id: Option<i64>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCountResponse {
    pub artist_id: i64,
    pub user_id: Option<i64>,
    pub search_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub removed: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSyncResponse<T> {
    pub synced: usize,
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for BatchSyncResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            synced: items.len(),
            items,
        }
    }
}

fn required(id: Option<i64>, field: &str) -> Result<i64, StatsError> {
    id.ok_or_else(|| StatsError::Validation(format!("{} is required", field)))
}

// =============================================================================
// Artists
// =============================================================================

async fn get_artist_stat(
    State(rankings): State<GuardedRankings>,
    Path(artist_id): Path<i64>,
) -> Response {
    match rankings.artist_stat(artist_id) {
        Ok(stat) => Json(stat).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn sync_artist(
    State(synchronizer): State<GuardedSynchronizer>,
    Json(body): Json<SyncArtistBody>,
) -> Response {
    let artist_id = match required(body.artist_id, "artistId") {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    match synchronizer.sync_artist(artist_id).await {
        Ok(stat) => Json(stat).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn delete_artist_stat(
    State(synchronizer): State<GuardedSynchronizer>,
    Path(artist_id): Path<i64>,
) -> Response {
    match synchronizer.delete_artist(artist_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn artists_by_listeners(
    State(rankings): State<GuardedRankings>,
    Query(query): Query<RankingQuery>,
) -> Response {
    match rankings.top_artists_by_listeners(query.limit()) {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn artists_by_searches(
    State(rankings): State<GuardedRankings>,
    Query(query): Query<RankingQuery>,
) -> Response {
    match rankings.top_artists_by_search(query.limit()) {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn record_artist_search(
    State(search_counts): State<GuardedSearchCounts>,
    Json(body): Json<RecordSearchBody>,
) -> Response {
    let artist_id = match required(body.artist_id, "artistId") {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    match search_counts.record_artist_search(artist_id, body.user_id) {
        Ok(search_count) => Json(SearchCountResponse {
            artist_id,
            user_id: body.user_id,
            search_count,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn reset_artist_searches(State(search_counts): State<GuardedSearchCounts>) -> Response {
    match search_counts.reset_search_counts() {
        Ok(removed) => Json(ResetResponse { removed }).into_response(),
        Err(e) => e.into_response(),
    }
}

// =============================================================================
// Contents
// =============================================================================

async fn get_content_stat(
    State(rankings): State<GuardedRankings>,
    Path(content_id): Path<i64>,
) -> Response {
    match rankings.content_stat(content_id) {
        Ok(stat) => Json(stat).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn sync_content(
    State(synchronizer): State<GuardedSynchronizer>,
    Json(body): Json<SyncContentBody>,
) -> Response {
    let content_id = match required(body.content_id, "contentId") {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    match synchronizer.sync_content(content_id).await {
        Ok(stat) => Json(stat).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn delete_content_stat(
    State(synchronizer): State<GuardedSynchronizer>,
    Path(content_id): Path<i64>,
) -> Response {
    match synchronizer.delete_content(content_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn contents_ranking(
    State(rankings): State<GuardedRankings>,
    Path(metric): Path<String>,
    Query(query): Query<RankingQuery>,
) -> Response {
    let limit = query.limit();
    let result = match metric.as_str() {
        "rating" => rankings.top_content_by_rating(limit),
        "comments" => rankings.top_content_by_comments(limit),
        "sales" => rankings.top_content_by_sales(limit),
        other => Err(StatsError::NotFound(format!("content ranking '{}'", other))),
    };
    match result {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn genres_by_sales(
    State(rankings): State<GuardedRankings>,
    Query(query): Query<RankingQuery>,
) -> Response {
    match rankings.top_genres_by_sales(query.limit()) {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => e.into_response(),
    }
}

// =============================================================================
// Communities
// =============================================================================

async fn get_community_stat(
    State(rankings): State<GuardedRankings>,
    Path(community_id): Path<i64>,
) -> Response {
    match rankings.community_stat(community_id) {
        Ok(stat) => Json(stat).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn sync_community(
    State(synchronizer): State<GuardedSynchronizer>,
    Json(body): Json<SyncCommunityBody>,
) -> Response {
    let community_id = match required(body.community_id, "communityId") {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    match synchronizer.sync_community(community_id).await {
        Ok(Some(stat)) => Json(stat).into_response(),
        Ok(None) => StatsError::NotFound(format!("community {}", community_id)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn communities_ranking(
    State(rankings): State<GuardedRankings>,
    Path(metric): Path<String>,
) -> Response {
    let result = match metric.as_str() {
        "members" => rankings.top_communities_by_members(),
        "posts" => rankings.top_communities_by_posts(),
        other => Err(StatsError::NotFound(format!("community ranking '{}'", other))),
    };
    match result {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => e.into_response(),
    }
}

// =============================================================================
// Batch sync
// =============================================================================

async fn batch_sync(
    State(synchronizer): State<GuardedSynchronizer>,
    Path(family): Path<String>,
) -> Response {
    info!("Batch sync of {} requested", family);
    match family.as_str() {
        "artists" => Json(BatchSyncResponse::from(synchronizer.sync_all_artists().await))
            .into_response(),
        "contents" => Json(BatchSyncResponse::from(synchronizer.sync_all_content().await))
            .into_response(),
        "communities" => Json(BatchSyncResponse::from(
            synchronizer.sync_all_communities().await,
        ))
        .into_response(),
        other => StatsError::NotFound(format!("sync family '{}'", other)).into_response(),
    }
}

// =============================================================================
// Router Construction
// =============================================================================

/// Routes nested under `/v1/stats`.
pub fn stats_routes() -> Router<ServerState> {
    let artist_routes = Router::new()
        .route("/artists", put(sync_artist))
        .route(
            "/artists/{id}",
            get(get_artist_stat).delete(delete_artist_stat),
        )
        .route("/artists/ranking/listeners", get(artists_by_listeners))
        .route("/artists/ranking/searches", get(artists_by_searches))
        .route(
            "/artists/searches",
            post(record_artist_search).delete(reset_artist_searches),
        );

    let content_routes = Router::new()
        .route("/contents", put(sync_content))
        .route(
            "/contents/{id}",
            get(get_content_stat).delete(delete_content_stat),
        )
        .route("/contents/ranking/{metric}", get(contents_ranking))
        .route("/genres/ranking/sales", get(genres_by_sales));

    let community_routes = Router::new()
        .route("/communities", put(sync_community))
        .route("/communities/{id}", get(get_community_stat))
        .route("/communities/ranking/{metric}", get(communities_ranking));

    artist_routes
        .merge(content_routes)
        .merge(community_routes)
        .route("/sync/{family}", post(batch_sync))
}
