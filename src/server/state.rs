use axum::extract::FromRef;

use crate::background_jobs::SchedulerHandle;
use crate::stats::{RankingService, SearchCountRecorder, StatsSynchronizer};
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedSynchronizer = Arc<StatsSynchronizer>;
pub type GuardedRankings = Arc<RankingService>;
pub type GuardedSearchCounts = Arc<SearchCountRecorder>;
pub type OptionalSchedulerHandle = Option<SchedulerHandle>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub synchronizer: GuardedSynchronizer,
    pub rankings: GuardedRankings,
    pub search_counts: GuardedSearchCounts,
    pub scheduler_handle: OptionalSchedulerHandle,
    pub hash: String,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedSynchronizer {
    fn from_ref(input: &ServerState) -> Self {
        input.synchronizer.clone()
    }
}

impl FromRef<ServerState> for GuardedRankings {
    fn from_ref(input: &ServerState) -> Self {
        input.rankings.clone()
    }
}

impl FromRef<ServerState> for GuardedSearchCounts {
    fn from_ref(input: &ServerState) -> Self {
        input.search_counts.clone()
    }
}

impl FromRef<ServerState> for OptionalSchedulerHandle {
    fn from_ref(input: &ServerState) -> Self {
        input.scheduler_handle.clone()
    }
}
