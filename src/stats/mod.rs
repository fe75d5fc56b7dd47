//! Synchronization of upstream statistics and the queries served over them.

mod best_effort;
mod error;
mod normalize;
mod ranking;
mod search_counts;
mod synchronizer;

#[cfg(test)]
pub(crate) mod test_support;

pub use best_effort::BestEffort;
pub use error::{StatsError, StatsResult};
pub use ranking::{RankingService, DEFAULT_RANKING_LIMIT, MAX_RANKING_LIMIT};
pub use search_counts::SearchCountRecorder;
pub use synchronizer::StatsSynchronizer;
