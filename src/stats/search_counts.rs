use super::error::StatsResult;
use crate::period::Period;
use crate::stats_store::StatsStore;
use tracing::{debug, info};

/// Local-only write path for artist search popularity. Counters are windowed to the
/// calendar month: a counter last touched in an earlier month restarts from zero.
pub struct SearchCountRecorder {
    store: StatsStore,
}

impl SearchCountRecorder {
    pub fn new(store: StatsStore) -> Self {
        Self { store }
    }

    /// Counts one search in the current month and returns the updated counter.
    pub fn record_artist_search(&self, artist_id: i64, user_id: Option<i64>) -> StatsResult<u64> {
        self.record_artist_search_in(Period::current(), artist_id, user_id)
    }

    pub fn record_artist_search_in(
        &self,
        period: Period,
        artist_id: i64,
        user_id: Option<i64>,
    ) -> StatsResult<u64> {
        let count = self
            .store
            .write(|uow, repos| repos.searches.record(uow, artist_id, user_id, period))?;
        debug!(
            "Artist {} searched by {:?}, count {} in {}",
            artist_id, user_id, count, period
        );
        Ok(count)
    }

    /// Current-month counter of one (artist, user) pair, 0 when absent.
    pub fn search_count(&self, artist_id: i64, user_id: Option<i64>) -> StatsResult<u64> {
        let period = Period::current();
        Ok(self
            .store
            .read(|uow, repos| repos.searches.count(uow, artist_id, user_id, period))?)
    }

    /// Drops every counter. Run at each month boundary.
    pub fn reset_search_counts(&self) -> StatsResult<usize> {
        let removed = self.store.write(|uow, repos| repos.searches.truncate(uow))?;
        info!("Reset artist search counts, {} rows removed", removed);
        Ok(removed)
    }

    pub fn forget_artist_searches(&self, artist_id: i64) -> StatsResult<usize> {
        Ok(self
            .store
            .write(|uow, repos| repos.searches.delete_by_artist(uow, artist_id))?)
    }

    pub fn forget_user_searches(&self, user_id: i64) -> StatsResult<usize> {
        Ok(self
            .store
            .write(|uow, repos| repos.searches.delete_by_user(uow, user_id))?)
    }
}
