use super::best_effort::BestEffort;
use super::error::{StatsError, StatsResult};
use super::normalize;
use crate::server::metrics;
use crate::stats_store::{ArtistMonthlyStat, CommunityMonthlyStat, ContentMonthlyStat, StatsStore};
use crate::upstream::{ArtistDirectory, CommunityDirectory, ContentCatalog, UpstreamCommunity};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pulls statistics from the upstream services into the local store.
///
/// Every single-entity sync fetches first and then writes inside its own fresh unit of
/// work: a failure at any step leaves the store untouched. Batch syncs run the
/// single-entity sync for each member sequentially and never fail as a whole.
pub struct StatsSynchronizer {
    store: StatsStore,
    artists: Arc<dyn ArtistDirectory>,
    contents: Arc<dyn ContentCatalog>,
    communities: Arc<dyn CommunityDirectory>,
}

fn record_outcome<T>(family: &str, result: &StatsResult<T>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    metrics::record_sync_outcome(family, outcome);
}

impl StatsSynchronizer {
    pub fn new(
        store: StatsStore,
        artists: Arc<dyn ArtistDirectory>,
        contents: Arc<dyn ContentCatalog>,
        communities: Arc<dyn CommunityDirectory>,
    ) -> Self {
        Self {
            store,
            artists,
            contents,
            communities,
        }
    }

    // =========================================================================
    // Single entity
    // =========================================================================

    pub async fn sync_artist(&self, artist_id: i64) -> StatsResult<ArtistMonthlyStat> {
        let result = self.fetch_and_store_artist(artist_id).await;
        record_outcome("artist", &result);
        result
    }

    async fn fetch_and_store_artist(&self, artist_id: i64) -> StatsResult<ArtistMonthlyStat> {
        let upstream = self.artists.fetch_artist(artist_id).await?;
        let stat = normalize::artist(artist_id, upstream);
        self.store
            .write(|uow, repos| repos.artists.upsert(uow, &stat))?;
        debug!(
            "Synced artist {}: {} listeners, rating {}",
            artist_id, stat.listener_count, stat.average_rating
        );
        Ok(stat)
    }

    pub async fn sync_content(&self, content_id: i64) -> StatsResult<ContentMonthlyStat> {
        let result = self.fetch_and_store_content(content_id).await;
        record_outcome("content", &result);
        result
    }

    async fn fetch_and_store_content(&self, content_id: i64) -> StatsResult<ContentMonthlyStat> {
        let upstream = self.contents.fetch_content(content_id).await?;
        let comments = self.comment_count(content_id).await;
        let stat = normalize::content(content_id, upstream, comments.into_value());
        self.store
            .write(|uow, repos| repos.contents.upsert(uow, &stat))?;
        debug!(
            "Synced content {}: {} sales, {} comments",
            content_id, stat.sales_count, stat.comment_count
        );
        Ok(stat)
    }

    /// Number of non-empty comments of a content item. Never fails: when the comment
    /// listing cannot be fetched the count degrades to 0.
    pub async fn comment_count(&self, content_id: i64) -> BestEffort<u64> {
        let fetched = self
            .contents
            .fetch_comments(content_id)
            .await
            .map(|comments| comments.iter().filter(|c| c.has_text()).count() as u64);
        let outcome = BestEffort::from_result(fetched, 0);
        if let BestEffort::Degraded { reason, .. } = &outcome {
            warn!(
                "Comments of content {} unavailable, storing 0: {}",
                content_id, reason
            );
            metrics::record_degraded_fetch("comment_count");
        }
        outcome
    }

    /// Returns `Ok(None)` when the community is not part of the upstream listing, in which
    /// case nothing is written.
    pub async fn sync_community(
        &self,
        community_id: i64,
    ) -> StatsResult<Option<CommunityMonthlyStat>> {
        let listing = match self.communities.list_communities().await {
            Ok(listing) => listing,
            Err(e) => {
                let err = StatsError::from(e);
                metrics::record_sync_outcome("community", err.kind());
                return Err(err);
            }
        };
        match listing.iter().find(|c| c.id == community_id) {
            Some(upstream) => self.store_community(upstream).map(Some),
            None => {
                debug!("Community {} is not listed upstream", community_id);
                metrics::record_sync_outcome("community", "not_found");
                Ok(None)
            }
        }
    }

    fn store_community(&self, upstream: &UpstreamCommunity) -> StatsResult<CommunityMonthlyStat> {
        let stat = normalize::community(upstream);
        let result = self
            .store
            .write(|uow, repos| repos.communities.upsert(uow, &stat))
            .map(|_| stat)
            .map_err(StatsError::from);
        record_outcome("community", &result);
        result
    }

    // =========================================================================
    // Batch
    // =========================================================================

    pub async fn sync_all_artists(&self) -> Vec<ArtistMonthlyStat> {
        self.sync_all_artists_until(|| false).await
    }

    /// Like [`Self::sync_all_artists`], but checks `should_stop` before each artist and
    /// returns early once it yields true.
    pub async fn sync_all_artists_until<F>(&self, should_stop: F) -> Vec<ArtistMonthlyStat>
    where
        F: Fn() -> bool + Send,
    {
        let ids = match self.artists.list_artists().await {
            Ok(refs) => refs.into_iter().map(|r| r.id).collect(),
            Err(e) => {
                warn!("Skipping artist sync, listing failed: {}", e);
                return Vec::new();
            }
        };
        sync_each("artist", ids, should_stop, move |id| self.sync_artist(id)).await
    }

    pub async fn sync_all_content(&self) -> Vec<ContentMonthlyStat> {
        self.sync_all_content_until(|| false).await
    }

    pub async fn sync_all_content_until<F>(&self, should_stop: F) -> Vec<ContentMonthlyStat>
    where
        F: Fn() -> bool + Send,
    {
        let ids = match self.contents.list_contents().await {
            Ok(refs) => refs.into_iter().map(|r| r.id).collect(),
            Err(e) => {
                warn!("Skipping content sync, listing failed: {}", e);
                return Vec::new();
            }
        };
        sync_each("content", ids, should_stop, move |id| self.sync_content(id)).await
    }

    pub async fn sync_all_communities(&self) -> Vec<CommunityMonthlyStat> {
        self.sync_all_communities_until(|| false).await
    }

    /// The community listing already carries every metric, so it is fetched once and each
    /// member is stored in its own unit of work.
    pub async fn sync_all_communities_until<F>(&self, should_stop: F) -> Vec<CommunityMonthlyStat>
    where
        F: Fn() -> bool + Send,
    {
        let listing = match self.communities.list_communities().await {
            Ok(listing) => listing,
            Err(e) => {
                warn!("Skipping community sync, listing failed: {}", e);
                return Vec::new();
            }
        };
        if listing.is_empty() {
            info!("No community listed upstream, nothing to sync");
            return Vec::new();
        }

        let mut synced = Vec::with_capacity(listing.len());
        for upstream in &listing {
            if should_stop() {
                info!(
                    "Community sync stopped after {} of {} items",
                    synced.len(),
                    listing.len()
                );
                break;
            }
            match self.store_community(upstream) {
                Ok(stat) => synced.push(stat),
                Err(e) => warn!("Failed to sync community {}: {}", upstream.id, e),
            }
        }
        info!("Synced {}/{} communities", synced.len(), listing.len());
        synced
    }

    // =========================================================================
    // Admin
    // =========================================================================

    pub fn delete_artist(&self, artist_id: i64) -> StatsResult<()> {
        let deleted = self
            .store
            .write(|uow, repos| repos.artists.delete(uow, artist_id))?;
        if !deleted {
            return Err(StatsError::NotFound(format!("artist {}", artist_id)));
        }
        info!("Deleted stats of artist {}", artist_id);
        Ok(())
    }

    pub fn delete_content(&self, content_id: i64) -> StatsResult<()> {
        let deleted = self
            .store
            .write(|uow, repos| repos.contents.delete(uow, content_id))?;
        if !deleted {
            return Err(StatsError::NotFound(format!("content {}", content_id)));
        }
        info!("Deleted stats of content {}", content_id);
        Ok(())
    }
}

async fn sync_each<T, S, F, Fut>(family: &str, ids: Vec<i64>, should_stop: S, sync_one: F) -> Vec<T>
where
    S: Fn() -> bool,
    F: Fn(i64) -> Fut,
    Fut: Future<Output = StatsResult<T>>,
{
    if ids.is_empty() {
        info!("No {} listed upstream, nothing to sync", family);
        return Vec::new();
    }

    info!("Syncing {} {} entries", ids.len(), family);
    let mut synced = Vec::with_capacity(ids.len());
    for id in &ids {
        if should_stop() {
            info!(
                "{} sync stopped after {} of {} items",
                family,
                synced.len(),
                ids.len()
            );
            break;
        }
        match sync_one(*id).await {
            Ok(stat) => synced.push(stat),
            Err(e) => warn!("Failed to sync {} {}: {}", family, id, e),
        }
    }
    info!("Synced {}/{} {} entries", synced.len(), ids.len(), family);
    synced
}
