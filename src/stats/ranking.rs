use super::error::{StatsError, StatsResult};
use crate::period::Period;
use crate::stats_store::{
    ArtistMonthlyStat, ArtistSearchRanking, CommunityMonthlyStat, ContentMonthlyStat, GenreSales,
    StatsStore,
};

pub const MAX_RANKING_LIMIT: i64 = 100;
pub const DEFAULT_RANKING_LIMIT: i64 = 10;

fn validate_limit(limit: i64) -> StatsResult<usize> {
    if limit < 1 || limit > MAX_RANKING_LIMIT {
        return Err(StatsError::Validation(format!(
            "limit must be between 1 and {}, got {}",
            MAX_RANKING_LIMIT, limit
        )));
    }
    Ok(limit as usize)
}

/// Read side of the stats: point lookups and rankings straight from the store.
pub struct RankingService {
    store: StatsStore,
}

impl RankingService {
    pub fn new(store: StatsStore) -> Self {
        Self { store }
    }

    pub fn artist_stat(&self, artist_id: i64) -> StatsResult<ArtistMonthlyStat> {
        self.store
            .read(|uow, repos| repos.artists.get(uow, artist_id))?
            .ok_or_else(|| StatsError::NotFound(format!("artist {}", artist_id)))
    }

    pub fn content_stat(&self, content_id: i64) -> StatsResult<ContentMonthlyStat> {
        self.store
            .read(|uow, repos| repos.contents.get(uow, content_id))?
            .ok_or_else(|| StatsError::NotFound(format!("content {}", content_id)))
    }

    pub fn community_stat(&self, community_id: i64) -> StatsResult<CommunityMonthlyStat> {
        self.store
            .read(|uow, repos| repos.communities.get(uow, community_id))?
            .ok_or_else(|| StatsError::NotFound(format!("community {}", community_id)))
    }

    pub fn top_artists_by_listeners(&self, limit: i64) -> StatsResult<Vec<ArtistMonthlyStat>> {
        let limit = validate_limit(limit)?;
        Ok(self
            .store
            .read(|uow, repos| repos.artists.top_by_listeners(uow, limit))?)
    }

    /// Most searched artists of the current month.
    pub fn top_artists_by_search(&self, limit: i64) -> StatsResult<Vec<ArtistSearchRanking>> {
        self.top_artists_by_search_in(Period::current(), limit)
    }

    pub fn top_artists_by_search_in(
        &self,
        period: Period,
        limit: i64,
    ) -> StatsResult<Vec<ArtistSearchRanking>> {
        let limit = validate_limit(limit)?;
        Ok(self
            .store
            .read(|uow, repos| repos.searches.top_by_searches(uow, period, limit))?)
    }

    pub fn top_content_by_rating(&self, limit: i64) -> StatsResult<Vec<ContentMonthlyStat>> {
        let limit = validate_limit(limit)?;
        Ok(self
            .store
            .read(|uow, repos| repos.contents.top_by_rating(uow, limit))?)
    }

    pub fn top_content_by_comments(&self, limit: i64) -> StatsResult<Vec<ContentMonthlyStat>> {
        let limit = validate_limit(limit)?;
        Ok(self
            .store
            .read(|uow, repos| repos.contents.top_by_comments(uow, limit))?)
    }

    pub fn top_content_by_sales(&self, limit: i64) -> StatsResult<Vec<ContentMonthlyStat>> {
        let limit = validate_limit(limit)?;
        Ok(self
            .store
            .read(|uow, repos| repos.contents.top_by_sales(uow, limit))?)
    }

    /// Genres by summed sales. Content without a genre is left out.
    pub fn top_genres_by_sales(&self, limit: i64) -> StatsResult<Vec<GenreSales>> {
        let limit = validate_limit(limit)?;
        Ok(self
            .store
            .read(|uow, repos| repos.contents.top_genres_by_sales(uow, limit))?)
    }

    /// Every community, most members first.
    pub fn top_communities_by_members(&self) -> StatsResult<Vec<CommunityMonthlyStat>> {
        Ok(self
            .store
            .read(|uow, repos| repos.communities.all_by_members(uow))?)
    }

    pub fn top_communities_by_posts(&self) -> StatsResult<Vec<CommunityMonthlyStat>> {
        Ok(self
            .store
            .read(|uow, repos| repos.communities.all_by_posts(uow))?)
    }
}
