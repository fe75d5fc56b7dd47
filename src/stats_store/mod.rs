mod database;
mod models;
mod schema;
mod sqlite_repositories;

pub use database::{StatsDatabase, UnitOfWork};
pub use models::*;
pub use schema::STATS_VERSIONED_SCHEMAS;
pub use sqlite_repositories::{
    SqliteArtistMonthlyRepository, SqliteArtistSearchRepository,
    SqliteCommunityMonthlyRepository, SqliteContentMonthlyRepository,
};

use crate::period::Period;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

pub trait ArtistMonthlyRepository: Send + Sync {
    fn get(&self, uow: &UnitOfWork<'_>, artist_id: i64) -> Result<Option<ArtistMonthlyStat>>;
    fn top_by_listeners(&self, uow: &UnitOfWork<'_>, limit: usize)
        -> Result<Vec<ArtistMonthlyStat>>;
    fn upsert(&self, uow: &UnitOfWork<'_>, stat: &ArtistMonthlyStat) -> Result<()>;
    /// Returns whether a row was deleted.
    fn delete(&self, uow: &UnitOfWork<'_>, artist_id: i64) -> Result<bool>;
}

pub trait ArtistSearchRepository: Send + Sync {
    /// Counts one search of `artist_id` by `user_id` (None for anonymous) in `period`
    /// and returns the updated count.
    fn record(
        &self,
        uow: &UnitOfWork<'_>,
        artist_id: i64,
        user_id: Option<i64>,
        period: Period,
    ) -> Result<u64>;
    fn count(
        &self,
        uow: &UnitOfWork<'_>,
        artist_id: i64,
        user_id: Option<i64>,
        period: Period,
    ) -> Result<u64>;
    fn top_by_searches(
        &self,
        uow: &UnitOfWork<'_>,
        period: Period,
        limit: usize,
    ) -> Result<Vec<ArtistSearchRanking>>;
    /// Removes every counter, returning how many rows were dropped.
    fn truncate(&self, uow: &UnitOfWork<'_>) -> Result<usize>;
    fn delete_by_artist(&self, uow: &UnitOfWork<'_>, artist_id: i64) -> Result<usize>;
    fn delete_by_user(&self, uow: &UnitOfWork<'_>, user_id: i64) -> Result<usize>;
}

pub trait ContentMonthlyRepository: Send + Sync {
    fn get(&self, uow: &UnitOfWork<'_>, content_id: i64) -> Result<Option<ContentMonthlyStat>>;
    fn top_by_rating(&self, uow: &UnitOfWork<'_>, limit: usize)
        -> Result<Vec<ContentMonthlyStat>>;
    fn top_by_comments(
        &self,
        uow: &UnitOfWork<'_>,
        limit: usize,
    ) -> Result<Vec<ContentMonthlyStat>>;
    fn top_by_sales(&self, uow: &UnitOfWork<'_>, limit: usize) -> Result<Vec<ContentMonthlyStat>>;
    /// Sales summed per genre, excluding [`UNKNOWN_GENRE`].
    fn top_genres_by_sales(&self, uow: &UnitOfWork<'_>, limit: usize) -> Result<Vec<GenreSales>>;
    fn upsert(&self, uow: &UnitOfWork<'_>, stat: &ContentMonthlyStat) -> Result<()>;
    fn delete(&self, uow: &UnitOfWork<'_>, content_id: i64) -> Result<bool>;
}

pub trait CommunityMonthlyRepository: Send + Sync {
    fn get(&self, uow: &UnitOfWork<'_>, community_id: i64)
        -> Result<Option<CommunityMonthlyStat>>;
    fn all_by_members(&self, uow: &UnitOfWork<'_>) -> Result<Vec<CommunityMonthlyStat>>;
    fn all_by_posts(&self, uow: &UnitOfWork<'_>) -> Result<Vec<CommunityMonthlyStat>>;
    fn upsert(&self, uow: &UnitOfWork<'_>, stat: &CommunityMonthlyStat) -> Result<()>;
}

/// One repository per statistic family.
#[derive(Clone)]
pub struct StatsRepositories {
    pub artists: Arc<dyn ArtistMonthlyRepository>,
    pub searches: Arc<dyn ArtistSearchRepository>,
    pub contents: Arc<dyn ContentMonthlyRepository>,
    pub communities: Arc<dyn CommunityMonthlyRepository>,
}

impl StatsRepositories {
    pub fn sqlite() -> Self {
        Self {
            artists: Arc::new(SqliteArtistMonthlyRepository),
            searches: Arc::new(SqliteArtistSearchRepository),
            contents: Arc::new(SqliteContentMonthlyRepository),
            communities: Arc::new(SqliteCommunityMonthlyRepository),
        }
    }
}

/// The stats database together with the repositories operating on it.
#[derive(Clone)]
pub struct StatsStore {
    database: StatsDatabase,
    repositories: StatsRepositories,
}

impl StatsStore {
    pub fn new(database: StatsDatabase, repositories: StatsRepositories) -> Self {
        Self {
            database,
            repositories,
        }
    }

    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Ok(Self::new(
            StatsDatabase::open(db_path)?,
            StatsRepositories::sqlite(),
        ))
    }

    pub fn repositories(&self) -> &StatsRepositories {
        &self.repositories
    }

    /// Runs `op` inside a fresh write unit of work, committing on success and rolling back
    /// on any error.
    pub fn write<T>(
        &self,
        op: impl FnOnce(&UnitOfWork<'_>, &StatsRepositories) -> Result<T>,
    ) -> Result<T> {
        let uow = self.database.begin()?;
        match op(&uow, &self.repositories) {
            Ok(value) => {
                uow.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = uow.rollback() {
                    warn!("Rollback after failed write also failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Runs `op` against a read snapshot.
    pub fn read<T>(
        &self,
        op: impl FnOnce(&UnitOfWork<'_>, &StatsRepositories) -> Result<T>,
    ) -> Result<T> {
        let uow = self.database.begin_read()?;
        let value = op(&uow, &self.repositories)?;
        uow.commit()?;
        Ok(value)
    }
}
