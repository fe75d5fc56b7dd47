//! SQLite implementations of the stats repositories. They are stateless: every call works
//! on the connection of the unit of work it is handed.

use super::models::*;
use super::{
    ArtistMonthlyRepository, ArtistSearchRepository, CommunityMonthlyRepository,
    ContentMonthlyRepository, UnitOfWork,
};
use crate::period::Period;
use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

fn count_to_sql(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn count_from_sql(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn limit_to_sql(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

// =============================================================================
// Artist monthly stats
// =============================================================================

pub struct SqliteArtistMonthlyRepository;

const ARTIST_COLUMNS: &str = "artist_id, listener_count, average_rating";

fn row_to_artist(row: &Row) -> rusqlite::Result<ArtistMonthlyStat> {
    Ok(ArtistMonthlyStat {
        artist_id: row.get("artist_id")?,
        listener_count: count_from_sql(row.get("listener_count")?),
        average_rating: row.get("average_rating")?,
    })
}

impl ArtistMonthlyRepository for SqliteArtistMonthlyRepository {
    fn get(&self, uow: &UnitOfWork<'_>, artist_id: i64) -> Result<Option<ArtistMonthlyStat>> {
        uow.connection()
            .query_row(
                &format!(
                    "SELECT {} FROM artist_monthly_stats WHERE artist_id = ?1",
                    ARTIST_COLUMNS
                ),
                params![artist_id],
                row_to_artist,
            )
            .optional()
            .with_context(|| format!("Failed to read stats of artist {}", artist_id))
    }

    fn top_by_listeners(
        &self,
        uow: &UnitOfWork<'_>,
        limit: usize,
    ) -> Result<Vec<ArtistMonthlyStat>> {
        let mut stmt = uow.connection().prepare(&format!(
            "SELECT {} FROM artist_monthly_stats
             ORDER BY listener_count DESC, artist_id ASC LIMIT ?1",
            ARTIST_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![limit_to_sql(limit)], row_to_artist)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn upsert(&self, uow: &UnitOfWork<'_>, stat: &ArtistMonthlyStat) -> Result<()> {
        uow.connection()
            .execute(
                "INSERT INTO artist_monthly_stats (artist_id, listener_count, average_rating)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(artist_id) DO UPDATE SET
                    listener_count = excluded.listener_count,
                    average_rating = excluded.average_rating",
                params![
                    stat.artist_id,
                    count_to_sql(stat.listener_count),
                    stat.average_rating
                ],
            )
            .with_context(|| format!("Failed to upsert stats of artist {}", stat.artist_id))?;
        Ok(())
    }

    fn delete(&self, uow: &UnitOfWork<'_>, artist_id: i64) -> Result<bool> {
        let deleted = uow.connection().execute(
            "DELETE FROM artist_monthly_stats WHERE artist_id = ?1",
            params![artist_id],
        )?;
        Ok(deleted > 0)
    }
}

// =============================================================================
// Artist search counts
// =============================================================================

pub struct SqliteArtistSearchRepository;

impl ArtistSearchRepository for SqliteArtistSearchRepository {
    fn record(
        &self,
        uow: &UnitOfWork<'_>,
        artist_id: i64,
        user_id: Option<i64>,
        period: Period,
    ) -> Result<u64> {
        let conn = uow.connection();
        let period = period.to_string();
        let existing: Option<(i64, i64, String)> = conn
            .query_row(
                "SELECT id, search_count, period FROM artist_search_counts
                 WHERE artist_id = ?1 AND user_id IS ?2",
                params![artist_id, user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let new_count = match existing {
            Some((id, count, row_period)) => {
                // A counter left over from an earlier period starts again from zero.
                let new_count = if row_period == period { count + 1 } else { 1 };
                conn.execute(
                    "UPDATE artist_search_counts SET search_count = ?1, period = ?2 WHERE id = ?3",
                    params![new_count, period, id],
                )?;
                new_count
            }
            None => {
                conn.execute(
                    "INSERT INTO artist_search_counts (artist_id, user_id, search_count, period)
                     VALUES (?1, ?2, 1, ?3)",
                    params![artist_id, user_id, period],
                )?;
                1
            }
        };
        Ok(count_from_sql(new_count))
    }

    fn count(
        &self,
        uow: &UnitOfWork<'_>,
        artist_id: i64,
        user_id: Option<i64>,
        period: Period,
    ) -> Result<u64> {
        let count: Option<i64> = uow
            .connection()
            .query_row(
                "SELECT search_count FROM artist_search_counts
                 WHERE artist_id = ?1 AND user_id IS ?2 AND period = ?3",
                params![artist_id, user_id, period.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.map(count_from_sql).unwrap_or(0))
    }

    fn top_by_searches(
        &self,
        uow: &UnitOfWork<'_>,
        period: Period,
        limit: usize,
    ) -> Result<Vec<ArtistSearchRanking>> {
        let mut stmt = uow.connection().prepare(
            "SELECT artist_id, SUM(search_count) AS total FROM artist_search_counts
             WHERE period = ?1
             GROUP BY artist_id
             ORDER BY total DESC, artist_id ASC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![period.to_string(), limit_to_sql(limit)], |row| {
                Ok(ArtistSearchRanking {
                    artist_id: row.get(0)?,
                    search_count: count_from_sql(row.get(1)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn truncate(&self, uow: &UnitOfWork<'_>) -> Result<usize> {
        Ok(uow
            .connection()
            .execute("DELETE FROM artist_search_counts", [])?)
    }

    fn delete_by_artist(&self, uow: &UnitOfWork<'_>, artist_id: i64) -> Result<usize> {
        Ok(uow.connection().execute(
            "DELETE FROM artist_search_counts WHERE artist_id = ?1",
            params![artist_id],
        )?)
    }

    fn delete_by_user(&self, uow: &UnitOfWork<'_>, user_id: i64) -> Result<usize> {
        Ok(uow.connection().execute(
            "DELETE FROM artist_search_counts WHERE user_id = ?1",
            params![user_id],
        )?)
    }
}

// =============================================================================
// Content monthly stats
// =============================================================================

pub struct SqliteContentMonthlyRepository;

const CONTENT_COLUMNS: &str =
    "content_id, sales_count, is_album, average_rating, comment_count, genre, is_new";

fn row_to_content(row: &Row) -> rusqlite::Result<ContentMonthlyStat> {
    Ok(ContentMonthlyStat {
        content_id: row.get("content_id")?,
        sales_count: count_from_sql(row.get("sales_count")?),
        is_album: row.get("is_album")?,
        average_rating: row.get("average_rating")?,
        comment_count: count_from_sql(row.get("comment_count")?),
        genre: row.get("genre")?,
        is_new: row.get("is_new")?,
    })
}

impl SqliteContentMonthlyRepository {
    fn top_by(
        &self,
        uow: &UnitOfWork<'_>,
        order_column: &str,
        limit: usize,
    ) -> Result<Vec<ContentMonthlyStat>> {
        let mut stmt = uow.connection().prepare(&format!(
            "SELECT {} FROM content_monthly_stats
             ORDER BY {} DESC, content_id ASC LIMIT ?1",
            CONTENT_COLUMNS, order_column
        ))?;
        let rows = stmt
            .query_map(params![limit_to_sql(limit)], row_to_content)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl ContentMonthlyRepository for SqliteContentMonthlyRepository {
    fn get(&self, uow: &UnitOfWork<'_>, content_id: i64) -> Result<Option<ContentMonthlyStat>> {
        uow.connection()
            .query_row(
                &format!(
                    "SELECT {} FROM content_monthly_stats WHERE content_id = ?1",
                    CONTENT_COLUMNS
                ),
                params![content_id],
                row_to_content,
            )
            .optional()
            .with_context(|| format!("Failed to read stats of content {}", content_id))
    }

    fn top_by_rating(
        &self,
        uow: &UnitOfWork<'_>,
        limit: usize,
    ) -> Result<Vec<ContentMonthlyStat>> {
        self.top_by(uow, "average_rating", limit)
    }

    fn top_by_comments(
        &self,
        uow: &UnitOfWork<'_>,
        limit: usize,
    ) -> Result<Vec<ContentMonthlyStat>> {
        self.top_by(uow, "comment_count", limit)
    }

    fn top_by_sales(&self, uow: &UnitOfWork<'_>, limit: usize) -> Result<Vec<ContentMonthlyStat>> {
        self.top_by(uow, "sales_count", limit)
    }

    fn top_genres_by_sales(&self, uow: &UnitOfWork<'_>, limit: usize) -> Result<Vec<GenreSales>> {
        let mut stmt = uow.connection().prepare(
            "SELECT genre, SUM(sales_count) AS total FROM content_monthly_stats
             WHERE genre != ?1
             GROUP BY genre
             ORDER BY total DESC, genre ASC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![UNKNOWN_GENRE, limit_to_sql(limit)], |row| {
                Ok(GenreSales {
                    genre: row.get(0)?,
                    total_sales: count_from_sql(row.get(1)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn upsert(&self, uow: &UnitOfWork<'_>, stat: &ContentMonthlyStat) -> Result<()> {
        uow.connection()
            .execute(
                "INSERT INTO content_monthly_stats
                    (content_id, sales_count, is_album, average_rating, comment_count, genre, is_new)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(content_id) DO UPDATE SET
                    sales_count = excluded.sales_count,
                    is_album = excluded.is_album,
                    average_rating = excluded.average_rating,
                    comment_count = excluded.comment_count,
                    genre = excluded.genre,
                    is_new = excluded.is_new",
                params![
                    stat.content_id,
                    count_to_sql(stat.sales_count),
                    stat.is_album,
                    stat.average_rating,
                    count_to_sql(stat.comment_count),
                    stat.genre,
                    stat.is_new
                ],
            )
            .with_context(|| format!("Failed to upsert stats of content {}", stat.content_id))?;
        Ok(())
    }

    fn delete(&self, uow: &UnitOfWork<'_>, content_id: i64) -> Result<bool> {
        let deleted = uow.connection().execute(
            "DELETE FROM content_monthly_stats WHERE content_id = ?1",
            params![content_id],
        )?;
        Ok(deleted > 0)
    }
}

// =============================================================================
// Community monthly stats
// =============================================================================

pub struct SqliteCommunityMonthlyRepository;

fn row_to_community(row: &Row) -> rusqlite::Result<CommunityMonthlyStat> {
    Ok(CommunityMonthlyStat {
        community_id: row.get("community_id")?,
        post_count: count_from_sql(row.get("post_count")?),
        member_count: count_from_sql(row.get("member_count")?),
    })
}

impl SqliteCommunityMonthlyRepository {
    fn all_by(&self, uow: &UnitOfWork<'_>, order_column: &str) -> Result<Vec<CommunityMonthlyStat>> {
        let mut stmt = uow.connection().prepare(&format!(
            "SELECT community_id, post_count, member_count FROM community_monthly_stats
             ORDER BY {} DESC, community_id ASC",
            order_column
        ))?;
        let rows = stmt
            .query_map([], row_to_community)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl CommunityMonthlyRepository for SqliteCommunityMonthlyRepository {
    fn get(
        &self,
        uow: &UnitOfWork<'_>,
        community_id: i64,
    ) -> Result<Option<CommunityMonthlyStat>> {
        uow.connection()
            .query_row(
                "SELECT community_id, post_count, member_count FROM community_monthly_stats
                 WHERE community_id = ?1",
                params![community_id],
                row_to_community,
            )
            .optional()
            .with_context(|| format!("Failed to read stats of community {}", community_id))
    }

    fn all_by_members(&self, uow: &UnitOfWork<'_>) -> Result<Vec<CommunityMonthlyStat>> {
        self.all_by(uow, "member_count")
    }

    fn all_by_posts(&self, uow: &UnitOfWork<'_>) -> Result<Vec<CommunityMonthlyStat>> {
        self.all_by(uow, "post_count")
    }

    fn upsert(&self, uow: &UnitOfWork<'_>, stat: &CommunityMonthlyStat) -> Result<()> {
        uow.connection()
            .execute(
                "INSERT INTO community_monthly_stats (community_id, post_count, member_count)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(community_id) DO UPDATE SET
                    post_count = excluded.post_count,
                    member_count = excluded.member_count",
                params![
                    stat.community_id,
                    count_to_sql(stat.post_count),
                    count_to_sql(stat.member_count)
                ],
            )
            .with_context(|| {
                format!("Failed to upsert stats of community {}", stat.community_id)
            })?;
        Ok(())
    }
}
