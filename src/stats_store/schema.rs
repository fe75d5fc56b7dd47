//! SQLite schema of the stats database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

// =============================================================================
// Version 1
// =============================================================================

const ARTIST_MONTHLY_STATS_TABLE: Table = Table {
    name: "artist_monthly_stats",
    columns: &[
        sqlite_column!("artist_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "listener_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "average_rating",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[("idx_artist_monthly_stats_listeners", "listener_count DESC")],
};

/// One row per (artist, user) pair; `user_id` is NULL for anonymous searches, which is
/// why uniqueness is enforced by the repository rather than a UNIQUE constraint.
const ARTIST_SEARCH_COUNTS_TABLE: Table = Table {
    name: "artist_search_counts",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("artist_id", &SqlType::Integer, non_null = true),
        sqlite_column!("user_id", &SqlType::Integer),
        sqlite_column!(
            "search_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("period", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_artist_search_counts_artist_user", "artist_id, user_id"),
        ("idx_artist_search_counts_period", "period"),
    ],
};

const CONTENT_MONTHLY_STATS_TABLE_V1: Table = Table {
    name: "content_monthly_stats",
    columns: &[
        sqlite_column!("content_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "sales_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "is_album",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "average_rating",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "comment_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "genre",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'Unknown'")
        ),
    ],
    indices: &[("idx_content_monthly_stats_genre", "genre")],
};

const COMMUNITY_MONTHLY_STATS_TABLE: Table = Table {
    name: "community_monthly_stats",
    columns: &[
        sqlite_column!("community_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "post_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "member_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[],
};

// =============================================================================
// Version 2 - content novelty flag
// =============================================================================

const CONTENT_MONTHLY_STATS_TABLE_V2: Table = Table {
    name: "content_monthly_stats",
    columns: &[
        sqlite_column!("content_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "sales_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "is_album",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "average_rating",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "comment_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "genre",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'Unknown'")
        ),
        sqlite_column!(
            "is_new",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[("idx_content_monthly_stats_genre", "genre")],
};

fn migrate_v1_to_v2(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    conn.execute(
        "ALTER TABLE content_monthly_stats ADD COLUMN is_new INTEGER NOT NULL DEFAULT 0",
        [],
    )?;
    Ok(())
}

pub const STATS_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[
            ARTIST_MONTHLY_STATS_TABLE,
            ARTIST_SEARCH_COUNTS_TABLE,
            CONTENT_MONTHLY_STATS_TABLE_V1,
            COMMUNITY_MONTHLY_STATS_TABLE,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[
            ARTIST_MONTHLY_STATS_TABLE,
            ARTIST_SEARCH_COUNTS_TABLE,
            CONTENT_MONTHLY_STATS_TABLE_V2,
            COMMUNITY_MONTHLY_STATS_TABLE,
        ],
        migration: Some(migrate_v1_to_v2),
    },
];
