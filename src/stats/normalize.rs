//! Conversion of upstream payloads into local stat rows. Nothing null or negative gets
//! past this point.

use crate::stats_store::{
    ArtistMonthlyStat, CommunityMonthlyStat, ContentMonthlyStat, UNKNOWN_GENRE,
};
use crate::upstream::{UpstreamArtist, UpstreamCommunity, UpstreamContent};

/// Absent, NaN and negative values become 0; fractions are truncated.
pub fn count(value: Option<f64>) -> u64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.min(i64::MAX as f64) as u64,
        _ => 0,
    }
}

pub fn rating(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

pub fn artist(artist_id: i64, upstream: UpstreamArtist) -> ArtistMonthlyStat {
    ArtistMonthlyStat {
        artist_id,
        listener_count: count(upstream.listeners),
        average_rating: rating(upstream.rating),
    }
}

pub fn content(content_id: i64, upstream: UpstreamContent, comment_count: u64) -> ContentMonthlyStat {
    let genre = upstream
        .genre
        .and_then(|g| g.name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_GENRE.to_string());
    ContentMonthlyStat {
        content_id,
        sales_count: count(upstream.sales),
        is_album: upstream.is_album.unwrap_or(false),
        average_rating: rating(upstream.rating),
        comment_count,
        genre,
        is_new: upstream.is_new.unwrap_or(false),
    }
}

pub fn community(upstream: &UpstreamCommunity) -> CommunityMonthlyStat {
    CommunityMonthlyStat {
        community_id: upstream.id,
        post_count: count(upstream.posts),
        member_count: count(upstream.members),
    }
}
