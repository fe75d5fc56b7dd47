use serde::{Deserialize, Serialize};

/// Genre assigned to content whose upstream record carries none.
pub const UNKNOWN_GENRE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistMonthlyStat {
    pub artist_id: i64,
    pub listener_count: u64,
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMonthlyStat {
    pub content_id: i64,
    pub sales_count: u64,
    pub is_album: bool,
    pub average_rating: f64,
    pub comment_count: u64,
    pub genre: String,
    pub is_new: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityMonthlyStat {
    pub community_id: i64,
    pub post_count: u64,
    pub member_count: u64,
}

/// Searches of one artist in a period, summed over every user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistSearchRanking {
    pub artist_id: i64,
    pub search_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreSales {
    pub genre: String,
    pub total_sales: u64,
}
