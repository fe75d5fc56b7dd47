//! Adapters for the upstream services that own the authoritative data.

mod artist_directory;
mod community_service;
mod content_catalog;
mod http;
mod models;

pub use artist_directory::ArtistDirectoryClient;
pub use community_service::CommunityServiceClient;
pub use content_catalog::ContentCatalogClient;
pub use models::*;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The upstream answered 404 for the requested entity.
    #[error("{0} not found upstream")]
    NotFound(String),
    /// Transport failure, timeout, non-404 error status or an unreadable body.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

pub type UpstreamResult<T> = std::result::Result<T, UpstreamError>;

#[async_trait]
pub trait ArtistDirectory: Send + Sync {
    async fn fetch_artist(&self, artist_id: i64) -> UpstreamResult<UpstreamArtist>;
    async fn list_artists(&self) -> UpstreamResult<Vec<UpstreamEntityRef>>;
}

#[async_trait]
pub trait ContentCatalog: Send + Sync {
    async fn fetch_content(&self, content_id: i64) -> UpstreamResult<UpstreamContent>;
    async fn list_contents(&self) -> UpstreamResult<Vec<UpstreamEntityRef>>;
    async fn fetch_comments(&self, content_id: i64) -> UpstreamResult<Vec<UpstreamComment>>;
}

#[async_trait]
pub trait CommunityDirectory: Send + Sync {
    /// The service has no lookup by id; callers scan this listing.
    async fn list_communities(&self) -> UpstreamResult<Vec<UpstreamCommunity>>;
}
