use super::http::UpstreamHttp;
use super::{ArtistDirectory, UpstreamArtist, UpstreamEntityRef, UpstreamResult};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Client of the user/artist directory service.
pub struct ArtistDirectoryClient {
    http: UpstreamHttp,
}

impl ArtistDirectoryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: UpstreamHttp::new(base_url, timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }
}

#[async_trait]
impl ArtistDirectory for ArtistDirectoryClient {
    async fn fetch_artist(&self, artist_id: i64) -> UpstreamResult<UpstreamArtist> {
        self.http
            .get_json(
                &format!("/artists/{}", artist_id),
                &format!("artist {}", artist_id),
            )
            .await
    }

    async fn list_artists(&self) -> UpstreamResult<Vec<UpstreamEntityRef>> {
        self.http.get_json("/artists", "artist listing").await
    }
}
