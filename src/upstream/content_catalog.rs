use super::http::UpstreamHttp;
use super::{ContentCatalog, UpstreamComment, UpstreamContent, UpstreamEntityRef, UpstreamResult};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Client of the content catalog service.
pub struct ContentCatalogClient {
    http: UpstreamHttp,
}

impl ContentCatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: UpstreamHttp::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl ContentCatalog for ContentCatalogClient {
    async fn fetch_content(&self, content_id: i64) -> UpstreamResult<UpstreamContent> {
        self.http
            .get_json(
                &format!("/elementos/{}", content_id),
                &format!("content {}", content_id),
            )
            .await
    }

    async fn list_contents(&self) -> UpstreamResult<Vec<UpstreamEntityRef>> {
        self.http.get_json("/elementos", "content listing").await
    }

    async fn fetch_comments(&self, content_id: i64) -> UpstreamResult<Vec<UpstreamComment>> {
        self.http
            .get_json(
                &format!("/elementos/{}/comentarios", content_id),
                &format!("comments of content {}", content_id),
            )
            .await
    }
}
