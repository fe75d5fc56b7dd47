use super::http::UpstreamHttp;
use super::{CommunityDirectory, UpstreamCommunity, UpstreamResult};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

pub struct CommunityServiceClient {
    http: UpstreamHttp,
}

impl CommunityServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: UpstreamHttp::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl CommunityDirectory for CommunityServiceClient {
    async fn list_communities(&self) -> UpstreamResult<Vec<UpstreamCommunity>> {
        self.http.get_json("/comunidad/", "community listing").await
    }
}
