//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per stats server endpoint. When routes or request
//! formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    #[allow(dead_code)]
    pub client: reqwest::Client,
    pub base_url: String,
}

#[allow(dead_code)]
impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Request failed")
    }

    async fn put_json(&self, path: &str, body: serde_json::Value) -> Response {
        self.client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Request failed")
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) -> Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Request failed")
    }

    async fn post_empty(&self, path: &str) -> Response {
        self.client
            .post(self.url(path))
            .send()
            .await
            .expect("Request failed")
    }

    async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("Request failed")
    }

    fn with_limit(path: &str, limit: Option<i64>) -> String {
        match limit {
            Some(limit) => format!("{}?limit={}", path, limit),
            None => path.to_string(),
        }
    }

    // ========================================================================
    // Server
    // ========================================================================

    pub async fn get_home(&self) -> Response {
        self.get("/").await
    }

    pub async fn get_metrics(&self) -> Response {
        self.get("/metrics").await
    }

    // ========================================================================
    // Artists
    // ========================================================================

    pub async fn sync_artist(&self, artist_id: i64) -> Response {
        self.put_json("/v1/stats/artists", json!({ "artistId": artist_id }))
            .await
    }

    pub async fn get_artist(&self, artist_id: i64) -> Response {
        self.get(&format!("/v1/stats/artists/{}", artist_id)).await
    }

    pub async fn delete_artist(&self, artist_id: i64) -> Response {
        self.delete(&format!("/v1/stats/artists/{}", artist_id))
            .await
    }

    pub async fn artists_by_listeners(&self, limit: Option<i64>) -> Response {
        self.get(&Self::with_limit("/v1/stats/artists/ranking/listeners", limit))
            .await
    }

    pub async fn artists_by_searches(&self, limit: Option<i64>) -> Response {
        self.get(&Self::with_limit("/v1/stats/artists/ranking/searches", limit))
            .await
    }

    pub async fn record_search(&self, artist_id: i64, user_id: Option<i64>) -> Response {
        self.post_json(
            "/v1/stats/artists/searches",
            json!({ "artistId": artist_id, "userId": user_id }),
        )
        .await
    }

    pub async fn reset_searches(&self) -> Response {
        self.delete("/v1/stats/artists/searches").await
    }

    // ========================================================================
    // Contents
    // ========================================================================

    pub async fn sync_content(&self, content_id: i64) -> Response {
        self.put_json("/v1/stats/contents", json!({ "contentId": content_id }))
            .await
    }

    pub async fn get_content(&self, content_id: i64) -> Response {
        self.get(&format!("/v1/stats/contents/{}", content_id))
            .await
    }

    pub async fn delete_content(&self, content_id: i64) -> Response {
        self.delete(&format!("/v1/stats/contents/{}", content_id))
            .await
    }

    pub async fn content_ranking(&self, metric: &str, limit: Option<i64>) -> Response {
        self.get(&Self::with_limit(
            &format!("/v1/stats/contents/ranking/{}", metric),
            limit,
        ))
        .await
    }

    pub async fn genres_by_sales(&self, limit: Option<i64>) -> Response {
        self.get(&Self::with_limit("/v1/stats/genres/ranking/sales", limit))
            .await
    }

    // ========================================================================
    // Communities
    // ========================================================================

    pub async fn sync_community(&self, community_id: i64) -> Response {
        self.put_json(
            "/v1/stats/communities",
            json!({ "communityId": community_id }),
        )
        .await
    }

    pub async fn get_community(&self, community_id: i64) -> Response {
        self.get(&format!("/v1/stats/communities/{}", community_id))
            .await
    }

    pub async fn community_ranking(&self, metric: &str) -> Response {
        self.get(&format!("/v1/stats/communities/ranking/{}", metric))
            .await
    }

    // ========================================================================
    // Batch sync
    // ========================================================================

    pub async fn batch_sync(&self, family: &str) -> Response {
        self.post_empty(&format!("/v1/stats/sync/{}", family)).await
    }

    // ========================================================================
    // Admin
    // ========================================================================

    pub async fn admin_list_jobs(&self) -> Response {
        self.get("/v1/admin/jobs").await
    }

    pub async fn admin_get_job(&self, job_id: &str) -> Response {
        self.get(&format!("/v1/admin/jobs/{}", job_id)).await
    }

    pub async fn admin_trigger_job(&self, job_id: &str) -> Response {
        self.post_empty(&format!("/v1/admin/jobs/{}/trigger", job_id))
            .await
    }

    pub async fn admin_get_job_history(&self, job_id: &str, limit: Option<i64>) -> Response {
        self.get(&Self::with_limit(
            &format!("/v1/admin/jobs/{}/history", job_id),
            limit,
        ))
        .await
    }

    pub async fn admin_get_job_audit(&self, job_id: &str) -> Response {
        self.get(&format!("/v1/admin/jobs/{}/audit", job_id))
            .await
    }
}
