//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own databases and its own fake upstream.

use super::constants::*;
use super::upstream::FakeUpstream;
use stats_server::background_jobs::jobs::{MonthlyResyncJob, SearchCountsResetJob};
use stats_server::background_jobs::{create_scheduler, JobContext};
use stats_server::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use stats_server::server_store::{ServerStore, SqliteServerStore};
use stats_server::stats::{RankingService, SearchCountRecorder, StatsSynchronizer};
use stats_server::stats_store::StatsStore;
use stats_server::upstream::{ArtistDirectoryClient, CommunityServiceClient, ContentCatalogClient};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Test server instance with isolated databases
///
/// When dropped, the server and its scheduler (if any) shut down and the temporary
/// databases are removed.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    #[allow(dead_code)]
    pub port: u16,

    /// Upstream data served to this server
    pub upstream: FakeUpstream,

    _temp_db_dir: TempDir,
    _shutdown_tx: Option<oneshot::Sender<()>>,
    scheduler_shutdown: CancellationToken,
}

impl TestServer {
    /// Spawns a server without a job scheduler. Admin routes answer 503.
    pub async fn spawn() -> Self {
        Self::spawn_inner(false).await
    }

    /// Spawns a server with the monthly resync and search count reset jobs registered.
    ///
    /// Both jobs are calendar-driven, so nothing runs until a test triggers it. Tests
    /// running jobs should use the multi-threaded runtime.
    #[allow(dead_code)]
    pub async fn spawn_with_scheduler() -> Self {
        Self::spawn_inner(true).await
    }

    async fn spawn_inner(with_scheduler: bool) -> Self {
        let upstream = FakeUpstream::spawn().await;
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");

        let stats_store = StatsStore::open(temp_db_dir.path().join("stats.db"))
            .expect("Failed to open stats store");

        let timeout = Duration::from_secs(UPSTREAM_TIMEOUT_SECS);
        let synchronizer = Arc::new(StatsSynchronizer::new(
            stats_store.clone(),
            Arc::new(ArtistDirectoryClient::new(&upstream.base_url, timeout).unwrap()),
            Arc::new(ContentCatalogClient::new(&upstream.base_url, timeout).unwrap()),
            Arc::new(CommunityServiceClient::new(&upstream.base_url, timeout).unwrap()),
        ));
        let rankings = Arc::new(RankingService::new(stats_store.clone()));
        let search_counts = Arc::new(SearchCountRecorder::new(stats_store));

        let scheduler_shutdown = CancellationToken::new();
        let scheduler_handle = if with_scheduler {
            let server_store: Arc<dyn ServerStore> = Arc::new(
                SqliteServerStore::new(temp_db_dir.path().join("server.db"))
                    .expect("Failed to create server store"),
            );
            let job_context = JobContext::new(
                CancellationToken::new(),
                server_store.clone(),
                synchronizer.clone(),
                search_counts.clone(),
                tokio::runtime::Handle::current(),
            );
            let (mut scheduler, handle) =
                create_scheduler(server_store, scheduler_shutdown.clone(), job_context);
            scheduler
                .register_job(Arc::new(MonthlyResyncJob::default()))
                .await;
            scheduler
                .register_job(Arc::new(SearchCountsResetJob))
                .await;
            tokio::spawn(async move { scheduler.run().await });
            Some(handle)
        } else {
            None
        };

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener.local_addr().expect("No local address").port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
        };
        let state = ServerState::new(
            config,
            synchronizer,
            rankings,
            search_counts,
            scheduler_handle,
        );
        let app = make_app(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            upstream,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
            scheduler_shutdown,
        };

        server.wait_for_ready().await;

        server
    }

    /// Polls `/` until the server answers.
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.scheduler_shutdown.cancel();
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
