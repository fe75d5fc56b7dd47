use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stats_server::background_jobs::jobs::{MonthlyResyncJob, SearchCountsResetJob};
use stats_server::background_jobs::{create_scheduler, JobContext};
use stats_server::config;
use stats_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig, ServerState};
use stats_server::server_store::{ServerStore, SqliteServerStore};
use stats_server::stats::{RankingService, SearchCountRecorder, StatsSynchronizer};
use stats_server::stats_store::StatsStore;
use stats_server::upstream::{ArtistDirectoryClient, CommunityServiceClient, ContentCatalogClient};

/// Upper bound on how long Ctrl+C waits for the scheduler to wind down.
const SCHEDULER_SHUTDOWN_GRACE: Duration = Duration::from_secs(35);

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path_buf))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding stats.db and server.db. Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Base URL of the upstream artist directory.
    #[clap(long)]
    pub artists_url: Option<String>,

    /// Base URL of the upstream content catalog.
    #[clap(long)]
    pub contents_url: Option<String>,

    /// Base URL of the upstream community service.
    #[clap(long)]
    pub communities_url: Option<String>,

    /// Timeout in seconds of every upstream request.
    #[clap(long)]
    pub upstream_timeout_sec: Option<u64>,
}

impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            logging_level: args.logging_level.clone(),
            artists_url: args.artists_url.clone(),
            contents_url: args.contents_url.clone(),
            communities_url: args.communities_url.clone(),
            upstream_timeout_sec: args.upstream_timeout_sec,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  port: {}", app_config.port);
    info!("  artists_url: {}", app_config.upstream.artists_url);
    info!("  contents_url: {}", app_config.upstream.contents_url);
    info!("  communities_url: {}", app_config.upstream.communities_url);
    info!("  upstream timeout: {:?}", app_config.upstream.timeout);

    metrics::init_metrics();

    info!("Opening stats store at {:?}", app_config.stats_db_path());
    let stats_store = StatsStore::open(app_config.stats_db_path())?;

    info!(
        "Initializing server store at {:?}",
        app_config.server_db_path()
    );
    let server_store: Arc<dyn ServerStore> =
        Arc::new(SqliteServerStore::new(app_config.server_db_path())?);

    let upstream = &app_config.upstream;
    let synchronizer = Arc::new(StatsSynchronizer::new(
        stats_store.clone(),
        Arc::new(ArtistDirectoryClient::new(&upstream.artists_url, upstream.timeout)?),
        Arc::new(ContentCatalogClient::new(&upstream.contents_url, upstream.timeout)?),
        Arc::new(CommunityServiceClient::new(
            &upstream.communities_url,
            upstream.timeout,
        )?),
    ));
    let rankings = Arc::new(RankingService::new(stats_store.clone()));
    let search_counts = Arc::new(SearchCountRecorder::new(stats_store));

    // Jobs get their own token: the scheduler decides which of them to cancel on shutdown.
    let shutdown_token = CancellationToken::new();
    let job_context = JobContext::new(
        CancellationToken::new(),
        server_store.clone(),
        synchronizer.clone(),
        search_counts.clone(),
        tokio::runtime::Handle::current(),
    );

    let (mut scheduler, scheduler_handle) =
        create_scheduler(server_store, shutdown_token.clone(), job_context);

    let jobs_settings = &app_config.background_jobs;
    scheduler
        .register_job(Arc::new(MonthlyResyncJob::from_settings(
            jobs_settings.resync_interval_secs,
            jobs_settings.resync_on_startup,
        )))
        .await;
    scheduler
        .register_job(Arc::new(SearchCountsResetJob))
        .await;

    info!(
        "Job scheduler initialized with {} job(s)",
        scheduler.job_count().await
    );

    let mut scheduler_task = tokio::spawn(async move { scheduler.run().await });

    let state = ServerState::new(
        ServerConfig {
            requests_logging_level: app_config.logging_level.clone(),
            port: app_config.port,
        },
        synchronizer,
        rankings,
        search_counts,
        Some(scheduler_handle),
    );

    info!("Ready to serve at port {}!", app_config.port);

    let result = tokio::select! {
        result = run_server(state, shutdown_token.clone()) => {
            info!("HTTP server stopped: {:?}", result);
            result
        },
        _ = &mut scheduler_task => {
            error!("Scheduler stopped unexpectedly");
            Ok(())
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating graceful shutdown");
            Ok(())
        }
    };

    shutdown_token.cancel();
    if !scheduler_task.is_finished()
        && tokio::time::timeout(SCHEDULER_SHUTDOWN_GRACE, &mut scheduler_task)
            .await
            .is_err()
    {
        error!("Scheduler did not stop within {:?}", SCHEDULER_SHUTDOWN_GRACE);
    }

    result
}
