mod file_config;

pub use file_config::{BackgroundJobsConfig, FileConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_UPSTREAM_TIMEOUT_SEC: u64 = 20;

/// CLI arguments that can be overridden by the TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub artists_url: Option<String>,
    pub contents_url: Option<String>,
    pub communities_url: Option<String>,
    pub upstream_timeout_sec: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub upstream: UpstreamSettings,
    pub background_jobs: BackgroundJobsSettings,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub artists_url: String,
    pub contents_url: String,
    pub communities_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackgroundJobsSettings {
    pub resync_interval_secs: Option<u64>,
    pub resync_on_startup: bool,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| anyhow!("db_dir must be specified via --db-dir or in config file"))?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let artists_url = required_url("artists_url", file.artists_url, &cli.artists_url)?;
        let contents_url = required_url("contents_url", file.contents_url, &cli.contents_url)?;
        let communities_url = required_url(
            "communities_url",
            file.communities_url,
            &cli.communities_url,
        )?;

        let upstream_timeout_sec = file
            .upstream_timeout_sec
            .or(cli.upstream_timeout_sec)
            .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SEC);
        if upstream_timeout_sec == 0 {
            bail!("upstream_timeout_sec must be greater than zero");
        }

        let jobs_file = file.background_jobs.unwrap_or_default();
        let background_jobs = BackgroundJobsSettings {
            resync_interval_secs: jobs_file.resync_interval_secs.filter(|secs| *secs > 0),
            resync_on_startup: jobs_file.resync_on_startup.unwrap_or(false),
        };

        Ok(Self {
            db_dir,
            port,
            logging_level,
            upstream: UpstreamSettings {
                artists_url,
                contents_url,
                communities_url,
                timeout: Duration::from_secs(upstream_timeout_sec),
            },
            background_jobs,
        })
    }

    pub fn stats_db_path(&self) -> PathBuf {
        self.db_dir.join("stats.db")
    }

    pub fn server_db_path(&self) -> PathBuf {
        self.db_dir.join("server.db")
    }
}

fn required_url(name: &str, from_file: Option<String>, from_cli: &Option<String>) -> Result<String> {
    from_file
        .or_else(|| from_cli.clone())
        .map(|url| url.trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| anyhow!("{} must be specified via the CLI or in config file", name))
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
