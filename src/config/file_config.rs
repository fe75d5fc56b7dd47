use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,

    // Upstream services
    pub artists_url: Option<String>,
    pub contents_url: Option<String>,
    pub communities_url: Option<String>,
    pub upstream_timeout_sec: Option<u64>,

    pub background_jobs: Option<BackgroundJobsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct BackgroundJobsConfig {
    /// Replaces the month-start trigger of the resync with a fixed interval.
    pub resync_interval_secs: Option<u64>,
    pub resync_on_startup: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
