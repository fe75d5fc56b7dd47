use crate::upstream::UpstreamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl From<UpstreamError> for StatsError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::NotFound(what) => StatsError::NotFound(what),
            UpstreamError::Unavailable(reason) => StatsError::UpstreamUnavailable(reason),
        }
    }
}

impl StatsError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StatsError::NotFound(_) => "not_found",
            StatsError::UpstreamUnavailable(_) => "upstream_unavailable",
            StatsError::Validation(_) => "validation",
            StatsError::Store(_) => "store_error",
        }
    }
}

pub type StatsResult<T> = std::result::Result<T, StatsError>;
