use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("metric already registered: {0}")]
    DuplicateMetric(String),
    #[error("metric source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("metric source timed out after {0:?}")]
    SourceTimeout(Duration),
    #[error("giving up after {failures} consecutive sampling failures: {last}")]
    TooManyFailures {
        failures: u32,
        #[source]
        last: Box<Error>,
    },
    #[error("scheduler is stopped")]
    Stopped,
    #[error("no sample in progress")]
    NoSampleInProgress,
    #[error("invalid instance pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("metric cannot be totalled: {0}")]
    NotAggregatable(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Transient errors are counted as missed ticks and retried on the next
    /// tick. Everything else stops the sampling loop.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_) | Self::SourceTimeout(_))
    }
}
