use thiserror::Error;

use crate::runner::RunState;

/// Errors raised while configuring or running a benchmark.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Required configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The payload image could not be encoded.
    #[error("payload generation failed: {0}")]
    Payload(#[from] image::ImageError),

    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] blobperf_store::StoreError),

    /// Downloading through a retrieval reference failed.
    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    /// Writing the metrics line failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline invariant was broken (stage skipped, nothing to try, ...).
    #[error("internal error: {0}")]
    Internal(String),
}

pub type BenchResult<T> = Result<T, BenchError>;

/// A run that stopped before reporting.
#[derive(Debug, Error)]
#[error("{failed_in} stage failed: {source}")]
pub struct RunFailure {
    /// The state the run was in when the error surfaced.
    pub failed_in: RunState,
    #[source]
    pub source: BenchError,
}
