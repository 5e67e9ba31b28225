//! Round-trip latency benchmark for blob storage.
//!
//! One run generates a random JPEG, uploads it, issues a time-limited read
//! link, downloads the blob through that link (falling back to an
//! authenticated store read), verifies the bytes, reports the timings and
//! deletes the blob.
//!
//! The report is a single stdout line, `PERFORMANCE_METRICS_JSON:` followed
//! by a JSON object, plus a human summary written through `tracing`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use blobperf_core::{BenchmarkRunner, RunSettings};
//! use blobperf_store::InMemoryBlobStore;
//! use rand::SeedableRng;
//!
//! # async fn demo() {
//! let store = Arc::new(InMemoryBlobStore::new("devstore"));
//! let runner = BenchmarkRunner::new(store, reqwest::Client::new(), RunSettings::default());
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let report = runner.run(&mut rng, &mut std::io::stdout()).await.unwrap();
//! assert!(report.verification.digest_matches());
//! # }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod payload;
pub mod run_id;
pub mod runner;
pub mod stages;
pub mod timing;

#[cfg(test)]
mod test_support;

// Re-exports for convenience.
pub use config::{
    BenchConfig, ConfigOverrides, EnvSource, FileConfig, ProcessEnv, DEFAULT_CONTAINER,
    ENV_ACCESS_TOKEN, ENV_ACCOUNT_ENDPOINT, ENV_ACCOUNT_KEY, ENV_ACCOUNT_NAME,
};
pub use error::{BenchError, BenchResult, RunFailure};
pub use metrics::{MetricsBuilder, MetricsRecord, METRICS_PREFIX};
pub use payload::{Dimensions, Payload, PayloadGenerator, PixelBudget, DEFAULT_MAX_SIZE_MB};
pub use run_id::RunId;
pub use runner::{BenchmarkRunner, CleanupOutcome, RunReport, RunSettings, RunState, Verification};
pub use stages::{
    ContentFetcher, FetchStrategy, LinkIssuer, LinkOutcome, LinkStrategy, ReferenceKind,
    RetrievalReference, DEFAULT_LINK_TTL,
};
pub use timing::Timed;
