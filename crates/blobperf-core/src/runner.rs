use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use blobperf_store::BlobStore;
use bytes::Bytes;
use chrono::Utc;
use rand::Rng;

use crate::config::{BenchConfig, DEFAULT_CONTAINER};
use crate::error::{BenchError, RunFailure};
use crate::metrics::{MetricsBuilder, MetricsRecord};
use crate::payload::{PayloadGenerator, DEFAULT_MAX_SIZE_MB};
use crate::run_id::RunId;
use crate::stages::{upload, ContentFetcher, LinkIssuer, DEFAULT_LINK_TTL};

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

/// Where a run currently is. Runs move strictly forward through these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunState {
    Init,
    Generating,
    Uploading,
    Issuing,
    Fetching,
    Verifying,
    Reporting,
    CleaningUp,
    Done,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Generating => "generating",
            Self::Uploading => "uploading",
            Self::Issuing => "issuing",
            Self::Fetching => "fetching",
            Self::Verifying => "verifying",
            Self::Reporting => "reporting",
            Self::CleaningUp => "cleaning-up",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Verification and cleanup outcomes
// ---------------------------------------------------------------------------

/// Comparison of the downloaded bytes against the uploaded payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verification {
    pub expected_len: usize,
    pub actual_len: usize,
    pub expected_digest: blake3::Hash,
    pub actual_digest: blake3::Hash,
}

impl Verification {
    pub fn compare(expected: &[u8], actual: &[u8]) -> Self {
        Self {
            expected_len: expected.len(),
            actual_len: actual.len(),
            expected_digest: blake3::hash(expected),
            actual_digest: blake3::hash(actual),
        }
    }

    pub fn length_matches(&self) -> bool {
        self.expected_len == self.actual_len
    }

    pub fn digest_matches(&self) -> bool {
        self.expected_digest == self.actual_digest
    }
}

/// What happened to the payload blob at the end of the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanupOutcome {
    Deleted,
    /// The blob was already gone.
    Missing,
    /// Cleanup was disabled.
    Kept,
    /// Deletion failed; the blob may still exist.
    Failed { reason: String },
}

/// Everything a successful run produced.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub run_id: RunId,
    pub metrics: MetricsRecord,
    pub verification: Verification,
    pub signed_link: bool,
    pub cleanup: CleanupOutcome,
    /// Every state entered, in order, starting with `Init`.
    pub transitions: Vec<RunState>,
}

// ---------------------------------------------------------------------------
// RunSettings
// ---------------------------------------------------------------------------

/// Per-run knobs taken from [`BenchConfig`].
#[derive(Clone, Debug, PartialEq)]
pub struct RunSettings {
    pub container: String,
    pub max_size_mb: f64,
    pub link_ttl: Duration,
    pub cleanup: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            link_ttl: DEFAULT_LINK_TTL,
            cleanup: true,
        }
    }
}

impl From<&BenchConfig> for RunSettings {
    fn from(config: &BenchConfig) -> Self {
        Self {
            container: config.container.clone(),
            max_size_mb: config.max_size_mb,
            link_ttl: config.link_ttl,
            cleanup: config.cleanup,
        }
    }
}

// ---------------------------------------------------------------------------
// Progress tracking
// ---------------------------------------------------------------------------

struct Progress {
    transitions: Vec<RunState>,
}

impl Progress {
    fn new() -> Self {
        Self {
            transitions: vec![RunState::Init],
        }
    }

    fn current(&self) -> RunState {
        self.transitions.last().copied().unwrap_or(RunState::Init)
    }

    fn enter(&mut self, next: RunState) {
        tracing::debug!(from = %self.current(), to = %next, "run state");
        self.transitions.push(next);
    }

    /// Record the failure and tag `source` with the state it surfaced in.
    fn fail(&mut self, source: impl Into<BenchError>) -> RunFailure {
        let failed_in = self.current();
        self.enter(RunState::Failed);
        RunFailure {
            failed_in,
            source: source.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// BenchmarkRunner
// ---------------------------------------------------------------------------

/// Drives one round trip: generate, upload, issue a link, download, verify,
/// report, clean up.
///
/// Stages run strictly in sequence. The first stage error aborts the run
/// before anything is reported, and the blob is left in place.
pub struct BenchmarkRunner {
    store: Arc<dyn BlobStore>,
    client: reqwest::Client,
    settings: RunSettings,
    issuer: LinkIssuer,
}

impl BenchmarkRunner {
    pub fn new(store: Arc<dyn BlobStore>, client: reqwest::Client, settings: RunSettings) -> Self {
        Self {
            store,
            client,
            settings,
            issuer: LinkIssuer::with_default_strategies(),
        }
    }

    /// Replace the link strategies.
    pub fn with_link_issuer(mut self, issuer: LinkIssuer) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Execute a run, writing the metrics line to `out` on success.
    ///
    /// `out` receives exactly one line on success and nothing on failure.
    pub async fn run<R, W>(&self, rng: &mut R, out: &mut W) -> Result<RunReport, RunFailure>
    where
        R: Rng + ?Sized,
        W: Write + ?Sized,
    {
        let mut progress = Progress::new();
        let generator = PayloadGenerator::new(self.settings.max_size_mb)
            .map_err(|e| progress.fail(e))?;

        let run_id = RunId::generate(Utc::now(), rng);
        let location = run_id.location(&self.settings.container);
        let metrics = MetricsBuilder::new(run_id.clone(), Utc::now(), Instant::now());
        tracing::info!(
            "Starting performance test against storage account: {}",
            self.store.account_name()
        );
        tracing::debug!(%run_id, blob = %location, "run identity");

        progress.enter(RunState::Generating);
        tracing::info!("Step 1: Creating random image...");
        let payload = generator.generate(rng).map_err(|e| progress.fail(e))?;
        let metrics = metrics.with_payload(payload.size_mb());
        let original: Bytes = payload.into_bytes();

        progress.enter(RunState::Uploading);
        tracing::info!("Step 2: Uploading to blob storage...");
        let uploaded = upload(self.store.as_ref(), &location, original.clone())
            .await
            .map_err(|e| progress.fail(e))?;
        let metrics = metrics.with_upload(&uploaded);

        progress.enter(RunState::Issuing);
        tracing::info!("Step 3: Generating SAS URL...");
        let reference = self
            .issuer
            .issue(self.store.as_ref(), &location, self.settings.link_ttl);
        let metrics = metrics.with_link(&reference);

        progress.enter(RunState::Fetching);
        tracing::info!("Step 4: Downloading via SAS URL...");
        let fetcher = ContentFetcher::new(self.client.clone())
            .with_fallback(self.store.clone(), location.clone());
        let downloaded = fetcher
            .fetch(&reference.value)
            .await
            .map_err(|e| progress.fail(e))?;
        let metrics = metrics.with_download(&downloaded);

        progress.enter(RunState::Verifying);
        let verification = Verification::compare(&original, &downloaded.value);
        report_verification(&verification);

        progress.enter(RunState::Reporting);
        let record = metrics.finish().map_err(|e| progress.fail(e))?;
        let line = record.to_tagged_line().map_err(|e| progress.fail(e))?;
        for summary_line in record.summary_lines() {
            tracing::info!("{summary_line}");
        }
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|e| progress.fail(e))?;

        let cleanup = if self.settings.cleanup {
            progress.enter(RunState::CleaningUp);
            tracing::info!("Cleaning up test blob...");
            match self.store.delete(&location).await {
                Ok(true) => CleanupOutcome::Deleted,
                Ok(false) => {
                    tracing::warn!("test blob {location} was already gone");
                    CleanupOutcome::Missing
                }
                Err(e) => {
                    tracing::warn!("failed to delete test blob {location}: {e}");
                    CleanupOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        } else {
            tracing::info!("Keeping test blob {location}");
            CleanupOutcome::Kept
        };

        progress.enter(RunState::Done);
        Ok(RunReport {
            run_id,
            metrics: record,
            verification,
            signed_link: reference.value.is_signed(),
            cleanup,
            transitions: progress.transitions,
        })
    }
}

fn report_verification(verification: &Verification) {
    if !verification.length_matches() {
        tracing::warn!(
            "⚠ Download verification failed - size mismatch: {} vs {}",
            verification.actual_len,
            verification.expected_len
        );
    } else if !verification.digest_matches() {
        tracing::warn!("⚠ Download verification failed - content digest differs");
    } else {
        tracing::info!("✓ Download verification successful - file sizes match");
    }
}
