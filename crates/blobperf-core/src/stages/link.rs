use std::time::Duration;

use blobperf_store::{default_endpoint, BlobLocation, BlobSas, BlobSasPermissions, BlobStore};
use chrono::{DateTime, Utc};
use url::Url;

use crate::timing::{timed_sync, Timed};

/// Default lifetime of an issued link.
pub const DEFAULT_LINK_TTL: Duration = Duration::from_secs(60 * 60);

/// What kind of access a reference grants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Read-only SAS valid until `expires_at`.
    Signed { expires_at: DateTime<Utc> },
    /// Bare blob URL; readable only with ambient permissions.
    Plain,
}

/// A URL through which the uploaded blob can be read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrievalReference {
    pub url: String,
    pub kind: ReferenceKind,
}

impl RetrievalReference {
    pub fn is_signed(&self) -> bool {
        matches!(self.kind, ReferenceKind::Signed { .. })
    }
}

/// The outcome of a single link strategy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A reference was produced; stop here.
    Issued(RetrievalReference),
    /// The strategy does not apply to this store (e.g. no shared key).
    Unavailable { reason: String },
    /// The strategy applied but failed.
    Failed { reason: String },
}

/// One way of producing a retrieval reference.
///
/// Strategies are tried in order; the first `Issued` outcome wins.
pub trait LinkStrategy: Send + Sync {
    /// Human-readable name of this strategy.
    fn name(&self) -> &str;

    fn issue(&self, store: &dyn BlobStore, location: &BlobLocation, ttl: Duration) -> LinkOutcome;
}

/// Read-only SAS signed with the store's shared key.
pub struct SharedKeySas;

impl LinkStrategy for SharedKeySas {
    fn name(&self) -> &str {
        "shared-key-sas"
    }

    fn issue(&self, store: &dyn BlobStore, location: &BlobLocation, ttl: Duration) -> LinkOutcome {
        let Some(key) = store.shared_key() else {
            return LinkOutcome::Unavailable {
                reason: "no account key available".into(),
            };
        };

        let ttl = match chrono::Duration::from_std(ttl) {
            Ok(ttl) => ttl,
            Err(e) => return LinkOutcome::Failed { reason: format!("ttl out of range: {e}") },
        };
        let Some(expires_at) = Utc::now().checked_add_signed(ttl) else {
            return LinkOutcome::Failed {
                reason: "expiry overflows the calendar".into(),
            };
        };

        let sas = BlobSas::new(location.clone(), BlobSasPermissions::read_only(), expires_at);
        let signed = store
            .blob_url(location)
            .and_then(|url| sas.signed_url(&url, key));
        match signed {
            Ok(url) => LinkOutcome::Issued(RetrievalReference {
                url,
                kind: ReferenceKind::Signed { expires_at },
            }),
            Err(e) => LinkOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// The blob's own URL, without a token.
pub struct PlainUrl;

impl LinkStrategy for PlainUrl {
    fn name(&self) -> &str {
        "plain-url"
    }

    fn issue(&self, store: &dyn BlobStore, location: &BlobLocation, _ttl: Duration) -> LinkOutcome {
        match store.blob_url(location) {
            Ok(url) => LinkOutcome::Issued(RetrievalReference {
                url,
                kind: ReferenceKind::Plain,
            }),
            Err(e) => LinkOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// Produces retrieval references by trying strategies in order.
///
/// Issuing never fails: if every strategy declines, the reference is the
/// blob's URL under the account's public endpoint. When not even that can be
/// formed it is the bare `container/key` path, which only the store fallback
/// of the fetch stage can resolve.
pub struct LinkIssuer {
    strategies: Vec<Box<dyn LinkStrategy>>,
}

impl LinkIssuer {
    /// Start with an empty strategy list.
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Shared-key SAS, then plain URL.
    pub fn with_default_strategies() -> Self {
        let mut issuer = Self::new();
        issuer.add_strategy(Box::new(SharedKeySas));
        issuer.add_strategy(Box::new(PlainUrl));
        issuer
    }

    /// Append a strategy to the end of the list.
    pub fn add_strategy(&mut self, strategy: Box<dyn LinkStrategy>) {
        self.strategies.push(strategy);
    }

    /// Number of strategies.
    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    pub fn issue(&self, store: &dyn BlobStore, location: &BlobLocation, ttl: Duration) -> Timed<RetrievalReference> {
        let reference = timed_sync(|| self.run_strategies(store, location, ttl));
        match reference.value.kind {
            ReferenceKind::Signed { .. } => {
                tracing::info!("SAS URL generation completed in {:.2} ms", reference.elapsed_ms())
            }
            ReferenceKind::Plain => {
                tracing::info!("Blob URL generation completed in {:.2} ms", reference.elapsed_ms())
            }
        }
        reference
    }

    fn run_strategies(&self, store: &dyn BlobStore, location: &BlobLocation, ttl: Duration) -> RetrievalReference {
        for strategy in &self.strategies {
            match strategy.issue(store, location, ttl) {
                LinkOutcome::Issued(reference) => {
                    tracing::debug!(strategy = strategy.name(), "retrieval reference issued");
                    return reference;
                }
                LinkOutcome::Unavailable { reason } => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        "{reason}, using blob URL directly (requires appropriate permissions)"
                    );
                }
                LinkOutcome::Failed { reason } => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        "{} failed: {reason}. Using blob URL directly.",
                        strategy.name()
                    );
                }
            }
        }
        let url = last_resort_url(store.account_name(), location);
        tracing::warn!("no link strategy produced a URL, falling back to {url}");
        RetrievalReference {
            url,
            kind: ReferenceKind::Plain,
        }
    }
}

fn last_resort_url(account: &str, location: &BlobLocation) -> String {
    Url::parse(&default_endpoint(account))
        .ok()
        .and_then(|endpoint| location.url_under(&endpoint).ok())
        .map(String::from)
        .unwrap_or_else(|| location.to_string())
}

impl Default for LinkIssuer {
    fn default() -> Self {
        Self::with_default_strategies()
    }
}
