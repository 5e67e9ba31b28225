use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::error::{StoreError, StoreResult};
use crate::location::BlobLocation;
use crate::shared_key::SharedKeyCredential;
use crate::traits::BlobStore;

/// Store operations that can be made to fail on purpose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Put,
    Get,
    Delete,
}

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and offline runs. Blobs are held behind a `RwLock`.
/// Each operation can be slowed down by a fixed latency or made to fail,
/// which lets the benchmark pipeline be exercised without a network.
pub struct InMemoryBlobStore {
    account: String,
    endpoint: Url,
    shared_key: Option<SharedKeyCredential>,
    latency: Duration,
    blobs: RwLock<HashMap<BlobLocation, Bytes>>,
    failing: RwLock<HashSet<Operation>>,
}

impl InMemoryBlobStore {
    /// Endpoint used when none is given; not fetchable over HTTP.
    pub const DEFAULT_ENDPOINT: &'static str = "memory://blobperf.local/";

    /// Create a new empty store.
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            endpoint: Url::parse(Self::DEFAULT_ENDPOINT).expect("static endpoint parses"),
            shared_key: None,
            latency: Duration::ZERO,
            blobs: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Advertise blob URLs under `endpoint` (e.g. a local HTTP server that
    /// serves this store).
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Attach a shared key so SAS links can be issued.
    pub fn with_shared_key(mut self, key: impl Into<String>) -> Self {
        self.shared_key = Some(SharedKeyCredential::new(self.account.clone(), key));
        self
    }

    /// Delay every operation by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make `op` fail with [`StoreError::Unavailable`] until cleared.
    pub fn fail(&self, op: Operation) {
        self.failing.write().expect("lock poisoned").insert(op);
    }

    /// Stop failing `op`.
    pub fn recover(&self, op: Operation) {
        self.failing.write().expect("lock poisoned").remove(&op);
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Whether a blob is present, without going through fault injection.
    pub fn contains(&self, location: &BlobLocation) -> bool {
        self.blobs.read().expect("lock poisoned").contains_key(location)
    }

    /// Direct read that bypasses latency and fault injection.
    pub fn peek(&self, location: &BlobLocation) -> Option<Bytes> {
        self.blobs.read().expect("lock poisoned").get(location).cloned()
    }

    async fn enter(&self, op: Operation) -> StoreResult<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.failing.read().expect("lock poisoned").contains(&op) {
            return Err(StoreError::Unavailable(format!("{op:?} disabled")));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    fn account_name(&self) -> &str {
        &self.account
    }

    fn blob_url(&self, location: &BlobLocation) -> StoreResult<String> {
        Ok(location.url_under(&self.endpoint)?.into())
    }

    fn shared_key(&self) -> Option<&SharedKeyCredential> {
        self.shared_key.as_ref()
    }

    async fn put(&self, location: &BlobLocation, data: Bytes) -> StoreResult<()> {
        self.enter(Operation::Put).await?;
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(location.clone(), data);
        Ok(())
    }

    async fn get(&self, location: &BlobLocation) -> StoreResult<Bytes> {
        self.enter(Operation::Get).await?;
        self.peek(location)
            .ok_or_else(|| StoreError::NotFound(location.clone()))
    }

    async fn delete(&self, location: &BlobLocation) -> StoreResult<bool> {
        self.enter(Operation::Delete).await?;
        Ok(self
            .blobs
            .write()
            .expect("lock poisoned")
            .remove(location)
            .is_some())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("account", &self.account)
            .field("endpoint", &self.endpoint.as_str())
            .field("blob_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    fn loc(key: &str) -> BlobLocation {
        BlobLocation::new("performance-test", key)
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryBlobStore::new("acct");
        let data = Bytes::from_static(b"\xff\xd8 jpeg-ish bytes \x00\x01");
        store.put(&loc("a.jpg"), data.clone()).await.unwrap();
        assert_eq!(store.get(&loc("a.jpg")).await.unwrap(), data);
    }

    #[tokio::test]
    async fn put_overwrites_existing_blob() {
        let store = InMemoryBlobStore::new("acct");
        store.put(&loc("a.jpg"), Bytes::from_static(b"first")).await.unwrap();
        store.put(&loc("a.jpg"), Bytes::from_static(b"second")).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&loc("a.jpg")).await.unwrap(), Bytes::from_static(b"second"));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = InMemoryBlobStore::new("acct");
        let err = store.get(&loc("missing")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(l) if l == loc("missing")));
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = InMemoryBlobStore::new("acct");
        store.put(&loc("d"), Bytes::from_static(b"x")).await.unwrap();
        assert!(store.delete(&loc("d")).await.unwrap());
        assert!(!store.delete(&loc("d")).await.unwrap());
        assert!(store.is_empty());
    }

    // -----------------------------------------------------------------------
    // URLs and credentials
    // -----------------------------------------------------------------------

    #[test]
    fn blob_url_uses_endpoint() {
        let store = InMemoryBlobStore::new("acct")
            .with_endpoint(Url::parse("http://127.0.0.1:8080").unwrap());
        assert_eq!(
            store.blob_url(&loc("a.jpg")).unwrap(),
            "http://127.0.0.1:8080/performance-test/a.jpg"
        );
    }

    #[test]
    fn shared_key_is_optional() {
        let plain = InMemoryBlobStore::new("acct");
        assert!(plain.shared_key().is_none());
        let keyed = InMemoryBlobStore::new("acct").with_shared_key("a2V5");
        assert_eq!(keyed.shared_key().unwrap().account(), "acct");
    }

    // -----------------------------------------------------------------------
    // Fault injection and latency
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn failing_operation_errors_until_recovered() {
        let store = InMemoryBlobStore::new("acct");
        store.fail(Operation::Put);
        let err = store.put(&loc("a"), Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(!store.contains(&loc("a")));

        store.recover(Operation::Put);
        store.put(&loc("a"), Bytes::from_static(b"x")).await.unwrap();
        assert!(store.contains(&loc("a")));
    }

    #[tokio::test]
    async fn peek_bypasses_failures() {
        let store = InMemoryBlobStore::new("acct");
        store.put(&loc("a"), Bytes::from_static(b"x")).await.unwrap();
        store.fail(Operation::Get);
        assert!(store.get(&loc("a")).await.is_err());
        assert_eq!(store.peek(&loc("a")), Some(Bytes::from_static(b"x")));
    }

    #[tokio::test]
    async fn latency_is_applied() {
        let store = InMemoryBlobStore::new("acct").with_latency(Duration::from_millis(15));
        let start = Instant::now();
        store.put(&loc("a"), Bytes::from_static(b"x")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[tokio::test]
    async fn usable_as_trait_object() {
        let store: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new("acct"));
        store.put(&loc("t"), Bytes::from_static(b"dyn")).await.unwrap();
        assert_eq!(store.get(&loc("t")).await.unwrap(), Bytes::from_static(b"dyn"));
        assert_eq!(store.account_name(), "acct");
    }
}
