use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;
use crate::location::BlobLocation;
use crate::shared_key::SharedKeyCredential;

/// A blob store addressed by container + key.
///
/// All implementations must satisfy these invariants:
/// - `put` overwrites: after two puts to the same location only the second
///   payload is readable.
/// - `get` returns exactly the bytes of the latest `put`, or
///   [`StoreError::NotFound`](crate::StoreError::NotFound).
/// - Errors are propagated as-is; implementations never retry.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Storage account this store talks to.
    fn account_name(&self) -> &str;

    /// Plain (unsigned) URL of a blob.
    fn blob_url(&self, location: &BlobLocation) -> StoreResult<String>;

    /// Shared key usable for local SAS signing, when the store was built
    /// with one. Token-based and anonymous stores return `None`.
    fn shared_key(&self) -> Option<&SharedKeyCredential>;

    /// Create or overwrite a blob.
    async fn put(&self, location: &BlobLocation, data: Bytes) -> StoreResult<()>;

    /// Read a blob through the store's authenticated access path.
    async fn get(&self, location: &BlobLocation) -> StoreResult<Bytes>;

    /// Delete a blob. Returns `true` if the blob existed.
    async fn delete(&self, location: &BlobLocation) -> StoreResult<bool>;
}
