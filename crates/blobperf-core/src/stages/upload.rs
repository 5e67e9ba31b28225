use blobperf_store::{BlobLocation, BlobStore, StoreResult};
use bytes::Bytes;

use crate::timing::{timed, Timed};

/// Upload `data` to `location`, overwriting any existing blob.
///
/// The window covers the store call only; the store handle is built by the
/// caller. Store errors are returned unchanged.
pub async fn upload(store: &dyn BlobStore, location: &BlobLocation, data: Bytes) -> StoreResult<Timed<()>> {
    let result = timed(store.put(location, data)).await.transpose()?;
    tracing::info!("Upload completed in {:.2} ms", result.elapsed_ms());
    Ok(result)
}
