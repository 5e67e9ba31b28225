use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{StoreError, StoreResult};

/// Address of a blob inside a storage account: container plus key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobLocation {
    pub container: String,
    pub key: String,
}

impl BlobLocation {
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
        }
    }

    /// Resolve this location against a service endpoint.
    ///
    /// Path segments are appended to whatever path the endpoint already has,
    /// so emulator-style endpoints (`http://127.0.0.1:10000/devstoreaccount1`)
    /// address blobs the same way as `https://{account}.blob.core.windows.net`.
    /// Segments are percent-encoded.
    pub fn url_under(&self, endpoint: &Url) -> StoreResult<Url> {
        let mut url = endpoint.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                StoreError::InvalidEndpoint(format!("{endpoint} cannot carry a path"))
            })?;
            segments.pop_if_empty();
            segments.push(&self.container);
            for part in self.key.split('/') {
                segments.push(part);
            }
        }
        Ok(url)
    }
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.key)
    }
}
