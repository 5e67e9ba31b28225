use crate::location::BlobLocation;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested blob does not exist.
    #[error("blob not found: {0}")]
    NotFound(BlobLocation),

    /// The service answered with a non-success status.
    #[error("{operation} failed with HTTP {status}: {message}")]
    Status {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The configured endpoint cannot be used to address blobs.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A credential could not be resolved or is malformed.
    #[error("credential error: {0}")]
    Credential(String),

    /// Computing a Shared Key or SAS signature failed.
    #[error("signing error: {0}")]
    Signing(String),

    /// The backend refused the operation (used by the in-memory store's
    /// fault injection).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
