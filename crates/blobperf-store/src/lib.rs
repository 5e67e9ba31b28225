//! Blob storage backends for blobperf.
//!
//! The benchmark only needs four things from an object store: put a blob,
//! read it back through an authenticated path, delete it, and tell how a
//! blob can be reached by URL. This crate provides that surface behind the
//! [`BlobStore`] trait, plus the signing machinery for handing out
//! time-limited read links.
//!
//! # Storage Backends
//!
//! - [`AzureBlobStore`] -- Azure Blob Storage over its REST API
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and offline runs,
//!   with injectable latency and failures
//!
//! # Authorization
//!
//! - [`CredentialChain`] -- ambient credential resolution (account key,
//!   bearer token, Azure CLI, anonymous)
//! - [`SignedRequest`] -- Shared Key request signatures
//! - [`BlobSas`] -- blob-scoped service SAS tokens

pub mod azure;
pub mod credential;
pub mod error;
pub mod location;
pub mod memory;
pub mod sas;
pub mod shared_key;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use azure::{default_endpoint, AzureBlobStore};
pub use credential::{
    AccessTokenSource, AccountKeySource, AzureCliSource, CredentialChain, CredentialSource,
    StorageCredential,
};
pub use error::{StoreError, StoreResult};
pub use location::BlobLocation;
pub use memory::{InMemoryBlobStore, Operation};
pub use sas::{BlobSas, BlobSasPermissions, SERVICE_VERSION};
pub use shared_key::{SharedKeyCredential, SignedRequest};
pub use traits::BlobStore;
