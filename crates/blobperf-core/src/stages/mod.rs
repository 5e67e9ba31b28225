//! The timed stages of a run: upload, link issuance and download.

pub mod fetch;
pub mod link;
pub mod upload;

pub use fetch::{ContentFetcher, FetchStrategy, StoreFetch, UrlFetch};
pub use link::{
    LinkIssuer, LinkOutcome, LinkStrategy, PlainUrl, ReferenceKind, RetrievalReference,
    SharedKeySas, DEFAULT_LINK_TTL,
};
pub use upload::upload;
