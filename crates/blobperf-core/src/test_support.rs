//! Shared fixtures for pipeline tests.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use blobperf_store::{BlobLocation, BlobStore, InMemoryBlobStore, StoreError};
use url::Url;

async fn get_blob(
    State(store): State<Arc<InMemoryBlobStore>>,
    Path((container, key)): Path<(String, String)>,
) -> Response {
    match store.get(&BlobLocation::new(container, key)).await {
        Ok(bytes) => bytes.into_response(),
        Err(StoreError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

/// Serve `store` read-only over HTTP on an ephemeral local port.
pub async fn serve_store(store: Arc<InMemoryBlobStore>) -> Url {
    let app = Router::new()
        .route("/:container/:key", get(get_blob))
        .with_state(store);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}")).unwrap()
}

/// An endpoint nothing listens on.
pub fn unreachable_endpoint() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}")).unwrap()
}
