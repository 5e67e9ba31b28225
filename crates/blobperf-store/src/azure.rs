use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use url::Url;

use crate::credential::StorageCredential;
use crate::error::{StoreError, StoreResult};
use crate::location::BlobLocation;
use crate::sas::SERVICE_VERSION;
use crate::shared_key::{SharedKeyCredential, SignedRequest};
use crate::traits::BlobStore;

const BLOB_CONTENT_TYPE: &str = "application/octet-stream";

/// Default public endpoint for an account.
pub fn default_endpoint(account: &str) -> String {
    format!("https://{account}.blob.core.windows.net")
}

/// Blob store backed by the Azure Blob Storage REST API.
///
/// Uses Put Blob (block blob, single shot), Get Blob and Delete Blob.
/// Requests are authorized according to the [`StorageCredential`] the store
/// was built with.
pub struct AzureBlobStore {
    account: String,
    endpoint: Url,
    credential: StorageCredential,
    client: Client,
}

impl AzureBlobStore {
    pub fn new(
        account: impl Into<String>,
        endpoint: &str,
        credential: StorageCredential,
    ) -> StoreResult<Self> {
        Self::with_client(account, endpoint, credential, Client::new())
    }

    /// Build with a caller-supplied HTTP client.
    pub fn with_client(
        account: impl Into<String>,
        endpoint: &str,
        credential: StorageCredential,
        client: Client,
    ) -> StoreResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| StoreError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(Self {
            account: account.into(),
            endpoint,
            credential,
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn credential(&self) -> &StorageCredential {
        &self.credential
    }

    /// Build and send one request, attaching auth headers.
    async fn send(
        &self,
        method: Method,
        location: &BlobLocation,
        body: Option<Bytes>,
    ) -> StoreResult<Response> {
        let url = location.url_under(&self.endpoint)?;
        let content_length = body.as_ref().map_or(0, |b| b.len() as u64);
        let content_type = if body.is_some() { BLOB_CONTENT_TYPE } else { "" };

        let mut ms_headers = vec![
            ("x-ms-date", Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()),
            ("x-ms-version", SERVICE_VERSION.to_string()),
        ];
        if method == Method::PUT {
            ms_headers.push(("x-ms-blob-type", "BlockBlob".to_string()));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &ms_headers {
            headers.insert(HeaderName::from_static(*name), header_value(value)?);
        }
        if !content_type.is_empty() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }

        match &self.credential {
            StorageCredential::SharedKey(key) => {
                let signed = SignedRequest {
                    method: method.as_str(),
                    content_length,
                    content_type,
                    ms_headers,
                    resource: self.canonical_resource(key, &url),
                };
                headers.insert(AUTHORIZATION, header_value(&signed.authorization(key)?)?);
            }
            StorageCredential::Bearer(token) => {
                headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
            }
            StorageCredential::Anonymous => {}
        }

        let mut request = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }
        Ok(request.send().await?)
    }

    fn canonical_resource(&self, key: &SharedKeyCredential, url: &Url) -> String {
        format!("/{}{}", key.account(), url.path())
    }

    async fn status_error(operation: &'static str, response: Response) -> StoreError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
        StoreError::Status {
            operation,
            status,
            message,
        }
    }
}

fn header_value(value: &str) -> StoreResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| StoreError::Signing(format!("invalid header value: {e}")))
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    fn account_name(&self) -> &str {
        &self.account
    }

    fn blob_url(&self, location: &BlobLocation) -> StoreResult<String> {
        Ok(location.url_under(&self.endpoint)?.into())
    }

    fn shared_key(&self) -> Option<&SharedKeyCredential> {
        match &self.credential {
            StorageCredential::SharedKey(key) => Some(key),
            _ => None,
        }
    }

    async fn put(&self, location: &BlobLocation, data: Bytes) -> StoreResult<()> {
        let response = self.send(Method::PUT, location, Some(data)).await?;
        if !response.status().is_success() {
            return Err(Self::status_error("put blob", response).await);
        }
        Ok(())
    }

    async fn get(&self, location: &BlobLocation) -> StoreResult<Bytes> {
        let response = self.send(Method::GET, location, None).await?;
        match response.status() {
            s if s.is_success() => Ok(response.bytes().await?),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(location.clone())),
            _ => Err(Self::status_error("get blob", response).await),
        }
    }

    async fn delete(&self, location: &BlobLocation) -> StoreResult<bool> {
        let response = self.send(Method::DELETE, location, None).await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::status_error("delete blob", response).await),
        }
    }
}

impl std::fmt::Debug for AzureBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureBlobStore")
            .field("account", &self.account)
            .field("endpoint", &self.endpoint.as_str())
            .field("credential", &self.credential.kind())
            .finish()
    }
}
