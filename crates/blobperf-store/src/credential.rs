//! Ambient credential resolution.
//!
//! A [`CredentialChain`] walks an ordered list of [`CredentialSource`]s and
//! settles on the first one that produces a credential. Sources that fail
//! are logged and skipped; an exhausted chain yields
//! [`StorageCredential::Anonymous`].

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{StoreError, StoreResult};
use crate::shared_key::SharedKeyCredential;

/// OAuth resource requested for storage tokens.
pub const STORAGE_RESOURCE: &str = "https://storage.azure.com/";

/// How requests to the storage account are authorized.
#[derive(Clone)]
pub enum StorageCredential {
    /// Account shared key: signs requests and SAS tokens locally.
    SharedKey(SharedKeyCredential),
    /// OAuth bearer token from an identity provider.
    Bearer(String),
    /// No credential; relies on public access.
    Anonymous,
}

impl StorageCredential {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SharedKey(_) => "shared-key",
            Self::Bearer(_) => "bearer-token",
            Self::Anonymous => "anonymous",
        }
    }
}

impl std::fmt::Debug for StorageCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SharedKey(key) => write!(f, "SharedKey({key:?})"),
            Self::Bearer(_) => write!(f, "Bearer(<redacted>)"),
            Self::Anonymous => write!(f, "Anonymous"),
        }
    }
}

/// One link in the credential chain.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Human-readable name of this source (e.g., "account-key").
    fn name(&self) -> &str;

    /// Try to produce a credential for `account`.
    ///
    /// `Ok(None)` means the source is not configured here; `Err` means it is
    /// configured but broken.
    async fn resolve(&self, account: &str) -> StoreResult<Option<StorageCredential>>;
}

/// Shared key supplied through configuration (`AZURE_STORAGE_ACCOUNT_KEY`).
pub struct AccountKeySource {
    key: Option<String>,
}

impl AccountKeySource {
    pub fn new(key: Option<String>) -> Self {
        Self { key }
    }
}

#[async_trait]
impl CredentialSource for AccountKeySource {
    fn name(&self) -> &str {
        "account-key"
    }

    async fn resolve(&self, account: &str) -> StoreResult<Option<StorageCredential>> {
        Ok(self
            .key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .map(|k| StorageCredential::SharedKey(SharedKeyCredential::new(account, k))))
    }
}

/// Pre-acquired bearer token (`AZURE_STORAGE_ACCESS_TOKEN`).
pub struct AccessTokenSource {
    token: Option<String>,
}

impl AccessTokenSource {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl CredentialSource for AccessTokenSource {
    fn name(&self) -> &str {
        "access-token"
    }

    async fn resolve(&self, _account: &str) -> StoreResult<Option<StorageCredential>> {
        Ok(self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| StorageCredential::Bearer(t.to_string())))
    }
}

/// Token from a logged-in Azure CLI session.
pub struct AzureCliSource {
    program: String,
}

#[derive(Deserialize)]
struct CliToken {
    #[serde(rename = "accessToken")]
    access_token: String,
}

impl AzureCliSource {
    pub fn new() -> Self {
        Self::with_program("az")
    }

    /// Use a different executable (tests, non-standard installs).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn parse(stdout: &[u8]) -> StoreResult<String> {
        let token: CliToken = serde_json::from_slice(stdout)
            .map_err(|e| StoreError::Credential(format!("unexpected az output: {e}")))?;
        Ok(token.access_token)
    }
}

impl Default for AzureCliSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialSource for AzureCliSource {
    fn name(&self) -> &str {
        "azure-cli"
    }

    async fn resolve(&self, _account: &str) -> StoreResult<Option<StorageCredential>> {
        let output = tokio::process::Command::new(&self.program)
            .args([
                "account",
                "get-access-token",
                "--resource",
                STORAGE_RESOURCE,
                "--output",
                "json",
            ])
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            // Not installed: not configured rather than broken.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Credential(format!("{}: {e}", self.program))),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StoreError::Credential(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Self::parse(&output.stdout).map(|t| Some(StorageCredential::Bearer(t)))
    }
}

/// Ordered list of credential sources.
pub struct CredentialChain {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl CredentialChain {
    /// Start with an empty chain. Resolves to anonymous until sources are added.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// The ambient chain: account key, then access token, then the Azure CLI
    /// (when `use_azure_cli`).
    pub fn ambient(
        account_key: Option<String>,
        access_token: Option<String>,
        use_azure_cli: bool,
    ) -> Self {
        let mut chain = Self::new();
        chain.add_source(Box::new(AccountKeySource::new(account_key)));
        chain.add_source(Box::new(AccessTokenSource::new(access_token)));
        if use_azure_cli {
            chain.add_source(Box::new(AzureCliSource::new()));
        }
        chain
    }

    /// Append a source to the end of the chain.
    pub fn add_source(&mut self, source: Box<dyn CredentialSource>) {
        self.sources.push(source);
    }

    /// Number of sources in the chain.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Resolve a credential for `account`. Never fails.
    pub async fn resolve(&self, account: &str) -> StorageCredential {
        for source in &self.sources {
            match source.resolve(account).await {
                Ok(Some(credential)) => {
                    tracing::debug!(
                        source = source.name(),
                        kind = credential.kind(),
                        "resolved storage credential"
                    );
                    return credential;
                }
                Ok(None) => {
                    tracing::debug!(source = source.name(), "credential source not configured");
                }
                Err(e) => {
                    tracing::warn!(source = source.name(), "credential source failed: {e}");
                }
            }
        }
        tracing::debug!("no credential source produced a credential, using anonymous access");
        StorageCredential::Anonymous
    }
}

impl Default for CredentialChain {
    fn default() -> Self {
        Self::new()
    }
}
