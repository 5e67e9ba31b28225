//! Benchmark configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `AZURE_STORAGE_*` environment variables, then command-line overrides.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BenchError, BenchResult};
use crate::payload::DEFAULT_MAX_SIZE_MB;
use crate::stages::DEFAULT_LINK_TTL;

pub const ENV_ACCOUNT_NAME: &str = "AZURE_STORAGE_ACCOUNT_NAME";
pub const ENV_ACCOUNT_ENDPOINT: &str = "AZURE_STORAGE_ACCOUNT_ENDPOINT";
pub const ENV_ACCOUNT_KEY: &str = "AZURE_STORAGE_ACCOUNT_KEY";
pub const ENV_ACCESS_TOKEN: &str = "AZURE_STORAGE_ACCESS_TOKEN";

/// Container used when none is configured.
pub const DEFAULT_CONTAINER: &str = "performance-test";

/// Read access to environment variables.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;

    /// Like [`EnvSource::var`], treating blank values as unset.
    fn non_empty(&self, name: &str) -> Option<String> {
        self.var(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// The process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// The TOML configuration file. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub account_name: Option<String>,
    pub endpoint: Option<String>,
    pub container: Option<String>,
    pub max_size_mb: Option<f64>,
    pub link_ttl_secs: Option<u64>,
    pub cleanup: Option<bool>,
    pub use_azure_cli: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> BenchResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(|e| match e {
            BenchError::Config(msg) => BenchError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn parse(text: &str) -> BenchResult<Self> {
        toml::from_str(text).map_err(|e| BenchError::Config(e.to_string()))
    }
}

/// Values given on the command line. `None` / `false` leave lower layers in
/// effect.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub account_name: Option<String>,
    pub endpoint: Option<String>,
    pub container: Option<String>,
    pub max_size_mb: Option<f64>,
    pub link_ttl_secs: Option<u64>,
    pub keep_blob: bool,
    pub no_azure_cli: bool,
}

/// Fully resolved, validated configuration of one run.
#[derive(Clone, PartialEq)]
pub struct BenchConfig {
    pub account_name: String,
    pub endpoint: String,
    pub container: String,
    pub max_size_mb: f64,
    pub link_ttl: Duration,
    pub cleanup: bool,
    pub use_azure_cli: bool,
    pub account_key: Option<String>,
    pub access_token: Option<String>,
}

impl BenchConfig {
    /// Read the optional file at `path`, then resolve.
    pub fn load(
        path: Option<&Path>,
        env: &dyn EnvSource,
        overrides: &ConfigOverrides,
    ) -> BenchResult<Self> {
        let file = match path {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, env, overrides)
    }

    pub fn resolve(
        file: FileConfig,
        env: &dyn EnvSource,
        overrides: &ConfigOverrides,
    ) -> BenchResult<Self> {
        let account_name = overrides
            .account_name
            .clone()
            .or_else(|| env.non_empty(ENV_ACCOUNT_NAME))
            .or(file.account_name)
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| {
                BenchError::Config(format!("{ENV_ACCOUNT_NAME} environment variable is required"))
            })?;

        let endpoint = overrides
            .endpoint
            .clone()
            .or_else(|| env.non_empty(ENV_ACCOUNT_ENDPOINT))
            .or(file.endpoint)
            .unwrap_or_else(|| blobperf_store::default_endpoint(&account_name));

        let container = overrides
            .container
            .clone()
            .or(file.container)
            .unwrap_or_else(|| DEFAULT_CONTAINER.to_string());

        let max_size_mb = overrides
            .max_size_mb
            .or(file.max_size_mb)
            .unwrap_or(DEFAULT_MAX_SIZE_MB);

        let link_ttl = overrides
            .link_ttl_secs
            .or(file.link_ttl_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LINK_TTL);

        let config = Self {
            account_name,
            endpoint,
            container,
            max_size_mb,
            link_ttl,
            cleanup: !overrides.keep_blob && file.cleanup.unwrap_or(true),
            use_azure_cli: !overrides.no_azure_cli && file.use_azure_cli.unwrap_or(true),
            account_key: env.non_empty(ENV_ACCOUNT_KEY),
            access_token: env.non_empty(ENV_ACCESS_TOKEN),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.account_name.trim().is_empty() {
            return Err(BenchError::Config(format!(
                "{ENV_ACCOUNT_NAME} environment variable is required"
            )));
        }
        let endpoint = Url::parse(&self.endpoint)
            .map_err(|e| BenchError::Config(format!("invalid endpoint {:?}: {e}", self.endpoint)))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(BenchError::Config(format!(
                "endpoint must be http or https, got {:?}",
                self.endpoint
            )));
        }
        if self.container.is_empty() {
            return Err(BenchError::Config("container name must not be empty".into()));
        }
        if !self.max_size_mb.is_finite() || self.max_size_mb <= 0.0 {
            return Err(BenchError::Config(format!(
                "max size must be a positive number of MB, got {}",
                self.max_size_mb
            )));
        }
        if self.link_ttl.is_zero() {
            return Err(BenchError::Config("link TTL must be positive".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for BenchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("BenchConfig")
            .field("account_name", &self.account_name)
            .field("endpoint", &self.endpoint)
            .field("container", &self.container)
            .field("max_size_mb", &self.max_size_mb)
            .field("link_ttl", &self.link_ttl)
            .field("cleanup", &self.cleanup)
            .field("use_azure_cli", &self.use_azure_cli)
            .field("account_key", &redact(&self.account_key))
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resolve(
        file: FileConfig,
        pairs: &[(&str, &str)],
        overrides: ConfigOverrides,
    ) -> BenchResult<BenchConfig> {
        BenchConfig::resolve(file, &env(pairs), &overrides)
    }

    // -----------------------------------------------------------------------
    // Required account
    // -----------------------------------------------------------------------

    #[test]
    fn missing_account_is_config_error() {
        let err = resolve(FileConfig::default(), &[], ConfigOverrides::default()).unwrap_err();
        match err {
            BenchError::Config(msg) => {
                assert!(msg.contains("AZURE_STORAGE_ACCOUNT_NAME"), "{msg}")
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn blank_account_counts_as_missing() {
        let err = resolve(
            FileConfig::default(),
            &[(ENV_ACCOUNT_NAME, "   ")],
            ConfigOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }

    // -----------------------------------------------------------------------
    // Defaults and layering
    // -----------------------------------------------------------------------

    #[test]
    fn defaults_from_account_only() {
        let c = resolve(
            FileConfig::default(),
            &[(ENV_ACCOUNT_NAME, "acct")],
            ConfigOverrides::default(),
        )
        .unwrap();
        assert_eq!(c.account_name, "acct");
        assert_eq!(c.endpoint, "https://acct.blob.core.windows.net");
        assert_eq!(c.container, "performance-test");
        assert_eq!(c.max_size_mb, 5.0);
        assert_eq!(c.link_ttl, Duration::from_secs(3600));
        assert!(c.cleanup);
        assert!(c.use_azure_cli);
        assert!(c.account_key.is_none());
        assert!(c.access_token.is_none());
    }

    #[test]
    fn env_endpoint_and_secrets() {
        let c = resolve(
            FileConfig::default(),
            &[
                (ENV_ACCOUNT_NAME, "acct"),
                (ENV_ACCOUNT_ENDPOINT, "http://127.0.0.1:10000/acct"),
                (ENV_ACCOUNT_KEY, "a2V5"),
                (ENV_ACCESS_TOKEN, " tok "),
            ],
            ConfigOverrides::default(),
        )
        .unwrap();
        assert_eq!(c.endpoint, "http://127.0.0.1:10000/acct");
        assert_eq!(c.account_key.as_deref(), Some("a2V5"));
        assert_eq!(c.access_token.as_deref(), Some("tok"));
    }

    #[test]
    fn file_below_env_below_flags() {
        let file = FileConfig {
            account_name: Some("from-file".into()),
            container: Some("file-container".into()),
            max_size_mb: Some(2.0),
            link_ttl_secs: Some(60),
            ..FileConfig::default()
        };

        let c = resolve(file.clone(), &[], ConfigOverrides::default()).unwrap();
        assert_eq!(c.account_name, "from-file");
        assert_eq!(c.container, "file-container");
        assert_eq!(c.max_size_mb, 2.0);
        assert_eq!(c.link_ttl, Duration::from_secs(60));

        let c = resolve(file.clone(), &[(ENV_ACCOUNT_NAME, "from-env")], ConfigOverrides::default())
            .unwrap();
        assert_eq!(c.account_name, "from-env");

        let overrides = ConfigOverrides {
            account_name: Some("from-flag".into()),
            max_size_mb: Some(0.5),
            ..ConfigOverrides::default()
        };
        let c = resolve(file, &[(ENV_ACCOUNT_NAME, "from-env")], overrides).unwrap();
        assert_eq!(c.account_name, "from-flag");
        assert_eq!(c.max_size_mb, 0.5);
    }

    #[test]
    fn keep_blob_and_no_azure_cli_flags() {
        let overrides = ConfigOverrides {
            keep_blob: true,
            no_azure_cli: true,
            ..ConfigOverrides::default()
        };
        let c = resolve(FileConfig::default(), &[(ENV_ACCOUNT_NAME, "acct")], overrides).unwrap();
        assert!(!c.cleanup);
        assert!(!c.use_azure_cli);
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn rejects_bad_values() {
        let base = [(ENV_ACCOUNT_NAME, "acct")];
        let cases = [
            ConfigOverrides { max_size_mb: Some(0.0), ..Default::default() },
            ConfigOverrides { max_size_mb: Some(f64::NAN), ..Default::default() },
            ConfigOverrides { link_ttl_secs: Some(0), ..Default::default() },
            ConfigOverrides { endpoint: Some("not a url".into()), ..Default::default() },
            ConfigOverrides { endpoint: Some("ftp://host/".into()), ..Default::default() },
            ConfigOverrides { container: Some(String::new()), ..Default::default() },
        ];
        for overrides in cases {
            let err = resolve(FileConfig::default(), &base, overrides.clone()).unwrap_err();
            assert!(matches!(err, BenchError::Config(_)), "{overrides:?}");
        }
    }

    // -----------------------------------------------------------------------
    // File format
    // -----------------------------------------------------------------------

    #[test]
    fn parses_toml_file() {
        let file = FileConfig::parse(
            r#"
            account_name = "acct"
            container = "bench"
            max_size_mb = 1.5
            link_ttl_secs = 600
            cleanup = false
            "#,
        )
        .unwrap();
        assert_eq!(file.account_name.as_deref(), Some("acct"));
        assert_eq!(file.max_size_mb, Some(1.5));
        assert_eq!(file.cleanup, Some(false));
        assert!(file.endpoint.is_none());
    }

    #[test]
    fn unknown_file_key_is_rejected() {
        let err = FileConfig::parse("acount_name = \"typo\"").unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BenchConfig::load(
            Some(Path::new("/nonexistent/blobperf.toml")),
            &env(&[(ENV_ACCOUNT_NAME, "acct")]),
            &ConfigOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BenchError::Io(_)));
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = resolve(
            FileConfig::default(),
            &[(ENV_ACCOUNT_NAME, "acct"), (ENV_ACCOUNT_KEY, "c2VjcmV0LWtleQ==")],
            ConfigOverrides::default(),
        )
        .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("c2VjcmV0LWtleQ=="));
        assert!(dbg.contains("[REDACTED]"));
    }
}
