use std::path::PathBuf;

use blobperf_core::ConfigOverrides;
use clap::error::ErrorKind;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "blobperf",
    about = "Blob storage round-trip latency benchmark",
    version,
)]
pub struct Cli {
    /// TOML file with default settings
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Storage account name (overrides AZURE_STORAGE_ACCOUNT_NAME)
    #[arg(long)]
    pub account: Option<String>,

    /// Blob service endpoint (overrides AZURE_STORAGE_ACCOUNT_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Container holding the test blob
    #[arg(long)]
    pub container: Option<String>,

    /// Approximate upper bound on the payload size
    #[arg(long, value_name = "MB")]
    pub max_size_mb: Option<f64>,

    /// Lifetime of the signed download link
    #[arg(long, value_name = "SECS")]
    pub link_ttl_secs: Option<u64>,

    /// Leave the test blob in place after a successful run
    #[arg(long)]
    pub keep_blob: bool,

    /// Do not ask the Azure CLI for an access token
    #[arg(long)]
    pub no_azure_cli: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            account_name: self.account.clone(),
            endpoint: self.endpoint.clone(),
            container: self.container.clone(),
            max_size_mb: self.max_size_mb,
            link_ttl_secs: self.link_ttl_secs,
            keep_blob: self.keep_blob,
            no_azure_cli: self.no_azure_cli,
        }
    }
}

/// Exit code for arguments clap rejected, matching configuration errors.
/// Help and version requests yield `None` and are left to clap.
pub fn rejection_code(err: &clap::Error) -> Option<u8> {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => None,
        _ => Some(1),
    }
}
