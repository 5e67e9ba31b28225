use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use blobperf_core::{BenchConfig, BenchmarkRunner, CleanupOutcome, EnvSource, RunSettings};
use blobperf_store::{AzureBlobStore, CredentialChain};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cli::Cli;

/// Run one benchmark and map the outcome to a process exit code.
///
/// Only a successful run writes to `out`.
pub fn run_command(cli: Cli, env: &dyn EnvSource, out: &mut dyn Write) -> u8 {
    match execute(&cli, env, out) {
        Ok(()) => {
            tracing::info!("Performance test completed successfully!");
            0
        }
        Err(e) => {
            tracing::error!("Performance test failed: {e:#}");
            eprintln!("{} {e:#}", "error:".red().bold());
            1
        }
    }
}

fn execute(cli: &Cli, env: &dyn EnvSource, out: &mut dyn Write) -> anyhow::Result<()> {
    let config = BenchConfig::load(cli.config.as_deref(), env, &cli.overrides())?;
    tracing::debug!(?config, "resolved configuration");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run_benchmark(config, out))
}

async fn run_benchmark(config: BenchConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    let chain = CredentialChain::ambient(
        config.account_key.clone(),
        config.access_token.clone(),
        config.use_azure_cli,
    );
    let credential = chain.resolve(&config.account_name).await;

    let client = reqwest::Client::new();
    let store = AzureBlobStore::with_client(
        config.account_name.clone(),
        &config.endpoint,
        credential,
        client.clone(),
    )?;
    let runner = BenchmarkRunner::new(Arc::new(store), client, RunSettings::from(&config));

    let report = runner.run(&mut StdRng::from_entropy(), out).await?;
    if let CleanupOutcome::Failed { reason } = &report.cleanup {
        eprintln!(
            "{} test blob for {} was not deleted: {reason}",
            "warning:".yellow().bold(),
            report.run_id
        );
    }
    Ok(())
}
