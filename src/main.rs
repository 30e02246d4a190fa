//! Billing Aggregator
//!
//! Batch job over zipped detailed billing reports:
//! - Unpacks every archive in the data folder
//! - Decodes the `user:scalr-meta` tag of each row
//! - Sums cost per env, farm, farm role, and server on a worker pool
//! - Accumulates the totals into the SQLite billing store

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use billing_core::Error as BillingError;
use billing_store::{check_connection, init_schema, BillingStore, StoreConfig};
use pipeline::{PipelineConfig, PipelineRunner, RunReport};
use telemetry::{init_tracing_from_env, metrics};

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    store: StoreConfig,

    #[serde(default)]
    pipeline: PipelineConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Billing Aggregator v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    config
        .pipeline
        .check()
        .context("Invalid pipeline configuration")?;

    info!(
        data_folder = %config.pipeline.data_folder.display(),
        unzip_folder = %config.pipeline.unzip_folder.display(),
        threads = config.pipeline.num_threads,
        db_path = %config.store.path.display(),
        "Loaded configuration"
    );

    let store = Arc::new(
        BillingStore::open(config.store.clone()).context("Failed to open billing store")?,
    );
    if !check_connection(&store) {
        bail!("Billing store is not answering queries");
    }
    init_schema(&store).context("Failed to initialize billing store schema")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                _ = shutdown_signal() => {
                    warn!("Cancelling billing run");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        }
    });

    let job = {
        let store = store.clone();
        let cancel = cancel.clone();
        let pipeline = config.pipeline.clone();
        tokio::task::spawn_blocking(move || {
            PipelineRunner::new(&pipeline).run(store.as_ref(), &cancel)
        })
    };
    let outcome = job.await;
    // Stops the signal watcher.
    cancel.cancel();

    let report = match outcome.context("Billing run panicked")? {
        Ok(report) => report,
        Err(BillingError::Cancelled) => {
            info!("Billing run cancelled, nothing persisted");
            log_metrics();
            bail!("billing run cancelled");
        }
        Err(e) => {
            error!(error = %e, "Billing run failed");
            log_metrics();
            return Err(e).context("Billing run failed");
        }
    };

    log_report(&report);
    log_metrics();

    if !report.is_success() {
        bail!(
            "{} of {} archives failed",
            report.failures.len(),
            report.failures.len() + report.archives_processed
        );
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("BILLING")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat names for the settings operators change most
    if let Ok(path) = std::env::var("BILLING_DB_PATH") {
        config.store.path = path.into();
    }
    if let Ok(folder) = std::env::var("BILLING_DATA_FOLDER") {
        config.pipeline.data_folder = folder.into();
    }
    if let Ok(folder) = std::env::var("BILLING_UNZIP_FOLDER") {
        config.pipeline.unzip_folder = folder.into();
    }
    if let Ok(threads) = std::env::var("BILLING_NUM_THREADS") {
        config.pipeline.num_threads = threads
            .trim()
            .parse()
            .context("BILLING_NUM_THREADS must be a positive integer")?;
    }

    Ok(config)
}

fn log_report(report: &RunReport) {
    for failure in &report.failures {
        error!(archive = %failure.archive.display(), error = %failure.error, "Archive not aggregated");
    }
    info!(
        run_id = %report.run_id,
        started_at = %report.started_at,
        archives = report.archives_processed,
        failed = report.failures.len(),
        files = report.files_processed,
        files_skipped = report.files_skipped,
        rows = report.stats.rows_aggregated,
        rows_skipped = report.stats.rows_skipped,
        cost_errors = report.stats.cost_errors,
        persisted = report.aggregates_persisted,
        "Billing run report"
    );
}

fn log_metrics() {
    match serde_json::to_string(&metrics().snapshot()) {
        Ok(json) => info!(metrics = %json, "Metrics snapshot"),
        Err(e) => warn!(error = %e, "Failed to serialize metrics snapshot"),
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
