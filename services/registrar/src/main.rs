//! pidreg Registrar
//!
//! Runs the registration worker: queued actions plus the periodic retry
//! sweep over records left at an intent status.

use std::sync::Arc;

use anyhow::Result;
use pidreg_registrar::{
    config::Config,
    resource::{InMemoryResources, ResourceDirectory, RestDirectoryConfig, RestResourceDirectory},
    worker::{RegistrationWorker, WorkerConfig},
    Connectors, RecordStore, Registrar,
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Prefer RUST_LOG, fall back to PIDREG_LOG_LEVEL
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting pidreg registrar");
    info!(
        db_path = %config.db_path.display(),
        dark_enabled = config.dark.enabled,
        doi_enabled = config.doi.enabled,
        "Configuration loaded"
    );

    let store = match RecordStore::open(&config.db_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(error = %e, "Failed to open record store");
            return Err(e.into());
        }
    };

    let resources: Arc<dyn ResourceDirectory> = match &config.repository_api_url {
        Some(base_url) => Arc::new(RestResourceDirectory::new(&RestDirectoryConfig {
            base_url: base_url.clone(),
            timeout: config.http_timeout,
        })?),
        None => {
            warn!("PIDREG_REPOSITORY_API_URL not set, using an empty in-memory directory");
            Arc::new(InMemoryResources::new())
        }
    };

    let connectors = Connectors::from_config(&config)?;
    let registrar = Arc::new(Registrar::new(
        store,
        resources,
        connectors,
        config.payload.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Held until shutdown so the job queue stays open.
    let (worker, handle) = RegistrationWorker::new(
        registrar,
        WorkerConfig {
            sweep_interval: config.sweep_interval,
            ..WorkerConfig::default()
        },
    );
    let worker_handle = tokio::spawn(worker.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    let _ = shutdown_tx.send(true);
    drop(handle);

    let shutdown_timeout = std::time::Duration::from_secs(10);
    if let Err(e) = tokio::time::timeout(shutdown_timeout, worker_handle).await {
        warn!(error = %e, "Registration worker did not shut down in time");
    }

    info!("Registrar shutdown complete");
    Ok(())
}
