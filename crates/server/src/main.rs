//! egecache server entry point.
//!
//! Loads configuration, brings the offline worker up (install, then
//! activate) and serves the inspection tools over stdio. Logging goes to
//! stderr so it stays out of the JSON-RPC stream on stdout.

use std::sync::Arc;

use anyhow::Result;
use egecache_client::{FetchClient, FetchConfig, Network, Worker, WorkerSettings};
use egecache_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        origin = %config.origin,
        version = %config.cache_version,
        db_path = %config.db_path.display(),
        "starting egecache"
    );

    let cache = CacheDb::open(&config.db_path).await?;
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);

    let mut worker = Worker::new(cache, Arc::clone(&network), WorkerSettings::from_config(&config)?)?;
    worker.start().await?;

    let state = Arc::new(handler::AppState { worker, network });
    let server = serve_server(handler::EgecacheServer::new(Arc::clone(&state)), stdio()).await?;
    server.waiting().await?;

    state.worker.wait_until_idle().await;
    tracing::info!("shut down");

    Ok(())
}
