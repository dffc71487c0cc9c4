//! RRR Server - HTTP API and command-line front end
//!
//! Wires the production collaborators into a [`Pipeline`] and exposes it
//! over warp; the `rrr` binary adds one-shot `analyze` and `purge`
//! commands.

pub mod config;
pub mod routes;
pub mod telemetry;

pub use config::{AppConfig, ServerConfig, DEFAULT_BIND};
pub use routes::{error_response, routes, AnalyzeRequest, ErrorBody};

use rrr_cache::{CacheStore, MemoryBackend};
use rrr_core::{AnalysisPayload, Collaborators, Pipeline, PipelineConfig};
use std::sync::Arc;
use std::time::Duration;

/// Cache store for `config`: SQLite on disk, or memory when `persist` is off
///
/// # Errors
/// Returns an error if the database cannot be opened.
pub fn open_cache(
    config: &PipelineConfig,
    persist: bool,
) -> anyhow::Result<Arc<CacheStore<AnalysisPayload>>> {
    let store = if persist {
        CacheStore::open(&config.cache)?
    } else {
        CacheStore::new(Arc::new(MemoryBackend::new()), &config.cache)
    };
    Ok(Arc::new(store))
}

/// Production pipeline: PDF extraction, Azure OpenAI, SVG charts
///
/// # Errors
/// Returns an error if the LLM settings are incomplete or the cache cannot
/// be opened.
pub fn build_pipeline(config: &PipelineConfig, persist: bool) -> anyhow::Result<Pipeline> {
    let collaborators = Collaborators::from_config(config)?;
    let cache = open_cache(config, persist)?;
    Ok(Pipeline::new(config.clone(), collaborators, cache))
}

/// Purge expired cache rows every `interval` until the runtime shuts down
pub fn spawn_purge_task(pipeline: Arc<Pipeline>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match pipeline.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "expired cache entries purged"),
                Err(e) => tracing::warn!(error = %e, "cache purge failed"),
            }
        }
    })
}
