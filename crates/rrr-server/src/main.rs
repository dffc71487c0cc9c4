//! `rrr` - serve the analysis API or run one-shot analyses and cache purges

use anyhow::Context;
use clap::{Parser, Subcommand};
use rrr_server::{build_pipeline, open_cache, routes, spawn_purge_task, telemetry, AppConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "rrr", version, about = "Release readiness report analyzer")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "RRR_CONFIG")]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Keep the cache in memory only
    #[arg(long, global = true)]
    no_persist: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Listen address, overriding the config file
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Analyse one folder and print the result as JSON
    Analyze {
        /// Folder holding the release PDFs
        folder: String,
    },
    /// Delete expired cache entries
    Purge,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_json);

    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let persist = !cli.no_persist;

    match cli.command {
        Command::Serve { bind } => {
            let server = match bind {
                Some(addr) => config.server.clone().with_bind(addr),
                None => config.server.clone(),
            };
            let pipeline = Arc::new(build_pipeline(&config.pipeline, persist)?);
            let purge = spawn_purge_task(Arc::clone(&pipeline), config.pipeline.cache.purge_interval());

            let (addr, serving) = warp::serve(routes(pipeline, server.max_body_bytes))
                .try_bind_with_graceful_shutdown(server.bind, async {
                    let _ = tokio::signal::ctrl_c().await;
                    tracing::info!("shutdown requested");
                })
                .with_context(|| format!("binding {}", server.bind))?;
            tracing::info!(%addr, "listening");
            serving.await;
            purge.abort();
        }
        Command::Analyze { folder } => {
            let pipeline = build_pipeline(&config.pipeline, persist)?;
            match pipeline.analyze(&folder).await {
                Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                Err(e) => {
                    let body = rrr_server::ErrorBody::from(&e);
                    eprintln!("{}", serde_json::to_string_pretty(&body)?);
                    std::process::exit(1);
                }
            }
        }
        Command::Purge => {
            let cache = open_cache(&config.pipeline, persist)?;
            let purged = cache.purge_expired().await?;
            println!("purged {purged} expired entries");
        }
    }
    Ok(())
}
