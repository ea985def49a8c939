//! sentinel_agent: demo metrics backend. Samples the host and serves the sentinel HTTP API.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use sentinel_agent::metrics::Collector;
use sentinel_agent::routes::router;
use sentinel_agent::sampler::{backfill, spawn_sampler};
use sentinel_agent::state::AppState;
use sentinel_agent::{parse_port, DEFAULT_PORT};
use sysinfo::System;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SAMPLE_EVERY: Duration = Duration::from_secs(5);

fn usage() -> String {
    format!(
        "Usage: sentinel_agent [--port PORT|-p PORT]   (default port {DEFAULT_PORT})\n\n\
         Logging: SENTINEL_AGENT_LOG=debug"
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().skip(1).any(|a| a == "-h" || a == "--help") {
        println!("{}", usage());
        return Ok(());
    }

    let filter = EnvFilter::try_from_env("SENTINEL_AGENT_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let port = parse_port(args, DEFAULT_PORT);
    let hostname = System::host_name().unwrap_or_else(|| "unknown".into());
    let state = AppState::new(hostname);

    // seed history around the first real reading
    let first = Collector::new().sample();
    backfill(&state, &first, first.timestamp).await;
    let _sampler = spawn_sampler(state.clone(), SAMPLE_EVERY);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!(%addr, "sentinel agent listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
