//! `robohr serve` - Start the HTTP command server.

use crate::bootstrap;
use anyhow::{Context, Result};
use robohr_command::{HttpServer, spawn_probe};
use robohr_core::RobohrConfig;

pub async fn run(config: RobohrConfig) -> Result<()> {
    let state = bootstrap::build_state(&config).await?;

    let probe = config.gateway.probe_interval().map(|interval| {
        tracing::info!(interval_secs = interval.as_secs(), "Starting intent service health probe");
        spawn_probe(
            state.gateway.recognizer().clone(),
            state.gateway.health().clone(),
            interval,
        )
    });

    let result = HttpServer::new(config.server.bind_addr(), state)
        .run()
        .await
        .context("HTTP server failed");

    if let Some(probe) = probe {
        probe.abort();
    }
    result
}
