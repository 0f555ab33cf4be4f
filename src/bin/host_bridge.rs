//! Headless widget host bridge over stdin/stdout JSON.
//!
//! Reads `CommandEnvelope` messages as newline-delimited JSON from stdin,
//! routes them to the widget engine, and writes `ResponseEnvelope` and
//! `EventEnvelope` messages (including `render.*` pushes) to stdout.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use glance::GlanceConfig;
use glance::WidgetEngine;
use glance::clock::SystemClock;
use glance::host::event_targets;
use glance::host::stdio::run_stdio_bridge;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for the JSON protocol.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("glance-host starting");

    let config = GlanceConfig::load_or_default().map_err(|e| {
        tracing::error!(error = %e, "cannot load config");
        anyhow::anyhow!("glance-host config: {e}")
    })?;

    let (event_tx, _event_rx) = broadcast::channel(config.bridge.event_capacity.max(1));
    let engine = Arc::new(WidgetEngine::from_config(
        &config,
        Arc::new(SystemClock::new()),
        event_targets(&event_tx),
    ));
    engine.resume_known_instances();

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received; shutting down");
            ctrl_c.cancel();
        }
    });

    // The bridge returns only after its command server has dropped its
    // engine handle, so the unwrap below sees the last reference.
    let result = run_stdio_bridge(
        Arc::clone(&engine),
        event_tx,
        config.bridge.request_capacity,
        shutdown,
    )
    .await;

    match Arc::try_unwrap(engine) {
        Ok(engine) => engine.shutdown().await,
        Err(_) => tracing::warn!("engine still referenced at exit; skipping graceful shutdown"),
    }

    result.map_err(|e| {
        tracing::error!(error = %e, "glance-host exited with error");
        anyhow::anyhow!("glance-host failed: {e}")
    })?;

    tracing::info!("glance-host shut down cleanly");
    Ok(())
}
