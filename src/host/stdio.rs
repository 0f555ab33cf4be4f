//! Stdin/stdout JSON bridge for the host command channel.
//!
//! Reads newline-delimited JSON `CommandEnvelope` messages from stdin,
//! dispatches them through the `HostCommandServer` router, and writes
//! `ResponseEnvelope` and `EventEnvelope` messages as newline-delimited
//! JSON to stdout.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use crate::engine::WidgetEngine;
use crate::error::{GlanceError, Result};
use crate::host::channel::{HostCommandClient, command_channel_with_events};
use crate::host::contract::{CommandEnvelope, CommandName, EventEnvelope, ResponseEnvelope};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

type SharedWriter<W> = Arc<Mutex<BufWriter<W>>>;

/// Run the stdin/stdout JSON bridge until stdin closes, a `runtime.stop`
/// command is received, or `shutdown` is cancelled.
///
/// `event_tx` must be the sender the engine's renderers publish on, so that
/// `render.*` events are forwarded alongside command responses.
pub async fn run_stdio_bridge(
    engine: Arc<WidgetEngine>,
    event_tx: broadcast::Sender<EventEnvelope>,
    request_capacity: usize,
    shutdown: CancellationToken,
) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    run_bridge(
        engine,
        event_tx,
        request_capacity,
        reader,
        tokio::io::stdout(),
        shutdown,
    )
    .await
}

/// Bridge loop over arbitrary line-oriented I/O.
///
/// Three tasks cooperate:
///
/// 1. **Reader** (current task) reads commands, dispatches each through the
///    client and writes the response.
/// 2. **Event forwarder** writes broadcast events as they arrive.
/// 3. **Server** runs the command router.
///
/// Dropping the client when the reader finishes lets the server exit, which
/// releases its handle on `engine` before this returns.
pub async fn run_bridge<R, W>(
    engine: Arc<WidgetEngine>,
    event_tx: broadcast::Sender<EventEnvelope>,
    request_capacity: usize,
    reader: R,
    writer: W,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (client, server) = command_channel_with_events(request_capacity, event_tx, engine);
    let writer: SharedWriter<W> = Arc::new(Mutex::new(BufWriter::new(writer)));

    let server_handle = tokio::spawn(server.run());

    let event_writer = Arc::clone(&writer);
    let mut event_rx = client.subscribe_events();
    let event_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event_envelope) => match serde_json::to_string(&event_envelope) {
                    Ok(json) => {
                        let mut w = event_writer.lock().await;
                        if let Err(e) = write_line(&mut w, &json).await {
                            tracing::warn!(
                                error = %e,
                                "failed to write event envelope; stopping event forwarder"
                            );
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize event envelope; skipping");
                    }
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event forwarder lagged; some events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("event broadcast channel closed; stopping event forwarder");
                    break;
                }
            }
        }
    });

    let reader_result = run_reader(client, reader, Arc::clone(&writer), shutdown).await;

    event_handle.abort();
    let _ = event_handle.await;
    let _ = server_handle.await;

    reader_result
}

async fn run_reader<R, W>(
    client: HostCommandClient,
    mut reader: R,
    writer: SharedWriter<W>,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        let read = tokio::select! {
            read = reader.read_line(&mut line) => read,
            () = shutdown.cancelled() => {
                tracing::info!("shutdown requested; stopping host bridge");
                break;
            }
        };
        let bytes_read = read
            .map_err(|e| GlanceError::Channel(format!("failed to read command line: {e}")))?;

        if bytes_read == 0 {
            tracing::info!("input closed (EOF); shutting down host bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope: CommandEnvelope = match serde_json::from_str(trimmed) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(error = %e, raw_line = %trimmed, "failed to parse command envelope");
                let error_response = ResponseEnvelope::error(
                    "parse-error",
                    format!("failed to parse command envelope: {e}"),
                );
                write_response(&writer, &error_response).await?;
                continue;
            }
        };

        let is_stop = envelope.command == CommandName::RuntimeStop;
        let request_id = envelope.request_id.clone();

        let response = match client.send(envelope).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(error = %e, request_id = %request_id, "host command failed");
                ResponseEnvelope::error(request_id, e.to_string())
            }
        };
        write_response(&writer, &response).await?;

        if is_stop {
            tracing::info!("runtime.stop received; shutting down host bridge");
            break;
        }
    }

    Ok(())
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &SharedWriter<W>,
    response: &ResponseEnvelope,
) -> Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| GlanceError::Contract(format!("failed to serialize response envelope: {e}")))?;
    let mut w = writer.lock().await;
    write_line(&mut w, &json).await
}

/// Write a single JSON line and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut BufWriter<W>, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| GlanceError::Channel(format!("failed to write output: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| GlanceError::Channel(format!("failed to write newline: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| GlanceError::Channel(format!("failed to flush output: {e}")))?;
    Ok(())
}
