//! Host command channel and router for native shell integrations.

use crate::engine::{UserIntent, WidgetEngine};
use crate::error::{GlanceError, Result};
use crate::host::contract::{CommandEnvelope, CommandName, EventEnvelope, ResponseEnvelope};
use crate::list::RowDisplay;
use crate::store::InstanceId;
use crate::timer::Transition;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

struct HostCommandRequest {
    envelope: CommandEnvelope,
    response_tx: oneshot::Sender<Result<ResponseEnvelope>>,
}

#[derive(Clone)]
pub struct HostCommandClient {
    request_tx: mpsc::Sender<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
}

impl HostCommandClient {
    pub async fn send(&self, envelope: CommandEnvelope) -> Result<ResponseEnvelope> {
        envelope.validate().map_err(|e| {
            GlanceError::Contract(format!(
                "invalid host command envelope {}: {}",
                envelope.request_id, e
            ))
        })?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(HostCommandRequest {
                envelope,
                response_tx,
            })
            .await
            .map_err(|e| {
                GlanceError::Channel(format!("failed to send host command request: {e}"))
            })?;

        response_rx
            .await
            .map_err(|e| GlanceError::Channel(format!("host command response dropped: {e}")))?
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.event_tx.subscribe()
    }
}

pub struct HostCommandServer {
    request_rx: mpsc::Receiver<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
    engine: Arc<WidgetEngine>,
}

/// Create a command channel sharing `event_tx` with the engine's renderers,
/// so `render.*` events and router events reach the shell on one stream.
#[must_use]
pub fn command_channel_with_events(
    request_capacity: usize,
    event_tx: broadcast::Sender<EventEnvelope>,
    engine: Arc<WidgetEngine>,
) -> (HostCommandClient, HostCommandServer) {
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));

    (
        HostCommandClient {
            request_tx,
            event_tx: event_tx.clone(),
        },
        HostCommandServer {
            request_rx,
            event_tx,
            engine,
        },
    )
}

impl HostCommandServer {
    pub async fn run(mut self) {
        while let Some(request) = self.request_rx.recv().await {
            let response = self.route(&request.envelope);
            let _ = request.response_tx.send(response);
        }
    }

    /// Route a command envelope to the appropriate handler.
    pub fn route(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        match envelope.command {
            CommandName::HostPing => Ok(ResponseEnvelope::ok(
                envelope.request_id.clone(),
                serde_json::json!({"pong": true}),
            )),
            CommandName::HostVersion => Ok(ResponseEnvelope::ok(
                envelope.request_id.clone(),
                serde_json::json!({
                    "contract_version": crate::host::contract::EVENT_VERSION,
                    "engine_version": env!("CARGO_PKG_VERSION"),
                    "channel": "glance_host_v1"
                }),
            )),
            CommandName::TimerStart => self.handle_intent(envelope, UserIntent::Start),
            CommandName::TimerPause => self.handle_intent(envelope, UserIntent::Pause),
            CommandName::TimerReset => self.handle_intent(envelope, UserIntent::Reset),
            CommandName::TimerStatus => self.handle_timer_status(envelope),
            CommandName::WidgetBind => self.handle_widget_bind(envelope),
            CommandName::WidgetUnbind => self.handle_widget_unbind(envelope),
            CommandName::ListReplace => self.handle_list_replace(envelope),
            CommandName::ListSnapshot => self.handle_list_snapshot(envelope),
            CommandName::RuntimeStop => self.handle_runtime_stop(envelope),
        }
    }

    fn handle_intent(
        &self,
        envelope: &CommandEnvelope,
        intent: UserIntent,
    ) -> Result<ResponseEnvelope> {
        let id = parse_instance_id(&envelope.payload, envelope.command.as_str())?;
        let transition = self.engine.apply_intent(&id, intent);
        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            self.transition_payload(&id, intent, &transition),
        ))
    }

    fn handle_timer_status(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let id = parse_instance_id(&envelope.payload, CommandName::TimerStatus.as_str())?;
        let view = self.engine.timer_view(&id);
        let mut payload = to_payload(&view)?;
        payload["ticking"] = serde_json::Value::Bool(self.engine.is_ticking(&id));
        Ok(ResponseEnvelope::ok(envelope.request_id.clone(), payload))
    }

    fn handle_widget_bind(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let id = parse_instance_id(&envelope.payload, CommandName::WidgetBind.as_str())?;
        self.engine.on_instance_created_or_rebound(&id);
        self.emit_event("widget.bound", serde_json::json!({"instance_id": id}));
        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({
                "accepted": true,
                "instance_id": id,
                "ticking": self.engine.is_ticking(&id),
            }),
        ))
    }

    fn handle_widget_unbind(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let id = parse_instance_id(&envelope.payload, CommandName::WidgetUnbind.as_str())?;
        self.engine.on_instance_destroyed(&id);
        self.emit_event("widget.unbound", serde_json::json!({"instance_id": id}));
        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"accepted": true, "instance_id": id}),
        ))
    }

    fn handle_list_replace(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let data = parse_list_data(&envelope.payload)?;
        let rows = self.engine.replace_list_content(&data);
        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"accepted": true, "rows": rows}),
        ))
    }

    fn handle_list_snapshot(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let rows: Vec<RowDisplay> = self
            .engine
            .list_snapshot()
            .iter()
            .enumerate()
            .map(|(position, row)| RowDisplay::new(position, row))
            .collect();
        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"count": rows.len(), "rows": to_payload(&rows)?}),
        ))
    }

    fn handle_runtime_stop(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        // The bridge stops reading after this response; the engine is shut
        // down by whoever owns it.
        self.emit_event("runtime.stopping", serde_json::json!({}));
        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({"accepted": true}),
        ))
    }

    fn transition_payload(
        &self,
        id: &InstanceId,
        intent: UserIntent,
        transition: &Transition,
    ) -> serde_json::Value {
        let view = self.engine.timer_view(id);
        serde_json::json!({
            "instance_id": id,
            "intent": intent.as_str(),
            "outcome": transition.outcome.as_str(),
            "phase": view.phase,
            "running": transition.instance.running,
            "elapsed_secs": view.elapsed_secs,
            "clock_text": view.clock_text,
            "ticking": self.engine.is_ticking(id),
        })
    }

    fn emit_event(&self, event: &str, payload: serde_json::Value) {
        let envelope =
            EventEnvelope::new(uuid::Uuid::new_v4().to_string(), event.to_owned(), payload);
        let _ = self.event_tx.send(envelope);
    }
}

fn to_payload<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| GlanceError::Contract(format!("cannot encode response payload: {e}")))
}

fn parse_instance_id(payload: &serde_json::Value, command: &str) -> Result<InstanceId> {
    let Some(raw) = payload
        .get("instance_id")
        .and_then(serde_json::Value::as_str)
    else {
        return Err(GlanceError::Contract(format!(
            "{command} requires payload.instance_id"
        )));
    };
    let value = raw.trim();
    if value.is_empty() {
        return Err(GlanceError::Contract(format!(
            "{command} requires a non-empty payload.instance_id"
        )));
    }
    Ok(InstanceId::new(value))
}

/// `payload.data` is either the raw JSON text or an inline array.
fn parse_list_data(payload: &serde_json::Value) -> Result<String> {
    match payload.get("data") {
        Some(serde_json::Value::String(raw)) => Ok(raw.clone()),
        Some(inline @ serde_json::Value::Array(_)) => Ok(inline.to_string()),
        Some(_) => Err(GlanceError::Contract(
            "list.replace payload.data must be a string or an array".to_owned(),
        )),
        None => Err(GlanceError::Contract(
            "list.replace requires payload.data".to_owned(),
        )),
    }
}
