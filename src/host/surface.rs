//! Renderers that publish views as host events.
//!
//! The host shell owns the actual surfaces (status notification, summary
//! widget, list widget); the engine only pushes `render.*` events that the
//! shell redraws from.

use crate::error::{GlanceError, Result};
use crate::host::contract::EventEnvelope;
use crate::render::{ListRenderer, ListView, RenderTargets, TimerRenderer, TimerView};
use std::sync::Arc;
use tokio::sync::broadcast;

pub const STATUS_EVENT: &str = "render.status";
pub const SUMMARY_EVENT: &str = "render.summary";
pub const LIST_EVENT: &str = "render.list";

/// Publishes every render as an [`EventEnvelope`] named `event`.
pub struct EventRenderer {
    event: &'static str,
    event_tx: broadcast::Sender<EventEnvelope>,
}

impl EventRenderer {
    #[must_use]
    pub fn new(event: &'static str, event_tx: broadcast::Sender<EventEnvelope>) -> Self {
        Self { event, event_tx }
    }

    #[must_use]
    pub fn event(&self) -> &'static str {
        self.event
    }

    fn publish(&self, payload: serde_json::Value) {
        let envelope = EventEnvelope::new(uuid::Uuid::new_v4().to_string(), self.event, payload);
        // No subscribers just means no shell is attached right now.
        let _ = self.event_tx.send(envelope);
    }
}

impl TimerRenderer for EventRenderer {
    fn render_timer(&self, view: &TimerView) -> Result<()> {
        let payload = serde_json::to_value(view)
            .map_err(|e| GlanceError::Contract(format!("cannot encode timer view: {e}")))?;
        self.publish(payload);
        Ok(())
    }
}

impl ListRenderer for EventRenderer {
    fn render_list(&self, view: &ListView) -> Result<()> {
        let payload = serde_json::to_value(view)
            .map_err(|e| GlanceError::Contract(format!("cannot encode list view: {e}")))?;
        self.publish(payload);
        Ok(())
    }
}

/// Render targets that all publish onto `event_tx`.
#[must_use]
pub fn event_targets(event_tx: &broadcast::Sender<EventEnvelope>) -> RenderTargets {
    RenderTargets {
        status: Arc::new(EventRenderer::new(STATUS_EVENT, event_tx.clone())),
        summary: Arc::new(EventRenderer::new(SUMMARY_EVENT, event_tx.clone())),
        list: Arc::new(EventRenderer::new(LIST_EVENT, event_tx.clone())),
    }
}
