//! Turns refresh signals into renderer calls.
//!
//! Renderers never see the signal itself: every call recomputes from the
//! timer store and the list snapshot, so duplicate, late or missing
//! signals only change how often the same picture is drawn.

use crate::clock::MonotonicClock;
use crate::error::Result;
use crate::list::ListContentCache;
use crate::render::view::{ListView, TimerView};
use crate::signal::{RefreshReason, RefreshSignal};
use crate::store::{InstanceId, TimerStore};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Draws timer state (status indicator, summary view).
///
/// Must be idempotent: called zero, one or many times for the same state.
pub trait TimerRenderer: Send + Sync + 'static {
    fn render_timer(&self, view: &TimerView) -> Result<()>;
}

/// Supplies list rows to the scrollable list view.
///
/// Must be idempotent, like [`TimerRenderer`].
pub trait ListRenderer: Send + Sync + 'static {
    fn render_list(&self, view: &ListView) -> Result<()>;
}

/// The three downstream renderers.
#[derive(Clone)]
pub struct RenderTargets {
    pub status: Arc<dyn TimerRenderer>,
    pub summary: Arc<dyn TimerRenderer>,
    pub list: Arc<dyn ListRenderer>,
}

pub struct RenderDispatcher {
    store: TimerStore,
    clock: Arc<dyn MonotonicClock>,
    list: Arc<ListContentCache>,
    targets: RenderTargets,
}

impl RenderDispatcher {
    #[must_use]
    pub fn new(
        store: TimerStore,
        clock: Arc<dyn MonotonicClock>,
        list: Arc<ListContentCache>,
        targets: RenderTargets,
    ) -> Self {
        Self {
            store,
            clock,
            list,
            targets,
        }
    }

    /// Render whatever `signal.reason` calls for.
    ///
    /// - `StateChanged`: status, summary and list.
    /// - `Tick`: status and summary.
    /// - `ContentChanged`: list only.
    pub fn on_signal(&self, signal: &RefreshSignal) {
        let id = &signal.instance_id;
        match signal.reason {
            RefreshReason::StateChanged => {
                self.push_timer(id);
                self.push_list(id);
            }
            RefreshReason::Tick => self.push_timer(id),
            RefreshReason::ContentChanged => self.push_list(id),
        }
    }

    /// Current timer view for `id`.
    #[must_use]
    pub fn timer_view(&self, id: &InstanceId) -> TimerView {
        let instance = self.store.get(id);
        let now = self.clock.now();
        TimerView::new(id.clone(), instance.phase(), instance.elapsed(now))
    }

    /// Current list view for `id`.
    #[must_use]
    pub fn list_view(&self, id: &InstanceId) -> ListView {
        ListView {
            instance_id: id.clone(),
            rows: self.list.display_rows(),
        }
    }

    /// Drain `rx` until the bus closes. Lagging is logged and skipped; the
    /// next signal redraws from current state anyway.
    pub async fn run(self: Arc<Self>, mut rx: broadcast::Receiver<RefreshSignal>) {
        info!("render dispatcher started");
        loop {
            match rx.recv().await {
                Ok(signal) => self.on_signal(&signal),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged = n, "render dispatcher lagged; some refreshes were skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("refresh signal bus closed; stopping render dispatcher");
                    break;
                }
            }
        }
    }

    fn push_timer(&self, id: &InstanceId) {
        let view = self.timer_view(id);
        debug!(instance = %id, clock = %view.clock_text, phase = view.phase.as_str(), "render timer");

        if let Err(e) = self.targets.status.render_timer(&view) {
            warn!(instance = %id, "status renderer failed: {e}");
        }
        if let Err(e) = self.targets.summary.render_timer(&view) {
            warn!(instance = %id, "summary renderer failed: {e}");
        }
    }

    fn push_list(&self, id: &InstanceId) {
        let view = self.list_view(id);
        debug!(instance = %id, rows = view.rows.len(), "render list");

        if let Err(e) = self.targets.list.render_list(&view) {
            warn!(instance = %id, "list renderer failed: {e}");
        }
    }
}
