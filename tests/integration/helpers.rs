//! Shared helpers for integration tests.

use glance::clock::{ManualClock, MonotonicInstant};
use glance::config::GlanceConfig;
use glance::host::EventEnvelope;
use glance::render::{RecordingRenderer, RenderTargets};
use glance::store::{FileKv, KvStore, MemoryKv};
use glance::WidgetEngine;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// An engine plus the handles tests poke at.
pub(crate) struct TestEngine {
    pub engine: WidgetEngine,
    pub clock: ManualClock,
    pub status: Arc<RecordingRenderer>,
    pub summary: Arc<RecordingRenderer>,
    pub list: Arc<RecordingRenderer>,
}

/// Engine over `kv` driven by `clock`, rendering into recorders.
pub(crate) fn engine_with(kv: Arc<dyn KvStore>, clock: ManualClock) -> TestEngine {
    let status = Arc::new(RecordingRenderer::default());
    let summary = Arc::new(RecordingRenderer::default());
    let list = Arc::new(RecordingRenderer::default());
    let engine = WidgetEngine::new(
        kv,
        Arc::new(clock.clone()),
        RenderTargets {
            status: status.clone(),
            summary: summary.clone(),
            list: list.clone(),
        },
        &GlanceConfig::default(),
    );
    TestEngine {
        engine,
        clock,
        status,
        summary,
        list,
    }
}

/// In-memory engine with the clock at zero.
pub(crate) fn memory_engine() -> TestEngine {
    engine_with(
        Arc::new(MemoryKv::new()),
        ManualClock::new(MonotonicInstant::ZERO),
    )
}

/// File-backed store at `dir/widget_state.json`.
pub(crate) fn file_kv(dir: &Path) -> Arc<dyn KvStore> {
    Arc::new(FileKv::new(dir.join("widget_state.json")))
}

/// Poll `check` until it holds or a few seconds pass.
pub(crate) async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Drain all pending events from the broadcast receiver into a Vec.
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<EventEnvelope>) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    while let Ok(evt) = rx.try_recv() {
        events.push(evt);
    }
    events
}
