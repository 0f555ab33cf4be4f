//! Refresh signals between the core and renderers.
//!
//! Signals are fire-and-forget and carry no state: a receiver always
//! recomputes from the store, so a lagged or dropped signal is harmless.

use crate::store::InstanceId;
use tokio::sync::broadcast;

/// Why a renderer should redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshReason {
    /// A start/pause/reset transition was persisted.
    StateChanged,
    /// Periodic refresh while running.
    Tick,
    /// List content was replaced.
    ContentChanged,
}

impl RefreshReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StateChanged => "state_changed",
            Self::Tick => "tick",
            Self::ContentChanged => "content_changed",
        }
    }
}

/// Transient "please redraw" notification for one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSignal {
    pub instance_id: InstanceId,
    pub reason: RefreshReason,
}

impl RefreshSignal {
    #[must_use]
    pub fn new(instance_id: InstanceId, reason: RefreshReason) -> Self {
        Self {
            instance_id,
            reason,
        }
    }
}

/// Broadcast fan-out of refresh signals.
#[derive(Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<RefreshSignal>,
}

impl SignalBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit a signal. Having no subscribers is not an error.
    pub fn emit(&self, signal: RefreshSignal) {
        tracing::trace!(
            instance = %signal.instance_id,
            reason = signal.reason.as_str(),
            "refresh signal"
        );
        let _ = self.tx.send(signal);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshSignal> {
        self.tx.subscribe()
    }
}
