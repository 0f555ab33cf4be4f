//! Start/pause/reset transitions over the timer store.

use crate::clock::{MonotonicInstant, anchor_for, elapsed_at};
use crate::signal::{RefreshReason, RefreshSignal, SignalBus};
use crate::store::{InstanceId, TimerInstance, TimerPhase, TimerStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{error, info};

/// User intent routed back from a renderer affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserIntent {
    Start,
    Pause,
    Reset,
}

impl UserIntent {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Reset => "reset",
        }
    }
}

/// What a transition did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Timer began running (from stopped or paused).
    Started,
    /// Start on a running timer; anchor left untouched.
    AlreadyRunning,
    /// Running timer banked its elapsed time.
    Paused,
    /// Pause on a timer that was not running.
    NotRunning,
    /// Timer returned to stopped with nothing banked.
    Reset,
}

impl TransitionOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::AlreadyRunning => "already_running",
            Self::Paused => "paused",
            Self::NotRunning => "not_running",
            Self::Reset => "reset",
        }
    }
}

/// Result of a transition: the outcome and the state now persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub outcome: TransitionOutcome,
    pub instance: TimerInstance,
}

/// Read-only view of a timer at some instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    pub elapsed: Duration,
    pub running: bool,
}

/// Applies user intents to persisted timers.
///
/// Each transition is one read-modify-write under a per-instance lock,
/// followed by a `StateChanged` signal. Different instances never block
/// each other.
pub struct TimerStateMachine {
    store: TimerStore,
    signals: SignalBus,
    locks: Mutex<HashMap<InstanceId, Arc<Mutex<()>>>>,
}

impl TimerStateMachine {
    #[must_use]
    pub fn new(store: TimerStore, signals: SignalBus) -> Self {
        Self {
            store,
            signals,
            locks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &TimerStore {
        &self.store
    }

    /// Begin or resume counting. A running timer is left untouched so a
    /// duplicate start never loses elapsed time.
    pub fn start(&self, id: &InstanceId, now: MonotonicInstant) -> Transition {
        self.apply(id, UserIntent::Start, now, |_| {})
    }

    /// Bank elapsed time and stop counting. No-op unless running.
    pub fn pause(&self, id: &InstanceId, now: MonotonicInstant) -> Transition {
        self.apply(id, UserIntent::Pause, now, |_| {})
    }

    /// Return to stopped with nothing banked, from any state.
    pub fn reset(&self, id: &InstanceId, now: MonotonicInstant) -> Transition {
        self.apply(id, UserIntent::Reset, now, |_| {})
    }

    /// Apply `intent` at `now`. `on_committed` sees the persisted result
    /// while the instance lock is still held, so callers can mirror it
    /// (e.g. arm a refresh loop) in the same order transitions commit.
    pub fn apply(
        &self,
        id: &InstanceId,
        intent: UserIntent,
        now: MonotonicInstant,
        on_committed: impl FnOnce(&TimerInstance),
    ) -> Transition {
        self.with_instance_lock(id, || {
            let transition = self.transition(id, intent, now);
            on_committed(&transition.instance);
            transition
        })
    }

    /// Read the stored timer under the instance lock.
    pub fn observe<R>(&self, id: &InstanceId, f: impl FnOnce(&TimerInstance) -> R) -> R {
        self.with_instance_lock(id, || f(&self.store.get(id)))
    }

    /// Current phase and elapsed time without mutating anything.
    #[must_use]
    pub fn snapshot(&self, id: &InstanceId, now: MonotonicInstant) -> TimerSnapshot {
        let instance = self.store.get(id);
        TimerSnapshot {
            phase: instance.phase(),
            elapsed: instance.elapsed(now),
            running: instance.running,
        }
    }

    fn transition(&self, id: &InstanceId, intent: UserIntent, now: MonotonicInstant) -> Transition {
        let mut outcome = TransitionOutcome::NotRunning;
        let written = self.store.update(id, |current| {
            let (next, result) = next_state(intent, current, now);
            outcome = result;
            next
        });

        let instance = match written {
            Ok(instance) => instance,
            Err(e) => {
                error!(
                    instance = %id,
                    transition = intent.as_str(),
                    "cannot persist timer transition: {e}"
                );
                self.store.get(id)
            }
        };

        info!(
            instance = %id,
            transition = intent.as_str(),
            outcome = outcome.as_str(),
            phase = instance.phase().as_str(),
            "timer transition"
        );

        self.signals
            .emit(RefreshSignal::new(id.clone(), RefreshReason::StateChanged));

        Transition { outcome, instance }
    }

    fn with_instance_lock<R>(&self, id: &InstanceId, f: impl FnOnce() -> R) -> R {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(id.clone()).or_default())
        };
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);

        // Clones are only taken under the map lock, so a count of one means
        // no other caller is waiting on this entry.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(id);
        }
        result
    }
}

fn next_state(
    intent: UserIntent,
    current: TimerInstance,
    now: MonotonicInstant,
) -> (TimerInstance, TransitionOutcome) {
    match intent {
        UserIntent::Start if current.running => (current, TransitionOutcome::AlreadyRunning),
        UserIntent::Start => {
            let anchor = anchor_for(now, current.accumulated_offset);
            (
                TimerInstance::running_from(anchor),
                TransitionOutcome::Started,
            )
        }
        UserIntent::Pause if current.running => {
            let offset = elapsed_at(now, current.anchor);
            (TimerInstance::holding(offset), TransitionOutcome::Paused)
        }
        UserIntent::Pause => (current, TransitionOutcome::NotRunning),
        UserIntent::Reset => (TimerInstance::holding(Duration::ZERO), TransitionOutcome::Reset),
    }
}
