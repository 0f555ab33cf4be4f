//! Persisted per-instance timer state.

use crate::clock::{ClockEpoch, MonotonicClock, MonotonicInstant, elapsed_at};
use crate::error::Result;
use crate::store::kv::{KvMap, KvStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const KEY_ANCHOR_OR_OFFSET: &str = "timer.anchor_or_offset.";
const KEY_RUNNING: &str = "timer.running.";
const KEY_EPOCH: &str = "timer.epoch.";

/// Stable identifier for one placed widget (timer + list pairing).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Derived lifecycle phase of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// Not running, nothing banked.
    Stopped,
    /// Not running, some time banked.
    Paused,
    /// Counting from the anchor.
    Running,
}

impl TimerPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Paused => "paused",
            Self::Running => "running",
        }
    }
}

/// One logical stopwatch.
///
/// While `running`, only `anchor` is authoritative; otherwise only
/// `accumulated_offset` is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerInstance {
    /// Instant from which elapsed time is measured while running.
    pub anchor: MonotonicInstant,
    /// Time banked from earlier run segments, used while not running.
    pub accumulated_offset: Duration,
    pub running: bool,
}

impl TimerInstance {
    /// Running timer anchored at `anchor`.
    #[must_use]
    pub fn running_from(anchor: MonotonicInstant) -> Self {
        Self {
            anchor,
            accumulated_offset: Duration::ZERO,
            running: true,
        }
    }

    /// Stopped-or-paused timer holding `offset`.
    #[must_use]
    pub fn holding(offset: Duration) -> Self {
        Self {
            anchor: MonotonicInstant::ZERO,
            accumulated_offset: offset,
            running: false,
        }
    }

    /// Elapsed time at `now`.
    #[must_use]
    pub fn elapsed(&self, now: MonotonicInstant) -> Duration {
        if self.running {
            elapsed_at(now, self.anchor)
        } else {
            self.accumulated_offset
        }
    }

    #[must_use]
    pub fn phase(&self) -> TimerPhase {
        if self.running {
            TimerPhase::Running
        } else if self.accumulated_offset > Duration::ZERO {
            TimerPhase::Paused
        } else {
            TimerPhase::Stopped
        }
    }
}

/// Repository of timer instances on top of the shared key-value store.
///
/// Each record is stamped with the clock epoch it was written in; records
/// from another epoch (e.g. before a reboot) read back as the default
/// stopped timer.
#[derive(Clone)]
pub struct TimerStore {
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn MonotonicClock>,
}

impl TimerStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>, clock: Arc<dyn MonotonicClock>) -> Self {
        Self { kv, clock }
    }

    /// Current state of `id`, or the default stopped timer when absent,
    /// unreadable, or from another clock epoch.
    #[must_use]
    pub fn get(&self, id: &InstanceId) -> TimerInstance {
        match self.kv.load() {
            Ok(map) => decode(&map, id, &self.clock.epoch()),
            Err(e) => {
                tracing::warn!(instance = %id, "cannot read timer state, using default: {e}");
                TimerInstance::default()
            }
        }
    }

    /// Replace the state of `id` atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn put(&self, id: &InstanceId, instance: TimerInstance) -> Result<()> {
        self.kv.put_many(encode(id, instance, &self.clock.epoch()))
    }

    /// Atomic read-modify-write of one instance inside a single backend
    /// update. Returns the value written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend update fails.
    pub fn update(
        &self,
        id: &InstanceId,
        f: impl FnOnce(TimerInstance) -> TimerInstance,
    ) -> Result<TimerInstance> {
        let epoch = self.clock.epoch();
        let mut f = Some(f);
        let mut written = TimerInstance::default();
        self.kv.update(&mut |map| {
            if let Some(f) = f.take() {
                let next = f(decode(map, id, &epoch));
                map.extend(encode(id, next, &epoch));
                written = next;
            }
        })?;
        Ok(written)
    }
}

fn decode(map: &KvMap, id: &InstanceId, epoch: &ClockEpoch) -> TimerInstance {
    let raw_value = map.get(&format!("{KEY_ANCHOR_OR_OFFSET}{id}"));
    let raw_running = map.get(&format!("{KEY_RUNNING}{id}"));

    let (Some(raw_value), Some(raw_running)) = (raw_value, raw_running) else {
        return TimerInstance::default();
    };

    let stored_epoch = map.get(&format!("{KEY_EPOCH}{id}"));
    if stored_epoch.map(String::as_str) != Some(epoch.as_str()) {
        tracing::warn!(
            instance = %id,
            stored = stored_epoch.map(String::as_str).unwrap_or("<none>"),
            current = %epoch,
            "clock discontinuity; treating timer as stopped"
        );
        return TimerInstance::default();
    }

    let (Ok(value_ms), Ok(running)) = (raw_value.parse::<u64>(), raw_running.parse::<bool>())
    else {
        tracing::warn!(instance = %id, "malformed timer record; treating timer as stopped");
        return TimerInstance::default();
    };

    if running {
        TimerInstance::running_from(MonotonicInstant::from_millis(value_ms))
    } else {
        TimerInstance::holding(Duration::from_millis(value_ms))
    }
}

fn encode(id: &InstanceId, instance: TimerInstance, epoch: &ClockEpoch) -> Vec<(String, String)> {
    let value_ms = if instance.running {
        instance.anchor.as_millis()
    } else {
        crate::clock::anchor::duration_millis(instance.accumulated_offset)
    };

    vec![
        (format!("{KEY_ANCHOR_OR_OFFSET}{id}"), value_ms.to_string()),
        (format!("{KEY_RUNNING}{id}"), instance.running.to_string()),
        (format!("{KEY_EPOCH}{id}"), epoch.as_str().to_owned()),
    ]
}
