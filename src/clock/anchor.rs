//! Anchor arithmetic between monotonic instants and elapsed durations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A point on the monotonic clock, in milliseconds since the clock's origin.
///
/// Only comparable with instants taken in the same [`ClockEpoch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonotonicInstant(u64);

impl MonotonicInstant {
    /// The clock origin.
    pub const ZERO: Self = Self(0);

    /// Build an instant from milliseconds since the clock origin.
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Build an instant from whole seconds since the clock origin.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Milliseconds since the clock origin.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Move forward by `d`, saturating at `u64::MAX` milliseconds.
    #[must_use]
    pub fn saturating_add(self, d: Duration) -> Self {
        Self(self.0.saturating_add(duration_millis(d)))
    }

    /// Move backward by `d`, saturating at the origin.
    #[must_use]
    pub fn saturating_sub(self, d: Duration) -> Self {
        Self(self.0.saturating_sub(duration_millis(d)))
    }

    /// Length from `earlier` to `self`, zero if `earlier` is later.
    #[must_use]
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

/// Opaque marker identifying one lifetime of the monotonic clock (one boot).
///
/// Anchors recorded under a different epoch are meaningless.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClockEpoch(String);

impl ClockEpoch {
    #[must_use]
    pub fn new(marker: impl Into<String>) -> Self {
        Self(marker.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClockEpoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Elapsed running time for a timer anchored at `anchor`: `max(0, now - anchor)`.
#[must_use]
pub fn elapsed_at(now: MonotonicInstant, anchor: MonotonicInstant) -> Duration {
    now.saturating_duration_since(anchor)
}

/// Anchor that makes `elapsed_at(now, anchor) == offset`: `now - offset`.
///
/// Saturates at the clock origin when `offset` is longer than the clock has run.
#[must_use]
pub fn anchor_for(now: MonotonicInstant, offset: Duration) -> MonotonicInstant {
    now.saturating_sub(offset)
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
#[must_use]
pub fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
