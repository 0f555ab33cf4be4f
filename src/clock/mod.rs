//! Monotonic time and anchor arithmetic.
//!
//! A running timer stores an anchor instant and derives elapsed time by
//! subtraction, so no context ever has to accumulate ticks.

pub mod anchor;
pub mod source;

pub use anchor::{ClockEpoch, MonotonicInstant, anchor_for, elapsed_at};
pub use source::{ManualClock, MonotonicClock, SystemClock};
