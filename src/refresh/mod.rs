//! Periodic `tick` refreshes for running timers.

pub mod driver;

pub use driver::{LoopHandle, RefreshLoop};
