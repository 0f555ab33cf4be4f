//! Glance: stopwatch and study-list sync engine for home-screen widgets.
//!
//! Widgets live in short-lived, independent execution contexts that only
//! share a persisted key-value store. This crate keeps a stopwatch and a
//! study list consistent across those contexts:
//!
//! - **Clock**: running time is `now - anchor` on a monotonic clock, never
//!   a counter that needs every tick to arrive.
//! - **Store**: per-instance timer state and list content, persisted as
//!   plain keys so any context can read them cold.
//! - **Timer**: start/pause/reset transitions, idempotent and serialized per
//!   instance.
//! - **Refresh**: at most one repeating `tick` per running instance.
//! - **Render**: every refresh recomputes views from the store and pushes
//!   them to the status, summary and list renderers.
//! - **Host**: a versioned JSON command/event bridge for native shells.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod list;
pub mod paths;
pub mod refresh;
pub mod render;
pub mod signal;
pub mod store;
pub mod timer;

pub use config::GlanceConfig;
pub use engine::{UserIntent, WidgetEngine};
pub use error::{GlanceError, Result};
pub use signal::{RefreshReason, RefreshSignal};
pub use store::InstanceId;
