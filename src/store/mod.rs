//! Shared persisted widget state.
//!
//! Independent contexts only communicate through this store, so everything
//! here is a plain repository over a string key-value map.

pub mod kv;
pub mod registry;
pub mod timer_store;

pub use kv::{FileKv, KvStore, MemoryKv};
pub use registry::InstanceRegistry;
pub use timer_store::{InstanceId, TimerInstance, TimerPhase, TimerStore};
