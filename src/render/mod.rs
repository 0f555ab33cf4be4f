//! Rendering: view payloads, renderer traits, and signal dispatch.

pub mod dispatcher;
pub mod recording;
pub mod view;

pub use dispatcher::{ListRenderer, RenderDispatcher, RenderTargets, TimerRenderer};
pub use recording::RecordingRenderer;
pub use view::{ListView, TimerAction, TimerView, format_hms};
