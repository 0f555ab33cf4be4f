//! Render payloads handed to the status, summary and list renderers.

use crate::list::RowDisplay;
use crate::store::{InstanceId, TimerPhase};
use serde::Serialize;
use std::time::Duration;

/// `HH:MM:SS`, zero-padded; hours keep growing past 99.
#[must_use]
pub fn format_hms(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Action a renderer offers back to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerAction {
    Start,
    Pause,
    Resume,
    /// Reset to zero.
    Stop,
}

impl TimerAction {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Pause => "Pause",
            Self::Resume => "Resume",
            Self::Stop => "Stop",
        }
    }

    /// Primary affordance for a phase.
    #[must_use]
    pub fn primary_for(phase: TimerPhase) -> Self {
        match phase {
            TimerPhase::Running => Self::Pause,
            TimerPhase::Paused => Self::Resume,
            TimerPhase::Stopped => Self::Start,
        }
    }
}

/// Timer state as drawn by the status indicator and summary view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerView {
    pub instance_id: InstanceId,
    pub phase: TimerPhase,
    pub running: bool,
    pub elapsed_secs: u64,
    /// `HH:MM:SS`.
    pub clock_text: String,
    /// Clock text prefixed with a running/paused glyph.
    pub headline: String,
    pub primary_action: TimerAction,
    pub secondary_action: TimerAction,
}

impl TimerView {
    #[must_use]
    pub fn new(instance_id: InstanceId, phase: TimerPhase, elapsed: Duration) -> Self {
        let running = phase == TimerPhase::Running;
        let clock_text = format_hms(elapsed);
        let glyph = if running { "⏱" } else { "⏸" };
        Self {
            instance_id,
            phase,
            running,
            elapsed_secs: elapsed.as_secs(),
            headline: format!("{glyph} {clock_text}"),
            clock_text,
            primary_action: TimerAction::primary_for(phase),
            secondary_action: TimerAction::Stop,
        }
    }
}

/// List content as drawn by the list renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListView {
    pub instance_id: InstanceId,
    pub rows: Vec<RowDisplay>,
}

impl ListView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
