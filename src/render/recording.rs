//! In-memory renderers that keep every view they were asked to draw.
//!
//! Used by headless hosts and tests to observe what the dispatcher pushed.

use crate::error::Result;
use crate::render::dispatcher::{ListRenderer, TimerRenderer};
use crate::render::view::{ListView, TimerView};
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
pub struct RecordingRenderer {
    timers: Mutex<Vec<TimerView>>,
    lists: Mutex<Vec<ListView>>,
}

impl RecordingRenderer {
    #[must_use]
    pub fn timer_renders(&self) -> Vec<TimerView> {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn list_renders(&self) -> Vec<ListView> {
        self.lists
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent timer view, if any.
    #[must_use]
    pub fn last_timer(&self) -> Option<TimerView> {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn clear(&self) {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.lists
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl TimerRenderer for RecordingRenderer {
    fn render_timer(&self, view: &TimerView) -> Result<()> {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(view.clone());
        Ok(())
    }
}

impl ListRenderer for RecordingRenderer {
    fn render_list(&self, view: &ListView) -> Result<()> {
        self.lists
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(view.clone());
        Ok(())
    }
}
