//! Pure row formatting for the list renderer.

use crate::list::row::ListRow;
use serde::Serialize;

/// Shown when a row has no usable scheduled time.
pub const TIME_PLACEHOLDER: &str = "--:--";

/// 12-hour display time, e.g. `"2:05 PM"`, or [`TIME_PLACEHOLDER`].
#[must_use]
pub fn display_time(row: &ListRow) -> String {
    match row.scheduled_time_of_day {
        Some(time) => time.format("%-I:%M %p").to_string(),
        None => TIME_PLACEHOLDER.to_owned(),
    }
}

/// Progress text, e.g. `"20/50 min"`.
#[must_use]
pub fn kpi_text(row: &ListRow) -> String {
    format!("{}/{} min", row.actual_minutes, row.planned_minutes)
}

/// Everything a list renderer needs to draw one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDisplay {
    pub position: usize,
    pub label: String,
    pub time: String,
    pub kpi: String,
    /// Even rows get the stronger zebra stripe.
    pub striped: bool,
}

impl RowDisplay {
    #[must_use]
    pub fn new(position: usize, row: &ListRow) -> Self {
        Self {
            position,
            label: row.label.clone(),
            time: display_time(row),
            kpi: kpi_text(row),
            striped: position % 2 == 0,
        }
    }
}
