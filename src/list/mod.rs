//! Study-list content: typed rows, formatting, and the shared snapshot.

pub mod cache;
pub mod format;
pub mod row;

pub use cache::ListContentCache;
pub use format::{RowDisplay, TIME_PLACEHOLDER, display_time, kpi_text};
pub use row::{ListRow, MalformedContent, parse_payload};
