//! Typed list rows and the ingest payload parser.
//!
//! The external content source sends a loosely typed JSON array. Each
//! element is validated here into a [`ListRow`] with explicit defaults so
//! nothing downstream has to handle missing or malformed fields.

use chrono::NaiveTime;
use serde_json::Value;

/// Label used when a row carries no usable name.
pub const DEFAULT_LABEL: &str = "Subject";

/// One study-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub label: String,
    /// 24-hour scheduled time; `None` when missing or malformed.
    pub scheduled_time_of_day: Option<NaiveTime>,
    pub planned_minutes: u32,
    pub actual_minutes: u32,
}

impl Default for ListRow {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_owned(),
            scheduled_time_of_day: None,
            planned_minutes: 0,
            actual_minutes: 0,
        }
    }
}

/// Why a payload produced no rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedContent {
    /// Not valid JSON.
    Unparseable(String),
    /// Valid JSON, but not an array.
    NotAnArray,
}

impl std::fmt::Display for MalformedContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unparseable(e) => write!(f, "list payload is not valid JSON: {e}"),
            Self::NotAnArray => f.write_str("list payload is not a JSON array"),
        }
    }
}

/// Parse an ingest payload into rows.
///
/// Non-object elements are skipped; field problems fall back to defaults.
pub fn parse_payload(payload: &str) -> Result<Vec<ListRow>, MalformedContent> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| MalformedContent::Unparseable(e.to_string()))?;
    parse_value(&value)
}

/// Same as [`parse_payload`] for an already-decoded JSON value.
pub fn parse_value(value: &Value) -> Result<Vec<ListRow>, MalformedContent> {
    let Value::Array(items) = value else {
        return Err(MalformedContent::NotAnArray);
    };

    Ok(items.iter().filter_map(row_from_value).collect())
}

fn row_from_value(value: &Value) -> Option<ListRow> {
    let Value::Object(fields) = value else {
        tracing::debug!("skipping non-object list element");
        return None;
    };

    let label = match fields.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => DEFAULT_LABEL.to_owned(),
    };

    let scheduled_time_of_day = match fields.get("time") {
        Some(Value::String(raw)) => parse_time_of_day(raw),
        _ => None,
    };

    Some(ListRow {
        label,
        scheduled_time_of_day,
        planned_minutes: minutes_field(fields.get("planned")),
        actual_minutes: minutes_field(fields.get("actual")),
    })
}

/// Parse `"HH:MM"` (24-hour, single-digit hours allowed).
#[must_use]
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let (hour, minute) = raw.trim().split_once(':')?;
    let hour = hour.trim().parse::<u32>().ok()?;
    let minute = minute.trim().parse::<u32>().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Minutes from a number or numeric string; anything else, or a negative
/// value, is zero.
fn minutes_field(value: Option<&Value>) -> u32 {
    let minutes = match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            trimmed.parse::<u64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f > 0.0)
                    .map(|f| f as u64)
            })
        }
        _ => None,
    };
    minutes
        .map(|m| u32::try_from(m).unwrap_or(u32::MAX))
        .unwrap_or(0)
}
