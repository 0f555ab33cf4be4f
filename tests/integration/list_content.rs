//! Study-list ingest and rendering.

use crate::helpers::{engine_with, file_kv, memory_engine, wait_until};
use glance::InstanceId;
use glance::clock::{ManualClock, MonotonicInstant};
use glance::list::TIME_PLACEHOLDER;

const PAYLOAD: &str = r#"[
    {"name": "Chemistry", "time": "14:05", "planned": "50", "actual": "20"},
    {"time": "8:00", "planned": 30},
    {"name": "History", "time": "25:99", "planned": "x", "actual": "-3"}
]"#;

#[tokio::test]
async fn rows_are_typed_and_formatted() {
    let t = memory_engine();
    assert_eq!(t.engine.replace_list_content(PAYLOAD), 3);

    let view = t.engine.list_view(&InstanceId::new("w"));
    assert_eq!(view.rows.len(), 3);

    assert_eq!(view.rows[0].label, "Chemistry");
    assert_eq!(view.rows[0].time, "2:05 PM");
    assert_eq!(view.rows[0].kpi, "20/50 min");
    assert!(view.rows[0].striped);

    assert_eq!(view.rows[1].label, "Subject");
    assert_eq!(view.rows[1].time, "8:00 AM");
    assert_eq!(view.rows[1].kpi, "0/30 min");
    assert!(!view.rows[1].striped);

    assert_eq!(view.rows[2].time, TIME_PLACEHOLDER);
    assert_eq!(view.rows[2].kpi, "0/0 min");
}

#[tokio::test]
async fn malformed_payload_degrades_to_empty() {
    let t = memory_engine();
    t.engine.replace_list_content(PAYLOAD);

    assert_eq!(t.engine.replace_list_content("{not json"), 0);
    assert!(t.engine.list_snapshot().is_empty());
    assert!(t.engine.list_view(&InstanceId::new("w")).is_empty());

    assert_eq!(t.engine.replace_list_content(r#"{"name":"not an array"}"#), 0);
}

#[tokio::test]
async fn ingest_refreshes_only_the_list_of_every_known_instance() {
    let t = memory_engine();
    let a = InstanceId::new("a");
    let b = InstanceId::new("b");
    t.engine.on_instance_created_or_rebound(&a);
    t.engine.on_instance_created_or_rebound(&b);
    t.status.clear();
    t.list.clear();

    t.engine.replace_list_content(PAYLOAD);

    assert!(wait_until(|| t.list.list_renders().len() >= 2).await);
    let mut ids: Vec<_> = t
        .list
        .list_renders()
        .into_iter()
        .map(|v| v.instance_id)
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids, vec![a, b]);
    assert!(t.status.timer_renders().is_empty());
}

#[tokio::test]
async fn content_written_by_one_context_is_read_by_another() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(MonotonicInstant::ZERO);
    let ingest = engine_with(file_kv(dir.path()), clock.clone());
    ingest.engine.replace_list_content(PAYLOAD);

    let widget = engine_with(file_kv(dir.path()), clock);
    assert_eq!(widget.engine.list_snapshot().len(), 3);

    let id = InstanceId::new("w");
    widget.engine.on_instance_created_or_rebound(&id);
    let drawn = widget.list.list_renders();
    assert_eq!(drawn.last().unwrap().rows[0].label, "Chemistry");
}
