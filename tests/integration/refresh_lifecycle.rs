//! Refresh loop behaviour as seen through rendered output.

use crate::helpers::engine_with;
use glance::InstanceId;
use glance::RefreshReason;
use glance::clock::{ManualClock, MonotonicInstant};
use glance::render::TimerAction;
use glance::store::{KvStore, MemoryKv};
use std::sync::Arc;
use std::time::Duration;

const PERIOD: Duration = Duration::from_secs(1);

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Advance both the stopwatch clock and tokio's timer by one period.
async fn step(clock: &ManualClock) {
    clock.advance(PERIOD);
    tokio::time::advance(PERIOD).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn running_timer_redraws_every_period() {
    let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    let t = engine_with(kv, ManualClock::new(MonotonicInstant::ZERO));
    let id = InstanceId::new("w");
    let mut signals = t.engine.signals().subscribe();

    t.engine.start(&id);
    settle().await;
    for _ in 0..3 {
        step(&t.clock).await;
    }

    let mut ticks = 0;
    while let Ok(signal) = signals.try_recv() {
        if signal.reason == RefreshReason::Tick {
            ticks += 1;
        }
    }
    assert_eq!(ticks, 3);
    assert_eq!(t.summary.last_timer().unwrap().clock_text, "00:00:03");
    assert!(t.list.list_renders().len() <= 1, "ticks never redraw the list");
}

#[tokio::test(start_paused = true)]
async fn pause_from_another_context_stops_the_loop() {
    let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    let clock = ManualClock::new(MonotonicInstant::ZERO);
    let host = engine_with(Arc::clone(&kv), clock.clone());
    let other = engine_with(kv, clock.clone());
    let id = InstanceId::new("w");

    host.engine.start(&id);
    settle().await;
    step(&clock).await;
    assert!(host.engine.is_ticking(&id));

    other.engine.pause(&id);
    step(&clock).await;
    assert!(!host.engine.is_ticking(&id));

    let last = host.summary.last_timer().unwrap();
    assert!(!last.running, "host redraws the paused state");
    assert_eq!(last.primary_action, TimerAction::Resume);
    assert_eq!(host.status.last_timer().unwrap().clock_text, "00:00:01");

    let drawn = host.summary.timer_renders().len();
    for _ in 0..3 {
        step(&clock).await;
    }
    assert_eq!(host.summary.timer_renders().len(), drawn);
}

#[tokio::test(start_paused = true)]
async fn paused_timer_has_no_loop() {
    let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    let t = engine_with(kv, ManualClock::new(MonotonicInstant::ZERO));
    let id = InstanceId::new("w");

    t.engine.start(&id);
    settle().await;
    step(&t.clock).await;
    t.engine.pause(&id);
    settle().await;
    let drawn = t.status.timer_renders().len();

    for _ in 0..5 {
        step(&t.clock).await;
    }
    assert!(!t.engine.is_ticking(&id));
    assert_eq!(t.status.timer_renders().len(), drawn);
    assert_eq!(t.status.last_timer().unwrap().clock_text, "00:00:01");
}

#[tokio::test(start_paused = true)]
async fn destroy_cancels_ticks_but_keeps_running_state() {
    let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    let t = engine_with(kv, ManualClock::new(MonotonicInstant::ZERO));
    let id = InstanceId::new("w");

    t.engine.on_instance_created_or_rebound(&id);
    t.engine.start(&id);
    settle().await;
    t.engine.on_instance_destroyed(&id);
    settle().await;
    let drawn = t.status.timer_renders().len();

    for _ in 0..3 {
        step(&t.clock).await;
    }
    assert_eq!(t.status.timer_renders().len(), drawn);
    assert!(t.engine.status(&id).running);
    assert_eq!(t.engine.status(&id).elapsed, Duration::from_secs(3));
}
