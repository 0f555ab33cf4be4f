//! Stopwatch behaviour through the engine entry points.

use crate::helpers::memory_engine;
use glance::InstanceId;
use glance::UserIntent;
use glance::render::TimerAction;
use glance::store::TimerPhase;
use glance::timer::TransitionOutcome;
use std::time::Duration;

#[tokio::test]
async fn pause_resume_banks_total_running_time() {
    let t = memory_engine();
    let id = InstanceId::new("desk");

    t.engine.start(&id);
    t.clock.advance(Duration::from_secs(65));
    assert_eq!(t.engine.timer_view(&id).clock_text, "00:01:05");

    let first = t.engine.pause(&id);
    assert_eq!(first.instance.accumulated_offset, Duration::from_secs(65));

    t.engine.start(&id);
    t.clock.advance(Duration::from_secs(30));
    let second = t.engine.pause(&id);
    assert_eq!(second.instance.accumulated_offset, Duration::from_secs(95));
    assert_eq!(t.engine.timer_view(&id).clock_text, "00:01:35");
}

#[tokio::test]
async fn paused_time_does_not_advance() {
    let t = memory_engine();
    let id = InstanceId::new("desk");
    t.engine.start(&id);
    t.clock.advance(Duration::from_secs(10));
    t.engine.pause(&id);

    t.clock.advance(Duration::from_secs(3_600));
    let status = t.engine.status(&id);
    assert_eq!(status.phase, TimerPhase::Paused);
    assert_eq!(status.elapsed, Duration::from_secs(10));
}

#[tokio::test]
async fn invalid_transitions_are_no_ops() {
    let t = memory_engine();
    let id = InstanceId::new("desk");

    let pause = t.engine.pause(&id);
    assert_eq!(pause.outcome, TransitionOutcome::NotRunning);
    assert_eq!(t.engine.status(&id).phase, TimerPhase::Stopped);

    t.engine.start(&id);
    t.clock.advance(Duration::from_secs(5));
    let again = t.engine.start(&id);
    assert_eq!(again.outcome, TransitionOutcome::AlreadyRunning);
    assert_eq!(t.engine.status(&id).elapsed, Duration::from_secs(5));
}

#[tokio::test]
async fn reset_from_any_phase_stops_at_zero() {
    let t = memory_engine();
    let id = InstanceId::new("desk");

    for intents in [
        vec![],
        vec![UserIntent::Start],
        vec![UserIntent::Start, UserIntent::Pause],
    ] {
        for intent in intents {
            t.engine.apply_intent(&id, intent);
            t.clock.advance(Duration::from_secs(7));
        }
        let reset = t.engine.reset(&id);
        assert_eq!(reset.outcome, TransitionOutcome::Reset);
        let status = t.engine.status(&id);
        assert_eq!(status.phase, TimerPhase::Stopped);
        assert_eq!(status.elapsed, Duration::ZERO);
        assert!(!t.engine.is_ticking(&id));
    }
}

#[tokio::test]
async fn every_transition_renders_status_and_summary() {
    let t = memory_engine();
    let id = InstanceId::new("desk");

    t.engine.start(&id);
    assert!(
        crate::helpers::wait_until(|| t.summary.last_timer().is_some_and(|v| v.running)).await
    );
    let running = t.status.last_timer().unwrap();
    assert_eq!(running.primary_action, TimerAction::Pause);
    assert_eq!(running.secondary_action, TimerAction::Stop);

    t.clock.advance(Duration::from_secs(3));
    t.engine.pause(&id);
    assert!(
        crate::helpers::wait_until(|| {
            t.summary
                .last_timer()
                .is_some_and(|v| v.phase == TimerPhase::Paused)
        })
        .await
    );
    let paused = t.summary.last_timer().unwrap();
    assert_eq!(paused.primary_action, TimerAction::Resume);
    assert_eq!(paused.headline, "⏸ 00:00:03");
}

#[tokio::test]
async fn instances_are_independent() {
    let t = memory_engine();
    let a = InstanceId::new("a");
    let b = InstanceId::new("b");

    t.engine.start(&a);
    t.clock.advance(Duration::from_secs(20));
    t.engine.start(&b);
    t.clock.advance(Duration::from_secs(5));
    t.engine.pause(&a);

    assert_eq!(t.engine.status(&a).elapsed, Duration::from_secs(25));
    assert_eq!(t.engine.status(&b).elapsed, Duration::from_secs(5));
    assert!(!t.engine.is_ticking(&a));
    assert!(t.engine.is_ticking(&b));
}
