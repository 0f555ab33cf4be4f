//! Widget engine: the entry points the host calls.
//!
//! Wires the timer state machine, refresh loop, render dispatcher and list
//! cache together. Every user intent is "persist, signal, then (dis)arm":
//! a running timer gets exactly one refresh loop, anything else gets none.

use crate::clock::MonotonicClock;
use crate::config::{GlanceConfig, StoreBackend};
use crate::list::{ListContentCache, ListRow};
use crate::refresh::RefreshLoop;
use crate::render::{ListView, RenderDispatcher, RenderTargets, TimerView};
use crate::signal::{RefreshReason, RefreshSignal, SignalBus};
use crate::store::{FileKv, InstanceId, InstanceRegistry, KvStore, MemoryKv, TimerStore};
use crate::timer::{TimerSnapshot, TimerStateMachine, Transition};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub use crate::timer::UserIntent;

pub struct WidgetEngine {
    clock: Arc<dyn MonotonicClock>,
    machine: TimerStateMachine,
    registry: InstanceRegistry,
    list: Arc<ListContentCache>,
    refresh: RefreshLoop,
    dispatcher: Arc<RenderDispatcher>,
    signals: SignalBus,
    tick_period: Duration,
    dispatch_task: JoinHandle<()>,
}

impl WidgetEngine {
    /// Build an engine over `kv`, spawning the refresh driver and the render
    /// dispatcher on the current tokio runtime.
    #[must_use]
    pub fn new(
        kv: Arc<dyn KvStore>,
        clock: Arc<dyn MonotonicClock>,
        targets: RenderTargets,
        config: &GlanceConfig,
    ) -> Self {
        let signals = SignalBus::new(config.signals.capacity);
        let store = TimerStore::new(Arc::clone(&kv), Arc::clone(&clock));
        let registry = InstanceRegistry::new(Arc::clone(&kv));
        let list = Arc::new(ListContentCache::new(
            kv,
            registry.clone(),
            signals.clone(),
        ));
        let refresh = RefreshLoop::spawn(store.clone(), signals.clone());
        let dispatcher = Arc::new(RenderDispatcher::new(
            store.clone(),
            Arc::clone(&clock),
            Arc::clone(&list),
            targets,
        ));
        let dispatch_task = tokio::spawn(Arc::clone(&dispatcher).run(signals.subscribe()));

        Self {
            clock,
            machine: TimerStateMachine::new(store, signals.clone()),
            registry,
            list,
            refresh,
            dispatcher,
            signals,
            tick_period: config.timer.tick_period(),
            dispatch_task,
        }
    }

    /// Build an engine with the backend named in `config`.
    #[must_use]
    pub fn from_config(
        config: &GlanceConfig,
        clock: Arc<dyn MonotonicClock>,
        targets: RenderTargets,
    ) -> Self {
        let kv: Arc<dyn KvStore> = match config.store.backend {
            StoreBackend::File => {
                let path = config.store.resolved_path();
                info!("widget state at {}", path.display());
                Arc::new(FileKv::new(path))
            }
            StoreBackend::Memory => Arc::new(MemoryKv::new()),
        };
        Self::new(kv, clock, targets, config)
    }

    pub fn start(&self, id: &InstanceId) -> Transition {
        self.apply_intent(id, UserIntent::Start)
    }

    pub fn pause(&self, id: &InstanceId) -> Transition {
        self.apply_intent(id, UserIntent::Pause)
    }

    pub fn reset(&self, id: &InstanceId) -> Transition {
        self.apply_intent(id, UserIntent::Reset)
    }

    /// Apply one intent at the current clock instant.
    pub fn apply_intent(&self, id: &InstanceId, intent: UserIntent) -> Transition {
        let now = self.clock.now();
        self.machine.apply(id, intent, now, |committed| {
            self.sync_loop(id, committed.running);
        })
    }

    /// A widget was placed or re-bound: render stored state as-is and
    /// resume ticking if it was left running.
    pub fn on_instance_created_or_rebound(&self, id: &InstanceId) {
        match self.registry.insert(id) {
            Ok(true) => info!(instance = %id, "widget instance registered"),
            Ok(false) => info!(instance = %id, "widget instance rebound"),
            Err(e) => error!(instance = %id, "cannot register widget instance: {e}"),
        }

        self.list.reload();
        self.dispatcher
            .on_signal(&RefreshSignal::new(id.clone(), RefreshReason::StateChanged));

        self.machine
            .observe(id, |stored| self.sync_loop(id, stored.running));
    }

    /// A widget was removed. Its timer state is kept for re-creation with
    /// the same id.
    pub fn on_instance_destroyed(&self, id: &InstanceId) {
        self.refresh.disarm_instance(id);
        match self.registry.remove(id) {
            Ok(_) => info!(instance = %id, "widget instance destroyed; state retained"),
            Err(e) => error!(instance = %id, "cannot unregister widget instance: {e}"),
        }
    }

    /// Ingest entry point: replace list content and refresh every known
    /// instance's list. Returns the number of rows accepted.
    pub fn replace_list_content(&self, payload: &str) -> usize {
        let rows = self.list.invalidate(payload);
        info!(rows, "list content replaced");
        rows
    }

    /// Re-arm refresh loops for every known instance left running, e.g.
    /// after the host process restarted. Returns how many were armed.
    pub fn resume_known_instances(&self) -> usize {
        let mut armed = 0;
        for id in self.registry.known() {
            let running = self.machine.observe(&id, |stored| {
                self.sync_loop(&id, stored.running);
                stored.running
            });
            if running {
                armed += 1;
            }
        }
        if armed > 0 {
            info!(armed, "resumed refresh loops for running timers");
        }
        armed
    }

    #[must_use]
    pub fn status(&self, id: &InstanceId) -> TimerSnapshot {
        self.machine.snapshot(id, self.clock.now())
    }

    #[must_use]
    pub fn timer_view(&self, id: &InstanceId) -> TimerView {
        self.dispatcher.timer_view(id)
    }

    #[must_use]
    pub fn list_view(&self, id: &InstanceId) -> ListView {
        self.dispatcher.list_view(id)
    }

    #[must_use]
    pub fn list_snapshot(&self) -> Arc<[ListRow]> {
        self.list.snapshot()
    }

    #[must_use]
    pub fn known_instances(&self) -> BTreeSet<InstanceId> {
        self.registry.known()
    }

    #[must_use]
    pub fn is_ticking(&self, id: &InstanceId) -> bool {
        self.refresh.is_armed(id)
    }

    #[must_use]
    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    /// Stop the refresh driver and the render dispatcher.
    pub async fn shutdown(mut self) {
        self.refresh.shutdown().await;
        self.dispatch_task.abort();
        let _ = (&mut self.dispatch_task).await;
        info!("widget engine stopped");
    }

    fn sync_loop(&self, id: &InstanceId, running: bool) {
        if running {
            self.refresh.arm(id, self.tick_period);
        } else {
            self.refresh.disarm_instance(id);
        }
    }
}

impl Drop for WidgetEngine {
    fn drop(&mut self) {
        // The dispatcher task holds the renderers; stop it with the engine.
        self.dispatch_task.abort();
    }
}
