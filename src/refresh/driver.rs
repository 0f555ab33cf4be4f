//! Periodic refresh loop for running timers.
//!
//! One driver task owns every schedule. `arm`/`disarm` are commands sent to
//! it, so there is only ever one pending wake-up and a schedule map keyed by
//! instance id: arming an id replaces its previous loop instead of adding a
//! second one.

use crate::signal::{RefreshReason, RefreshSignal, SignalBus};
use crate::store::{InstanceId, TimerStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Identifies one armed loop. Passing a stale handle to
/// [`RefreshLoop::disarm`] does nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopHandle {
    instance_id: InstanceId,
    generation: u64,
}

impl LoopHandle {
    #[must_use]
    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }
}

#[derive(Debug)]
enum LoopCommand {
    Arm {
        id: InstanceId,
        period: Duration,
        generation: u64,
    },
    Disarm {
        id: InstanceId,
        generation: Option<u64>,
    },
    Shutdown,
}

/// Active generation per instance id. The single source of truth for
/// "which loop is armed", shared with the driver for self-disarm.
type ArmedMap = Arc<Mutex<HashMap<InstanceId, u64>>>;

/// Handle to the refresh driver task.
pub struct RefreshLoop {
    cmd_tx: mpsc::UnboundedSender<LoopCommand>,
    armed: ArmedMap,
    next_generation: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshLoop {
    /// Spawn the driver on the current tokio runtime.
    #[must_use]
    pub fn spawn(store: TimerStore, signals: SignalBus) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let armed: ArmedMap = Arc::new(Mutex::new(HashMap::new()));

        let driver = Driver {
            cmd_rx,
            store,
            signals,
            armed: Arc::clone(&armed),
            schedules: HashMap::new(),
        };
        let task = tokio::spawn(driver.run());

        Self {
            cmd_tx,
            armed,
            next_generation: AtomicU64::new(1),
            task: Mutex::new(Some(task)),
        }
    }

    /// Emit `Tick` for `id` every `period` while it stays running.
    ///
    /// Any loop already armed for `id` is cancelled first.
    pub fn arm(&self, id: &InstanceId, period: Duration) -> LoopHandle {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = armed.insert(id.clone(), generation) {
            debug!(instance = %id, previous, generation, "re-arming refresh loop");
        } else {
            debug!(instance = %id, generation, "arming refresh loop");
        }
        self.send(LoopCommand::Arm {
            id: id.clone(),
            period,
            generation,
        });

        LoopHandle {
            instance_id: id.clone(),
            generation,
        }
    }

    /// Cancel the loop `handle` refers to, if it is still the active one.
    /// Returns `true` when a loop was cancelled.
    pub fn disarm(&self, handle: &LoopHandle) -> bool {
        let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
        if armed.get(&handle.instance_id) != Some(&handle.generation) {
            return false;
        }
        armed.remove(&handle.instance_id);
        debug!(instance = %handle.instance_id, generation = handle.generation, "disarming refresh loop");
        self.send(LoopCommand::Disarm {
            id: handle.instance_id.clone(),
            generation: Some(handle.generation),
        });
        true
    }

    /// Cancel whatever loop `id` has. Returns `true` when one was armed.
    pub fn disarm_instance(&self, id: &InstanceId) -> bool {
        let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
        let was_armed = armed.remove(id).is_some();
        if was_armed {
            debug!(instance = %id, "disarming refresh loop");
            self.send(LoopCommand::Disarm {
                id: id.clone(),
                generation: None,
            });
        }
        was_armed
    }

    #[must_use]
    pub fn is_armed(&self, id: &InstanceId) -> bool {
        self.armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    #[must_use]
    pub fn armed_count(&self) -> usize {
        self.armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Stop the driver and wait for it to exit.
    pub async fn shutdown(&self) {
        self.send(LoopCommand::Shutdown);
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }
        self.armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn send(&self, command: LoopCommand) {
        if self.cmd_tx.send(command).is_err() {
            warn!("refresh driver is not running; command dropped");
        }
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

struct Schedule {
    period: Duration,
    next_due: Instant,
    generation: u64,
}

struct Driver {
    cmd_rx: mpsc::UnboundedReceiver<LoopCommand>,
    store: TimerStore,
    signals: SignalBus,
    armed: ArmedMap,
    schedules: HashMap<InstanceId, Schedule>,
}

impl Driver {
    async fn run(mut self) {
        info!("refresh driver started");
        loop {
            let next_due = self.schedules.values().map(|s| s.next_due).min();

            tokio::select! {
                // Commands first: a disarm must land before the next fire.
                biased;
                command = self.cmd_rx.recv() => match command {
                    Some(LoopCommand::Shutdown) | None => break,
                    Some(command) => self.apply(command),
                },
                () = sleep_until(next_due) => self.fire_due(),
            }
        }
        info!("refresh driver stopped");
    }

    fn apply(&mut self, command: LoopCommand) {
        match command {
            LoopCommand::Arm {
                id,
                period,
                generation,
            } => {
                let period = period.max(Duration::from_millis(1));
                self.schedules.insert(
                    id,
                    Schedule {
                        period,
                        next_due: Instant::now() + period,
                        generation,
                    },
                );
            }
            LoopCommand::Disarm { id, generation } => {
                let matches = match (self.schedules.get(&id), generation) {
                    (Some(_), None) => true,
                    (Some(schedule), Some(generation)) => schedule.generation == generation,
                    (None, _) => false,
                };
                if matches {
                    self.schedules.remove(&id);
                }
            }
            LoopCommand::Shutdown => {}
        }
    }

    fn fire_due(&mut self) {
        let now = Instant::now();
        let due: Vec<InstanceId> = self
            .schedules
            .iter()
            .filter(|(_, s)| s.next_due <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in due {
            // Read fresh every tick; another context may have paused us.
            if !self.store.get(&id).running {
                self.self_disarm(&id);
                continue;
            }

            self.signals
                .emit(RefreshSignal::new(id.clone(), RefreshReason::Tick));

            if let Some(schedule) = self.schedules.get_mut(&id) {
                schedule.next_due += schedule.period;
                if schedule.next_due <= now {
                    schedule.next_due = now + schedule.period;
                }
            }
        }
    }

    fn self_disarm(&mut self, id: &InstanceId) {
        let Some(schedule) = self.schedules.remove(id) else {
            return;
        };
        let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
        if armed.get(id) == Some(&schedule.generation) {
            armed.remove(id);
        }
        drop(armed);
        // Last tick drew a running clock; redraw from the stored state.
        self.signals
            .emit(RefreshSignal::new(id.clone(), RefreshReason::StateChanged));
        debug!(instance = %id, "timer no longer running; refresh loop self-disarmed");
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
