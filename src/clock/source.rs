//! Monotonic clock sources.

use super::anchor::{ClockEpoch, MonotonicInstant, duration_millis};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Linux exposes a per-boot random UUID here.
const BOOT_ID_PATH: &str = "/proc/sys/kernel/random/boot_id";

/// Derived boot times are rounded to this granularity so that wall-clock
/// jitter between two reads does not change the epoch marker.
const BOOT_TIME_GRANULARITY_SECS: u64 = 60;

/// Source of monotonic time shared by every context that reads timer state.
pub trait MonotonicClock: Send + Sync + 'static {
    /// Current instant. Never goes backwards within one epoch.
    fn now(&self) -> MonotonicInstant;

    /// Marker of the current clock lifetime.
    fn epoch(&self) -> ClockEpoch;
}

/// Host monotonic clock that keeps counting through device sleep.
///
/// Uses `CLOCK_BOOTTIME` on Linux/Android and `CLOCK_MONOTONIC` on other unix
/// targets. Anywhere else it falls back to a process-local origin, and the epoch
/// is scoped to the process so stale anchors are discarded on restart.
pub struct SystemClock {
    epoch: ClockEpoch,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        let epoch = detect_epoch();
        tracing::debug!(epoch = %epoch, "monotonic clock epoch detected");
        Self { epoch }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now(&self) -> MonotonicInstant {
        let raw = raw_monotonic().unwrap_or_else(|| process_origin().elapsed());
        MonotonicInstant::from_millis(duration_millis(raw))
    }

    fn epoch(&self) -> ClockEpoch {
        self.epoch.clone()
    }
}

fn process_origin() -> Instant {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    *ORIGIN.get_or_init(Instant::now)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
const CLOCK_ID: libc::clockid_t = libc::CLOCK_BOOTTIME;

#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
const CLOCK_ID: libc::clockid_t = libc::CLOCK_MONOTONIC;

#[cfg(unix)]
fn raw_monotonic() -> Option<Duration> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    let ret = unsafe { libc::clock_gettime(CLOCK_ID, &mut ts) };
    if ret != 0 {
        return None;
    }
    let secs = u64::try_from(ts.tv_sec).ok()?;
    let nanos = u32::try_from(ts.tv_nsec).ok()?;
    Some(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn raw_monotonic() -> Option<Duration> {
    None
}

fn detect_epoch() -> ClockEpoch {
    if let Ok(boot_id) = std::fs::read_to_string(BOOT_ID_PATH) {
        let trimmed = boot_id.trim();
        if !trimmed.is_empty() {
            return ClockEpoch::new(format!("boot-id:{trimmed}"));
        }
    }

    let wall_now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    match raw_monotonic() {
        Some(uptime) => {
            let boot_secs = wall_now.saturating_sub(uptime).as_secs();
            let rounded = boot_secs - boot_secs % BOOT_TIME_GRANULARITY_SECS;
            ClockEpoch::new(format!("boot-at:{rounded}"))
        }
        None => ClockEpoch::new(format!(
            "process:{}:{}",
            std::process::id(),
            wall_now.as_millis()
        )),
    }
}

/// Hand-driven clock for tests and simulations.
///
/// Clones share the same time and epoch.
#[derive(Clone)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
    epoch: Arc<Mutex<ClockEpoch>>,
}

impl ManualClock {
    /// Clock at `start` in epoch `"manual-0"`.
    #[must_use]
    pub fn new(start: MonotonicInstant) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start.as_millis())),
            epoch: Arc::new(Mutex::new(ClockEpoch::new("manual-0"))),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, now: MonotonicInstant) {
        self.now_ms.store(now.as_millis(), Ordering::SeqCst);
    }

    /// Move forward by `d`.
    pub fn advance(&self, d: Duration) {
        self.now_ms.fetch_add(duration_millis(d), Ordering::SeqCst);
    }

    /// Simulate a reboot: new epoch, clock restarts at `restart_at`.
    pub fn reboot(&self, epoch: ClockEpoch, restart_at: MonotonicInstant) {
        let mut guard = self
            .epoch
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = epoch;
        self.set(restart_at);
    }
}

impl MonotonicClock for ManualClock {
    fn now(&self) -> MonotonicInstant {
        MonotonicInstant::from_millis(self.now_ms.load(Ordering::SeqCst))
    }

    fn epoch(&self) -> ClockEpoch {
        self.epoch
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
