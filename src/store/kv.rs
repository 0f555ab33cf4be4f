//! Key-value backends for shared widget state.
//!
//! Every context (status updater, summary renderer, list provider) reads and
//! writes the same flat string map. [`FileKv`] makes that map visible across
//! processes; [`MemoryKv`] keeps it in-process.

use crate::error::{GlanceError, Result};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

/// The full persisted map.
pub type KvMap = BTreeMap<String, String>;

/// How long a writer waits for the cross-process lock.
const LOCK_TIMEOUT: Duration = Duration::from_millis(1500);

/// Lock files older than this are assumed abandoned by a crashed writer.
const STALE_LOCK_AGE: Duration = Duration::from_secs(30);

/// Shared string key-value store.
pub trait KvStore: Send + Sync + 'static {
    /// Consistent read of the whole map.
    fn load(&self) -> Result<KvMap>;

    /// Atomic read-modify-write: `f` sees the current map and its edits are
    /// committed as one replacement. Last writer wins.
    fn update(&self, f: &mut dyn FnMut(&mut KvMap)) -> Result<()>;

    /// Read one key.
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    /// Write several keys in one atomic replacement.
    fn put_many(&self, entries: Vec<(String, String)>) -> Result<()> {
        let mut entries = Some(entries);
        self.update(&mut |map| {
            if let Some(entries) = entries.take() {
                map.extend(entries);
            }
        })
    }

    /// Write one key.
    fn put(&self, key: &str, value: String) -> Result<()> {
        self.put_many(vec![(key.to_owned(), value)])
    }

    /// Keys beginning with `prefix`, in sorted order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .load()?
            .into_keys()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}

/// In-process map.
#[derive(Default)]
pub struct MemoryKv {
    map: Mutex<KvMap>,
}

impl MemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn load(&self) -> Result<KvMap> {
        Ok(self
            .map
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    fn update(&self, f: &mut dyn FnMut(&mut KvMap)) -> Result<()> {
        let mut guard = self
            .map
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut *guard);
        Ok(())
    }
}

/// JSON object file shared between processes.
///
/// Reads always go to disk so writes from other contexts are observed.
/// Writes take a lock file, re-read, apply, then replace the file through a
/// temp file and rename, so readers never see a torn document.
pub struct FileKv {
    path: PathBuf,
}

impl FileKv {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn read_map(&self) -> Result<KvMap> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(KvMap::new()),
            Err(e) => {
                return Err(GlanceError::Store(format!(
                    "cannot read widget state {}: {e}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_slice::<KvMap>(&bytes) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!(
                    "ignoring malformed widget state at {}: {e}",
                    self.path.display()
                );
                Ok(KvMap::new())
            }
        }
    }

    fn write_map(&self, map: &KvMap) -> Result<()> {
        let tmp_path = self.path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(map)
            .map_err(|e| GlanceError::Store(format!("cannot serialize widget state: {e}")))?;
        std::fs::write(&tmp_path, json)
            .map_err(|e| GlanceError::Store(format!("cannot write widget state temp file: {e}")))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| GlanceError::Store(format!("cannot finalize widget state file: {e}")))?;
        Ok(())
    }

    fn acquire_write_guard(&self) -> Result<LockGuard> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GlanceError::Store(format!("cannot create widget state directory: {e}"))
            })?;
        }

        let started = Instant::now();
        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    let _ = write!(file, "{}", std::process::id());
                    return Ok(LockGuard { path: lock_path });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    evict_stale_lock(&lock_path);
                    if started.elapsed() > LOCK_TIMEOUT {
                        return Err(GlanceError::Store(format!(
                            "timed out waiting for widget state lock {}",
                            lock_path.display()
                        )));
                    }
                    std::thread::sleep(Duration::from_millis(2));
                }
                Err(e) => {
                    return Err(GlanceError::Store(format!(
                        "cannot create widget state lock {}: {e}",
                        lock_path.display()
                    )));
                }
            }
        }
    }
}

impl KvStore for FileKv {
    fn load(&self) -> Result<KvMap> {
        self.read_map()
    }

    fn update(&self, f: &mut dyn FnMut(&mut KvMap)) -> Result<()> {
        let _guard = self.acquire_write_guard()?;
        let mut map = self.read_map()?;
        f(&mut map);
        self.write_map(&map)
    }
}

fn evict_stale_lock(lock_path: &Path) {
    if !is_stale(lock_path) {
        return;
    }

    // Rename is atomic: of several evictors only one moves the file, and a
    // lock created after the check is never deleted by path.
    let aside = lock_path.with_extension(format!("lock.stale-{}", uuid::Uuid::new_v4()));
    if std::fs::rename(lock_path, &aside).is_err() {
        return;
    }

    if is_stale(&aside) {
        tracing::warn!("removed stale widget state lock {}", lock_path.display());
    } else if std::fs::hard_link(&aside, lock_path).is_err() {
        // Link never overwrites; a newer lock already took the path.
        tracing::warn!(
            "live widget state lock {} was replaced during eviction",
            lock_path.display()
        );
    }
    let _ = std::fs::remove_file(&aside);
}

fn is_stale(path: &Path) -> bool {
    std::fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK_AGE)
}

struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
