//! Snapshot of list rows, replaced only on explicit invalidation.

use crate::list::format::RowDisplay;
use crate::list::row::{ListRow, parse_payload};
use crate::signal::{RefreshReason, RefreshSignal, SignalBus};
use crate::store::{InstanceRegistry, KvStore};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, warn};

/// Global (not per-instance) key holding the raw ingest payload.
const KEY_LIST_CONTENT: &str = "list.content";

pub struct ListContentCache {
    kv: Arc<dyn KvStore>,
    registry: InstanceRegistry,
    signals: SignalBus,
    rows: RwLock<Arc<[ListRow]>>,
}

impl ListContentCache {
    /// Build the cache, seeded from whatever payload is already persisted.
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>, registry: InstanceRegistry, signals: SignalBus) -> Self {
        let cache = Self {
            kv,
            registry,
            signals,
            rows: RwLock::new(Arc::from(Vec::new())),
        };
        cache.reload();
        cache
    }

    /// Replace the snapshot from `payload`, persist it, and signal every
    /// known instance. Returns the new row count.
    ///
    /// A malformed payload yields an empty snapshot.
    pub fn invalidate(&self, payload: &str) -> usize {
        let rows = rows_or_empty(payload);
        let count = {
            // Persisted payload and snapshot change under the same write lock.
            let mut current = self.rows.write().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = self.kv.put(KEY_LIST_CONTENT, payload.to_owned()) {
                error!("cannot persist list content: {e}");
            }
            swap_rows(&mut current, rows)
        };

        for id in self.registry.known() {
            self.signals
                .emit(RefreshSignal::new(id, RefreshReason::ContentChanged));
        }
        count
    }

    /// Re-read the persisted payload; another context may have written it.
    pub fn reload(&self) -> usize {
        let mut current = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let payload = match self.kv.get(KEY_LIST_CONTENT) {
            Ok(Some(payload)) => payload,
            Ok(None) => return swap_rows(&mut current, Vec::new()),
            Err(e) => {
                warn!("cannot read list content, keeping current snapshot: {e}");
                return current.len();
            }
        };
        swap_rows(&mut current, rows_or_empty(&payload))
    }

    /// Current rows, in ingest order.
    #[must_use]
    pub fn snapshot(&self) -> Arc<[ListRow]> {
        Arc::clone(&self.rows.read().unwrap_or_else(PoisonError::into_inner))
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Display-ready rows for the list renderer.
    #[must_use]
    pub fn display_rows(&self) -> Vec<RowDisplay> {
        self.snapshot()
            .iter()
            .enumerate()
            .map(|(position, row)| RowDisplay::new(position, row))
            .collect()
    }
}

fn swap_rows(current: &mut Arc<[ListRow]>, rows: Vec<ListRow>) -> usize {
    let count = rows.len();
    *current = Arc::from(rows);
    debug!(rows = count, "list snapshot replaced");
    count
}

fn rows_or_empty(payload: &str) -> Vec<ListRow> {
    parse_payload(payload).unwrap_or_else(|e| {
        warn!("{e}; showing an empty list");
        Vec::new()
    })
}
