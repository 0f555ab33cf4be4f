//! Set of instance ids currently placed in the host.
//!
//! Persisted so that any context (e.g. the ingest path) can fan a list
//! refresh out to every placed widget.

use crate::error::Result;
use crate::store::kv::{KvMap, KvStore};
use crate::store::timer_store::InstanceId;
use std::collections::BTreeSet;
use std::sync::Arc;

const KEY_INSTANCES: &str = "widget.instances";

#[derive(Clone)]
pub struct InstanceRegistry {
    kv: Arc<dyn KvStore>,
}

impl InstanceRegistry {
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Known instance ids; empty when unreadable.
    #[must_use]
    pub fn known(&self) -> BTreeSet<InstanceId> {
        match self.kv.load() {
            Ok(map) => decode(&map),
            Err(e) => {
                tracing::warn!("cannot read instance registry: {e}");
                BTreeSet::new()
            }
        }
    }

    /// Record `id` as placed. Returns `true` when newly added.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend update fails.
    pub fn insert(&self, id: &InstanceId) -> Result<bool> {
        self.edit(|set| set.insert(id.clone()))
    }

    /// Forget `id`. Returns `true` when it was known.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend update fails.
    pub fn remove(&self, id: &InstanceId) -> Result<bool> {
        self.edit(|set| set.remove(id))
    }

    fn edit(&self, f: impl FnOnce(&mut BTreeSet<InstanceId>) -> bool) -> Result<bool> {
        let mut f = Some(f);
        let mut changed = false;
        self.kv.update(&mut |map| {
            if let Some(f) = f.take() {
                let mut set = decode(map);
                changed = f(&mut set);
                if changed {
                    match serde_json::to_string(&set) {
                        Ok(json) => {
                            map.insert(KEY_INSTANCES.to_owned(), json);
                        }
                        Err(e) => tracing::error!("cannot encode instance registry: {e}"),
                    }
                }
            }
        })?;
        Ok(changed)
    }
}

fn decode(map: &KvMap) -> BTreeSet<InstanceId> {
    let Some(raw) = map.get(KEY_INSTANCES) else {
        return BTreeSet::new();
    };
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!("ignoring malformed instance registry: {e}");
        BTreeSet::new()
    })
}
