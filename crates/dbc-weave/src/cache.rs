//! Definition cache for woven plans.
//!
//! In production, plans are keyed by [`CacheKey`] (structure id plus
//! definition and policy fingerprints) and woven at most once per key per
//! process: concurrent loaders of the same key serialize on that key's slot,
//! the first one weaves, and everyone gets the same `Arc`. The map itself is
//! locked only long enough to find the slot, so loads of other keys never
//! wait behind a weave or store I/O. An optional
//! [`ArtifactStore`] persists plans across processes; a payload that fails
//! to decode, or decodes to a plan for another key, is logged, discarded and
//! re-woven. Corruption never reaches the caller.
//!
//! In development the cache is bypassed and every load weaves fresh.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use serde::Serialize;

use dbc_core::Environment;
use dbc_storage::{decode_artifact, encode_artifact, ArtifactStore, CacheCorruptionError, CacheKey};

use crate::plan::WovenPlan;

/// Counters, mainly for tests and the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Served from the in-process map.
    pub hits: u64,
    /// Not in the in-process map.
    pub misses: u64,
    /// Plans built by running the weaver.
    pub weaves: u64,
    /// Persisted payloads discarded as corrupt.
    pub recovered: u64,
}

/// One key's plan, filled by whichever loader gets there first.
type Slot = Arc<Mutex<Option<Arc<WovenPlan>>>>;

fn lock(slot: &Mutex<Option<Arc<WovenPlan>>>) -> MutexGuard<'_, Option<Arc<WovenPlan>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct DefinitionCache {
    plans: DashMap<CacheKey, Slot>,
    store: Option<Arc<dyn ArtifactStore>>,
    hits: AtomicU64,
    misses: AtomicU64,
    weaves: AtomicU64,
    recovered: AtomicU64,
}

impl DefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that also reads and writes plans through `store`.
    pub fn with_store(store: Arc<dyn ArtifactStore>) -> Self {
        DefinitionCache {
            store: Some(store),
            ..Self::default()
        }
    }

    /// Returns the plan for `key`, running `weave` only when no usable plan
    /// exists. Errors from `weave` are returned as-is and nothing is cached.
    pub fn get_or_weave<E, F>(&self, environment: Environment, key: &CacheKey, weave: F) -> Result<Arc<WovenPlan>, E>
    where
        F: FnOnce() -> Result<WovenPlan, E>,
    {
        if environment == Environment::Development {
            self.weaves.fetch_add(1, Ordering::Relaxed);
            return weave().map(Arc::new);
        }

        let slot = Arc::clone(self.plans.entry(key.clone()).or_default().value());
        let mut guard = lock(&slot);
        if let Some(plan) = guard.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(plan));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let plan = match self.load_persisted(key) {
            Some(plan) => plan,
            None => match weave() {
                Ok(plan) => {
                    self.weaves.fetch_add(1, Ordering::Relaxed);
                    self.persist(&plan);
                    plan
                }
                Err(err) => {
                    drop(guard);
                    self.plans.remove_if(key, |_, s| Arc::ptr_eq(s, &slot));
                    return Err(err);
                }
            },
        };
        let plan = Arc::new(plan);
        *guard = Some(Arc::clone(&plan));
        Ok(plan)
    }

    /// Drops `key` from the in-process map and the store.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let mut removed = self
            .plans
            .remove(key)
            .is_some_and(|(_, slot)| lock(&slot).is_some());
        if let Some(store) = &self.store {
            match store.remove(key) {
                Ok(existed) => removed |= existed,
                Err(err) => tracing::warn!(%key, error = %err, "failed to remove persisted plan"),
            }
        }
        removed
    }

    /// Empties the in-process map. The store is left alone.
    pub fn clear(&self) {
        self.plans.clear();
    }

    /// Number of woven plans held in process.
    pub fn len(&self) -> usize {
        self.plans.iter().filter(|slot| lock(slot.value()).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.plans.get(key).is_some_and(|slot| lock(slot.value()).is_some())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            weaves: self.weaves.load(Ordering::Relaxed),
            recovered: self.recovered.load(Ordering::Relaxed),
        }
    }

    fn load_persisted(&self, key: &CacheKey) -> Option<WovenPlan> {
        let store = self.store.as_ref()?;
        let payload = match store.load(key) {
            Ok(payload) => payload?,
            Err(err) => {
                tracing::warn!(%key, error = %err, "failed to read persisted plan");
                return None;
            }
        };
        let decoded = decode_artifact::<WovenPlan>(key, &payload).and_then(|plan| {
            if plan.key == *key {
                Ok(plan)
            } else {
                Err(CacheCorruptionError::KeyMismatch {
                    expected: key.clone(),
                    found: plan.key,
                })
            }
        });
        match decoded {
            Ok(plan) => {
                tracing::debug!(%key, "loaded persisted plan");
                Some(plan)
            }
            Err(err) => {
                self.recovered.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(%key, error = %err, "discarding corrupt cached plan, re-weaving");
                None
            }
        }
    }

    fn persist(&self, plan: &WovenPlan) {
        let Some(store) = &self.store else {
            return;
        };
        let result = encode_artifact(plan).and_then(|payload| store.save(&plan.key, &payload));
        if let Err(err) = result {
            tracing::warn!(key = %plan.key, error = %err, "failed to persist woven plan");
        }
    }
}
