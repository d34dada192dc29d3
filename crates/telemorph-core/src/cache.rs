//! # State Cache
//!
//! Partial facts accumulated across notifications, keyed by target (device)
//! and then by entity identifier.
//!
//! Each [`EntityRecord`] holds entity-level facts plus per-sub-key facts.
//! Facts use overwrite semantics: the last write for a fact wins.
//!
//! ## Locking
//!
//! The cache is split into one partition per target, each behind its own
//! `Mutex`. The outer map lock is held only long enough to find or create a
//! partition, so work on different targets never blocks. [`StateCache::with_target`]
//! runs a closure as a single critical section over one target, which is how
//! a whole notification is applied atomically with respect to other
//! notifications for the same device.
//!
//! Misses (unknown target, entity or sub-key) are reported as `bool`/`Option`.

use crate::TypedValue;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// =============================================================================
// COMPLETENESS
// =============================================================================

/// The facts a derivation needs before it may produce output.
#[derive(Debug, Clone, Copy)]
pub struct Requirement<'a, F> {
    /// Entity-level facts that must be set.
    pub entity: &'a [F],
    /// Facts that must be set on the sub-key.
    pub sub_key: &'a [F],
}

// =============================================================================
// ENTITY RECORD
// =============================================================================

/// Facts known about one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord<F> {
    facts: BTreeMap<F, TypedValue>,
    sub_keys: BTreeMap<String, BTreeMap<F, TypedValue>>,
}

impl<F> Default for EntityRecord<F> {
    fn default() -> Self {
        Self {
            facts: BTreeMap::new(),
            sub_keys: BTreeMap::new(),
        }
    }
}

impl<F: Ord + Copy> EntityRecord<F> {
    /// Entity-level fact, if set.
    #[must_use]
    pub fn fact(&self, fact: F) -> Option<&TypedValue> {
        self.facts.get(&fact)
    }

    /// Fact of one sub-key, if set.
    #[must_use]
    pub fn sub_key_fact(&self, sub_key: &str, fact: F) -> Option<&TypedValue> {
        self.sub_keys.get(sub_key).and_then(|f| f.get(&fact))
    }

    /// Set an entity-level fact.
    pub fn set_fact(&mut self, fact: F, value: TypedValue) {
        self.facts.insert(fact, value);
    }

    /// Set a fact on a sub-key, creating the sub-key if needed.
    pub fn set_sub_key_fact(&mut self, sub_key: &str, fact: F, value: TypedValue) {
        self.sub_keys
            .entry(sub_key.to_string())
            .or_default()
            .insert(fact, value);
    }

    /// Unset an entity-level fact. Returns `true` if it was set.
    pub fn clear_fact(&mut self, fact: F) -> bool {
        self.facts.remove(&fact).is_some()
    }

    /// Unset one fact of a sub-key. Returns `true` if it was set.
    ///
    /// A sub-key left with no facts is removed.
    pub fn clear_sub_key_fact(&mut self, sub_key: &str, fact: F) -> bool {
        let Some(facts) = self.sub_keys.get_mut(sub_key) else {
            return false;
        };
        let removed = facts.remove(&fact).is_some();
        if facts.is_empty() {
            self.sub_keys.remove(sub_key);
        }
        removed
    }

    /// Remove a sub-key and all its facts. Returns `true` if it existed.
    pub fn remove_sub_key(&mut self, sub_key: &str) -> bool {
        self.sub_keys.remove(sub_key).is_some()
    }

    /// Remove every sub-key. Returns `true` if any existed.
    pub fn clear_sub_keys(&mut self) -> bool {
        let had_any = !self.sub_keys.is_empty();
        self.sub_keys.clear();
        had_any
    }

    /// True if at least one sub-key is present.
    #[must_use]
    pub fn has_sub_keys(&self) -> bool {
        !self.sub_keys.is_empty()
    }

    /// Sub-keys in lexicographic order.
    pub fn sub_keys(&self) -> impl Iterator<Item = &str> {
        self.sub_keys.keys().map(String::as_str)
    }

    /// True if every required fact is set for `sub_key`.
    #[must_use]
    pub fn is_complete(&self, sub_key: &str, required: Requirement<'_, F>) -> bool {
        let Some(facts) = self.sub_keys.get(sub_key) else {
            return false;
        };
        required.entity.iter().all(|f| self.facts.contains_key(f))
            && required.sub_key.iter().all(|f| facts.contains_key(f))
    }

    /// True if no entity-level fact and no sub-key remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.sub_keys.is_empty()
    }
}

// =============================================================================
// TARGET PARTITION
// =============================================================================

/// All entity records of one target.
#[derive(Debug)]
pub struct TargetState<F> {
    entities: BTreeMap<String, EntityRecord<F>>,
    retired: bool,
}

impl<F> Default for TargetState<F> {
    fn default() -> Self {
        Self {
            entities: BTreeMap::new(),
            retired: false,
        }
    }
}

impl<F: Ord + Copy> TargetState<F> {
    /// Return the record for `id`, creating an empty one if needed.
    pub fn create_or_get_entity(&mut self, id: &str) -> &mut EntityRecord<F> {
        self.entities.entry(id.to_string()).or_default()
    }

    /// Record for `id`, if present.
    #[must_use]
    pub fn entity(&self, id: &str) -> Option<&EntityRecord<F>> {
        self.entities.get(id)
    }

    /// Mutable record for `id`, if present.
    pub fn entity_mut(&mut self, id: &str) -> Option<&mut EntityRecord<F>> {
        self.entities.get_mut(id)
    }

    /// Set an entity-level fact, creating the entity on demand.
    pub fn set_fact(&mut self, id: &str, fact: F, value: TypedValue) {
        self.create_or_get_entity(id).set_fact(fact, value);
    }

    /// Set a sub-key fact, creating the entity and sub-key on demand.
    pub fn set_sub_key_fact(&mut self, id: &str, sub_key: &str, fact: F, value: TypedValue) {
        self.create_or_get_entity(id)
            .set_sub_key_fact(sub_key, fact, value);
    }

    /// Completeness of one sub-key. `false` for unknown entities or sub-keys.
    #[must_use]
    pub fn is_complete(&self, id: &str, sub_key: &str, required: Requirement<'_, F>) -> bool {
        self.entities
            .get(id)
            .is_some_and(|r| r.is_complete(sub_key, required))
    }

    /// Remove one sub-key. Returns `true` if it existed.
    ///
    /// The entity is left in place even if it is now empty; whether an empty
    /// record should be destroyed is the caller's decision.
    pub fn remove_sub_key(&mut self, id: &str, sub_key: &str) -> bool {
        self.entities
            .get_mut(id)
            .is_some_and(|r| r.remove_sub_key(sub_key))
    }

    /// Destroy the record for `id`. Returns `true` if it existed.
    pub fn clear_entity(&mut self, id: &str) -> bool {
        self.entities.remove(id).is_some()
    }

    /// Destroy the record for `id` if it holds no facts. Returns `true` if removed.
    pub fn prune(&mut self, id: &str) -> bool {
        if self.entities.get(id).is_some_and(EntityRecord::is_empty) {
            self.entities.remove(id);
            true
        } else {
            false
        }
    }

    /// Destroy every record, returning the ids that existed (sorted).
    pub fn clear(&mut self) -> Vec<String> {
        std::mem::take(&mut self.entities).into_keys().collect()
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if no entity is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

// =============================================================================
// STATE CACHE
// =============================================================================

type Partition<F> = Arc<Mutex<TargetState<F>>>;

/// Process-wide cache of partial facts, one partition per target.
///
/// Construct once and share by `Arc`; every translator call receives it by
/// reference, so tests can use a fresh cache each.
#[derive(Debug)]
pub struct StateCache<F> {
    targets: Mutex<BTreeMap<String, Partition<F>>>,
}

impl<F> Default for StateCache<F> {
    fn default() -> Self {
        Self {
            targets: Mutex::new(BTreeMap::new()),
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // Partition state is only mutated through complete operations, so a
    // panic elsewhere cannot leave it half-written.
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<F: Ord + Copy> StateCache<F> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, target: &str) -> Partition<F> {
        let mut targets = lock(&self.targets);
        Arc::clone(targets.entry(target.to_string()).or_default())
    }

    /// Run `f` with exclusive access to `target`'s partition, creating it if needed.
    ///
    /// Calls for the same target are serialized; calls for different
    /// targets run in parallel.
    pub fn with_target<R>(&self, target: &str, f: impl FnOnce(&mut TargetState<F>) -> R) -> R {
        loop {
            let partition = self.partition(target);
            let mut state = lock(&partition);
            // A concurrent delete_target may have retired the partition we
            // looked up; retry against the fresh one.
            if state.retired {
                continue;
            }
            return f(&mut state);
        }
    }

    /// Run `f` against an existing partition without creating one.
    pub fn with_existing_target<R>(
        &self,
        target: &str,
        f: impl FnOnce(&TargetState<F>) -> R,
    ) -> Option<R> {
        let partition = lock(&self.targets).get(target).map(Arc::clone)?;
        let state = lock(&partition);
        if state.retired {
            return None;
        }
        Some(f(&state))
    }

    /// Destroy one entity record. Returns `true` if it existed.
    pub fn clear_entity(&self, target: &str, id: &str) -> bool {
        let Some(partition) = lock(&self.targets).get(target).map(Arc::clone) else {
            return false;
        };
        let mut state = lock(&partition);
        !state.retired && state.clear_entity(id)
    }

    /// Drop a whole target. Returns `true` if it existed.
    pub fn delete_target(&self, target: &str) -> bool {
        let Some(partition) = lock(&self.targets).remove(target) else {
            return false;
        };
        let mut state = lock(&partition);
        state.retired = true;
        state.entities.clear();
        true
    }

    /// Known targets in lexicographic order.
    #[must_use]
    pub fn targets(&self) -> Vec<String> {
        lock(&self.targets).keys().cloned().collect()
    }

    /// Number of entities cached for `target`.
    #[must_use]
    pub fn entity_count(&self, target: &str) -> Option<usize> {
        self.with_existing_target(target, TargetState::len)
    }
}

// =============================================================================
// TESTS
// =============================================================================
