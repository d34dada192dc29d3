//! # Aggregation & Derivation Engine
//!
//! Turns one input notification into at most one normalized notification,
//! using the [`StateCache`] to accumulate facts that arrive across many
//! notifications.
//!
//! A concrete feature plugs in through [`StatefulFeature`]: it classifies
//! updates and deletes, and derives output from a complete record. The
//! engine owns everything else:
//!
//! 1. Resolve every update into a [`FactWrite`]. Any error aborts the
//!    notification before the cache is touched.
//! 2. Apply the writes, then the deletes. Unrecognized or malformed deletes
//!    are logged and skipped.
//! 3. Reconcile: an entity slated for output deletion is never also updated.
//! 4. Derive output for the remaining entities; incomplete ones are deferred.
//! 5. Assemble the outgoing notification, or `None` if it would be empty.
//!
//! Steps 2–4 run inside one [`StateCache::with_target`] critical section.

use crate::cache::{EntityRecord, StateCache, TargetState};
use crate::path::Path;
use crate::{Notification, TelemorphError, TypedValue, Update};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

// =============================================================================
// FEATURE CONTRACT
// =============================================================================

/// One fact to store, produced by classifying an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactWrite<F> {
    pub entity: String,
    /// `None` for an entity-level fact.
    pub sub_key: Option<String>,
    pub fact: F,
    pub value: TypedValue,
}

/// What a recognized delete removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteScope<F> {
    /// Every entity of the target.
    Target,
    /// One whole entity.
    Entity(String),
    /// One sub-key of an entity.
    SubKey { entity: String, sub_key: String },
    /// Every sub-key of an entity (a container-level delete).
    SubKeys(String),
    /// One entity-level fact.
    Fact { entity: String, fact: F },
    /// One fact of one sub-key.
    SubKeyFact {
        entity: String,
        sub_key: String,
        fact: F,
    },
}

/// A stateful translation feature.
pub trait StatefulFeature: Send + Sync {
    /// Fact identifiers stored in the cache.
    type Fact: Ord + Copy + fmt::Debug + Send;

    /// Origin of the produced notification.
    fn output_origin(&self) -> &str;

    /// Classify one update given its full (prefix-joined) path.
    ///
    /// `Ok(None)` means "not interesting". Errors abort the notification.
    fn classify_update(
        &self,
        path: &Path,
        value: &TypedValue,
    ) -> Result<Option<FactWrite<Self::Fact>>, TelemorphError>;

    /// Classify one delete given its full path.
    ///
    /// `Ok(None)` means "not recognized". Errors are logged and the delete is
    /// skipped.
    fn classify_delete(&self, path: &Path)
    -> Result<Option<DeleteScope<Self::Fact>>, TelemorphError>;

    /// Derive output updates for one entity, or `None` if nothing is complete.
    ///
    /// Update paths are relative to the output prefix.
    fn derive(&self, entity: &str, record: &EntityRecord<Self::Fact>) -> Option<Vec<Update>>;

    /// Paths removing every output of `entity`, one per derived output kind.
    fn deletion_paths(&self, entity: &str) -> Vec<Path>;
}

// =============================================================================
// RECONCILIATION
// =============================================================================

/// Entities touched by one notification, by what must happen to their output.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntityPlan {
    updated: BTreeSet<String>,
    refreshed: BTreeSet<String>,
    removed: BTreeSet<String>,
}

/// Output actions for one entity after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputAction {
    /// Remove every output of the entity.
    Delete,
    /// Re-derive; defer silently if incomplete.
    Update,
    /// Re-derive after a partial delete; remove outputs if nothing is complete.
    Refresh,
}

impl EntityPlan {
    /// Create an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An update touched `entity`.
    pub fn mark_updated(&mut self, entity: &str) {
        self.updated.insert(entity.to_string());
    }

    /// A partial delete touched `entity`.
    pub fn mark_refreshed(&mut self, entity: &str) {
        self.refreshed.insert(entity.to_string());
    }

    /// `entity`'s output must be deleted.
    pub fn mark_removed(&mut self, entity: &str) {
        self.removed.insert(entity.to_string());
    }

    /// True if nothing was touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.refreshed.is_empty() && self.removed.is_empty()
    }

    /// Resolve every touched entity to a single action, in lexicographic
    /// entity order. Deletion wins over refresh, refresh over update.
    #[must_use]
    pub fn reconcile(&self) -> Vec<(String, OutputAction)> {
        let all: BTreeSet<&String> = self
            .updated
            .iter()
            .chain(&self.refreshed)
            .chain(&self.removed)
            .collect();
        all.into_iter()
            .map(|entity| {
                let action = if self.removed.contains(entity) {
                    OutputAction::Delete
                } else if self.refreshed.contains(entity) {
                    OutputAction::Refresh
                } else {
                    OutputAction::Update
                };
                (entity.clone(), action)
            })
            .collect()
    }
}

// =============================================================================
// ASSEMBLY
// =============================================================================

/// Accumulates the outgoing notification.
#[derive(Debug)]
pub struct OutputBuilder {
    notification: Notification,
}

impl OutputBuilder {
    /// Start an output under `origin`/`target` with the input's timestamp.
    #[must_use]
    pub fn new(timestamp: i64, origin: &str, target: &str) -> Self {
        let prefix = Path::default().with_origin(origin).with_target(target);
        Self {
            notification: Notification::new(timestamp, prefix),
        }
    }

    /// Add deletion paths.
    pub fn delete(&mut self, paths: impl IntoIterator<Item = Path>) {
        self.notification.deletes.extend(paths);
    }

    /// Add updates.
    pub fn update(&mut self, updates: impl IntoIterator<Item = Update>) {
        self.notification.updates.extend(updates);
    }

    /// Finish, returning `None` when there is nothing to send.
    #[must_use]
    pub fn finish(self) -> Option<Notification> {
        if self.notification.is_empty() {
            None
        } else {
            Some(self.notification)
        }
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Drives a [`StatefulFeature`] over notifications against a shared cache.
#[derive(Debug)]
pub struct Engine<S: StatefulFeature> {
    feature: S,
    cache: Arc<StateCache<S::Fact>>,
}

impl<S: StatefulFeature> Engine<S> {
    /// Create an engine for `feature` using `cache`.
    pub fn new(feature: S, cache: Arc<StateCache<S::Fact>>) -> Self {
        Self { feature, cache }
    }

    /// The feature being driven.
    pub fn feature(&self) -> &S {
        &self.feature
    }

    /// The shared cache.
    pub fn cache(&self) -> &Arc<StateCache<S::Fact>> {
        &self.cache
    }

    /// Translate one notification.
    ///
    /// Returns `Ok(None)` when nothing needs to be sent.
    pub fn process(&self, input: &Notification) -> Result<Option<Notification>, TelemorphError> {
        // Step 1: classify everything before touching the cache.
        let mut writes = Vec::new();
        for update in &input.updates {
            let full = input.prefix.join(&update.path);
            match self.feature.classify_update(&full, &update.value)? {
                Some(write) => {
                    trace!(path = %full, entity = %write.entity, fact = ?write.fact, "update matched");
                    writes.push(write);
                }
                None => trace!(path = %full, "update ignored"),
            }
        }

        let mut scopes = Vec::new();
        for delete in &input.deletes {
            let full = input.prefix.join(delete);
            match self.feature.classify_delete(&full) {
                Ok(Some(scope)) => scopes.push(scope),
                Ok(None) => debug!(path = %full, "unrecognized delete skipped"),
                Err(e) => warn!(path = %full, error = %e, "malformed delete skipped"),
            }
        }

        if writes.is_empty() && scopes.is_empty() {
            return Ok(None);
        }

        let target = input.target();
        let output = self.cache.with_target(target, |state| {
            let mut plan = EntityPlan::new();

            // Step 2: apply facts, then deletes.
            for write in writes {
                match &write.sub_key {
                    Some(sub_key) => {
                        state.set_sub_key_fact(&write.entity, sub_key, write.fact, write.value);
                    }
                    None => state.set_fact(&write.entity, write.fact, write.value),
                }
                plan.mark_updated(&write.entity);
            }
            for scope in scopes {
                apply_delete(state, scope, &mut plan);
            }

            // Steps 3-5.
            let mut out = OutputBuilder::new(input.timestamp, self.feature.output_origin(), target);
            for (entity, action) in plan.reconcile() {
                let derived = match action {
                    OutputAction::Delete => None,
                    OutputAction::Update | OutputAction::Refresh => state
                        .entity(&entity)
                        .and_then(|record| self.feature.derive(&entity, record)),
                };
                match (action, derived) {
                    (_, Some(updates)) => out.update(updates),
                    (OutputAction::Update, None) => {
                        trace!(entity = %entity, "incomplete, output deferred");
                    }
                    (OutputAction::Delete | OutputAction::Refresh, None) => {
                        out.delete(self.feature.deletion_paths(&entity));
                    }
                }
            }
            out.finish()
        });

        Ok(output)
    }
}

/// Apply one delete to the partition and record the output consequence.
fn apply_delete<F: Ord + Copy + fmt::Debug>(
    state: &mut TargetState<F>,
    scope: DeleteScope<F>,
    plan: &mut EntityPlan,
) {
    match scope {
        DeleteScope::Target => {
            for entity in state.clear() {
                plan.mark_removed(&entity);
            }
        }
        DeleteScope::Entity(entity) => {
            state.clear_entity(&entity);
            plan.mark_removed(&entity);
        }
        DeleteScope::SubKey { entity, sub_key } => {
            if !state.remove_sub_key(&entity, &sub_key) {
                debug!(entity = %entity, sub_key = %sub_key, "delete of unknown sub-key");
            }
            let emptied = state.entity(&entity).is_none_or(|r| !r.has_sub_keys());
            if emptied {
                plan.mark_removed(&entity);
            } else {
                plan.mark_refreshed(&entity);
            }
            state.prune(&entity);
        }
        DeleteScope::SubKeys(entity) => {
            if let Some(record) = state.entity_mut(&entity) {
                record.clear_sub_keys();
            }
            state.prune(&entity);
            plan.mark_removed(&entity);
        }
        DeleteScope::Fact { entity, fact } => {
            if let Some(record) = state.entity_mut(&entity) {
                record.clear_fact(fact);
            }
            state.prune(&entity);
            plan.mark_removed(&entity);
        }
        DeleteScope::SubKeyFact {
            entity,
            sub_key,
            fact,
        } => {
            if let Some(record) = state.entity_mut(&entity) {
                record.clear_sub_key_fact(&sub_key, fact);
            }
            let emptied = state.entity(&entity).is_none_or(|r| !r.has_sub_keys());
            if emptied {
                plan.mark_removed(&entity);
            } else {
                plan.mark_refreshed(&entity);
            }
            state.prune(&entity);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
