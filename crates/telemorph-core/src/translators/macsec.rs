//! # MACsec Status Translator
//!
//! Derives per-interface MACsec session status from three flags that the
//! device streams independently:
//!
//! - `port-enabled` on the interface
//! - `success` and `principal` on each MKA session, keyed by CKN
//!
//! Output is two parallel leaf-lists per interface, ordered by CKN:
//!
//! ```text
//! openconfig:/interfaces/interface[name=Et1]/macsec/state/status = [Secured, Pending]
//! openconfig:/interfaces/interface[name=Et1]/macsec/state/ckn    = [ckn1,    ckn2   ]
//! ```
//!
//! A session only appears once all three flags are known.

use crate::cache::{EntityRecord, Requirement, StateCache};
use crate::engine::{DeleteScope, Engine, FactWrite, StatefulFeature};
use crate::matcher::PatternSet;
use crate::path::{Path, PathElem};
use crate::primitives::{NATIVE_ORIGIN, OPENCONFIG_ORIGIN, WILDCARD};
use crate::translator::{DeviceFilter, OutputMap, Translator};
use crate::{Notification, TelemorphError, TypedValue, Update};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Translator identifier.
pub const MACSEC_STATUS_ID: &str = "macsec-status";

/// First EOS release streaming the MKA session flags.
const MIN_VERSION: &str = "4.20.0";

// =============================================================================
// FACTS & LEAVES
// =============================================================================

/// Facts cached per interface (`PortEnabled`) and per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MacsecFact {
    PortEnabled,
    Success,
    Principal,
}

const REQUIRED: Requirement<'static, MacsecFact> = Requirement {
    entity: &[MacsecFact::PortEnabled],
    sub_key: &[MacsecFact::Success, MacsecFact::Principal],
};

/// Leaf names seen under the MACsec status tree, decoded once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MacsecLeaf {
    PortEnabled,
    Success,
    Principal,
    Unrecognized,
}

impl MacsecLeaf {
    fn from_name(name: &str) -> Self {
        match name {
            "port-enabled" => Self::PortEnabled,
            "success" => Self::Success,
            "principal" => Self::Principal,
            _ => Self::Unrecognized,
        }
    }
}

/// Containers whose direct leaves carry facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Interface,
    Session,
}

/// Shapes of recognized deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeleteShape {
    Target,
    Interface,
    Sessions,
    PortEnabled,
    Session,
    SessionLeaf(MacsecFact),
}

// =============================================================================
// STATUS DERIVATION
// =============================================================================

/// Derived session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacsecStatus {
    Secured,
    Standby,
    Pending,
    Disabled,
    Unknown,
}

impl MacsecStatus {
    /// Label emitted on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Secured => "Secured",
            Self::Standby => "Standby",
            Self::Pending => "Pending",
            Self::Disabled => "Disabled",
            Self::Unknown => "Unknown",
        }
    }

    /// Truth table over (port enabled, session success, principal).
    ///
    /// Combinations not listed, including a disabled port that still reports
    /// a successful principal session, map to `Unknown`.
    #[must_use]
    pub fn derive(enabled: bool, success: bool, principal: bool) -> Self {
        match (enabled, success, principal) {
            (true, true, true) => Self::Secured,
            (true, true, false) => Self::Standby,
            (true, false, false) => Self::Pending,
            (false, false, false) => Self::Disabled,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for MacsecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PATHS
// =============================================================================

fn intf_elem(name: &str) -> PathElem {
    PathElem::new("intf").with_key("name", name)
}

fn session_elem(ckn: &str) -> PathElem {
    PathElem::new("session").with_key("ckn", ckn)
}

fn status_root() -> Path {
    Path::new(vec![PathElem::new("macsec"), PathElem::new("status")])
}

fn intf_pattern() -> Path {
    status_root().child(intf_elem(WILDCARD))
}

fn session_pattern() -> Path {
    intf_pattern()
        .child(PathElem::new("mka"))
        .child(session_elem(WILDCARD))
}

fn output_intf(entity: &str) -> Path {
    Path::new(vec![
        PathElem::new("interfaces"),
        PathElem::new("interface").with_key("name", entity),
        PathElem::new("macsec"),
        PathElem::new("state"),
    ])
}

fn native_leaves(container: &Path, names: &[&str]) -> Vec<Path> {
    names
        .iter()
        .map(|n| {
            container
                .clone()
                .child(PathElem::new(*n))
                .with_origin(NATIVE_ORIGIN)
        })
        .collect()
}

/// Output path of the status leaf-list for `entity`.
#[must_use]
pub fn status_path(entity: &str) -> Path {
    output_intf(entity).child(PathElem::new("status"))
}

/// Output path of the CKN leaf-list for `entity`.
#[must_use]
pub fn ckn_path(entity: &str) -> Path {
    output_intf(entity).child(PathElem::new("ckn"))
}

// =============================================================================
// FEATURE
// =============================================================================

/// Classification and derivation rules for MACsec status.
#[derive(Debug, Clone)]
pub struct MacsecFeature {
    containers: PatternSet<Container>,
    deletes: PatternSet<DeleteShape>,
}

impl Default for MacsecFeature {
    fn default() -> Self {
        let containers = PatternSet::new()
            .with(intf_pattern(), Container::Interface)
            .with(session_pattern(), Container::Session);

        let deletes = PatternSet::new()
            .with(Path::new(vec![PathElem::new("macsec")]), DeleteShape::Target)
            .with(status_root(), DeleteShape::Target)
            .with(intf_pattern(), DeleteShape::Interface)
            .with(intf_pattern().child(PathElem::new("mka")), DeleteShape::Sessions)
            .with(
                intf_pattern().child(PathElem::new("port-enabled")),
                DeleteShape::PortEnabled,
            )
            .with(session_pattern(), DeleteShape::Session)
            .with(
                session_pattern().child(PathElem::new("success")),
                DeleteShape::SessionLeaf(MacsecFact::Success),
            )
            .with(
                session_pattern().child(PathElem::new("principal")),
                DeleteShape::SessionLeaf(MacsecFact::Principal),
            );

        Self {
            containers,
            deletes,
        }
    }
}

impl MacsecFeature {
    fn bool_value(path: &Path, value: &TypedValue) -> Result<TypedValue, TelemorphError> {
        let resolved = value.resolve(path)?;
        resolved
            .as_bool()
            .map(TypedValue::Bool)
            .ok_or_else(|| TelemorphError::InvalidValue {
                path: path.to_string(),
                reason: format!("expected a boolean, got {:?}", resolved),
            })
    }

    fn flag(value: Option<&TypedValue>) -> bool {
        value.and_then(TypedValue::as_bool).unwrap_or(false)
    }
}

impl StatefulFeature for MacsecFeature {
    type Fact = MacsecFact;

    fn output_origin(&self) -> &str {
        OPENCONFIG_ORIGIN
    }

    fn classify_update(
        &self,
        path: &Path,
        value: &TypedValue,
    ) -> Result<Option<FactWrite<MacsecFact>>, TelemorphError> {
        let Some((leaf_elem, parent_elems)) = path.elems.split_last() else {
            return Ok(None);
        };
        let parent = Path {
            origin: path.origin.clone(),
            target: String::new(),
            elems: parent_elems.to_vec(),
        };
        let Some(container) = self.containers.classify(&parent) else {
            return Ok(None);
        };

        let leaf = MacsecLeaf::from_name(&leaf_elem.name);
        let (entity, sub_key, fact) = match (container, leaf) {
            (Container::Interface, MacsecLeaf::PortEnabled) => {
                (path.key_from_end(2, "name")?, None, MacsecFact::PortEnabled)
            }
            (Container::Session, MacsecLeaf::Success | MacsecLeaf::Principal) => {
                let fact = if leaf == MacsecLeaf::Success {
                    MacsecFact::Success
                } else {
                    MacsecFact::Principal
                };
                let ckn = path.key_from_end(2, "ckn")?;
                (path.key_from_end(4, "name")?, Some(ckn.to_string()), fact)
            }
            (container, leaf) => {
                debug!(path = %path, ?container, ?leaf, "leaf not used for status");
                return Ok(None);
            }
        };

        Ok(Some(FactWrite {
            entity: entity.to_string(),
            sub_key,
            fact,
            value: Self::bool_value(path, value)?,
        }))
    }

    fn classify_delete(
        &self,
        path: &Path,
    ) -> Result<Option<DeleteScope<MacsecFact>>, TelemorphError> {
        let Some(shape) = self.deletes.classify(path) else {
            return Ok(None);
        };
        let scope = match *shape {
            DeleteShape::Target => DeleteScope::Target,
            DeleteShape::Interface => DeleteScope::Entity(path.key_from_end(1, "name")?.to_string()),
            DeleteShape::Sessions => DeleteScope::SubKeys(path.key_from_end(2, "name")?.to_string()),
            DeleteShape::PortEnabled => DeleteScope::Fact {
                entity: path.key_from_end(2, "name")?.to_string(),
                fact: MacsecFact::PortEnabled,
            },
            DeleteShape::Session => DeleteScope::SubKey {
                entity: path.key_from_end(3, "name")?.to_string(),
                sub_key: path.key_from_end(1, "ckn")?.to_string(),
            },
            DeleteShape::SessionLeaf(fact) => DeleteScope::SubKeyFact {
                entity: path.key_from_end(4, "name")?.to_string(),
                sub_key: path.key_from_end(2, "ckn")?.to_string(),
                fact,
            },
        };
        Ok(Some(scope))
    }

    fn derive(&self, entity: &str, record: &EntityRecord<MacsecFact>) -> Option<Vec<Update>> {
        let enabled = Self::flag(record.fact(MacsecFact::PortEnabled));
        let mut labels = Vec::new();
        let mut ckns = Vec::new();
        for ckn in record.sub_keys() {
            if !record.is_complete(ckn, REQUIRED) {
                continue;
            }
            let status = MacsecStatus::derive(
                enabled,
                Self::flag(record.sub_key_fact(ckn, MacsecFact::Success)),
                Self::flag(record.sub_key_fact(ckn, MacsecFact::Principal)),
            );
            labels.push(status.as_str());
            ckns.push(ckn.to_string());
        }
        if labels.is_empty() {
            return None;
        }
        Some(vec![
            Update::new(status_path(entity), TypedValue::string_list(labels)),
            Update::new(ckn_path(entity), TypedValue::string_list(ckns)),
        ])
    }

    fn deletion_paths(&self, entity: &str) -> Vec<Path> {
        vec![status_path(entity), ckn_path(entity)]
    }
}

// =============================================================================
// TRANSLATOR
// =============================================================================

/// Stateful translator producing OpenConfig MACsec status leaf-lists.
#[derive(Debug)]
pub struct MacsecStatusTranslator {
    engine: Engine<MacsecFeature>,
    outputs: OutputMap,
    filter: DeviceFilter,
}

impl MacsecStatusTranslator {
    /// Create the translator over a shared cache.
    pub fn new(cache: Arc<StateCache<MacsecFact>>) -> Self {
        let mut inputs = native_leaves(&intf_pattern(), &["port-enabled"]);
        inputs.extend(native_leaves(&session_pattern(), &["success", "principal"]));

        let mut outputs = OutputMap::new();
        for out in [status_path(WILDCARD), ckn_path(WILDCARD)] {
            outputs.insert(
                out.with_origin(OPENCONFIG_ORIGIN).canonical(),
                inputs.clone(),
            );
        }

        Self {
            engine: Engine::new(MacsecFeature::default(), cache),
            outputs,
            filter: DeviceFilter::any().vendor("Arista").versions(MIN_VERSION, ""),
        }
    }

    /// Replace the applicability filter.
    #[must_use]
    pub fn with_filter(mut self, filter: DeviceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The shared cache this translator writes to.
    pub fn cache(&self) -> &Arc<StateCache<MacsecFact>> {
        self.engine.cache()
    }
}

impl Translator for MacsecStatusTranslator {
    fn id(&self) -> &str {
        MACSEC_STATUS_ID
    }

    fn output_map(&self) -> &OutputMap {
        &self.outputs
    }

    fn filter(&self) -> &DeviceFilter {
        &self.filter
    }

    fn translate(&self, input: &Notification) -> Result<Option<Notification>, TelemorphError> {
        self.engine.process(input)
    }
}

// =============================================================================
// TESTS
// =============================================================================
