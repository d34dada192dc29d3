//! # telemorph-core
//!
//! The deterministic translation engine for Telemorph.
//!
//! This crate turns vendor-native streaming telemetry into normalized,
//! vendor-neutral telemetry. It holds everything that does not need a
//! runtime:
//! - paths, typed values and notifications (`path`, `types`)
//! - template matching and variable binding (`matcher`, `binder`)
//! - the per-target state cache (`cache`)
//! - the aggregation and derivation engine (`engine`)
//! - the translator contract and registry (`translator`)
//! - concrete translators (`translators`)
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network dependencies
//! - Ordered collections only (`BTreeMap`/`BTreeSet`), so output ordering
//!   is reproducible
//! - Shared state lives in an injected [`StateCache`], never in globals

// =============================================================================
// MODULES
// =============================================================================

pub mod binder;
pub mod cache;
pub mod engine;
pub mod matcher;
pub mod path;
pub mod primitives;
pub mod translator;
pub mod translators;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use path::{Path, PathElem};
pub use types::{
    DeviceInfo, Notification, TelemorphError, TypedValue, Update, blob_preview, json_blob,
};

// =============================================================================
// RE-EXPORTS: Matching & Binding
// =============================================================================

pub use binder::{Bindings, apply_bind, bind_keys, vars_to_wildcards};
pub use matcher::{PatternSet, path_matches};

// =============================================================================
// RE-EXPORTS: State & Engine
// =============================================================================

pub use cache::{EntityRecord, Requirement, StateCache, TargetState};
pub use engine::{DeleteScope, Engine, FactWrite, OutputAction, OutputBuilder, StatefulFeature};

// =============================================================================
// RE-EXPORTS: Translators
// =============================================================================

pub use translator::{
    DeviceFilter, OutputMap, Registry, Translated, TranslationReport, Translator,
    compare_versions,
};
pub use translators::macsec::{MACSEC_STATUS_ID, MacsecFact, MacsecStatus, MacsecStatusTranslator};
pub use translators::rename::{RenameRule, RenameSpec, RenameTranslator};
