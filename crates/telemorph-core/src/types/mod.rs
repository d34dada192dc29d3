//! # Core Type Definitions
//!
//! This module contains the wire-level types for the Telemorph engine:
//! - Typed telemetry values (`TypedValue`)
//! - Updates and notifications (`Update`, `Notification`)
//! - Device metadata used for translator selection (`DeviceInfo`)
//! - Error types (`TelemorphError`)
//!
//! ## Determinism Guarantees
//!
//! All collections are ordered (`Vec` or `BTreeMap`). Nothing in this module
//! depends on hashing order or wall-clock time.

use crate::path::Path;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// =============================================================================
// TYPED VALUE
// =============================================================================

/// A telemetry value as carried on the wire.
///
/// `Json` is an opaque pre-encoded blob; it must be unwrapped with
/// [`TypedValue::resolve`] before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypedValue {
    String(String),
    Bool(bool),
    Uint(u64),
    LeafList(Vec<TypedValue>),
    Json(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl TypedValue {
    /// Shorthand for a string value.
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Build a leaf-list of strings, preserving order.
    #[must_use]
    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::LeafList(items.into_iter().map(|s| Self::String(s.into())).collect())
    }

    /// Unwrap an opaque blob into a scalar. Non-opaque values are returned as-is.
    ///
    /// Fails with `InvalidValue` when the blob is not JSON or decodes to
    /// something other than a string, boolean or non-negative integer.
    pub fn resolve(&self, path: &Path) -> Result<TypedValue, TelemorphError> {
        let Self::Json(bytes) = self else {
            return Ok(self.clone());
        };
        let invalid = |reason: String| TelemorphError::InvalidValue {
            path: path.to_string(),
            reason,
        };
        let decoded: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| {
            invalid(format!("undecodable blob {}: {e}", blob_preview(bytes)))
        })?;
        match decoded {
            serde_json::Value::String(s) => Ok(Self::String(s)),
            serde_json::Value::Bool(b) => Ok(Self::Bool(b)),
            serde_json::Value::Number(n) => n
                .as_u64()
                .map(Self::Uint)
                .ok_or_else(|| invalid(format!("number {n} is not an unsigned integer"))),
            other => Err(invalid(format!("no scalar in blob: {other}"))),
        }
    }

    /// Interpret a resolved value as a boolean.
    ///
    /// Strings `"true"`/`"false"` are accepted since some devices stringify
    /// every leaf.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Self::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }
}

mod base64_bytes {
    use super::{BASE64, Deserialize, Deserializer, Serializer};
    use base64::Engine as _;

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        BASE64.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// Encode a JSON scalar as an opaque blob value.
#[must_use]
pub fn json_blob(value: &serde_json::Value) -> TypedValue {
    TypedValue::Json(value.to_string().into_bytes())
}

/// Render an opaque blob for logs and error messages.
#[must_use]
pub fn blob_preview(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

// =============================================================================
// UPDATE & NOTIFICATION
// =============================================================================

/// One value update: a suffix path relative to the notification prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub path: Path,
    #[serde(rename = "val")]
    pub value: TypedValue,
}

impl Update {
    /// Create a new update.
    #[must_use]
    pub fn new(path: Path, value: TypedValue) -> Self {
        Self { path, value }
    }
}

/// A batch of timestamped updates and deletions under a common prefix.
///
/// Notifications are never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Notification {
    /// Nanoseconds since the Unix epoch, as reported by the device.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub prefix: Path,
    #[serde(default, rename = "update")]
    pub updates: Vec<Update>,
    #[serde(default, rename = "delete")]
    pub deletes: Vec<Path>,
}

impl Notification {
    /// Create an empty notification under `prefix`.
    #[must_use]
    pub fn new(timestamp: i64, prefix: Path) -> Self {
        Self {
            timestamp,
            prefix,
            updates: Vec::new(),
            deletes: Vec::new(),
        }
    }

    /// Builder-style update.
    #[must_use]
    pub fn with_update(mut self, path: Path, value: TypedValue) -> Self {
        self.updates.push(Update::new(path, value));
        self
    }

    /// Builder-style delete.
    #[must_use]
    pub fn with_delete(mut self, path: Path) -> Self {
        self.deletes.push(path);
        self
    }

    /// True if there is nothing to update or delete.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Target of the notification (from its prefix).
    #[must_use]
    pub fn target(&self) -> &str {
        &self.prefix.target
    }
}

// =============================================================================
// DEVICE METADATA
// =============================================================================

/// Metadata describing the device a stream comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub version: String,
}

impl DeviceInfo {
    /// Create device metadata.
    #[must_use]
    pub fn new(
        vendor: impl Into<String>,
        model: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            vendor: vendor.into(),
            model: model.into(),
            version: version.into(),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while translating telemetry.
///
/// Lookup misses (unknown target, entity or sub-key) are NOT errors; they are
/// reported as `bool`/`Option` by the cache.
#[derive(Debug, Error)]
pub enum TelemorphError {
    /// A path is shorter than its expected shape.
    #[error("path {path} is too short: expected at least {min} elements")]
    PathTooShort { path: String, min: usize },

    /// A path could not be parsed or lacks a required key.
    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Template and concrete paths have different lengths.
    #[error("length mismatch: template {template} vs path {path}")]
    LengthMismatch { template: String, path: String },

    /// Element names differ at some position.
    #[error("element mismatch at position {index}: template {template} vs path {path}")]
    ElementMismatch {
        index: usize,
        template: String,
        path: String,
    },

    /// Key sets differ, or a literal key value does not match.
    #[error("key mismatch at position {index}: template {template} vs path {path}")]
    KeyMismatch {
        index: usize,
        template: String,
        path: String,
    },

    /// The same variable bound to two different values.
    #[error("ambiguous binding for <{var}>: '{first}' vs '{second}'")]
    AmbiguousBinding {
        var: String,
        first: String,
        second: String,
    },

    /// An output template references a variable with no binding.
    #[error("unbound variable <{var}> in template {template}")]
    UnboundVariable { var: String, template: String },

    /// A value is missing, undecodable or of the wrong type.
    #[error("invalid value at {path}: {reason}")]
    InvalidValue { path: String, reason: String },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// TESTS
// =============================================================================
