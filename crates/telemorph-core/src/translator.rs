//! # Translator Contract
//!
//! A translator maps vendor notifications to normalized notifications.
//! Each one exposes:
//! - an identifier
//! - an output map (output path → input paths it needs), used to plan
//!   subscriptions rather than at translation time
//! - a pure-looking `translate` function (stateful translators keep their
//!   state in an injected cache)
//! - a [`DeviceFilter`] deciding which devices it applies to
//!
//! The [`Registry`] holds translators and runs the applicable ones.

use crate::path::Path;
use crate::{DeviceInfo, Notification, TelemorphError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Output path (canonical string) → input paths needed to produce it.
pub type OutputMap = BTreeMap<String, Vec<Path>>;

/// The translator contract.
pub trait Translator: Send + Sync {
    /// Unique identifier.
    fn id(&self) -> &str;

    /// Output paths and the inputs each one depends on.
    fn output_map(&self) -> &OutputMap;

    /// Which devices this translator applies to.
    fn filter(&self) -> &DeviceFilter;

    /// Translate one notification. `Ok(None)` means nothing to emit.
    fn translate(&self, input: &Notification) -> Result<Option<Notification>, TelemorphError>;

    /// True if this translator should run for `device`.
    fn applies_to(&self, device: &DeviceInfo) -> bool {
        self.filter().accepts(device)
    }
}

// =============================================================================
// DEVICE FILTER
// =============================================================================

/// Applicability predicate over device metadata.
///
/// Empty fields are wildcards. Vendor and model compare case-insensitively.
/// The version must satisfy `min_version <= version < max_version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFilter {
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub min_version: String,
    #[serde(default)]
    pub max_version: String,
}

impl DeviceFilter {
    /// A filter that accepts every device.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict to a vendor.
    #[must_use]
    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    /// Restrict to a hardware model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Restrict to `[min, max)`. Either bound may be empty.
    #[must_use]
    pub fn versions(mut self, min: impl Into<String>, max: impl Into<String>) -> Self {
        self.min_version = min.into();
        self.max_version = max.into();
        self
    }

    /// Evaluate the predicate.
    #[must_use]
    pub fn accepts(&self, device: &DeviceInfo) -> bool {
        if !self.vendor.is_empty() && !self.vendor.eq_ignore_ascii_case(&device.vendor) {
            return false;
        }
        if !self.model.is_empty() && !self.model.eq_ignore_ascii_case(&device.model) {
            return false;
        }
        if !self.min_version.is_empty()
            && compare_versions(&device.version, &self.min_version) == Ordering::Less
        {
            return false;
        }
        if !self.max_version.is_empty()
            && compare_versions(&device.version, &self.max_version) != Ordering::Less
        {
            return false;
        }
        true
    }
}

/// Compare dotted versions such as `4.28.1F`.
///
/// Segments are compared by their leading number, then by the remaining
/// suffix text (case-insensitive). Missing segments count as `0`.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.trim().split('.');
    let mut right = b.trim().split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (l, r) => {
                let ord = compare_segment(l.unwrap_or("0"), r.unwrap_or("0"));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    let (an, asuf) = split_numeric(a);
    let (bn, bsuf) = split_numeric(b);
    an.cmp(&bn)
        .then_with(|| asuf.to_ascii_lowercase().cmp(&bsuf.to_ascii_lowercase()))
}

fn split_numeric(segment: &str) -> (u64, &str) {
    let digits = segment
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(segment.len());
    let number = segment[..digits].parse().unwrap_or(0);
    (number, &segment[digits..])
}

// =============================================================================
// REGISTRY
// =============================================================================

/// One non-empty translation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated {
    pub translator: String,
    pub notification: Notification,
}

/// Everything produced by running the registry over one notification.
#[derive(Debug, Default)]
pub struct TranslationReport {
    pub outputs: Vec<Translated>,
    pub failures: Vec<(String, TelemorphError)>,
}

/// Ordered collection of translators.
#[derive(Default, Clone)]
pub struct Registry {
    translators: Vec<Arc<dyn Translator>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.translators.iter().map(|t| t.id()))
            .finish()
    }
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a translator. Later registrations with the same id replace
    /// earlier ones.
    pub fn register(&mut self, translator: Arc<dyn Translator>) {
        self.translators.retain(|t| t.id() != translator.id());
        self.translators.push(translator);
    }

    /// Ids in registration order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.translators.iter().map(|t| t.id()).collect()
    }

    /// Every translator, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Translator>> {
        self.translators.iter()
    }

    /// Translators applicable to `device`, in registration order.
    pub fn select<'a>(
        &'a self,
        device: &'a DeviceInfo,
    ) -> impl Iterator<Item = &'a Arc<dyn Translator>> + 'a {
        self.translators.iter().filter(move |t| t.applies_to(device))
    }

    /// Union of the output maps of translators applicable to `device`.
    #[must_use]
    pub fn output_paths(&self, device: &DeviceInfo) -> OutputMap {
        let mut all = OutputMap::new();
        for t in self.select(device) {
            for (out, inputs) in t.output_map() {
                let entry = all.entry(out.clone()).or_default();
                for input in inputs {
                    if !entry.contains(input) {
                        entry.push(input.clone());
                    }
                }
            }
        }
        all
    }

    /// Run every applicable translator over `input`.
    ///
    /// A failing translator does not stop the others.
    pub fn translate_all(&self, device: &DeviceInfo, input: &Notification) -> TranslationReport {
        let mut report = TranslationReport::default();
        for t in self.select(device) {
            match t.translate(input) {
                Ok(Some(notification)) => report.outputs.push(Translated {
                    translator: t.id().to_string(),
                    notification,
                }),
                Ok(None) => {}
                Err(e) => {
                    warn!(translator = t.id(), error = %e, "translation failed");
                    report.failures.push((t.id().to_string(), e));
                }
            }
        }
        report
    }
}

// =============================================================================
// TESTS
// =============================================================================
