//! # Rename Translator
//!
//! Stateless translator driven by binding templates: each rule says "the
//! value at input template A belongs at output template B". Variables bound
//! from A's keys are substituted into B.
//!
//! ```text
//! input:  /Sysdb/interface/counter[intf=<intf>]/in-octets
//! output: /interfaces/interface[name=<intf>]/state/counters/in-octets
//! ```

use crate::binder::{apply_bind, bind_keys, vars_to_wildcards};
use crate::engine::OutputBuilder;
use crate::matcher::path_matches;
use crate::path::Path;
use crate::primitives::OPENCONFIG_ORIGIN;
use crate::translator::{DeviceFilter, OutputMap, Translator};
use crate::{Notification, TelemorphError, Update};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// A rule as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameSpec {
    pub input: String,
    pub output: String,
}

/// A parsed rule with its recognition pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRule {
    input: Path,
    output: Path,
    pattern: Path,
}

impl RenameRule {
    /// Build a rule from two binding templates.
    ///
    /// Every variable of `output` must appear in `input`.
    pub fn new(input: Path, output: Path) -> Result<Self, TelemorphError> {
        // Binding the input template against itself yields var -> "<var>",
        // which is exactly what applying the output template needs.
        let self_bindings = bind_keys(&input, &input)?;
        apply_bind(&self_bindings, &output)?;
        let pattern = vars_to_wildcards(&input);
        Ok(Self {
            input,
            output,
            pattern,
        })
    }

    /// Parse a rule from its configuration form.
    pub fn from_spec(spec: &RenameSpec) -> Result<Self, TelemorphError> {
        Self::new(Path::parse(&spec.input)?, Path::parse(&spec.output)?)
    }

    /// Rewrite `path` if it matches this rule.
    pub fn rewrite(&self, path: &Path) -> Result<Option<Path>, TelemorphError> {
        if !path_matches(path, &self.pattern) {
            return Ok(None);
        }
        let bindings = bind_keys(&self.input, path)?;
        apply_bind(&bindings, &self.output).map(Some)
    }
}

/// Stateless translator applying an ordered list of rename rules.
#[derive(Debug, Clone)]
pub struct RenameTranslator {
    id: String,
    rules: Vec<RenameRule>,
    outputs: OutputMap,
    filter: DeviceFilter,
}

impl RenameTranslator {
    /// Create a translator from parsed rules. The first matching rule wins.
    #[must_use]
    pub fn new(id: impl Into<String>, rules: Vec<RenameRule>) -> Self {
        let mut outputs = OutputMap::new();
        for rule in &rules {
            let out = vars_to_wildcards(&rule.output).with_origin(OPENCONFIG_ORIGIN);
            outputs
                .entry(out.canonical())
                .or_default()
                .push(rule.pattern.clone());
        }
        Self {
            id: id.into(),
            rules,
            outputs,
            filter: DeviceFilter::any(),
        }
    }

    /// Create a translator from configuration specs.
    pub fn from_specs(id: impl Into<String>, specs: &[RenameSpec]) -> Result<Self, TelemorphError> {
        let rules = specs
            .iter()
            .map(RenameRule::from_spec)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(id, rules))
    }

    /// Replace the applicability filter.
    #[must_use]
    pub fn with_filter(mut self, filter: DeviceFilter) -> Self {
        self.filter = filter;
        self
    }

    fn rewrite(&self, path: &Path) -> Result<Option<Path>, TelemorphError> {
        for rule in &self.rules {
            if let Some(mut out) = rule.rewrite(path)? {
                out.origin.clear();
                return Ok(Some(out));
            }
        }
        Ok(None)
    }
}

impl Translator for RenameTranslator {
    fn id(&self) -> &str {
        &self.id
    }

    fn output_map(&self) -> &OutputMap {
        &self.outputs
    }

    fn filter(&self) -> &DeviceFilter {
        &self.filter
    }

    fn translate(&self, input: &Notification) -> Result<Option<Notification>, TelemorphError> {
        let mut out = OutputBuilder::new(input.timestamp, OPENCONFIG_ORIGIN, input.target());

        let mut updates = Vec::new();
        for update in &input.updates {
            let full = input.prefix.join(&update.path);
            if let Some(path) = self.rewrite(&full)? {
                trace!(from = %full, to = %path, "renamed update");
                updates.push(Update::new(path, update.value.resolve(&full)?));
            }
        }

        let mut deletes = Vec::new();
        for delete in &input.deletes {
            let full = input.prefix.join(delete);
            match self.rewrite(&full) {
                Ok(Some(path)) => deletes.push(path),
                Ok(None) => {}
                Err(e) => warn!(path = %full, error = %e, "malformed delete skipped"),
            }
        }

        out.delete(deletes);
        out.update(updates);
        Ok(out.finish())
    }
}

// =============================================================================
// TESTS
// =============================================================================
