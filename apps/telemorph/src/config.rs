//! # Configuration
//!
//! TOML configuration for the Telemorph binary.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [log]
//! format = "json"
//!
//! [device]
//! vendor = "Arista"
//! model = "DCS-7280SR"
//! version = "4.28.1F"
//!
//! [[rename]]
//! id = "interface-counters"
//! input = "eos_native:/Sysdb/interface/counter[intf=<intf>]/in-octets"
//! output = "/interfaces/interface[name=<intf>]/state/counters/in-octets"
//! ```
//!
//! A missing file yields the defaults. A file that exists but does not parse
//! is an error.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use telemorph_core::{
    DeviceInfo, MacsecFact, MacsecStatusTranslator, Registry, RenameSpec, RenameTranslator,
    StateCache, TelemorphError,
};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "telemorph.toml";

// =============================================================================
// CONFIG STRUCTURE
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemorphConfig {
    pub server: ServerConfig,
    pub log: LogConfig,
    /// Metadata of the device whose telemetry is being translated.
    pub device: DeviceInfo,
    pub rename: Vec<RenameEntry>,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Resolve the effective format: `TELEMORPH_LOG_FORMAT` wins over the file.
    #[must_use]
    pub fn with_env_override(self) -> Self {
        match std::env::var("TELEMORPH_LOG_FORMAT").ok().as_deref() {
            Some("json") => Self::Json,
            Some("text") => Self::Text,
            _ => self,
        }
    }
}

/// One `[[rename]]` rule. Entries sharing an `id` form one translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameEntry {
    pub id: String,
    pub input: String,
    pub output: String,
}

// =============================================================================
// LOADING
// =============================================================================

impl TelemorphConfig {
    /// Load configuration from `path`. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, TelemorphError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(TelemorphError::Io(format!(
                "Cannot read config '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    /// Parse configuration from TOML text.
    pub fn parse(text: &str) -> Result<Self, TelemorphError> {
        let config: Self =
            toml::from_str(text).map_err(|e| TelemorphError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would fail later at startup.
    fn validate(&self) -> Result<(), TelemorphError> {
        if self.server.host.trim().is_empty() {
            return Err(TelemorphError::Config("server.host is empty".to_string()));
        }
        for entry in &self.rename {
            if entry.id.trim().is_empty() {
                return Err(TelemorphError::Config(format!(
                    "rename rule '{}' has an empty id",
                    entry.input
                )));
            }
        }
        // Parsing the templates surfaces binding errors now rather than at first use.
        self.rename_translators().map(|_| ())
    }

    /// Group `[[rename]]` entries into translators, in order of first appearance.
    pub fn rename_translators(&self) -> Result<Vec<RenameTranslator>, TelemorphError> {
        let mut groups: Vec<(String, Vec<RenameSpec>)> = Vec::new();
        for entry in &self.rename {
            let spec = RenameSpec {
                input: entry.input.clone(),
                output: entry.output.clone(),
            };
            match groups.iter_mut().find(|(id, _)| *id == entry.id) {
                Some((_, specs)) => specs.push(spec),
                None => groups.push((entry.id.clone(), vec![spec])),
            }
        }
        groups
            .into_iter()
            .map(|(id, specs)| {
                RenameTranslator::from_specs(id.as_str(), &specs).map_err(|e| {
                    TelemorphError::Config(format!("rename translator '{}': {}", id, e))
                })
            })
            .collect()
    }

    /// Build the translator registry: the MACsec status translator over
    /// `cache`, followed by the configured rename translators.
    pub fn build_registry(
        &self,
        cache: Arc<StateCache<MacsecFact>>,
    ) -> Result<Registry, TelemorphError> {
        let mut registry = Registry::new();
        registry.register(Arc::new(MacsecStatusTranslator::new(cache)));
        for translator in self.rename_translators()? {
            registry.register(Arc::new(translator));
        }
        Ok(registry)
    }
}

// =============================================================================
// TESTS
// =============================================================================
