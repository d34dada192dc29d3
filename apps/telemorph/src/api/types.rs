//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use telemorph_core::{DeviceInfo, Notification, TranslationReport, Translator};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// TRANSLATORS RESPONSE
// =============================================================================

/// One registered translator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorJson {
    pub id: String,
    /// Whether it runs for the configured device.
    pub applicable: bool,
    /// Output path → input paths, rendered as strings.
    pub outputs: BTreeMap<String, Vec<String>>,
}

impl TranslatorJson {
    /// Describe `translator` relative to `device`.
    #[must_use]
    pub fn describe(translator: &dyn Translator, device: &DeviceInfo) -> Self {
        let outputs = translator
            .output_map()
            .iter()
            .map(|(out, inputs)| (out.clone(), inputs.iter().map(ToString::to_string).collect()))
            .collect();
        Self {
            id: translator.id().to_string(),
            applicable: translator.applies_to(device),
            outputs,
        }
    }
}

/// Registered translators response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorsResponse {
    pub device: DeviceInfo,
    pub translators: Vec<TranslatorJson>,
}

// =============================================================================
// TRANSLATE REQUEST/RESPONSE
// =============================================================================

/// Translate request.
///
/// `device` overrides the configured device metadata for this request only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub device: Option<DeviceInfo>,
    pub notification: Notification,
}

/// One non-empty translator output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatedJson {
    pub translator: String,
    pub notification: Notification,
}

/// One translator failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationErrorJson {
    pub translator: String,
    pub error: String,
}

/// Translate response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateResponse {
    /// `true` when no translator failed.
    pub success: bool,
    pub outputs: Vec<TranslatedJson>,
    pub errors: Vec<TranslationErrorJson>,
}

impl From<TranslationReport> for TranslateResponse {
    fn from(report: TranslationReport) -> Self {
        let outputs = report
            .outputs
            .into_iter()
            .map(|t| TranslatedJson {
                translator: t.translator,
                notification: t.notification,
            })
            .collect();
        let errors: Vec<TranslationErrorJson> = report
            .failures
            .into_iter()
            .map(|(translator, e)| TranslationErrorJson {
                translator,
                error: e.to_string(),
            })
            .collect();
        Self {
            success: errors.is_empty(),
            outputs,
            errors,
        }
    }
}

// =============================================================================
// CACHE RESPONSES
// =============================================================================

/// Entity count for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCacheJson {
    pub target: String,
    pub entities: usize,
}

/// Cache summary response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheResponse {
    pub targets: Vec<TargetCacheJson>,
}

/// Target teardown response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheDeleteResponse {
    pub target: String,
    pub deleted: bool,
}
