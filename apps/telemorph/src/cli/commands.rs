//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState, TranslatedJson, TranslatorJson};
use crate::config::TelemorphConfig;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use telemorph_core::{
    DeviceInfo, Notification, Registry, StateCache, TelemorphError,
    primitives::MAX_BATCH_NOTIFICATIONS,
};

// =============================================================================
// FILE LIMITS
// =============================================================================

/// Maximum input file size for translation (100 MB).
const MAX_INPUT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Resolve `path` to an existing regular file within the size limit.
fn validate_input_file(path: &Path) -> Result<PathBuf, TelemorphError> {
    let canonical = path.canonicalize().map_err(|e| {
        TelemorphError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(TelemorphError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| TelemorphError::Io(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_INPUT_FILE_SIZE {
        return Err(TelemorphError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_INPUT_FILE_SIZE
        )));
    }

    Ok(canonical)
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    config: &TelemorphConfig,
    host: &str,
    port: u16,
) -> Result<(), TelemorphError> {
    let cache = Arc::new(StateCache::new());
    let registry = config.build_registry(Arc::clone(&cache))?;
    warn_inapplicable(&registry, &config.device);

    println!("Telemorph Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:        {}", host);
    println!("  Port:        {}", port);
    println!("  Device:      {}", describe_device(&config.device));
    println!("  Translators: {}", registry.ids().join(", "));
    println!();
    println!("Endpoints:");
    println!("  GET    /health          - Health check");
    println!("  GET    /translators     - List translators");
    println!("  POST   /notification    - Translate a notification");
    println!("  GET    /cache           - Cached entities per target");
    println!("  DELETE /cache/{{target}}  - Drop a target's cached state");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(registry, cache, config.device.clone());
    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state).await
}

/// Ids of registered translators whose filter rejects `device`.
pub fn inapplicable<'a>(registry: &'a Registry, device: &DeviceInfo) -> Vec<&'a str> {
    registry
        .iter()
        .filter(|t| !t.filter().accepts(device))
        .map(|t| t.id())
        .collect()
}

fn warn_inapplicable(registry: &Registry, device: &DeviceInfo) {
    for id in inapplicable(registry, device) {
        tracing::warn!(
            translator = id,
            device = %describe_device(device),
            "Translator does not apply to this device; set [device] in the config"
        );
    }
}

fn describe_device(device: &DeviceInfo) -> String {
    let field = |s: &str| if s.is_empty() { "*" } else { s }.to_string();
    format!(
        "{} {} {}",
        field(&device.vendor),
        field(&device.model),
        field(&device.version)
    )
}

// =============================================================================
// TRANSLATE COMMAND
// =============================================================================

/// Parse notifications from a JSON array or from JSON lines.
pub fn parse_notifications(text: &str) -> Result<Vec<Notification>, TelemorphError> {
    let trimmed = text.trim_start();
    let notifications: Vec<Notification> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)
            .map_err(|e| TelemorphError::Serialization(format!("Invalid JSON array: {}", e)))?
    } else {
        trimmed
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| {
                    TelemorphError::Serialization(format!("Line {}: {}", i + 1, e))
                })
            })
            .collect::<Result<_, _>>()?
    };

    if notifications.len() > MAX_BATCH_NOTIFICATIONS {
        return Err(TelemorphError::Serialization(format!(
            "{} notifications exceed the maximum of {}",
            notifications.len(),
            MAX_BATCH_NOTIFICATIONS
        )));
    }
    Ok(notifications)
}

/// Translate every notification in `file`, writing outputs as JSON lines.
pub fn cmd_translate(
    config: &TelemorphConfig,
    device: &DeviceInfo,
    file: &Path,
    quiet: bool,
) -> Result<(), TelemorphError> {
    let path = validate_input_file(file)?;
    let text = std::fs::read_to_string(&path)
        .map_err(|e| TelemorphError::Io(format!("Cannot read '{}': {}", path.display(), e)))?;
    let notifications = parse_notifications(&text)?;

    let registry = config.build_registry(Arc::new(StateCache::new()))?;
    warn_inapplicable(&registry, device);
    let mut stdout = std::io::stdout().lock();
    let mut emitted = 0usize;
    let mut failed = 0usize;

    for notification in &notifications {
        let report = registry.translate_all(device, notification);
        failed += report.failures.len();
        for output in report.outputs {
            let line = serde_json::to_string(&TranslatedJson {
                translator: output.translator,
                notification: output.notification,
            })
            .map_err(|e| TelemorphError::Serialization(e.to_string()))?;
            writeln!(stdout, "{}", line).map_err(|e| TelemorphError::Io(e.to_string()))?;
            emitted += 1;
        }
    }

    if !quiet {
        eprintln!(
            "Translated {} notifications: {} outputs, {} translator failures",
            notifications.len(),
            emitted,
            failed
        );
    }
    Ok(())
}

// =============================================================================
// TRANSLATORS COMMAND
// =============================================================================

/// List translators and the output paths they produce.
pub fn cmd_translators(config: &TelemorphConfig, json_mode: bool) -> Result<(), TelemorphError> {
    let registry = config.build_registry(Arc::new(StateCache::new()))?;
    let described: Vec<TranslatorJson> = registry
        .iter()
        .map(|t| TranslatorJson::describe(t.as_ref(), &config.device))
        .collect();

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&described).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Telemorph Translators");
    println!("=====================");
    println!("Device: {}", describe_device(&config.device));
    for t in &described {
        println!();
        let marker = if t.applicable { "" } else { " (not applicable)" };
        println!("{}{}", t.id, marker);
        for (out, inputs) in &t.outputs {
            println!("  {}", out);
            for input in inputs {
                println!("    <- {}", input);
            }
        }
    }
    Ok(())
}

// =============================================================================
// CHECK-CONFIG COMMAND
// =============================================================================

/// Report the loaded configuration. Loading already validated it.
pub fn cmd_check_config(
    path: &Path,
    config: &TelemorphConfig,
    json_mode: bool,
) -> Result<(), TelemorphError> {
    let registry = config.build_registry(Arc::new(StateCache::new()))?;

    if json_mode {
        let output = serde_json::json!({
            "config": path.to_string_lossy(),
            "exists": path.exists(),
            "valid": true,
            "translators": registry.ids(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    if path.exists() {
        println!("Configuration OK: {}", path.display());
    } else {
        println!("No file at {}; defaults are valid", path.display());
    }
    println!("Translators: {}", registry.ids().join(", "));
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
