//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        CacheDeleteResponse, CacheResponse, HealthResponse, TargetCacheJson, TranslateRequest,
        TranslateResponse, TranslatorJson, TranslatorsResponse,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// TRANSLATORS HANDLER
// =============================================================================

/// List registered translators and their output maps.
pub async fn translators_handler(State(state): State<AppState>) -> impl IntoResponse {
    let device = state.device.as_ref().clone();
    let translators = state
        .registry
        .iter()
        .map(|t| TranslatorJson::describe(t.as_ref(), &device))
        .collect();

    (
        StatusCode::OK,
        Json(TranslatorsResponse {
            device,
            translators,
        }),
    )
}

// =============================================================================
// NOTIFICATION HANDLER
// =============================================================================

/// Translate one notification through every applicable translator.
///
/// Translator failures are reported in the body; they do not fail the request.
pub async fn notification_handler(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> impl IntoResponse {
    let device = request.device.unwrap_or_else(|| state.device.as_ref().clone());

    tracing::debug!(
        target_name = request.notification.target(),
        updates = request.notification.updates.len(),
        deletes = request.notification.deletes.len(),
        "translating notification"
    );

    let report = state.registry.translate_all(&device, &request.notification);
    (StatusCode::OK, Json(TranslateResponse::from(report)))
}

// =============================================================================
// CACHE HANDLERS
// =============================================================================

/// Entity counts per cached target.
pub async fn cache_handler(State(state): State<AppState>) -> impl IntoResponse {
    let targets = state
        .cache
        .targets()
        .into_iter()
        .filter_map(|target| {
            let entities = state.cache.entity_count(&target)?;
            Some(TargetCacheJson { target, entities })
        })
        .collect();

    (StatusCode::OK, Json(CacheResponse { targets }))
}

/// Drop all cached state for a target.
pub async fn cache_delete_handler(
    State(state): State<AppState>,
    Path(target): Path<String>,
) -> impl IntoResponse {
    let deleted = state.cache.delete_target(&target);
    if deleted {
        tracing::info!(target_name = %target, "cache target dropped");
    }
    let status = if deleted {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    (status, Json(CacheDeleteResponse { target, deleted }))
}
