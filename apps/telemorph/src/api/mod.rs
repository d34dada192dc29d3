//! # Telemorph HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /translators` - Registered translators and their output maps
//! - `POST /notification` - Translate one notification
//! - `GET /cache` - Entity counts per cached target
//! - `DELETE /cache/{target}` - Drop all cached state for a target
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `TELEMORPH_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `TELEMORPH_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod types;

pub use auth::{API_KEY_ENV, get_api_key_from_env};
pub use types::{
    CacheDeleteResponse, CacheResponse, HealthResponse, TargetCacheJson, TranslateRequest,
    TranslateResponse, TranslatedJson, TranslationErrorJson, TranslatorJson, TranslatorsResponse,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use telemorph_core::{DeviceInfo, MacsecFact, Registry, StateCache, TelemorphError};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Environment variable holding the allowed CORS origins.
pub const CORS_ORIGINS_ENV: &str = "TELEMORPH_CORS_ORIGINS";

/// Maximum request body size (4 MiB).
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
///
/// The cache synchronizes itself per target, so no outer lock is needed.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub cache: Arc<StateCache<MacsecFact>>,
    /// Device metadata used when a request does not supply its own.
    pub device: Arc<DeviceInfo>,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(registry: Registry, cache: Arc<StateCache<MacsecFact>>, device: DeviceInfo) -> Self {
        Self {
            registry: Arc::new(registry),
            cache,
            device: Arc::new(device),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from `TELEMORPH_CORS_ORIGINS`.
///
/// - `*`: allow all origins
/// - unset: localhost only
/// - otherwise: the comma-separated list of origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var(CORS_ORIGINS_ENV).ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins ({}=*). This is insecure for production!",
                CORS_ORIGINS_ENV
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in {}, defaulting to localhost only",
                    CORS_ORIGINS_ENV
                );
                build_localhost_cors()
            } else {
                restricted_cors(allowed_origins)
            }
        }
        None => {
            tracing::info!(
                "CORS: No {} set, defaulting to localhost only",
                CORS_ORIGINS_ENV
            );
            build_localhost_cors()
        }
    }
}

/// CORS layer allowing only local origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    restricted_cors(origins)
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set {} to enable authentication.",
            API_KEY_ENV
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/translators", get(handlers::translators_handler))
        .route("/notification", post(handlers::notification_handler))
        .route("/cache", get(handlers::cache_handler))
        .route("/cache/{target}", delete(handlers::cache_delete_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer())
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), TelemorphError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TelemorphError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("Telemorph HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TelemorphError::Io(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
