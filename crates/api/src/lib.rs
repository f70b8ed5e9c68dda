//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - Multipart media upload routes
//! - Error to response mapping
//! - Health check

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use melodia_core::asset::AssetService;

/// Room for multipart boundaries and part headers on top of the payload.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Asset ingestion service.
    pub assets: Arc<AssetService>,
}

impl AppState {
    /// Largest request body accepted: both class limits plus overhead, since
    /// the songs media route carries one image and one audio part.
    #[must_use]
    pub fn body_limit(&self) -> usize {
        let policy = self.assets.policy();
        let payload = policy
            .image
            .max_size_bytes
            .saturating_add(policy.audio.max_size_bytes);
        usize::try_from(payload)
            .unwrap_or(usize::MAX)
            .saturating_add(MULTIPART_OVERHEAD_BYTES)
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(DefaultBodyLimit::max(state.body_limit()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
