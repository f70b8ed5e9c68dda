//! Melodia API Server
//!
//! Main entry point for the media ingestion service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use melodia_api::{AppState, create_router};
use melodia_core::asset::{AssetPolicy, AssetService};
use melodia_core::storage::{StorageProvider, StorageService};
use melodia_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "melodia=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    // Connect object storage
    let provider = StorageProvider::from_config(&config.storage)?;
    let storage = StorageService::from_provider(provider)?;
    info!(
        provider = storage.provider_name(),
        bucket = %config.storage.bucket,
        "Object storage configured"
    );

    // Build the ingestion pipeline
    let policy = AssetPolicy::from_config(&config.upload).with_context(|| {
        format!("unknown dedup policy '{}'", config.upload.dedup_policy)
    })?;
    info!(
        dedup_policy = policy.dedup.as_str(),
        image_max_bytes = policy.image.max_size_bytes,
        audio_max_bytes = policy.audio.max_size_bytes,
        strict_folders = policy.strict_folders,
        "Upload policy loaded"
    );
    let assets = AssetService::new(Arc::new(storage), policy, &config.storage.public_base_url)
        .with_deadline(Duration::from_secs(config.upload.deadline_secs));

    // Create application state
    let state = AppState {
        assets: Arc::new(assets),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
