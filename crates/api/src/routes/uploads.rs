//! Media upload routes.
//!
//! Multipart parts named `image` carry image assets and parts named
//! `file_song` carry song audio. Parts without a file name are plain form
//! fields and are ignored here.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{AppState, error::ApiError};
use melodia_core::asset::{
    AUDIO_FOLDER, AssetClass, AssetService, UploadError, UploadOutcome, UploadRequest,
    normalize_folder,
};
use melodia_shared::AppError;

/// Folder for song cover art.
const SONG_IMAGE_FOLDER: &str = "songs/images";

/// Creates the upload routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/uploads/{*folder}", post(upload_asset))
        .route("/songs/media", post(upload_song_media))
}

// ============================================================================
// Response Types
// ============================================================================

/// Response for a single asset upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Storage key of the asset.
    pub key: String,
    /// Public URL of the asset.
    pub url: String,
    /// True when an asset with this key already existed.
    pub deduplicated: bool,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        Self {
            key: outcome.key.to_string(),
            url: outcome.url.into_string(),
            deduplicated: outcome.deduplicated,
        }
    }
}

/// Response for song media uploads.
#[derive(Debug, Default, Serialize)]
pub struct SongMediaResponse {
    /// Cover art URL, if an image part was sent.
    pub image_url: Option<String>,
    /// Audio URL, if a `file_song` part was sent.
    pub audio_url: Option<String>,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Gate a part by field name and type, then buffer it.
async fn read_part(
    assets: &AssetService,
    field: Field<'_>,
    folder: &str,
) -> Result<UploadRequest, ApiError> {
    let field_name = field.name().unwrap_or_default().to_string();
    let original_name = field.file_name().unwrap_or_default().to_string();
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    // Reject before the bytes are read.
    if let Err(e) = assets.validator().admit_field(&field_name, &mime_type, folder) {
        warn!(field = %field_name, mime_type = %mime_type, folder, error = %e, "Part rejected");
        return Err(e.into());
    }

    let bytes = field.bytes().await?;
    Ok(UploadRequest::new(
        field_name,
        original_name,
        mime_type,
        bytes,
        folder,
    ))
}

async fn ingest_optional(
    assets: &AssetService,
    request: Option<UploadRequest>,
) -> Result<Option<UploadOutcome>, UploadError> {
    match request {
        Some(request) => assets.ingest(request).await.map(Some),
        None => Ok(None),
    }
}

/// Remove an asset this request created when its sibling part failed.
/// Deduplicated assets predate the request and are left alone.
async fn discard_created(
    assets: &AssetService,
    outcome: Result<Option<UploadOutcome>, UploadError>,
) {
    if let Ok(Some(outcome)) = outcome
        && !outcome.deduplicated
    {
        warn!(key = %outcome.key, "Discarding media whose sibling part failed");
        assets.discard(&outcome.key).await;
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/uploads/{folder}`
/// Upload one file part into one of the image or audio folders.
async fn upload_asset(
    State(state): State<AppState>,
    Path(folder): Path<String>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let folder = normalize_folder(&folder)?;
    if state.assets.policy().class_for_folder(&folder).is_none() {
        warn!(folder = %folder, "Upload to unknown folder rejected");
        return Err(UploadError::UnknownFolder { folder }.into());
    }

    let mut request = None;

    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_none() {
            continue;
        }
        if request.is_some() {
            return Err(AppError::BadRequest("expected exactly one file part".into()).into());
        }
        request = Some(read_part(&state.assets, field, &folder).await?);
    }

    let Some(request) = request else {
        return Err(AppError::BadRequest("missing file part".into()).into());
    };

    let outcome = state.assets.ingest(request).await?;
    info!(
        folder = %folder,
        key = %outcome.key,
        deduplicated = outcome.deduplicated,
        "Asset uploaded"
    );

    let status = if outcome.deduplicated {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(UploadResponse::from(outcome))).into_response())
}

/// POST `/songs/media`
/// Upload a song's cover art and/or audio file.
async fn upload_song_media(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SongMediaResponse>, ApiError> {
    let mut image = None;
    let mut audio = None;

    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_none() {
            continue;
        }
        let name = field.name().unwrap_or_default().to_string();
        let (slot, folder) = match AssetClass::from_field_name(&name) {
            Some(AssetClass::Image) => (&mut image, SONG_IMAGE_FOLDER),
            Some(AssetClass::Audio) => (&mut audio, AUDIO_FOLDER),
            None => {
                warn!(field = %name, "Part rejected");
                return Err(UploadError::unexpected_field(name).into());
            }
        };
        if slot.is_some() {
            return Err(AppError::BadRequest(format!("duplicate '{name}' part")).into());
        }
        *slot = Some(read_part(&state.assets, field, folder).await?);
    }

    if image.is_none() && audio.is_none() {
        return Err(AppError::BadRequest("no media parts".into()).into());
    }

    // Both run to completion; neither is cancelled by the other's failure.
    let (image, audio) = tokio::join!(
        ingest_optional(&state.assets, image),
        ingest_optional(&state.assets, audio),
    );

    let (image, audio) = match (image, audio) {
        (Ok(image), Ok(audio)) => (image, audio),
        (Err(e), other) | (other, Err(e)) => {
            discard_created(&state.assets, other).await;
            return Err(e.into());
        }
    };

    let response = SongMediaResponse {
        image_url: image.map(|o| o.url.into_string()),
        audio_url: audio.map(|o| o.url.into_string()),
    };
    info!(
        image = response.image_url.is_some(),
        audio = response.audio_url.is_some(),
        "Song media uploaded"
    );
    Ok(Json(response))
}
