//! Mapping of domain errors to HTTP responses.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use melodia_core::asset::UploadError;
use melodia_shared::AppError;

/// HTTP-facing error wrapper.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = json!({
            "error": self.0.error_code().to_ascii_lowercase(),
            "message": message_of(&self.0),
            "retryable": self.0.is_retryable(),
        });
        (status, Json(body)).into_response()
    }
}

fn message_of(err: &AppError) -> &str {
    match err {
        AppError::BadRequest(m)
        | AppError::PayloadTooLarge(m)
        | AppError::UnsupportedMediaType(m)
        | AppError::ServiceUnavailable(m)
        | AppError::ExternalService(m)
        | AppError::Timeout(m) => m,
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        let app = match &err {
            UploadError::UnexpectedField { .. }
            | UploadError::UnknownFolder { .. }
            | UploadError::InvalidFolder { .. }
            | UploadError::InvalidFileName { .. } => AppError::BadRequest(err.to_string()),
            UploadError::InvalidFormat { .. } => AppError::UnsupportedMediaType(err.to_string()),
            UploadError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            // Store causes stay in the logs; clients get the key only.
            UploadError::StorageUnavailable { key, .. } => AppError::ServiceUnavailable(format!(
                "storage unavailable while checking {key}"
            )),
            UploadError::UploadFailed { key, .. } => {
                AppError::ExternalService(format!("upload of {key} failed"))
            }
            UploadError::PublishFailed { key, .. } => {
                AppError::ExternalService(format!("publishing {key} failed"))
            }
            UploadError::DeadlineExceeded { .. } => AppError::Timeout(err.to_string()),
        };
        Self(app)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let app = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(err.body_text())
        };
        Self(app)
    }
}
