//! Application-wide error types.

use thiserror::Error;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or unexpected request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Uploaded payload exceeds a size limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Uploaded payload has a content type the target does not accept.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// A dependency could not be reached.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// External service error.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// The operation ran past its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::PayloadTooLarge(_) => 413,
            Self::UnsupportedMediaType(_) => 415,
            Self::ExternalService(_) => 502,
            Self::ServiceUnavailable(_) => 503,
            Self::Timeout(_) => 504,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::UnsupportedMediaType(_) => "UNSUPPORTED_MEDIA_TYPE",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Timeout(_) => "TIMEOUT",
        }
    }

    /// Whether a client may reasonably retry the same request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable(_) | Self::ExternalService(_) | Self::Timeout(_)
        )
    }
}
