use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{fmt, io, time::Duration};
use thiserror::Error;

/// Stable, serialisable classification of a [`LibraryError`].
///
/// Used as the `reason` of a failed batch item and as the `kind` field of
/// HTTP error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidFormat,
    TooLarge,
    UnsupportedFormat,
    NoOpConversion,
    NotFound,
    /// The asset changed underneath a long-running operation.
    Conflict,
    Timeout,
    InvalidInput,
    /// The source bytes could not be decoded or encoded.
    ProcessingFailure,
    StorageFailure,
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("`{mime}` is not an allowed upload type")]
    InvalidFormat { mime: String },
    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
    #[error("`{mime}` cannot be converted to a web variant")]
    UnsupportedFormat { mime: String },
    #[error("asset is already stored as `{mime}`")]
    NoOpConversion { mime: String },
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("image processing failed: {0}")]
    Processing(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type LibraryResult<T> = Result<T, LibraryError>;

impl LibraryError {
    pub fn asset_not_found(id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: "asset",
            id: id.to_string(),
        }
    }

    pub fn folder_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "folder",
            id: id.to_string(),
        }
    }

    pub fn tag_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "tag",
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            Self::TooLarge { .. } => ErrorKind::TooLarge,
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::NoOpConversion { .. } => ErrorKind::NoOpConversion,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Processing(_) => ErrorKind::ProcessingFailure,
            Self::Sqlx(_) | Self::Io(_) => ErrorKind::StorageFailure,
        }
    }
}

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            kind: None,
            message: msg.into(),
        }
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: Some(ErrorKind::InvalidInput),
            message: msg.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "kind": self.kind,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<LibraryError> for AppError {
    fn from(err: LibraryError) -> Self {
        let kind = err.kind();
        let status = match kind {
            ErrorKind::InvalidFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorKind::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::UnsupportedFormat => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NoOpConversion => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::ProcessingFailure => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::StorageFailure => StatusCode::SERVICE_UNAVAILABLE,
        };
        if kind == ErrorKind::StorageFailure {
            tracing::error!("storage failure: {}", err);
        }
        Self {
            status,
            kind: Some(kind),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_classify_as_storage_failure() {
        let err = LibraryError::from(io::Error::other("disk gone"));
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        let app = AppError::from(err);
        assert_eq!(app.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn validation_errors_map_to_client_statuses() {
        let too_large = AppError::from(LibraryError::TooLarge {
            size: 11,
            limit: 10,
        });
        assert_eq!(too_large.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(too_large.kind, Some(ErrorKind::TooLarge));

        let missing = AppError::from(LibraryError::asset_not_found("abc"));
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.message, "asset `abc` not found");
    }

    #[test]
    fn undecodable_sources_are_not_reported_as_outages() {
        let err = LibraryError::Processing("corrupt JPEG header".into());
        assert_eq!(err.kind(), ErrorKind::ProcessingFailure);
        let app = AppError::from(err);
        assert_eq!(app.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(app.kind, Some(ErrorKind::ProcessingFailure));
    }

    #[test]
    fn error_kind_serialises_as_plain_name() {
        let json = serde_json::to_string(&ErrorKind::UnsupportedFormat).unwrap();
        assert_eq!(json, "\"UnsupportedFormat\"");
    }
}
