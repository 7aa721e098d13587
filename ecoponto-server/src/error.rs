//! Handler errors and their JSON rendering.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ecoponto_core::PointError;
use serde_json::json;
use tracing::error;

pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// Error returned by handlers, rendered as a JSON body with a matching status.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
    pub details: Vec<String>,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Boundary validation failure listing every offending field.
    pub(crate) fn validation(details: Vec<String>) -> Self {
        Self {
            details,
            ..Self::new(StatusCode::BAD_REQUEST, "validation", "Validation failed")
        }
    }
}

impl From<PointError> for ApiError {
    fn from(err: PointError) -> Self {
        let message = err.to_string();
        match err {
            PointError::InvalidCriteria(_) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_criteria", message)
            }
            PointError::InvalidSubmission(_) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_submission", message)
            }
            PointError::NoCategorySelected => {
                Self::new(StatusCode::BAD_REQUEST, "no_category_selected", message)
            }
            PointError::UnknownCategory(_) => {
                Self::new(StatusCode::BAD_REQUEST, "unknown_category", message)
            }
            PointError::PointNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "point_not_found", "Point not found.")
            }
            PointError::StorageFailure(source) => {
                error!(error = %source, "storage failure");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_failure",
                    "Storage failure",
                )
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => Self::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                rejection.body_text(),
            ),
            _ => Self::new(StatusCode::BAD_REQUEST, "malformed_body", rejection.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(vec![rejection.body_text()])
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(vec![rejection.body_text()])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "kind": self.kind,
                "message": self.message,
                "status": self.status.as_u16(),
                "details": self.details,
            }
        }));

        (self.status, body).into_response()
    }
}
