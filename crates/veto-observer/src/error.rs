//! HTTP error responses for the veto API.
//!
//! [`ApiError`] wraps a pipeline failure and renders it through its
//! [`IntoResponse`](axum::response::IntoResponse) implementation, picking
//! the status code from the failure's [`ErrorCategory`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;
use veto_core::{ErrorCategory, VetoError};
use veto_db::StoreError;

/// A failed API request.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub VetoError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(VetoError::Storage(err))
    }
}

/// HTTP status for a failure class.
pub const fn status_for(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::InvalidState => StatusCode::BAD_REQUEST,
        ErrorCategory::TurnViolation | ErrorCategory::Conflict => StatusCode::CONFLICT,
        ErrorCategory::Unauthorized => StatusCode::FORBIDDEN,
        ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.category());
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Request failed");
        }

        let body = serde_json::json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_statuses() {
        assert_eq!(status_for(ErrorCategory::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorCategory::InvalidState), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorCategory::TurnViolation), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorCategory::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorCategory::Unauthorized), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(ErrorCategory::Internal),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_carries_code_and_status() {
        let response = ApiError(VetoError::NotYourTurn).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
