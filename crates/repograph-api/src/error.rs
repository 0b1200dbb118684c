use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use repograph_core::RepoGraphError;
use serde_json::json;
use thiserror::Error;

/// Transport-facing wrapper: every library error becomes a structured
/// `{success: false, error: {kind, message}}` envelope, never a panic.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct ApiError(#[from] pub RepoGraphError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RepoGraphError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RepoGraphError::NotFound(_) => StatusCode::NOT_FOUND,
            RepoGraphError::FetchFailed(_) => StatusCode::BAD_GATEWAY,
            RepoGraphError::IndexUnavailable(_) | RepoGraphError::IndexNotReady(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RepoGraphError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "kind": self.0.kind(),
                "message": self.0.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
