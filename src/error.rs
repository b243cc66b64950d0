//! API error taxonomy.
//!
//! Every failure surfaced to a client falls into one of these categories.
//! Authorization and validation failures are handled at the request/session
//! boundary; they never abort other sessions or the broadcast path.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Errors returned by HTTP handlers and the WebSocket upgrade path.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request or connection lacks a valid identity.
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated, but not allowed to touch this resource.
    #[error("{0}")]
    Forbidden(String),

    /// The named resource does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Malformed or semantically invalid request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Storage failure. Fatal for the in-flight operation only.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message exposed to clients. Storage details stay in the logs.
    pub fn detail(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Database(e) = &self {
            tracing::error!("database error: {e:?}");
        } else if let Self::Internal(msg) = &self {
            tracing::error!("internal error: {msg}");
        }
        let body = serde_json::json!({ "detail": self.detail() });
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn status_code_mapping() {
        assert_eq!(ApiError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Forbidden("nope".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::NotFound("room").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::InvalidRequest("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_is_not_leaked() {
        let err = ApiError::Internal("pool exhausted".into());
        assert_eq!(err.detail(), "internal server error");
    }

    #[test]
    fn not_found_detail_names_the_resource() {
        assert_eq!(ApiError::NotFound("room").detail(), "room not found");
    }
}
