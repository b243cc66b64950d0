//! Bearer-token authentication middleware.
//!
//! Verifies the `Authorization: Bearer <jwt>` header, checks the user still
//! exists, and attaches a `CurrentUser` to the request extensions. Handlers
//! take the `AuthUser` extractor to get it back.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::sessions::verify_token;
use crate::auth::users::get_user_by_id;
use crate::error::ApiError;
use crate::server::state::AppState;

/// Identity established for the current request.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
}

/// Pull a bearer token out of the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Reject the request with 401 unless it carries a valid token for an
/// existing user.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(ApiError::Unauthenticated)?;

    let claims = verify_token(token).map_err(|e| {
        tracing::debug!("token rejected: {e}");
        ApiError::Unauthenticated
    })?;
    let user_id: i64 = claims.sub.parse().map_err(|_| ApiError::Unauthenticated)?;

    // A token may outlive its account.
    get_user_by_id(&state.db_pool, user_id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    request.extensions_mut().insert(CurrentUser {
        id: user_id,
        email: claims.email,
    });

    Ok(next.run(request).await)
}

/// Extractor handing handlers the identity set by [`require_auth`].
#[derive(Clone, Debug)]
pub struct AuthUser(pub CurrentUser);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(AuthUser)
            .ok_or(ApiError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::HeaderValue;

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_or_malformed_header_yields_none() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);
    }
}
