//! Login handler for `POST /api/auth/login`.
//!
//! Unknown email and wrong password return the same 401 so the endpoint
//! cannot be used to enumerate accounts.

use axum::extract::State;
use axum::Json;
use sqlx::PgPool;

use crate::auth::handlers::types::{AuthResponse, LoginRequest};
use crate::auth::sessions::create_token;
use crate::auth::users::get_user_by_email;
use crate::error::ApiError;

/// Verify credentials and return a bearer token.
pub async fn login(
    State(pool): State<PgPool>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = get_user_by_email(&pool, &request.email)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    let valid = bcrypt::verify(&request.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(format!("password verification failed: {e}")))?;
    if !valid {
        tracing::warn!(user = user.id, "login with invalid password");
        return Err(ApiError::Unauthenticated);
    }

    let token = create_token(user.id, user.email.clone())
        .map_err(|e| ApiError::Internal(format!("token creation failed: {e}")))?;

    tracing::info!(user = user.id, "user logged in");

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}
