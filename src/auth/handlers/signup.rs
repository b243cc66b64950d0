//! User registration handler for `POST /api/auth/signup`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use sqlx::PgPool;

use crate::auth::handlers::types::{AuthResponse, SignupRequest};
use crate::auth::sessions::create_token;
use crate::auth::users::create_user;
use crate::error::ApiError;

/// Register a new account and return a token for immediate use.
///
/// Returns 400 for invalid fields or an already-registered email or phone
/// number; 201 with `{token, user}` on success.
pub async fn signup(
    State(pool): State<PgPool>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    validate(&request)?;

    let password_hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;

    let user = create_user(&pool, &request.email, &request.phone_number, &password_hash)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::InvalidRequest("email or phone number already registered".to_string())
            }
            _ => ApiError::Database(e),
        })?;

    let token = create_token(user.id, user.email.clone())
        .map_err(|e| ApiError::Internal(format!("token creation failed: {e}")))?;

    tracing::info!(user = user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

fn validate(request: &SignupRequest) -> Result<(), ApiError> {
    if !request.email.contains('@') {
        return Err(ApiError::InvalidRequest("a valid email is required".to_string()));
    }
    if request.phone_number.trim().is_empty() {
        return Err(ApiError::InvalidRequest("phone_number is required".to_string()));
    }
    if request.password.len() < 8 {
        return Err(ApiError::InvalidRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, phone: &str, password: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            phone_number: phone.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn rejects_invalid_email() {
        assert!(validate(&request("not-an-email", "555-0100", "longenough")).is_err());
    }

    #[test]
    fn rejects_short_password() {
        assert!(validate(&request("a@example.com", "555-0100", "short")).is_err());
    }

    #[test]
    fn rejects_blank_phone_number() {
        assert!(validate(&request("a@example.com", "  ", "longenough")).is_err());
    }

    #[test]
    fn accepts_well_formed_request() {
        assert!(validate(&request("a@example.com", "555-0100", "longenough")).is_ok());
    }
}
