//! Current-user handler for `GET /api/auth/me`.

use axum::extract::State;
use axum::Json;
use sqlx::PgPool;

use crate::auth::handlers::types::UserResponse;
use crate::auth::users::get_user_by_id;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;

/// Return the authenticated user's own record.
pub async fn me(
    State(pool): State<PgPool>,
    AuthUser(current): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = get_user_by_id(&pool, current.id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(user.into()))
}
