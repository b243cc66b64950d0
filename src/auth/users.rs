//! User model and database operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A user row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    /// Unique; also the login identifier.
    pub email: String,
    pub phone_number: String,
    /// Bcrypt hash, never returned to clients.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create a new user.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    phone_number: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, phone_number, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, email, phone_number, password_hash, created_at, updated_at
        "#,
    )
    .bind(email)
    .bind(phone_number)
    .bind(password_hash)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Get user by email, or None if not found.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, phone_number, password_hash, created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Get user by id, or None if not found.
pub async fn get_user_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, phone_number, password_hash, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// How many of the given ids exist. Used to validate participant lists.
pub async fn count_existing_users(pool: &PgPool, ids: &[i64]) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM users WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
