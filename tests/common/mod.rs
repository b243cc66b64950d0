//! Shared fixtures for database-backed integration tests.
//!
//! These tests need a running Postgres. Set `TEST_DATABASE_URL` to point at
//! a scratch database; when it is unset every test here passes vacuously so
//! the suite still runs in environments without a database.

use std::sync::atomic::{AtomicU64, Ordering};

use convene::auth::users::{create_user, User};
use sqlx::PgPool;

static USER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Connect to the test database and bring the schema up to date, or None
/// when `TEST_DATABASE_URL` is unset.
pub async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = PgPool::connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    Some(pool)
}

/// Insert a user with a unique email and phone number. The label keeps test
/// failures readable.
pub async fn make_user(pool: &PgPool, label: &str) -> User {
    let n = USER_SEQ.fetch_add(1, Ordering::Relaxed);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .subsec_nanos();

    let email = format!("{label}-{nanos}-{n}@test.invalid");
    let phone = format!("+1555{nanos:09}{n:03}");

    create_user(pool, &email, &phone, "$2b$04$testhashtesthashtesthas")
        .await
        .expect("insert test user")
}
