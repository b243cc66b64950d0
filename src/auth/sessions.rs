//! JWT session tokens.
//!
//! Tokens are HS256-signed bearer tokens carrying the user id and email.
//! Issued at signup/login, verified by the auth middleware and by the
//! WebSocket upgrade handler.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token lifetime: 7 days.
const TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a decimal string.
    pub sub: String,
    pub email: String,
    /// Expiration time (Unix timestamp).
    pub exp: u64,
    /// Issued at (Unix timestamp).
    pub iat: u64,
}

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set, using development default");
        "development-secret-change-in-production".to_string()
    })
}

/// Create a signed token for a user.
pub fn create_token(user_id: i64, email: String) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs();

    let claims = Claims {
        sub: user_id.to_string(),
        email,
        exp: now + TOKEN_TTL_SECS,
        iat: now,
    };

    let key = EncodingKey::from_secret(jwt_secret().as_ref());
    encode(&Header::default(), &claims, &key)
}

/// Verify a token and return its claims.
pub fn verify_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(jwt_secret().as_ref());
    let token_data = decode::<Claims>(token, &key, &Validation::default())?;
    Ok(token_data.claims)
}

/// Extract the user id from a verified token.
pub fn user_id_from_token(token: &str) -> Option<i64> {
    verify_token(token).ok()?.sub.parse().ok()
}
