//! Request and response types shared by the authentication handlers.

use serde::{Deserialize, Serialize};

use crate::auth::users::User;

/// Sign up request.
#[derive(Debug, Deserialize, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub phone_number: String,
    /// Hashed with bcrypt before storage.
    pub password: String,
}

/// Login request.
#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by signup and login: a bearer token plus the user it belongs to.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

/// User information safe to return to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub phone_number: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            phone_number: user.phone_number,
        }
    }
}
