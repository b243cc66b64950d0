//! Users, password hashing, and JWT session tokens.

pub mod handlers;
pub mod sessions;
pub mod users;
