//! Application state.
//!
//! `AppState` is the central state container: the Postgres pool (the only
//! authoritative store for rooms and messages) and the per-room broadcast
//! channel registry used for fan-out. The `FromRef` impls let handlers
//! extract just the part they need.

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::realtime::broadcast::RoomChannels;

#[derive(Clone)]
pub struct AppState {
    /// Database connection pool. All persistent reads and writes go through
    /// sqlx; no in-process cache of rooms or messages is authoritative.
    pub db_pool: PgPool,

    /// Per-room broadcast channels for delivering persisted messages to
    /// live WebSocket sessions.
    pub room_channels: RoomChannels,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}

impl FromRef<AppState> for RoomChannels {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.room_channels.clone()
    }
}
