//! Application assembly.

use axum::Router;
use sqlx::PgPool;

use crate::realtime::broadcast::RoomChannels;
use crate::routes::create_router;
use crate::server::state::AppState;

/// Sweep interval for broadcast channels whose rooms have no live sessions.
const CHANNEL_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);

/// Build the application router and start background maintenance.
pub async fn create_app(db_pool: PgPool) -> Router {
    let room_channels = RoomChannels::new();

    let app_state = AppState {
        db_pool,
        room_channels: room_channels.clone(),
    };

    // A room's channel outlives its last session until the next sweep; the
    // registry would otherwise grow with every room ever subscribed to.
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHANNEL_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = room_channels.sweep();
            if removed > 0 {
                tracing::debug!("swept {removed} idle room channels");
            }
        }
    });

    create_router(app_state)
}
