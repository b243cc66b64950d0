//! The HTTP and WebSocket route table.
//!
//! # Routes
//!
//! Public:
//! - `POST /api/auth/signup` - User registration
//! - `POST /api/auth/login` - User login
//!
//! Authenticated (bearer token):
//! - `GET /api/auth/me` - Current user
//! - `GET /api/chat/rooms` - Rooms for the current user
//! - `POST /api/chat/rooms` - Create a room
//! - `GET /api/chat/rooms/{room_id}/messages` - Message history
//! - `POST /api/chat/direct` - Get or create a direct chat
//!
//! WebSocket:
//! - `GET /ws/chat/{room_id}` - Live chat session; the token travels in the
//!   `Authorization` header or a `token` query parameter, so the auth
//!   middleware does not apply here.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::handlers::{login, me, signup};
use crate::chat::handlers::{create_room, direct_chat, list_rooms, room_messages};
use crate::chat::ws::chat_subscription;
use crate::middleware::auth::require_auth;
use crate::server::state::AppState;

/// Assemble the full router over the shared application state.
pub fn create_router(app_state: AppState) -> Router {
    let public = Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login));

    let authenticated = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/chat/rooms", get(list_rooms).post(create_room))
        .route("/api/chat/rooms/{room_id}/messages", get(room_messages))
        .route("/api/chat/direct", post(direct_chat))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let websocket = Router::new().route("/ws/chat/{room_id}", get(chat_subscription));

    Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(websocket)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
