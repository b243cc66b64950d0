//! WebSocket chat sessions.
//!
//! A session binds one live connection to one authenticated user and one
//! room subscription: `Unauthenticated -> Connecting -> Subscribed -> Closed`.
//! The upgrade handler walks the first three states; `run_session` is the
//! `Subscribed` state until the transport closes.
//!
//! Membership is enforced twice: at subscribe time (non-members never reach
//! the room's channel) and again for every inbound message, so a user
//! removed mid-session stops being able to post. Authorization and parse
//! failures produce an error frame on the offending session only.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::auth::sessions::verify_token;
use crate::chat::db;
use crate::chat::types::{ErrorFrame, InboundFrame, MessagePayload, RoomRef, UserSummary};
use crate::error::ApiError;
use crate::server::state::AppState;

/// Outbound queue per session. If a client stops draining its socket this
/// fills up and the session stalls without blocking other sessions.
const SESSION_OUTBOX: usize = 64;

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    /// Browser WebSocket clients cannot set headers, so the token may come
    /// as a query parameter instead.
    token: Option<String>,
}

/// `GET /ws/chat/{room_id}` — authenticate, resolve the room, check
/// membership, then upgrade to a live session.
pub async fn chat_subscription(
    State(state): State<AppState>,
    Path(room_ref): Path<String>,
    Query(auth): Query<WsAuthQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    // Unauthenticated -> Connecting
    let token = crate::middleware::auth::bearer_token(&headers)
        .or(auth.token.as_deref())
        .ok_or(ApiError::Unauthenticated)?;
    let claims = verify_token(token).map_err(|_| ApiError::Unauthenticated)?;
    let user_id: i64 = claims.sub.parse().map_err(|_| ApiError::Unauthenticated)?;

    // Connecting -> Subscribed: the room must resolve and the user must be
    // a participant before the channel subscription exists.
    let room_ref: RoomRef = room_ref.parse().map_err(|_| ApiError::NotFound("room"))?;
    let room = db::get_room(&state.db_pool, room_ref.id())
        .await?
        .ok_or(ApiError::NotFound("room"))?;

    if !db::is_participant(&state.db_pool, room.id, user_id).await? {
        return Err(ApiError::Forbidden(
            "not a participant of this room".to_string(),
        ));
    }

    let user = UserSummary {
        id: user_id,
        email: claims.email,
    };
    tracing::info!(room = room.id, user = user.id, "chat session subscribed");

    Ok(ws.on_upgrade(move |socket| run_session(socket, state, room.id, user)))
}

/// The `Subscribed` state: forward room broadcasts out, persist and fan out
/// inbound messages, until the transport closes.
async fn run_session(socket: WebSocket, state: AppState, room_id: i64, user: UserSummary) {
    let (mut sink, mut stream) = socket.split();
    let mut broadcast_rx = state.room_channels.subscribe(room_id);

    // Single writer owns the sink; broadcasts and per-session error frames
    // both go through it.
    let (out_tx, mut out_rx) = mpsc::channel::<String>(SESSION_OUTBOX);

    let writer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if sink.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let fanout_tx = out_tx.clone();
    let fanout = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(payload) => {
                    if fanout_tx.send(payload).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    // Dropped frames are recoverable through history.
                    tracing::warn!(room = room_id, skipped, "session lagged behind fan-out");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Inbound frames are handled to completion before the next poll, so a
    // disconnect never cancels an append already in flight: the message
    // still commits and fans out to the remaining sessions.
    while let Some(Ok(frame)) = stream.next().await {
        match frame {
            WsMessage::Text(text) => {
                handle_inbound(&state, room_id, &user, text.as_str(), &out_tx).await;
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    // Subscribed -> Closed: dropping the receiver releases the channel
    // subscription; nothing queued survives.
    writer.abort();
    fanout.abort();
    tracing::info!(room = room_id, user = user.id, "chat session closed");
}

/// Handle one inbound frame: parse, re-check membership, persist, fan out.
async fn handle_inbound(
    state: &AppState,
    room_id: i64,
    user: &UserSummary,
    text: &str,
    out: &mpsc::Sender<String>,
) {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(_) => {
            send_error(out, "expected a JSON object with a \"message\" field").await;
            return;
        }
    };

    match db::is_participant(&state.db_pool, room_id, user.id).await {
        Ok(true) => {}
        Ok(false) => {
            send_error(out, "you are not a participant of this room").await;
            return;
        }
        Err(e) => {
            tracing::error!(room = room_id, "participation check failed: {e:?}");
            send_error(out, "message could not be saved").await;
            return;
        }
    }

    // A failed append is never fanned out.
    let message = match db::append_message(&state.db_pool, room_id, user.id, &frame.message).await {
        Ok(message) => message,
        Err(e) => {
            tracing::error!(room = room_id, "message append failed: {e:?}");
            send_error(out, "message could not be saved").await;
            return;
        }
    };

    let payload = MessagePayload {
        id: message.id,
        room: message.room_id,
        sender: user.clone(),
        content: message.content,
        timestamp: message.created_at,
    };

    match serde_json::to_string(&payload) {
        Ok(json) => {
            // The sender's own subscription delivers the echo-back. Append
            // and publish are not serialized per room: two concurrent senders
            // can publish in the opposite order to their commit order, and
            // history is the arbiter when that happens.
            let delivered = state.room_channels.publish(room_id, json);
            tracing::debug!(room = room_id, message = payload.id, delivered, "message fanned out");
        }
        Err(e) => tracing::error!(message = payload.id, "payload serialization failed: {e}"),
    }
}

async fn send_error(out: &mpsc::Sender<String>, detail: &str) {
    let frame = ErrorFrame {
        error: detail.to_string(),
    };
    if let Ok(json) = serde_json::to_string(&frame) {
        let _ = out.send(json).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use sqlx::PgPool;

    use super::*;
    use crate::auth::users::{create_user, User};
    use crate::realtime::broadcast::RoomChannels;

    static USER_SEQ: AtomicU64 = AtomicU64::new(0);

    // Needs a running Postgres; tests pass vacuously when TEST_DATABASE_URL
    // is unset, like the suites under tests/.
    async fn test_state() -> Option<AppState> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let db_pool = PgPool::connect(&url)
            .await
            .expect("connect to test database");
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .expect("run migrations");

        Some(AppState {
            db_pool,
            room_channels: RoomChannels::new(),
        })
    }

    async fn make_user(pool: &PgPool, label: &str) -> User {
        let n = USER_SEQ.fetch_add(1, Ordering::Relaxed);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock before epoch")
            .subsec_nanos();

        create_user(
            pool,
            &format!("{label}-{nanos}-{n}@test.invalid"),
            &format!("+1999{nanos:09}{n:03}"),
            "$2b$04$testhashtesthashtesthas",
        )
        .await
        .expect("insert test user")
    }

    fn summary(user: &User) -> UserSummary {
        UserSummary {
            id: user.id,
            email: user.email.clone(),
        }
    }

    #[tokio::test]
    async fn member_message_is_persisted_then_broadcast() {
        let Some(state) = test_state().await else {
            return;
        };
        let alice = make_user(&state.db_pool, "alice").await;
        let bob = make_user(&state.db_pool, "bob").await;
        let room = db::create_room(&state.db_pool, None, &[alice.id, bob.id])
            .await
            .expect("create room");

        let mut rx = state.room_channels.subscribe(room.id);
        let (out_tx, mut out_rx) = mpsc::channel(8);

        handle_inbound(
            &state,
            room.id,
            &summary(&alice),
            r#"{"message":"hi"}"#,
            &out_tx,
        )
        .await;

        let payload: serde_json::Value =
            serde_json::from_str(&rx.try_recv().expect("broadcast delivered"))
                .expect("payload is JSON");
        assert_eq!(payload["content"], "hi");
        assert_eq!(payload["room"], room.id);
        assert_eq!(payload["sender"]["id"], alice.id);
        assert_eq!(payload["sender"]["email"], alice.email.as_str());
        assert!(payload["timestamp"]
            .as_str()
            .expect("timestamp is a string")
            .parse::<chrono::DateTime<chrono::Utc>>()
            .is_ok());

        // The broadcast carries the id the store assigned.
        let history = db::messages_for_room(&state.db_pool, room.id, 10, 0)
            .await
            .expect("read history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hi");
        assert_eq!(payload["id"], history[0].id);

        // No error frame for a valid member message.
        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn outsider_message_gets_an_error_frame_and_leaves_no_trace() {
        let Some(state) = test_state().await else {
            return;
        };
        let alice = make_user(&state.db_pool, "alice").await;
        let bob = make_user(&state.db_pool, "bob").await;
        let mallory = make_user(&state.db_pool, "mallory").await;
        let room = db::create_room(&state.db_pool, None, &[alice.id, bob.id])
            .await
            .expect("create room");

        let mut rx = state.room_channels.subscribe(room.id);
        let (out_tx, mut out_rx) = mpsc::channel(8);

        handle_inbound(
            &state,
            room.id,
            &summary(&mallory),
            r#"{"message":"let me in"}"#,
            &out_tx,
        )
        .await;

        // Only the offender hears about it.
        let frame: serde_json::Value =
            serde_json::from_str(&out_rx.try_recv().expect("error frame delivered"))
                .expect("frame is JSON");
        assert!(frame["error"].is_string());

        assert!(rx.try_recv().is_err());
        let history = db::messages_for_room(&state.db_pool, room.id, 10, 0)
            .await
            .expect("read history");
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn malformed_frame_is_rejected_without_persistence() {
        let Some(state) = test_state().await else {
            return;
        };
        let alice = make_user(&state.db_pool, "alice").await;
        let bob = make_user(&state.db_pool, "bob").await;
        let room = db::create_room(&state.db_pool, None, &[alice.id, bob.id])
            .await
            .expect("create room");

        let mut rx = state.room_channels.subscribe(room.id);
        let (out_tx, mut out_rx) = mpsc::channel(8);

        handle_inbound(&state, room.id, &summary(&alice), r#"{"text":"hi"}"#, &out_tx).await;

        let frame: serde_json::Value =
            serde_json::from_str(&out_rx.try_recv().expect("error frame delivered"))
                .expect("frame is JSON");
        assert!(frame["error"].is_string());

        assert!(rx.try_recv().is_err());
        let history = db::messages_for_room(&state.db_pool, room.id, 10, 0)
            .await
            .expect("read history");
        assert!(history.is_empty());
    }
}
