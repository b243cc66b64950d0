//! Chat HTTP handlers: room listing/creation, message history, and the
//! direct-chat endpoint.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::PgPool;

use crate::auth::users::count_existing_users;
use crate::chat::db;
use crate::chat::direct::{get_or_create_direct_room, DirectRoom};
use crate::chat::types::{
    CreateRoomRequest, DirectChatRequest, HistoryParams, HistoryResponse, RoomListResponse,
    RoomPayload, RoomRef,
};
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;

const DEFAULT_HISTORY_PAGE: u32 = 50;
const MAX_HISTORY_PAGE: u32 = 200;

/// `GET /api/chat/rooms` — the authenticated user's rooms, most recently
/// active first.
pub async fn list_rooms(
    State(pool): State<PgPool>,
    AuthUser(user): AuthUser,
) -> Result<Json<RoomListResponse>, ApiError> {
    let rooms = db::rooms_for_user(&pool, user.id).await?;

    let mut payloads = Vec::with_capacity(rooms.len());
    for room in rooms {
        let participants = db::room_participants(&pool, room.id).await?;
        payloads.push(RoomPayload::new(room, participants));
    }

    Ok(Json(RoomListResponse { rooms: payloads }))
}

/// `POST /api/chat/rooms` — create a group room. The requester is always a
/// participant. An unnamed request for exactly one counterpart degenerates
/// to the direct-chat resolver, so the generic path cannot mint a second
/// copy of an existing 1:1 room.
pub async fn create_room(
    State(pool): State<PgPool>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomPayload>), ApiError> {
    let mut ids = request.participant_ids;
    ids.push(user.id);
    ids.sort_unstable();
    ids.dedup();

    if ids.len() < 2 {
        return Err(ApiError::InvalidRequest(
            "a room needs at least two participants".to_string(),
        ));
    }

    if count_existing_users(&pool, &ids).await? != ids.len() as i64 {
        return Err(ApiError::NotFound("participant"));
    }

    let name = request.name.filter(|n| !n.is_empty());
    if let Some(name) = &name {
        validate_room_name(name)?;
    }

    if ids.len() == 2 && name.is_none() {
        let other = ids[if ids[0] == user.id { 1 } else { 0 }];
        let resolved = get_or_create_direct_room(&pool, user.id, other).await?;
        return room_response(&pool, resolved).await;
    }

    let room = db::create_room(&pool, name.as_deref(), &ids).await?;
    tracing::info!(room = room.id, participants = ids.len(), "room created");

    let participants = db::room_participants(&pool, room.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(RoomPayload::new(room, participants)),
    ))
}

/// `GET /api/chat/rooms/{room_id}/messages` — paginated ascending history.
/// Participants only.
pub async fn room_messages(
    State(pool): State<PgPool>,
    AuthUser(user): AuthUser,
    Path(room_ref): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let room_ref: RoomRef = room_ref.parse().map_err(|_| ApiError::NotFound("room"))?;
    let room = db::get_room(&pool, room_ref.id())
        .await?
        .ok_or(ApiError::NotFound("room"))?;

    if !db::is_participant(&pool, room.id, user.id).await? {
        return Err(ApiError::Forbidden(
            "not authorized to access this chat room".to_string(),
        ));
    }

    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_PAGE)
        .min(MAX_HISTORY_PAGE) as i64;
    let offset = params.offset.unwrap_or(0) as i64;

    let records = db::messages_for_room(&pool, room.id, limit, offset).await?;
    let has_more = records.len() as i64 == limit;

    Ok(Json(HistoryResponse {
        messages: records.into_iter().map(Into::into).collect(),
        has_more,
    }))
}

/// `POST /api/chat/direct` — get or create the canonical 1:1 room with the
/// given counterpart. 200 if it already existed, 201 if newly created.
pub async fn direct_chat(
    State(pool): State<PgPool>,
    AuthUser(user): AuthUser,
    Json(request): Json<DirectChatRequest>,
) -> Result<(StatusCode, Json<RoomPayload>), ApiError> {
    let other = crate::auth::users::get_user_by_id(&pool, request.other_user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let resolved = get_or_create_direct_room(&pool, user.id, other.id).await?;
    room_response(&pool, resolved).await
}

/// Explicit names must stay out of the reserved `DM_` namespace; the unique
/// index on canonical direct-room names would otherwise turn a colliding
/// group name into a storage error.
fn validate_room_name(name: &str) -> Result<(), ApiError> {
    if name.starts_with("DM_") {
        return Err(ApiError::InvalidRequest(
            "room names starting with DM_ are reserved".to_string(),
        ));
    }
    Ok(())
}

async fn room_response(
    pool: &PgPool,
    resolved: DirectRoom,
) -> Result<(StatusCode, Json<RoomPayload>), ApiError> {
    let status = match &resolved {
        DirectRoom::Existing(_) => StatusCode::OK,
        DirectRoom::Created(_) => StatusCode::CREATED,
    };
    let room = resolved.into_room();
    let participants = db::room_participants(pool, room.id).await?;
    Ok((status, Json(RoomPayload::new(room, participants))))
}
