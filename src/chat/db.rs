//! Database operations for rooms, participation, and messages.
//!
//! This layer is a pure persistence boundary: the membership query lives
//! here, but deciding who may read or write a room is the caller's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::chat::types::UserSummary;

/// A room row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Room {
    pub id: i64,
    /// None for unnamed 1:1 rooms created through the generic path;
    /// `DM_<a>_<b>` for canonical direct rooms.
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A message row. Immutable after insert.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A message joined with its sender's summary, as read back for history.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRecord {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub sender_email: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Room by id, or None.
pub async fn get_room(pool: &PgPool, room_id: i64) -> Result<Option<Room>, sqlx::Error> {
    sqlx::query_as::<_, Room>(
        r#"
        SELECT id, name, created_at, updated_at
        FROM rooms
        WHERE id = $1
        "#,
    )
    .bind(room_id)
    .fetch_optional(pool)
    .await
}

/// Is the user in the room's participant set?
pub async fn is_participant(pool: &PgPool, room_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM room_participants
        WHERE room_id = $1 AND user_id = $2
        "#,
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Participant summaries for a room, stable order.
pub async fn room_participants(
    pool: &PgPool,
    room_id: i64,
) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, u.email
        FROM room_participants rp
        JOIN users u ON u.id = rp.user_id
        WHERE rp.room_id = $1
        ORDER BY u.id ASC
        "#,
    )
    .bind(room_id)
    .fetch_all(pool)
    .await
}

/// Rooms the user participates in, most recently active first.
pub async fn rooms_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<Room>, sqlx::Error> {
    sqlx::query_as::<_, Room>(
        r#"
        SELECT r.id, r.name, r.created_at, r.updated_at
        FROM rooms r
        JOIN room_participants rp ON rp.room_id = r.id
        WHERE rp.user_id = $1
        ORDER BY r.updated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Create a room and enroll its participants in one transaction.
pub async fn create_room(
    pool: &PgPool,
    name: Option<&str>,
    participant_ids: &[i64],
) -> Result<Room, sqlx::Error> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let room = sqlx::query_as::<_, Room>(
        r#"
        INSERT INTO rooms (name, created_at, updated_at)
        VALUES ($1, $2, $3)
        RETURNING id, name, created_at, updated_at
        "#,
    )
    .bind(name)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO room_participants (room_id, user_id, joined_at)
        SELECT $1, ids.id, $3 FROM UNNEST($2::BIGINT[]) AS ids(id)
        "#,
    )
    .bind(room.id)
    .bind(participant_ids)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(room)
}

/// Find the direct room for a user pair: exactly two participants, and a
/// name that is empty or the canonical one. Both naming conventions exist
/// because rooms can be created through the generic path or the resolver.
pub async fn find_direct_room(
    pool: &PgPool,
    user_a: i64,
    user_b: i64,
    canonical_name: &str,
) -> Result<Option<Room>, sqlx::Error> {
    sqlx::query_as::<_, Room>(
        r#"
        SELECT r.id, r.name, r.created_at, r.updated_at
        FROM rooms r
        WHERE (r.name IS NULL OR r.name = '' OR r.name = $3)
          AND EXISTS (SELECT 1 FROM room_participants WHERE room_id = r.id AND user_id = $1)
          AND EXISTS (SELECT 1 FROM room_participants WHERE room_id = r.id AND user_id = $2)
          AND (SELECT COUNT(*) FROM room_participants WHERE room_id = r.id) = 2
        LIMIT 1
        "#,
    )
    .bind(user_a)
    .bind(user_b)
    .bind(canonical_name)
    .fetch_optional(pool)
    .await
}

/// Insert an immutable message stamped with the current time and bump the
/// room's activity timestamp, in one transaction. Once this returns, the
/// message is visible to ordered history reads; if it fails, neither the
/// message nor the activity bump is persisted.
pub async fn append_message(
    pool: &PgPool,
    room_id: i64,
    sender_id: i64,
    content: &str,
) -> Result<Message, sqlx::Error> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (room_id, sender_id, content, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, room_id, sender_id, content, created_at
        "#,
    )
    .bind(room_id)
    .bind(sender_id)
    .bind(content)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE rooms SET updated_at = $1 WHERE id = $2")
        .bind(now)
        .bind(room_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(message)
}

/// Message history: ascending by timestamp, id as tiebreak, so the order
/// always matches persisted order. Limit/offset makes the scan restartable.
pub async fn messages_for_room(
    pool: &PgPool,
    room_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<MessageRecord>, sqlx::Error> {
    sqlx::query_as::<_, MessageRecord>(
        r#"
        SELECT m.id, m.room_id, m.sender_id, u.email AS sender_email, m.content, m.created_at
        FROM messages m
        JOIN users u ON u.id = m.sender_id
        WHERE m.room_id = $1
        ORDER BY m.created_at ASC, m.id ASC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(room_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
