//! Direct-chat resolution.
//!
//! Maps an unordered pair of users to their canonical 1:1 room, creating it
//! on first contact. For a given pair at most one canonical room exists;
//! the partial unique index on `DM_%` names enforces that across concurrent
//! creators, and the loser of a race falls back to the winner's room.

use sqlx::PgPool;

use crate::chat::db::{self, Room};
use crate::error::ApiError;

/// Outcome of [`get_or_create_direct_room`], so callers can answer 200 vs 201.
#[derive(Debug)]
pub enum DirectRoom {
    Existing(Room),
    Created(Room),
}

impl DirectRoom {
    pub fn into_room(self) -> Room {
        match self {
            Self::Existing(room) | Self::Created(room) => room,
        }
    }
}

/// Deterministic name for the canonical direct room of a user pair. Order
/// independent: the pair is sorted by ascending id first.
pub fn canonical_direct_name(user_a: i64, user_b: i64) -> String {
    let (lo, hi) = if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };
    format!("DM_{lo}_{hi}")
}

/// A user cannot chat with themselves.
pub(crate) fn check_pair(user_a: i64, user_b: i64) -> Result<(), ApiError> {
    if user_a == user_b {
        return Err(ApiError::InvalidRequest(
            "cannot create a chat with yourself".to_string(),
        ));
    }
    Ok(())
}

/// Resolve the canonical direct room for a pair, creating it if absent.
///
/// Idempotent: repeated calls for the same pair, in either argument order,
/// return the same room. The lookup recognizes unnamed 2-participant rooms
/// as well as canonically named ones.
pub async fn get_or_create_direct_room(
    pool: &PgPool,
    user_a: i64,
    user_b: i64,
) -> Result<DirectRoom, ApiError> {
    check_pair(user_a, user_b)?;
    let name = canonical_direct_name(user_a, user_b);

    if let Some(room) = db::find_direct_room(pool, user_a, user_b, &name).await? {
        return Ok(DirectRoom::Existing(room));
    }

    match db::create_room(pool, Some(&name), &[user_a, user_b]).await {
        Ok(room) => {
            tracing::info!(room = room.id, name = %name, "direct room created");
            Ok(DirectRoom::Created(room))
        }
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            // Lost the creation race; the winner's room is committed now.
            tracing::debug!(name = %name, "direct room creation raced, re-querying");
            db::find_direct_room(pool, user_a, user_b, &name)
                .await?
                .map(DirectRoom::Existing)
                .ok_or_else(|| {
                    ApiError::Internal(format!("direct room {name} vanished after unique conflict"))
                })
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn name_sorts_the_pair() {
        assert_eq!(canonical_direct_name(1, 2), "DM_1_2");
        assert_eq!(canonical_direct_name(2, 1), "DM_1_2");
        assert_eq!(canonical_direct_name(100, 7), "DM_7_100");
    }

    #[test]
    fn self_pair_is_invalid() {
        let err = check_pair(5, 5).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert!(check_pair(5, 6).is_ok());
    }
}
