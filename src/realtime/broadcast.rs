//! Per-room broadcast channels.
//!
//! Each room gets its own `tokio::sync::broadcast` channel so fan-out in one
//! room never crosses into another. Payloads are pre-serialized JSON strings:
//! serialization happens once, at publish time, on plain data — subscriber
//! tasks only forward bytes.
//!
//! Delivery is best-effort and at-most-once per live subscriber. A session
//! that is not subscribed at publish time never sees the message through
//! this path; it catches up through the history endpoint instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

/// Capacity of each room channel. A receiver that falls this far behind
/// starts losing messages (`RecvError::Lagged`).
const CHANNEL_CAPACITY: usize = 256;

/// Registry mapping room ids to live broadcast channels.
#[derive(Clone, Default)]
pub struct RoomChannels {
    channels: Arc<Mutex<HashMap<i64, broadcast::Sender<String>>>>,
}

impl RoomChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a room's channel, creating the channel if this is the
    /// room's first live session.
    pub fn subscribe(&self, room_id: i64) -> broadcast::Receiver<String> {
        let mut channels = self.channels.lock().expect("room channel registry poisoned");
        channels
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Deliver a serialized payload to every live subscriber of the room.
    /// Returns the number of sessions that received it.
    pub fn publish(&self, room_id: i64, payload: String) -> usize {
        let channels = self.channels.lock().expect("room channel registry poisoned");
        match channels.get(&room_id) {
            Some(sender) => sender.send(payload).unwrap_or(0),
            None => 0,
        }
    }

    /// Number of live subscribers for a room.
    pub fn receiver_count(&self, room_id: i64) -> usize {
        let channels = self.channels.lock().expect("room channel registry poisoned");
        channels.get(&room_id).map_or(0, |s| s.receiver_count())
    }

    /// Drop channels with no live subscribers. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let mut channels = self.channels.lock().expect("room channel registry poisoned");
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }
}
