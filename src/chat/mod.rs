//! The messaging core: rooms, messages, direct-chat resolution, and
//! WebSocket sessions.

pub mod db;
pub mod direct;
pub mod handlers;
pub mod types;
pub mod ws;
