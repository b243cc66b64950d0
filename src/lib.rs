//! Convene - Real-time Messaging Backend
//!
//! Convene is the messaging core of a social-networking backend: persisted
//! chat rooms, canonical 1:1 direct chats, ordered message history, and
//! WebSocket fan-out to live sessions.
//!
//! # Module Structure
//!
//! - **`server`** - Configuration, shared application state, app assembly
//! - **`routes`** - The HTTP/WebSocket route table
//! - **`auth`** - Users, password hashing, JWT session tokens
//! - **`middleware`** - Bearer-token authentication layer
//! - **`chat`** - Rooms, messages, direct-chat resolution, WebSocket sessions
//! - **`realtime`** - Per-room broadcast channel registry
//! - **`error`** - The API error taxonomy

pub mod auth;
pub mod chat;
pub mod error;
pub mod middleware;
pub mod realtime;
pub mod routes;
pub mod server;
