//! Server configuration, shared state, and application assembly.

pub mod config;
pub mod init;
pub mod state;
