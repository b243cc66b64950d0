//! Real-time delivery: the per-room broadcast channel registry.

pub mod broadcast;
