// Network adapter for client websockets.

pub mod client;

pub use client::{spawn_arena_serializer, ws_handler};
