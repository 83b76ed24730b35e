// Use cases layer: application workflows for the arena server.

pub mod arena;
pub mod game;
pub mod types;
pub mod world;

pub use arena::{ArenaHandle, ArenaSettings, spawn_arena};
pub use types::{ArenaNotice, GameEvent, JoinAccepted, WorldUpdate};
pub use world::{AnomalyCounters, StepReport, World, WorldSettings};
