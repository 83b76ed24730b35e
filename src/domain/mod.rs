// Domain layer: core simulation types and rules.

pub mod ai;
pub mod arena;
pub mod collision;
pub mod geometry;
pub mod state;
pub mod tuning;
pub mod vehicle;

pub use arena::{ArenaLayout, GROUND_HEIGHT, Wall, WaypointCircuit};
pub use geometry::{Obb, Vec3};
pub use state::{PlayerInput, VehicleSnapshot};
pub use vehicle::{BotBrain, Pilot, Vehicle, VehicleId, Zone};
