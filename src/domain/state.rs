// Domain-level input and snapshot value types.

use super::geometry::Vec3;
use super::vehicle::{Vehicle, VehicleId};

/// Four-direction input sampled by a client for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl PlayerInput {
    /// Throttle axis in [-1, 1]: up wins over down.
    pub fn throttle_axis(self) -> f32 {
        if self.up {
            1.0
        } else if self.down {
            -1.0
        } else {
            0.0
        }
    }

    /// Steering axis in [-1, 1]: left (positive yaw) wins over right.
    pub fn steer_axis(self) -> f32 {
        if self.left {
            1.0
        } else if self.right {
            -1.0
        } else {
            0.0
        }
    }
}

/// Projection of a vehicle that remote observers need each tick.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub name: String,
    pub position: Vec3,
    pub heading: f32,
    pub score: u32,
    pub is_hit: bool,
    pub is_bot: bool,
}

impl From<&Vehicle> for VehicleSnapshot {
    fn from(v: &Vehicle) -> Self {
        Self {
            id: v.id,
            name: v.name.clone(),
            position: v.position,
            heading: v.heading,
            score: v.score(),
            is_hit: v.is_hit,
            is_bot: v.is_bot(),
        }
    }
}
