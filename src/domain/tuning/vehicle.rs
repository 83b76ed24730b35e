use std::ops::Range;

use crate::domain::geometry::Vec3;

/// Physical constants for one vehicle, fixed at spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleTuning {
    /// Forward acceleration applied at full throttle, units/s^2.
    pub acceleration_rate: f32,

    /// Speed cap in units per second.
    pub max_speed: f32,

    /// Yaw rate at full steering, radians per second.
    pub turn_speed: f32,

    /// Rolling friction applied while coasting, per second.
    pub linear_damping: f32,

    /// Fraction of lateral velocity removed each tick (0 = ice, 1 = rails).
    pub grip_factor: f32,
}

impl VehicleTuning {
    /// Tuning for player-driven cars.
    pub fn player() -> Self {
        Self {
            acceleration_rate: 12.0,
            max_speed: 20.0,
            turn_speed: 3.0,
            linear_damping: 2.0,
            grip_factor: 0.7,
        }
    }
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self::player()
    }
}

/// Ranges bots draw their tuning from so the field does not drive in lockstep.
#[derive(Debug, Clone)]
pub struct BotTuningBand {
    pub acceleration_rate: f32,
    pub linear_damping: f32,
    pub max_speed: Range<f32>,
    pub turn_speed: Range<f32>,
    pub grip_factor: Range<f32>,
}

impl Default for BotTuningBand {
    fn default() -> Self {
        Self {
            acceleration_rate: 12.0,
            linear_damping: 2.0,
            max_speed: 15.0..25.0,
            turn_speed: 2.5..3.5,
            grip_factor: 0.5..0.9,
        }
    }
}

/// Half width, half height and half length of a car's collision box.
pub const VEHICLE_HALF_EXTENTS: Vec3 = Vec3::new(0.35, 0.3, 0.75);

/// How far each scoring zone sticks out past the collision box.
pub const ZONE_OVERHANG: f32 = 0.05;
/// Front and rear zone depth as a fraction of the car's length.
pub const END_ZONE_DEPTH_FRACTION: f32 = 0.3;
/// Front and rear zone half width as a fraction of the car's half width. Must
/// stay inside the side zones' inner edge so a square head-on never touches a side.
pub const END_ZONE_WIDTH_FRACTION: f32 = 0.8;
/// Full thickness of the left and right zones.
pub const SIDE_ZONE_THICKNESS: f32 = 0.1;
pub const ZONE_HEIGHT_FRACTION: f32 = 0.9;

/// Seconds the hit flag stays raised after an impact.
pub const HIT_FLASH_SECONDS: f32 = 0.25;
