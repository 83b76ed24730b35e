use std::f32::consts::PI;

/// Steering policy for waypoint-following bots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringTuning {
    /// Heading error (radians) below which the bot stops steering.
    pub turn_threshold: f32,

    /// Share of the bot's turn speed used when steering.
    pub turn_fraction: f32,

    /// Heading error above which a fast bot brakes.
    pub brake_angle: f32,

    /// Share of max speed above which a wide angle triggers braking.
    pub brake_speed_fraction: f32,

    /// Heading error above which the bot only feathers the throttle.
    pub feather_angle: f32,

    /// Throttle shares (of acceleration rate) for brake, feather and cruise.
    pub brake_throttle: f32,
    pub feather_throttle: f32,
    pub cruise_throttle: f32,

    /// Distance under which the bot is considered on top of its target.
    pub arrival_epsilon: f32,

    /// Distance under which the active waypoint counts as reached.
    pub reach_radius: f32,
}

impl Default for SteeringTuning {
    fn default() -> Self {
        Self {
            turn_threshold: 0.15,
            turn_fraction: 0.8,
            brake_angle: PI / 6.0,
            brake_speed_fraction: 0.5,
            feather_angle: PI / 4.0,
            brake_throttle: -0.5,
            feather_throttle: 0.2,
            cruise_throttle: 0.75,
            arrival_epsilon: 0.001,
            reach_radius: 2.5,
        }
    }
}
