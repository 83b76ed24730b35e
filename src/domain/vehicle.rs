// Vehicle record and the planar car integrator.

use std::fmt;

use super::arena::GROUND_HEIGHT;
use super::geometry::{Obb, Vec3, forward_from_heading, wrap_angle};
use super::state::PlayerInput;
use super::tuning::vehicle::{
    END_ZONE_DEPTH_FRACTION, END_ZONE_WIDTH_FRACTION, HIT_FLASH_SECONDS, SIDE_ZONE_THICKNESS,
    VEHICLE_HALF_EXTENTS, VehicleTuning, ZONE_HEIGHT_FRACTION, ZONE_OVERHANG,
};

/// Throttle magnitude below which the car is considered coasting.
const COAST_THRESHOLD: f32 = 0.01;
/// Squared speed below which a coasting car snaps to rest.
const STOP_SPEED_SQ: f32 = 0.001;

/// Stable identity of a vehicle: the owning connection or a bot slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleId {
    Player(u64),
    Bot(u32),
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleId::Player(id) => write!(f, "{id}"),
            VehicleId::Bot(n) => write!(f, "bot-{n}"),
        }
    }
}

/// Bot-only controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotBrain {
    /// Index of the waypoint the bot is currently seeking.
    pub waypoint_index: usize,
}

/// Who produces this vehicle's intents each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pilot {
    Player,
    Bot(BotBrain),
}

/// Named sub-regions of a car used to classify impacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Front,
    Rear,
    Left,
    Right,
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::Front, Zone::Rear, Zone::Left, Zone::Right];

    pub fn is_side(self) -> bool {
        matches!(self, Zone::Left | Zone::Right)
    }

    /// Zone center and half extents in the car's frame, derived from the body box.
    ///
    /// +X is the car's left since forward is +Z. Every zone pokes out past the
    /// body by `ZONE_OVERHANG`, so any body contact also reaches a zone.
    fn local_box(self, body: Vec3) -> (Vec3, Vec3) {
        let height = body.y * ZONE_HEIGHT_FRACTION;
        let depth = body.z * 2.0 * END_ZONE_DEPTH_FRACTION;
        let end_center = body.z + ZONE_OVERHANG - depth / 2.0;
        let side_center = body.x + ZONE_OVERHANG - SIDE_ZONE_THICKNESS / 2.0;

        let end_half = Vec3::new(body.x * END_ZONE_WIDTH_FRACTION, height, depth / 2.0);
        // Sides run between the end zones without overlapping them.
        let side_half = Vec3::new(
            SIDE_ZONE_THICKNESS / 2.0,
            height,
            body.z + ZONE_OVERHANG - depth,
        );

        match self {
            Zone::Front => (Vec3::new(0.0, 0.0, end_center), end_half),
            Zone::Rear => (Vec3::new(0.0, 0.0, -end_center), end_half),
            Zone::Left => (Vec3::new(side_center, 0.0, 0.0), side_half),
            Zone::Right => (Vec3::new(-side_center, 0.0, 0.0), side_half),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub position: Vec3,
    /// Yaw in radians, kept in (-PI, PI].
    pub heading: f32,
    /// Planar velocity; `y` is always zero after integration.
    pub velocity: Vec3,
    pub acceleration_intent: f32,
    pub turn_intent: f32,
    pub tuning: VehicleTuning,
    pub half_extents: Vec3,
    pub is_hit: bool,
    pub hit_timer: f32,
    pub pilot: Pilot,
    score: u32,
}

impl Vehicle {
    pub fn new(
        id: VehicleId,
        name: String,
        position: Vec3,
        heading: f32,
        tuning: VehicleTuning,
        pilot: Pilot,
    ) -> Self {
        Self {
            id,
            name,
            position: position.with_y(GROUND_HEIGHT),
            heading: wrap_angle(heading),
            velocity: Vec3::ZERO,
            acceleration_intent: 0.0,
            turn_intent: 0.0,
            tuning,
            half_extents: VEHICLE_HALF_EXTENTS,
            is_hit: false,
            hit_timer: 0.0,
            pilot,
            score: 0,
        }
    }

    pub fn is_bot(&self) -> bool {
        matches!(self.pilot, Pilot::Bot(_))
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn award(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    /// Removes points without ever dropping below zero.
    pub fn penalize(&mut self, points: u32) {
        self.score = self.score.saturating_sub(points);
    }

    pub fn trigger_hit(&mut self) {
        self.is_hit = true;
        self.hit_timer = HIT_FLASH_SECONDS;
    }

    /// Counts down the hit flag; clears it once the timer runs out.
    pub fn tick_hit_flash(&mut self, dt: f32) {
        if !self.is_hit || dt <= 0.0 {
            return;
        }
        self.hit_timer -= dt;
        if self.hit_timer <= 0.0 {
            self.is_hit = false;
            self.hit_timer = 0.0;
        }
    }

    /// Translates a four-direction input into intents consumed next tick.
    pub fn apply_input(&mut self, input: PlayerInput) {
        self.acceleration_intent = input.throttle_axis() * self.tuning.acceleration_rate;
        self.turn_intent = input.steer_axis() * self.tuning.turn_speed;
    }

    pub fn forward(&self) -> Vec3 {
        forward_from_heading(self.heading)
    }

    pub fn speed(&self) -> f32 {
        self.velocity.planar_length()
    }

    pub fn obb(&self) -> Obb {
        Obb::new(self.position, self.half_extents, self.heading)
    }

    pub fn zone_obb(&self, zone: Zone) -> Obb {
        let (offset, half) = zone.local_box(self.half_extents);
        self.obb().child(offset, half)
    }

    /// Advances the car by `dt` seconds. Non-positive `dt` is a no-op.
    ///
    /// The step order matters for handling: steer, bleed lateral velocity by
    /// grip, throttle, coast friction, rest snap, speed cap, then move.
    pub fn integrate(&mut self, dt: f32) {
        if dt <= 0.0 || !dt.is_finite() {
            return;
        }

        self.heading = wrap_angle(self.heading + self.turn_intent * dt);
        let forward = self.forward();

        let longitudinal = forward * self.velocity.dot(forward);
        let lateral = self.velocity - longitudinal;
        self.velocity = longitudinal + lateral * (1.0 - self.tuning.grip_factor);

        self.velocity += forward * (self.acceleration_intent * dt);
        self.velocity.y = 0.0;

        if self.acceleration_intent.abs() < COAST_THRESHOLD {
            let damping = (1.0 - self.tuning.linear_damping * dt).max(0.0);
            self.velocity = self.velocity * damping;
        }

        let speed_sq = self.velocity.length_sq();
        if speed_sq < STOP_SPEED_SQ {
            self.velocity = Vec3::ZERO;
        } else if speed_sq > self.tuning.max_speed * self.tuning.max_speed {
            self.velocity = self.velocity * (self.tuning.max_speed / speed_sq.sqrt());
        }

        self.position += self.velocity * dt;
        self.position.y = GROUND_HEIGHT;
    }
}
