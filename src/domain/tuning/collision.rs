/// Collision response constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionTuning {
    /// Bounciness of car-to-car contacts.
    pub vehicle_restitution: f32,

    /// Estimated overlap below which no positional correction is applied.
    pub vehicle_correction_threshold: f32,

    /// Share of the estimated overlap corrected per contact (0..1).
    pub vehicle_correction_factor: f32,

    /// Bounciness of car-to-wall contacts.
    pub wall_restitution: f32,

    /// Wall overlap below which the car is not pushed out.
    pub wall_push_epsilon: f32,

    /// Extra distance added when pushing a car out of a wall.
    pub wall_push_buffer: f32,
}

impl Default for CollisionTuning {
    fn default() -> Self {
        Self {
            vehicle_restitution: 0.7,
            vehicle_correction_threshold: 0.02,
            vehicle_correction_factor: 0.3,
            wall_restitution: 0.4,
            wall_push_epsilon: 1e-4,
            wall_push_buffer: 0.01,
        }
    }
}
