// Waypoint-seeking controller for server bots.
//
// A bot has a single state, seeking the circuit waypoint at its current index.
// Each tick it turns toward that waypoint, picks a throttle from how far off
// its nose is, and moves on to the next index once close enough.

use super::arena::WaypointCircuit;
use super::geometry::Vec3;
use super::tuning::bot::SteeringTuning;
use super::vehicle::{Pilot, Vehicle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SteerError {
    EmptyCircuit,
    WaypointOutOfRange { index: usize, len: usize },
}

/// Signed angle from `forward` to `target_dir` around +Y, both planar unit vectors.
/// Positive means the target lies to the left (a positive turn intent).
pub fn signed_angle_to(forward: Vec3, target_dir: Vec3) -> f32 {
    let cos = forward.dot(target_dir).clamp(-1.0, 1.0);
    let angle = cos.acos();
    if forward.cross(target_dir).y < 0.0 {
        -angle
    } else {
        angle
    }
}

/// Sets the bot's intents for this tick and advances its waypoint when reached.
///
/// Player-driven vehicles are left untouched. On error the bot's intents and
/// waypoint index are left as they were.
pub fn steer_bot(
    bot: &mut Vehicle,
    circuit: &WaypointCircuit,
    tuning: &SteeringTuning,
) -> Result<(), SteerError> {
    let Pilot::Bot(mut brain) = bot.pilot else {
        return Ok(());
    };

    if circuit.is_empty() {
        return Err(SteerError::EmptyCircuit);
    }
    let target = circuit.get(brain.waypoint_index).ok_or(SteerError::WaypointOutOfRange {
        index: brain.waypoint_index,
        len: circuit.len(),
    })?;

    let to_target = Vec3::planar(target.x - bot.position.x, target.z - bot.position.z);
    let distance = to_target.planar_length();

    if distance > tuning.arrival_epsilon {
        let direction = to_target * (1.0 / distance);
        let angle = signed_angle_to(bot.forward(), direction);
        let off_nose = angle.abs();

        bot.turn_intent = if off_nose > tuning.turn_threshold {
            angle.signum() * bot.tuning.turn_speed * tuning.turn_fraction
        } else {
            0.0
        };

        let rate = bot.tuning.acceleration_rate;
        let fast = bot.speed() > bot.tuning.max_speed * tuning.brake_speed_fraction;
        bot.acceleration_intent = if off_nose > tuning.brake_angle && fast {
            rate * tuning.brake_throttle
        } else if off_nose > tuning.feather_angle {
            rate * tuning.feather_throttle
        } else {
            rate * tuning.cruise_throttle
        };
    } else {
        bot.acceleration_intent = 0.0;
        bot.turn_intent = 0.0;
    }

    if distance < tuning.reach_radius {
        brain.waypoint_index = circuit.next_index(brain.waypoint_index);
        bot.pilot = Pilot::Bot(brain);
    }

    Ok(())
}
