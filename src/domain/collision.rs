// Collision response: cars against walls, then cars against each other.
//
// Both passes use the SAT predicate for detection. Wall contacts are resolved
// first so a car pinned against a wall has settled before car impulses run.

use super::arena::{GROUND_HEIGHT, Wall};
use super::geometry::{Obb, Vec3, obb_intersects};
use super::tuning::collision::CollisionTuning;
use super::vehicle::{Vehicle, VehicleId, Zone};

/// Center distance (squared) below which two cars share a position.
const COINCIDENT_SQ: f32 = 1e-12;

/// Scoring result of a car-to-car impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOutcome {
    /// Front into rear: attacker +3, victim -1.
    RearHit { attacker: VehicleId, victim: VehicleId },
    /// Front into side: attacker +2.
    SideHit { attacker: VehicleId, victim: VehicleId },
    /// Front into front: both +1.
    HeadOn,
}

/// One resolved car-to-car contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub first: VehicleId,
    pub second: VehicleId,
    /// Closing speed along the contact normal before the impulse.
    pub closing_speed: f32,
    pub outcome: Option<ScoreOutcome>,
}

/// Resolves every car against every wall. Returns the number of wall hits.
pub fn resolve_wall_contacts(
    vehicles: &mut [Vehicle],
    walls: &[Wall],
    tuning: &CollisionTuning,
) -> usize {
    let mut hits = 0;
    for vehicle in vehicles.iter_mut() {
        for wall in walls {
            if obb_intersects(&vehicle.obb(), &wall.obb()) {
                resolve_wall_contact(vehicle, wall, tuning);
                hits += 1;
            }
        }
    }
    hits
}

/// Bounces a car off an overlapping wall, pushes it clear, and applies the
/// wall penalty.
pub fn resolve_wall_contact(vehicle: &mut Vehicle, wall: &Wall, tuning: &CollisionTuning) {
    let normal = wall_normal(vehicle.position, wall);

    let v_dot_n = vehicle.velocity.dot(normal);
    if v_dot_n < 0.0 {
        vehicle.velocity -= normal * ((1.0 + tuning.wall_restitution) * v_dot_n);
        vehicle.velocity.y = 0.0;
    }

    let car = vehicle.obb().project(normal);
    let solid = wall.obb().project(normal);
    let overlap = solid.max - car.min;
    if overlap > tuning.wall_push_epsilon {
        vehicle.position += normal * (overlap + tuning.wall_push_buffer);
    }
    vehicle.position.y = GROUND_HEIGHT;

    vehicle.penalize(1);
    vehicle.trigger_hit();
}

/// Picks the wall face the car is against: the horizontal wall axis on which the
/// car's offset is largest relative to the wall's half extent.
fn wall_normal(position: Vec3, wall: &Wall) -> Vec3 {
    let offset = position - wall.position;
    let along_x = offset.x.abs() / wall.half_extents.x.max(f32::EPSILON);
    let along_z = offset.z.abs() / wall.half_extents.z.max(f32::EPSILON);

    let sign = |v: f32| if v < 0.0 { -1.0 } else { 1.0 };
    if along_x > along_z {
        Vec3::X * sign(offset.x)
    } else {
        Vec3::Z * sign(offset.z)
    }
}

/// Resolves each unordered pair of overlapping cars once, visiting (i, j) with
/// `i < j` in row order: (0,1), (0,2), .., (1,2), ..
pub fn resolve_vehicle_contacts(vehicles: &mut [Vehicle], tuning: &CollisionTuning) -> Vec<Impact> {
    let mut impacts = Vec::new();
    for i in 0..vehicles.len() {
        let (head, tail) = vehicles.split_at_mut(i + 1);
        let a = &mut head[i];
        for b in tail.iter_mut() {
            if !obb_intersects(&a.obb(), &b.obb()) {
                continue;
            }
            if let Some(impact) = resolve_vehicle_pair(a, b, tuning) {
                impacts.push(impact);
            }
        }
    }
    impacts
}

/// Applies an equal-mass impulse, partial de-penetration and zone scoring to
/// two overlapping cars. Returns `None` when they are already separating.
pub fn resolve_vehicle_pair(
    a: &mut Vehicle,
    b: &mut Vehicle,
    tuning: &CollisionTuning,
) -> Option<Impact> {
    let between = Vec3::planar(b.position.x - a.position.x, b.position.z - a.position.z);
    let distance = between.planar_length();
    let normal = between.try_normalize(COINCIDENT_SQ).unwrap_or(Vec3::X);

    let closing = (b.velocity - a.velocity).dot(normal);
    if closing > 0.0 {
        return None;
    }

    let impulse = -(1.0 + tuning.vehicle_restitution) * closing / 2.0;
    a.velocity -= normal * impulse;
    b.velocity += normal * impulse;
    a.velocity.y = 0.0;
    b.velocity.y = 0.0;

    // Overlap is estimated from half lengths only, whatever the contact angle.
    let penetration = (a.half_extents.z + b.half_extents.z) - distance;
    if penetration > tuning.vehicle_correction_threshold {
        let correction = normal * (penetration * tuning.vehicle_correction_factor * 0.5);
        a.position -= correction;
        b.position += correction;
        a.position.y = GROUND_HEIGHT;
        b.position.y = GROUND_HEIGHT;
    }

    let outcome = score_zone_contact(a, b);
    a.trigger_hit();
    b.trigger_hit();

    Some(Impact {
        first: a.id,
        second: b.id,
        closing_speed: -closing,
        outcome,
    })
}

/// Classifies an impact by which zones touch and applies the score change.
///
/// Rules are tried in priority order and only the first match is applied:
/// a's front into b's rear, a's front into b's side, the same two with the
/// roles swapped, then front into front.
pub fn score_zone_contact(a: &mut Vehicle, b: &mut Vehicle) -> Option<ScoreOutcome> {
    let za = Zone::ALL.map(|z| a.zone_obb(z));
    let zb = Zone::ALL.map(|z| b.zone_obb(z));
    let touch = |x: &[Obb; 4], zx: Zone, y: &[Obb; 4], zy: Zone| {
        obb_intersects(&x[zx as usize], &y[zy as usize])
    };
    let hits_side = |x: &[Obb; 4], y: &[Obb; 4]| {
        Zone::ALL.into_iter().filter(|z| z.is_side()).any(|side| touch(x, Zone::Front, y, side))
    };

    if touch(&za, Zone::Front, &zb, Zone::Rear) {
        a.award(3);
        b.penalize(1);
        return Some(ScoreOutcome::RearHit { attacker: a.id, victim: b.id });
    }
    if hits_side(&za, &zb) {
        a.award(2);
        return Some(ScoreOutcome::SideHit { attacker: a.id, victim: b.id });
    }
    if touch(&zb, Zone::Front, &za, Zone::Rear) {
        b.award(3);
        a.penalize(1);
        return Some(ScoreOutcome::RearHit { attacker: b.id, victim: a.id });
    }
    if hits_side(&zb, &za) {
        b.award(2);
        return Some(ScoreOutcome::SideHit { attacker: b.id, victim: a.id });
    }
    if touch(&za, Zone::Front, &zb, Zone::Front) {
        a.award(1);
        b.award(1);
        return Some(ScoreOutcome::HeadOn);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tuning::vehicle::VehicleTuning;
    use crate::domain::vehicle::Pilot;
    use assert_approx_eq::assert_approx_eq;
    use std::f32::consts::PI;

    fn car(id: u64, x: f32, z: f32, heading: f32) -> Vehicle {
        Vehicle::new(
            VehicleId::Player(id),
            format!("Car {id}"),
            Vec3::new(x, GROUND_HEIGHT, z),
            heading,
            VehicleTuning::player(),
            Pilot::Player,
        )
    }

    #[test]
    fn when_cars_meet_head_on_then_normal_velocity_reverses_by_restitution() {
        let mut a = car(1, 0.0, -0.7, 0.0);
        let mut b = car(2, 0.0, 0.7, PI);
        a.velocity = Vec3::planar(0.0, 10.0);
        b.velocity = Vec3::planar(0.0, -10.0);
        let normal = Vec3::Z;
        let before = (b.velocity - a.velocity).dot(normal);

        let impact =
            resolve_vehicle_pair(&mut a, &mut b, &CollisionTuning::default()).expect("approaching");

        let after = (b.velocity - a.velocity).dot(normal);
        assert_approx_eq!(after, -0.7 * before, 1e-4);
        assert_approx_eq!(impact.closing_speed, 20.0, 1e-4);
        assert_eq!(a.velocity.y, 0.0);
        assert_eq!(b.velocity.y, 0.0);
    }

    #[test]
    fn when_cars_are_separating_then_contact_is_skipped() {
        let mut a = car(1, 0.0, -0.7, 0.0);
        let mut b = car(2, 0.0, 0.7, 0.0);
        a.velocity = Vec3::planar(0.0, -3.0);
        b.velocity = Vec3::planar(0.0, 3.0);

        assert!(resolve_vehicle_pair(&mut a, &mut b, &CollisionTuning::default()).is_none());
        assert_eq!(a.velocity, Vec3::planar(0.0, -3.0));
        assert!(!a.is_hit && !b.is_hit);
    }

    #[test]
    fn when_overlap_is_deep_then_cars_are_pushed_apart() {
        let mut a = car(1, 0.0, -0.4, 0.0);
        let mut b = car(2, 0.0, 0.4, 0.0);
        resolve_vehicle_pair(&mut a, &mut b, &CollisionTuning::default()).expect("resting contact");
        // 0.7 estimated overlap, 30% corrected, split evenly.
        assert_approx_eq!(b.position.z - a.position.z, 0.8 + 0.7 * 0.3, 1e-5);
        assert_eq!(a.position.y, GROUND_HEIGHT);
    }

    #[test]
    fn when_front_touches_both_rear_and_side_then_only_rear_hit_scores() {
        let mut attacker = car(1, 0.35, -1.0, 0.0);
        let mut victim = car(2, 0.0, 0.0, 0.0);
        victim.award(5);
        assert!(obb_intersects(&attacker.zone_obb(Zone::Front), &victim.zone_obb(Zone::Rear)));
        assert!(obb_intersects(&attacker.zone_obb(Zone::Front), &victim.zone_obb(Zone::Left)));

        let outcome = score_zone_contact(&mut attacker, &mut victim);

        assert_eq!(
            outcome,
            Some(ScoreOutcome::RearHit {
                attacker: attacker.id,
                victim: victim.id
            })
        );
        assert_eq!(attacker.score(), 3);
        assert_eq!(victim.score(), 4);
    }

    #[test]
    fn when_victim_rams_from_behind_then_roles_are_swapped() {
        let mut a = car(1, 0.0, 0.0, 0.0);
        let mut b = car(2, 0.0, -1.0, 0.0);
        let outcome = score_zone_contact(&mut a, &mut b);
        assert_eq!(outcome, Some(ScoreOutcome::RearHit { attacker: b.id, victim: a.id }));
        assert_eq!(b.score(), 3);
        assert_eq!(a.score(), 0);
    }

    #[test]
    fn when_front_hits_a_side_then_attacker_scores_two() {
        let mut attacker = car(1, 0.95, 0.1, -PI / 2.0);
        let mut victim = car(2, 0.0, 0.0, 0.0);
        let outcome = score_zone_contact(&mut attacker, &mut victim);
        assert_eq!(
            outcome,
            Some(ScoreOutcome::SideHit {
                attacker: attacker.id,
                victim: victim.id
            })
        );
        assert_eq!(attacker.score(), 2);
        assert_eq!(victim.score(), 0);
    }

    #[test]
    fn when_fronts_meet_then_both_score_one() {
        let mut a = car(1, 0.0, -0.55, 0.0);
        let mut b = car(2, 0.0, 0.55, PI);
        assert_eq!(score_zone_contact(&mut a, &mut b), Some(ScoreOutcome::HeadOn));
        assert_eq!((a.score(), b.score()), (1, 1));
    }

    #[test]
    fn when_car_drives_into_wall_then_it_bounces_and_is_pushed_clear() {
        let wall = Wall {
            position: Vec3::new(0.0, 0.5, 5.0),
            half_extents: Vec3::new(5.0, 0.5, 0.25),
        };
        let mut v = car(1, 0.0, 4.2, 0.0);
        v.velocity = Vec3::planar(0.0, 8.0);

        let tuning = CollisionTuning::default();
        let hits = resolve_wall_contacts(std::slice::from_mut(&mut v), &[wall], &tuning);

        assert_eq!(hits, 1);
        assert_approx_eq!(v.velocity.z, -3.2, 1e-4);
        assert!(!obb_intersects(&v.obb(), &wall.obb()));
        assert_eq!(v.position.y, GROUND_HEIGHT);
        assert_eq!(v.score(), 0);
        assert!(v.is_hit);
    }

    #[test]
    fn when_wall_hits_repeat_then_score_only_drops_to_zero() {
        let wall = Wall {
            position: Vec3::new(0.0, 0.5, 0.0),
            half_extents: Vec3::new(0.25, 0.5, 5.0),
        };
        let mut v = car(1, -0.4, 0.0, 0.0);
        v.award(2);
        for _ in 0..4 {
            resolve_wall_contact(&mut v, &wall, &CollisionTuning::default());
        }
        assert_eq!(v.score(), 0);
    }

    #[test]
    fn when_moving_away_from_wall_then_velocity_is_kept() {
        let wall = Wall {
            position: Vec3::new(0.0, 0.5, 0.0),
            half_extents: Vec3::new(0.25, 0.5, 5.0),
        };
        let mut v = car(1, -0.5, 0.0, 0.0);
        v.velocity = Vec3::planar(-2.0, 0.0);
        resolve_wall_contact(&mut v, &wall, &CollisionTuning::default());
        assert_eq!(v.velocity, Vec3::planar(-2.0, 0.0));
    }

    #[test]
    fn when_three_cars_and_one_overlapping_pair_then_one_impact() {
        let mut cars = vec![car(1, 0.0, -0.7, 0.0), car(2, 10.0, 0.0, 0.0), car(3, 0.0, 0.7, PI)];
        cars[0].velocity = Vec3::planar(0.0, 4.0);
        let impacts = resolve_vehicle_contacts(&mut cars, &CollisionTuning::default());
        assert_eq!(impacts.len(), 1);
        assert_eq!(impacts[0].first, cars[0].id);
        assert_eq!(impacts[0].second, cars[2].id);
        assert!(!cars[1].is_hit);
    }

    #[test]
    fn when_four_cars_overlap_then_pairs_resolve_row_by_row() {
        let mut cars: Vec<Vehicle> = (0..4).map(|n| car(n, n as f32 * 0.05, 0.0, 0.0)).collect();
        let tuning = CollisionTuning {
            vehicle_correction_factor: 0.0,
            ..CollisionTuning::default()
        };

        let impacts = resolve_vehicle_contacts(&mut cars, &tuning);

        let order: Vec<(VehicleId, VehicleId)> =
            impacts.iter().map(|impact| (impact.first, impact.second)).collect();
        let id = |n: u64| VehicleId::Player(n);
        assert_eq!(
            order,
            vec![
                (id(0), id(1)),
                (id(0), id(2)),
                (id(0), id(3)),
                (id(1), id(2)),
                (id(1), id(3)),
                (id(2), id(3)),
            ]
        );
    }
}
