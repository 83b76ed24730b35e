// The authoritative world: live vehicles, event application and one simulation step.

use std::f32::consts::PI;
use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use super::types::{ArenaNotice, GameEvent, JoinAccepted, WorldUpdate};
use crate::domain::ai::steer_bot;
use crate::domain::collision::{Impact, resolve_vehicle_contacts, resolve_wall_contacts};
use crate::domain::geometry::obb_intersects;
use crate::domain::tuning::bot::SteeringTuning;
use crate::domain::tuning::collision::CollisionTuning;
use crate::domain::tuning::vehicle::{BotTuningBand, VEHICLE_HALF_EXTENTS, VehicleTuning};
use crate::domain::{
    ArenaLayout, BotBrain, GROUND_HEIGHT, Obb, Pilot, PlayerInput, Vec3, Vehicle, VehicleId,
    VehicleSnapshot,
};

const SPAWN_ATTEMPTS: usize = 16;

/// Rectangle on the floor that spawn candidates are drawn from.
struct SpawnArea {
    x: Range<f32>,
    z: Range<f32>,
}

const PLAYER_SPAWN: SpawnArea = SpawnArea {
    x: -5.0..5.0,
    z: -5.0..5.0,
};

const BOT_SPAWN: SpawnArea = SpawnArea {
    x: -5.0..5.0,
    z: -15.0..8.0,
};

/// Gameplay configuration for one world.
#[derive(Debug, Clone)]
pub struct WorldSettings {
    pub layout: ArenaLayout,
    pub bot_count: usize,
    pub player_tuning: VehicleTuning,
    pub bot_band: BotTuningBand,
    pub steering: SteeringTuning,
    pub collision: CollisionTuning,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            layout: ArenaLayout::standard(),
            bot_count: 10,
            player_tuning: VehicleTuning::player(),
            bot_band: BotTuningBand::default(),
            steering: SteeringTuning::default(),
            collision: CollisionTuning::default(),
        }
    }
}

/// Non-fatal oddities seen while applying events or stepping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnomalyCounters {
    /// Input for a player with no live vehicle.
    pub unknown_input: u64,
    /// Leave for a player with no live vehicle.
    pub unknown_leave: u64,
    /// Join for a player that already has a vehicle.
    pub duplicate_join: u64,
    /// Bot ticks skipped because the waypoint data was unusable.
    pub steer_errors: u64,
}

/// What happened during one `World::step`.
#[derive(Debug, Default)]
pub struct StepReport {
    pub wall_hits: usize,
    pub impacts: Vec<Impact>,
}

pub struct World {
    vehicles: Vec<Vehicle>,
    settings: WorldSettings,
    rng: StdRng,
    tick: u64,
    next_bot: u32,
    anomalies: AnomalyCounters,
}

impl World {
    /// Creates an empty world whose spawns are reproducible from `seed`.
    pub fn new(settings: WorldSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    /// Creates an empty world seeded from the OS.
    pub fn from_entropy(settings: WorldSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    fn with_rng(settings: WorldSettings, rng: StdRng) -> Self {
        Self {
            vehicles: Vec::new(),
            settings,
            rng,
            tick: 0,
            next_bot: 0,
            anomalies: AnomalyCounters::default(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.iter_mut().find(|v| v.id == id)
    }

    pub fn anomalies(&self) -> AnomalyCounters {
        self.anomalies
    }

    /// Places a prepared vehicle as-is, replacing any vehicle with the same id.
    pub fn insert_vehicle(&mut self, vehicle: Vehicle) {
        self.vehicles.retain(|v| v.id != vehicle.id);
        self.vehicles.push(vehicle);
    }

    /// Spawns the configured number of bots.
    pub fn populate_bots(&mut self) {
        for _ in 0..self.settings.bot_count {
            self.spawn_bot();
        }
        info!(bots = self.settings.bot_count, "bots spawned");
    }

    pub fn spawn_bot(&mut self) -> VehicleId {
        let n = self.next_bot;
        self.next_bot += 1;

        let band = &self.settings.bot_band;
        let tuning = VehicleTuning {
            acceleration_rate: band.acceleration_rate,
            linear_damping: band.linear_damping,
            max_speed: self.rng.gen_range(band.max_speed.clone()),
            turn_speed: self.rng.gen_range(band.turn_speed.clone()),
            grip_factor: self.rng.gen_range(band.grip_factor.clone()),
        };
        let waypoints = self.settings.layout.circuit.len();
        let waypoint_index = if waypoints == 0 {
            0
        } else {
            self.rng.gen_range(0..waypoints)
        };

        let (position, heading) = self.find_spawn(&BOT_SPAWN);
        let id = VehicleId::Bot(n);
        self.vehicles.push(Vehicle::new(
            id,
            format!("Bot {n}"),
            position,
            heading,
            tuning,
            Pilot::Bot(BotBrain { waypoint_index }),
        ));
        id
    }

    /// Adds a car for a newly joined player. Returns `None` if the player already has one.
    pub fn join(&mut self, player_id: u64, name: String) -> Option<VehicleSnapshot> {
        let id = VehicleId::Player(player_id);
        if self.vehicle(id).is_some() {
            self.anomalies.duplicate_join += 1;
            warn!(player_id, "join for a player that is already driving");
            return None;
        }

        let (position, heading) = self.find_spawn(&PLAYER_SPAWN);
        let tuning = self.settings.player_tuning;
        let vehicle = Vehicle::new(id, name, position, heading, tuning, Pilot::Player);
        let snapshot = VehicleSnapshot::from(&vehicle);
        self.vehicles.push(vehicle);
        info!(player_id, x = position.x, z = position.z, "player joined");
        Some(snapshot)
    }

    /// Removes a player's car. Unknown ids are counted and otherwise ignored.
    pub fn leave(&mut self, player_id: u64) -> bool {
        let id = VehicleId::Player(player_id);
        let before = self.vehicles.len();
        self.vehicles.retain(|v| v.id != id);
        let removed = self.vehicles.len() != before;
        if removed {
            info!(player_id, "player left");
        } else {
            self.anomalies.unknown_leave += 1;
            debug!(player_id, "leave for unknown player");
        }
        removed
    }

    /// Stores a player's intents for the next step. Unknown ids are counted and dropped.
    pub fn input(&mut self, player_id: u64, input: PlayerInput) -> bool {
        match self.vehicle_mut(VehicleId::Player(player_id)) {
            Some(vehicle) => {
                vehicle.apply_input(input);
                true
            }
            None => {
                self.anomalies.unknown_input += 1;
                debug!(player_id, "input for unknown player dropped");
                false
            }
        }
    }

    /// Applies one queued event. Returns the roster change to announce, if any.
    pub fn apply_event(&mut self, event: GameEvent) -> Option<ArenaNotice> {
        match event {
            GameEvent::Join { player_id, name, reply } => {
                let joined = self.join(player_id, name);
                let accepted = JoinAccepted {
                    player_id: VehicleId::Player(player_id),
                    snapshot: self.snapshot(),
                };
                if reply.send(accepted).is_err() {
                    // The connection went away while queued; its Leave follows.
                    debug!(player_id, "join reply dropped");
                }
                joined.map(ArenaNotice::Joined)
            }
            GameEvent::Leave { player_id } => self.leave(player_id).then_some(ArenaNotice::Left {
                id: VehicleId::Player(player_id),
            }),
            GameEvent::Input { player_id, input } => {
                self.input(player_id, input);
                None
            }
        }
    }

    /// Runs one simulation step: bot AI, integration, hit flash, wall pass, vehicle pass.
    ///
    /// The tick counter always advances; a non-positive `dt` leaves every vehicle untouched.
    pub fn step(&mut self, dt: f32) -> StepReport {
        self.tick += 1;
        if dt <= 0.0 || !dt.is_finite() {
            return StepReport::default();
        }

        let circuit = &self.settings.layout.circuit;
        for vehicle in &mut self.vehicles {
            if let Err(error) = steer_bot(vehicle, circuit, &self.settings.steering) {
                self.anomalies.steer_errors += 1;
                if self.anomalies.steer_errors == 1 {
                    warn!(vehicle_id = %vehicle.id, ?error, "bot steering skipped");
                } else {
                    debug!(vehicle_id = %vehicle.id, ?error, "bot steering skipped");
                }
            }
            vehicle.integrate(dt);
            vehicle.tick_hit_flash(dt);
        }

        let wall_hits = resolve_wall_contacts(
            &mut self.vehicles,
            &self.settings.layout.walls,
            &self.settings.collision,
        );
        let impacts = resolve_vehicle_contacts(&mut self.vehicles, &self.settings.collision);

        for impact in &impacts {
            if let Some(outcome) = impact.outcome {
                debug!(
                    tick = self.tick,
                    first = %impact.first,
                    second = %impact.second,
                    closing_speed = impact.closing_speed,
                    ?outcome,
                    "scoring impact"
                );
            }
        }

        StepReport { wall_hits, impacts }
    }

    pub fn snapshot(&self) -> WorldUpdate {
        WorldUpdate {
            tick: self.tick,
            vehicles: self.vehicles.iter().map(VehicleSnapshot::from).collect(),
        }
    }

    /// Draws up to `SPAWN_ATTEMPTS` candidates and returns the first one clear of
    /// walls and cars, or the last one drawn.
    fn find_spawn(&mut self, area: &SpawnArea) -> (Vec3, f32) {
        let heading = self.rng.gen_range(-PI..PI);
        let mut candidate = Vec3::new(0.0, GROUND_HEIGHT, 0.0);

        for _ in 0..SPAWN_ATTEMPTS {
            candidate = Vec3::new(
                self.rng.gen_range(area.x.clone()),
                GROUND_HEIGHT,
                self.rng.gen_range(area.z.clone()),
            );
            let footprint = Obb::new(candidate, VEHICLE_HALF_EXTENTS, heading);
            let walls = &self.settings.layout.walls;
            let hits_wall = walls.iter().any(|w| obb_intersects(&footprint, &w.obb()));
            let hits_car = self.vehicles.iter().any(|v| obb_intersects(&footprint, &v.obb()));
            if !hits_wall && !hits_car {
                return (candidate, heading);
            }
        }

        debug!(x = candidate.x, z = candidate.z, "no clear spawn found; using last candidate");
        (candidate, heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WaypointCircuit;
    use tokio::sync::oneshot;

    fn empty_settings() -> WorldSettings {
        WorldSettings {
            bot_count: 0,
            ..WorldSettings::default()
        }
    }

    #[test]
    fn when_bots_are_populated_then_each_is_inside_its_band() {
        let mut world = World::new(WorldSettings::default(), 7);
        world.populate_bots();

        assert_eq!(world.vehicles().len(), 10);
        for (n, bot) in world.vehicles().iter().enumerate() {
            assert_eq!(bot.id, VehicleId::Bot(n as u32));
            assert_eq!(bot.id.to_string(), format!("bot-{n}"));
            assert_eq!(bot.name, format!("Bot {n}"));
            assert!(bot.is_bot());
            assert!((15.0..25.0).contains(&bot.tuning.max_speed));
            assert!((2.5..3.5).contains(&bot.tuning.turn_speed));
            assert!((0.5..0.9).contains(&bot.tuning.grip_factor));
            assert_eq!(bot.position.y, GROUND_HEIGHT);
        }
    }

    #[test]
    fn when_same_seed_is_used_then_spawns_match() {
        let mut a = World::new(WorldSettings::default(), 42);
        let mut b = World::new(WorldSettings::default(), 42);
        a.populate_bots();
        b.populate_bots();
        let positions = |w: &World| {
            w.vehicles().iter().map(|v| (v.position, v.heading)).collect::<Vec<_>>()
        };
        assert_eq!(positions(&a), positions(&b));
    }

    #[test]
    fn when_player_joins_then_car_spawns_near_the_centre() {
        let mut world = World::new(empty_settings(), 1);
        let snapshot = world.join(5, "Ada".to_string()).expect("new player");

        assert_eq!(snapshot.id, VehicleId::Player(5));
        assert!(!snapshot.is_bot);
        assert!(snapshot.position.x.abs() <= 5.0 && snapshot.position.z.abs() <= 5.0);
        assert!(world.join(5, "Ada".to_string()).is_none());
        assert_eq!(world.anomalies().duplicate_join, 1);
    }

    #[test]
    fn when_unknown_player_sends_input_or_leaves_then_it_is_counted() {
        let mut world = World::new(empty_settings(), 1);
        assert!(!world.input(99, PlayerInput::default()));
        assert!(!world.leave(99));
        let anomalies = world.anomalies();
        assert_eq!((anomalies.unknown_input, anomalies.unknown_leave), (1, 1));
    }

    #[test]
    fn when_join_event_is_applied_then_reply_holds_id_and_snapshot() {
        let mut world = World::new(WorldSettings::default(), 3);
        world.populate_bots();
        let (reply, mut reply_rx) = oneshot::channel();

        let notice = world.apply_event(GameEvent::Join {
            player_id: 11,
            name: "Grace".to_string(),
            reply,
        });

        let accepted = reply_rx.try_recv().expect("reply sent");
        assert_eq!(accepted.player_id, VehicleId::Player(11));
        assert_eq!(accepted.snapshot.vehicles.len(), 11);
        assert!(matches!(notice, Some(ArenaNotice::Joined(s)) if s.name == "Grace"));
    }

    #[test]
    fn when_leave_event_is_applied_then_vehicle_is_gone_and_notice_names_it() {
        let mut world = World::new(empty_settings(), 3);
        world.join(4, "Lin".to_string());
        let notice = world.apply_event(GameEvent::Leave { player_id: 4 });
        assert!(matches!(notice, Some(ArenaNotice::Left { id }) if id == VehicleId::Player(4)));
        assert!(world.vehicles().is_empty());
        assert!(world.apply_event(GameEvent::Leave { player_id: 4 }).is_none());
    }

    #[test]
    fn when_input_event_is_applied_then_next_step_moves_the_car() {
        let mut world = World::new(empty_settings(), 9);
        world.join(1, "Ada".to_string());
        let start = world.vehicles()[0].position;

        world.apply_event(GameEvent::Input {
            player_id: 1,
            input: PlayerInput {
                up: true,
                ..Default::default()
            },
        });
        for _ in 0..10 {
            world.step(1.0 / 30.0);
        }

        let moved = world.vehicles()[0].position - start;
        assert!(moved.planar_length() > 0.0);
    }

    #[test]
    fn when_world_steps_then_every_car_stays_on_the_ground() {
        let mut world = World::new(WorldSettings::default(), 5);
        world.populate_bots();
        for _ in 0..300 {
            world.step(1.0 / 30.0);
            for v in world.vehicles() {
                assert_eq!(v.position.y, GROUND_HEIGHT);
                assert_eq!(v.velocity.y, 0.0);
                assert!(v.heading > -PI && v.heading <= PI);
            }
        }
        assert_eq!(world.tick(), 300);
        assert_eq!(world.anomalies().steer_errors, 0);
    }

    #[test]
    fn when_dt_is_zero_then_only_the_tick_advances() {
        let mut world = World::new(WorldSettings::default(), 5);
        world.populate_bots();
        let before = world.snapshot();
        world.step(0.0);
        let after = world.snapshot();
        assert_eq!(after.tick, before.tick + 1);
        assert_eq!(after.vehicles, before.vehicles);
    }

    #[test]
    fn when_circuit_is_missing_then_bots_freeze_and_errors_are_counted() {
        let settings = WorldSettings {
            layout: ArenaLayout::open(WaypointCircuit::default()),
            bot_count: 2,
            ..WorldSettings::default()
        };
        let mut world = World::new(settings, 5);
        world.populate_bots();
        world.step(1.0 / 30.0);
        assert_eq!(world.anomalies().steer_errors, 2);
        assert!(world.vehicles().iter().all(|v| v.acceleration_intent == 0.0));
    }

    #[test]
    fn when_area_is_crowded_then_spawns_avoid_existing_cars() {
        let mut world = World::new(empty_settings(), 21);
        for id in 0..6 {
            world.join(id, format!("P{id}"));
        }
        let cars = world.vehicles();
        let overlapping = (0..cars.len())
            .flat_map(|i| (i + 1..cars.len()).map(move |j| (i, j)))
            .filter(|&(i, j)| obb_intersects(&cars[i].obb(), &cars[j].obb()))
            .count();
        assert_eq!(overlapping, 0);
    }
}
