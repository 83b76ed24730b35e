// Arena orchestration: builds the world, wires its channels and spawns its task.

use crate::use_cases::game::world_task;
use crate::use_cases::world::{World, WorldSettings};
use crate::use_cases::{ArenaNotice, GameEvent, WorldUpdate};
use axum::extract::ws::Utf8Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};

/// Runtime configuration for one arena.
#[derive(Debug, Clone)]
pub struct ArenaSettings {
    /// Capacity for inbound player events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast world updates.
    pub world_broadcast_capacity: usize,
    /// Capacity for join/leave notices.
    pub notice_broadcast_capacity: usize,
    /// Fixed tick interval for the game loop.
    pub tick_interval: Duration,
    /// Upper bound on the simulated step after a stall.
    pub max_tick_delta: Duration,
    /// Spawn seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub world: WorldSettings,
}

/// Channels into and out of a running arena.
#[derive(Clone)]
pub struct ArenaHandle {
    /// Sender for game events into the world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    /// Broadcast sender for raw world updates.
    pub world_tx: broadcast::Sender<WorldUpdate>,
    /// Broadcast sender for serialized world updates.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest serialized world update.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
    /// Broadcast sender for roster changes.
    pub notice_tx: broadcast::Sender<ArenaNotice>,
    shutdown: Arc<Notify>,
}

impl ArenaHandle {
    /// Stops the world task after its current tick.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// Populates a world and spawns its tick loop.
pub fn spawn_arena(settings: ArenaSettings) -> ArenaHandle {
    let mut world = match settings.seed {
        Some(seed) => World::new(settings.world.clone(), seed),
        None => World::from_entropy(settings.world.clone()),
    };
    world.populate_bots();

    let (input_tx, input_rx) = mpsc::channel::<GameEvent>(settings.input_channel_capacity);
    let (world_tx, _world_rx) =
        broadcast::channel::<WorldUpdate>(settings.world_broadcast_capacity);
    let (world_bytes_tx, _world_bytes_rx) =
        broadcast::channel::<Utf8Bytes>(settings.world_broadcast_capacity);
    let (world_latest_tx, _world_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
    let (notice_tx, _notice_rx) =
        broadcast::channel::<ArenaNotice>(settings.notice_broadcast_capacity);
    let shutdown = Arc::new(Notify::new());

    tokio::spawn(world_task(
        world,
        input_rx,
        world_tx.clone(),
        notice_tx.clone(),
        settings.tick_interval,
        settings.max_tick_delta,
        shutdown.clone(),
    ));

    ArenaHandle {
        input_tx,
        world_tx,
        world_bytes_tx,
        world_latest_tx,
        notice_tx,
        shutdown,
    }
}
