// Use-case level inputs/outputs for the game loop.

use crate::domain::{PlayerInput, VehicleId, VehicleSnapshot};
use tokio::sync::oneshot;

/// Events queued by connections and drained by the world task at the start of a tick.
#[derive(Debug)]
pub enum GameEvent {
    /// Spawn a car for `player_id`; the world answers on `reply` once it exists.
    Join {
        player_id: u64,
        name: String,
        reply: oneshot::Sender<JoinAccepted>,
    },
    Leave {
        player_id: u64,
    },
    Input {
        player_id: u64,
        input: PlayerInput,
    },
}

/// Everything a newly joined connection needs to start rendering.
#[derive(Debug, Clone)]
pub struct JoinAccepted {
    pub player_id: VehicleId,
    pub snapshot: WorldUpdate,
}

/// Per-tick projection of every live vehicle.
#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub vehicles: Vec<VehicleSnapshot>,
}

/// Roster changes pushed to every connection.
#[derive(Debug, Clone)]
pub enum ArenaNotice {
    Joined(VehicleSnapshot),
    Left { id: VehicleId },
}
