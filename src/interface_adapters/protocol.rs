// Wire protocol DTOs and conversions for public arena server messages.

use crate::domain::{PlayerInput, VehicleSnapshot};
use crate::use_cases::{JoinAccepted, WorldUpdate};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned vehicle id plus the full world, sent once after Join.
    JoinAccepted(JoinAcceptedDto),
    // Snapshot of the world for a given tick.
    WorldUpdate(WorldUpdateDto),
    // Another driver entered the arena.
    PlayerJoined(VehicleStateDto),
    // Another driver left the arena.
    PlayerLeft { player_id: String },
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake message carrying the display name.
    Join(JoinPayload),
    // Input messages sent after a successful Join.
    Input(PlayerInputDto),
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub name: String,
}

/// Four-direction input sampled by the client.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PlayerInputDto {
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
}

impl From<PlayerInputDto> for PlayerInput {
    fn from(input: PlayerInputDto) -> Self {
        Self {
            up: input.up,
            down: input.down,
            left: input.left,
            right: input.right,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinAcceptedDto {
    pub player_id: String,
    pub snapshot: WorldUpdateDto,
}

impl From<JoinAccepted> for JoinAcceptedDto {
    fn from(accepted: JoinAccepted) -> Self {
        Self {
            player_id: accepted.player_id.to_string(),
            snapshot: accepted.snapshot.into(),
        }
    }
}

/// Snapshot of the world sent to clients on each tick.
#[derive(Debug, Clone, Serialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    pub vehicles: Vec<VehicleStateDto>,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            vehicles: update.vehicles.iter().map(VehicleStateDto::from).collect(),
        }
    }
}

/// Flattened vehicle state for wire transmission.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleStateDto {
    pub id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub heading: f32,
    pub score: u32,
    pub is_hit: bool,
    pub is_bot: bool,
}

impl From<&VehicleSnapshot> for VehicleStateDto {
    fn from(vehicle: &VehicleSnapshot) -> Self {
        Self {
            id: vehicle.id.to_string(),
            name: vehicle.name.clone(),
            x: vehicle.position.x,
            y: vehicle.position.y,
            z: vehicle.position.z,
            heading: vehicle.heading,
            score: vehicle.score,
            is_hit: vehicle.is_hit,
            is_bot: vehicle.is_bot,
        }
    }
}
