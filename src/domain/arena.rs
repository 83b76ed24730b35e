// Static arena layout: walls, the shared bot circuit, and the ground plane.

use super::geometry::{Obb, Vec3};

/// Height every vehicle centre is pinned to after each tick.
pub const GROUND_HEIGHT: f32 = 0.3;

/// Axis-aligned static obstacle. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub position: Vec3,
    pub half_extents: Vec3,
}

impl Wall {
    /// Builds a wall from full dimensions, matching how the level is authored.
    pub fn from_size(width: f32, height: f32, depth: f32, position: Vec3) -> Self {
        Self {
            position,
            half_extents: Vec3::new(width / 2.0, height / 2.0, depth / 2.0),
        }
    }

    pub fn obb(&self) -> Obb {
        Obb::axis_aligned(self.position, self.half_extents)
    }
}

/// Ordered, cyclic list of positions shared by every bot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointCircuit {
    points: Vec<Vec3>,
}

impl WaypointCircuit {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Vec3> {
        self.points.get(index).copied()
    }

    /// Index after `index`, wrapping around. Returns 0 for an empty circuit.
    pub fn next_index(&self, index: usize) -> usize {
        if self.points.is_empty() {
            0
        } else {
            (index + 1) % self.points.len()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArenaLayout {
    pub walls: Vec<Wall>,
    pub circuit: WaypointCircuit,
}

impl ArenaLayout {
    /// The 30x30 bumper arena with a short divider wall and a four-point loop.
    pub fn standard() -> Self {
        let height = 1.0;
        let thickness = 0.5;
        let y = height / 2.0;

        let span = 30.0 + thickness;
        let edge = thickness / 2.0;

        let walls = vec![
            // -Z edge
            Wall::from_size(span, height, thickness, Vec3::new(0.0, y, -20.0 - edge)),
            // +Z edge
            Wall::from_size(span, height, thickness, Vec3::new(0.0, y, 10.0 + edge)),
            // -X edge
            Wall::from_size(thickness, height, span, Vec3::new(-15.0 - edge, y, -5.0)),
            // +X edge
            Wall::from_size(thickness, height, span, Vec3::new(15.0 + edge, y, -5.0)),
            // divider
            Wall::from_size(1.0, height, 7.0, Vec3::new(0.0, y, -3.0)),
        ];

        let circuit = WaypointCircuit::new(vec![
            Vec3::new(7.0, GROUND_HEIGHT, 6.0),
            Vec3::new(-10.0, GROUND_HEIGHT, 4.0),
            Vec3::new(-10.0, GROUND_HEIGHT, -14.0),
            Vec3::new(10.0, GROUND_HEIGHT, -14.0),
        ]);

        Self { walls, circuit }
    }

    /// Open floor with no walls; useful for scripted scenarios.
    pub fn open(circuit: WaypointCircuit) -> Self {
        Self {
            walls: Vec::new(),
            circuit,
        }
    }
}
