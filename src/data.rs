use crate::procgen::Biome;
use serde::{Deserialize, Serialize};

// --- Identifiers ---
/// Position of a slice along the road. Index 0 starts at z = 0.
pub type SegmentIndex = i64;
pub type CarId = String;

// --- World Records ---

/// One fixed-length longitudinal slice of road
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadSegment {
    pub index: SegmentIndex,
    /// Longitudinal start of the segment (index * segment_length)
    pub z: f32,
    /// Centerline lateral offset (meters)
    pub curve: f32,
    /// Centerline height (meters)
    pub elevation: f32,
    pub width: f32,
}

/// Which side of the road a strip or object sits on.
///
/// The vehicle faces +Z at heading 0, so its left is +X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn sign(self) -> f32 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }
}

/// Ground strip flanking a road segment.
///
/// The biome is captured at creation and never updated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainChunk {
    pub index: SegmentIndex,
    pub side: Side,
    /// Strip center X
    pub x: f32,
    pub z: f32,
    /// Ground height at the strip center, including undulation
    pub elevation: f32,
    pub undulation: f32,
    pub biome: Biome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneryKind {
    Tree,
    Rock,
    Bush,
    Sign,
}

/// Roadside point object, retired by distance rather than by segment index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneryObject {
    pub kind: SceneryKind,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub biome: Biome,
}

/// Everything produced for one segment index
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSlice {
    pub segment: RoadSegment,
    /// Left strip first, then right
    pub terrain: [TerrainChunk; 2],
    pub scenery: Vec<SceneryObject>,
}

// --- Vehicle ---

/// Level-triggered driver inputs, last write wins per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputState {
    pub accelerate: bool,
    pub brake: bool,
    pub steer_left: bool,
    pub steer_right: bool,
}

impl InputState {
    /// +1 for left, -1 for right, 0 when neither or both are held
    pub fn steer_axis(&self) -> f32 {
        match (self.steer_left, self.steer_right) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub pos_x: f32,
    /// Follows the road elevation under the vehicle
    pub pos_y: f32,
    pub pos_z: f32,
    pub heading_rad: f32,
    pub speed_kmh: f32,
    /// Cosmetic lateral slip indicator (0-1)
    pub drift: f32,
    pub headlights: bool,
    pub inputs: InputState,
}

impl VehicleState {
    pub fn at(pos_x: f32, pos_y: f32, pos_z: f32) -> Self {
        Self {
            pos_x,
            pos_y,
            pos_z,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    #[default]
    Clear,
    Rain,
    Fog,
    Snow,
}

impl Weather {
    pub const ALL: [Weather; 4] = [Weather::Clear, Weather::Rain, Weather::Fog, Weather::Snow];

    pub fn next(self) -> Weather {
        match self {
            Weather::Clear => Weather::Rain,
            Weather::Rain => Weather::Fog,
            Weather::Fog => Weather::Snow,
            Weather::Snow => Weather::Clear,
        }
    }
}
