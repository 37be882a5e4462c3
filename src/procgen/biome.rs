/// Biome definitions and their static environment parameters
use serde::{Deserialize, Serialize};

/// Environmental preset controlling terrain tint and scenery density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Biome {
    #[default]
    Grassland,
    Desert,
    Forest,
    Snow,
    Coastal,
    Mountain,
    Canyon,
    Tropical,
}

/// Static per-biome parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BiomeParams {
    /// Ground color RGB (0-1 range)
    pub ground_tint: [f32; 3],
    /// Foliage color RGB applied to trees and bushes
    pub foliage_tint: [f32; 3],
    /// Multiplier on the scenery batch size
    pub scenery_density: f32,
    /// Maximum terrain undulation in meters
    pub relief_m: f32,
    /// Frequency multiplier for terrain noise
    pub roughness: f32,
}

const BIOME_TABLE: [BiomeParams; 8] = [
    // Grassland
    BiomeParams {
        ground_tint: [0.40, 0.60, 0.30],
        foliage_tint: [0.20, 0.50, 0.15],
        scenery_density: 1.0,
        relief_m: 4.0,
        roughness: 0.8,
    },
    // Desert
    BiomeParams {
        ground_tint: [0.80, 0.70, 0.50],
        foliage_tint: [0.55, 0.55, 0.30],
        scenery_density: 0.3,
        relief_m: 6.0,
        roughness: 0.5,
    },
    // Forest
    BiomeParams {
        ground_tint: [0.30, 0.50, 0.20],
        foliage_tint: [0.10, 0.35, 0.10],
        scenery_density: 1.5,
        relief_m: 8.0,
        roughness: 1.0,
    },
    // Snow
    BiomeParams {
        ground_tint: [0.92, 0.94, 0.97],
        foliage_tint: [0.25, 0.40, 0.30],
        scenery_density: 0.6,
        relief_m: 10.0,
        roughness: 0.9,
    },
    // Coastal
    BiomeParams {
        ground_tint: [0.85, 0.80, 0.60],
        foliage_tint: [0.30, 0.60, 0.25],
        scenery_density: 0.5,
        relief_m: 2.0,
        roughness: 0.6,
    },
    // Mountain
    BiomeParams {
        ground_tint: [0.50, 0.50, 0.40],
        foliage_tint: [0.15, 0.35, 0.20],
        scenery_density: 0.8,
        relief_m: 25.0,
        roughness: 1.4,
    },
    // Canyon
    BiomeParams {
        ground_tint: [0.70, 0.40, 0.25],
        foliage_tint: [0.45, 0.45, 0.25],
        scenery_density: 0.4,
        relief_m: 18.0,
        roughness: 1.2,
    },
    // Tropical
    BiomeParams {
        ground_tint: [0.35, 0.65, 0.30],
        foliage_tint: [0.10, 0.60, 0.20],
        scenery_density: 1.4,
        relief_m: 5.0,
        roughness: 0.9,
    },
];

impl Biome {
    pub const ALL: [Biome; 8] = [
        Biome::Grassland,
        Biome::Desert,
        Biome::Forest,
        Biome::Snow,
        Biome::Coastal,
        Biome::Mountain,
        Biome::Canyon,
        Biome::Tropical,
    ];

    fn slot(self) -> usize {
        match self {
            Biome::Grassland => 0,
            Biome::Desert => 1,
            Biome::Forest => 2,
            Biome::Snow => 3,
            Biome::Coastal => 4,
            Biome::Mountain => 5,
            Biome::Canyon => 6,
            Biome::Tropical => 7,
        }
    }

    pub fn params(self) -> &'static BiomeParams {
        &BIOME_TABLE[self.slot()]
    }

    /// Next biome in the cycle, wrapping after the last one
    pub fn next(self) -> Biome {
        Self::ALL[(self.slot() + 1) % Self::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            Biome::Grassland => "grassland",
            Biome::Desert => "desert",
            Biome::Forest => "forest",
            Biome::Snow => "snow",
            Biome::Coastal => "coastal",
            Biome::Mountain => "mountain",
            Biome::Canyon => "canyon",
            Biome::Tropical => "tropical",
        }
    }

    /// Look up a biome by name
    ///
    /// Returns None if the name is not recognized.
    pub fn from_name(name: &str) -> Option<Biome> {
        let name = name.to_lowercase();
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Largest scenery density in the table
    pub fn max_scenery_density() -> f32 {
        BIOME_TABLE
            .iter()
            .map(|p| p.scenery_density)
            .fold(0.0, f32::max)
    }
}

impl std::fmt::Display for Biome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
