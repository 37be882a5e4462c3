use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub world: WorldSettings,
    pub noise: NoiseSettings,
    pub physics: PhysicsSettings,
    pub simulation: SimulationSettings,
    pub logging: LoggingSettings,
}

/// Road layout and streaming window sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Length of one road segment along Z (meters)
    pub segment_length: f32,
    pub road_width: f32,
    /// Gap between the road edge and the center of a terrain strip
    pub terrain_margin: f32,
    pub terrain_strip_width: f32,
    /// Segments that must exist ahead of the vehicle
    pub render_distance: u32,
    /// Segments kept behind the vehicle before retirement
    pub trailing_window: u32,
    /// Probability (0-1) that a segment spawns a scenery batch
    pub scenery_chance: f64,
    /// A roadside sign is placed on every Nth segment (0 disables signs)
    pub sign_interval: u32,
    pub sign_offset: f32,
    /// Scenery further than this behind the vehicle is disposed (meters)
    pub scenery_retire_distance: f32,
    /// Fixed seed for reproducible roads; random when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Harmonic road shape parameters.
///
/// Per-segment curve deltas stay below `curve_smoothing * sum(curve_amplitudes)`
/// as long as `sum(A * w) * curve_phase_step <= curve_smoothing * sum(A)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub curve_amplitudes: [f32; 4],
    pub curve_frequencies: [f32; 4],
    pub curve_phase_step: f64,
    pub curve_smoothing: f32,
    pub elevation_amplitudes: [f32; 3],
    pub elevation_frequencies: [f32; 3],
    pub elevation_phase_step: f64,
    pub elevation_smoothing: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Coasting deceleration (km/h per second)
    pub friction: f32,
    pub speed_scale: f32,
    /// Speed at which steering reaches its nominal turn rate (km/h)
    pub reference_speed: f32,
    /// Converts speed units into meters per second (3.6 for km/h)
    pub speed_unit_divisor: f32,
    pub drift_steer_threshold: f32,
    pub drift_speed_threshold: f32,
    pub drift_rise_rate: f32,
    pub drift_decay_rate: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub tick_rate_hz: u16,
    pub default_car: String,
    pub profile_path: String,
    pub cars_dir: String,
    /// Seconds between automatic biome changes in headless runs (0 disables)
    pub biome_cycle_seconds: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            segment_length: 10.0,
            road_width: 12.0,
            terrain_margin: 50.0,
            terrain_strip_width: 100.0,
            render_distance: 60,
            trailing_window: 20,
            scenery_chance: 0.6,
            sign_interval: 20,
            sign_offset: 10.0,
            scenery_retire_distance: 1000.0,
            seed: None,
        }
    }
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            curve_amplitudes: [30.0, 15.0, 8.0, 4.0],
            curve_frequencies: [0.013, 0.031, 0.071, 0.17],
            curve_phase_step: 1.0,
            curve_smoothing: 0.05,
            elevation_amplitudes: [6.0, 3.0, 1.5],
            elevation_frequencies: [0.006, 0.017, 0.041],
            elevation_phase_step: 1.0,
            elevation_smoothing: 0.03,
        }
    }
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            friction: 10.0,
            speed_scale: 1.0,
            reference_speed: 100.0,
            speed_unit_divisor: 3.6,
            drift_steer_threshold: 0.5,
            drift_speed_threshold: 80.0,
            drift_rise_rate: 3.0,
            drift_decay_rate: 2.0,
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            default_car: "sedan".to_string(),
            profile_path: "./profile.json".to_string(),
            cars_dir: "./content/cars".to_string(),
            biome_cycle_seconds: 60.0,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl NoiseSettings {
    /// Road shape problems a loaded config can introduce; empty when the shape is sound
    pub fn shape_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.curve_smoothing <= self.elevation_smoothing {
            warnings.push(format!(
                "curve_smoothing ({}) should exceed elevation_smoothing ({})",
                self.curve_smoothing, self.elevation_smoothing
            ));
        }

        let amplitude_sum: f64 = self.curve_amplitudes.iter().map(|a| f64::from(a.abs())).sum();
        let slope_sum: f64 = self
            .curve_amplitudes
            .iter()
            .zip(&self.curve_frequencies)
            .map(|(a, w)| f64::from(a.abs() * w.abs()))
            .sum();
        let drift = slope_sum * self.curve_phase_step.abs();
        let limit = f64::from(self.curve_smoothing) * amplitude_sum;
        if drift > limit {
            warnings.push(format!(
                "curve targets move {:.3} per segment, more than smoothing allows ({:.3}); curves may jump",
                drift, limit
            ));
        }

        warnings
    }
}

impl DriveConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: DriveConfig = toml::from_str(&contents)?;
        for warning in config.noise.shape_warnings() {
            tracing::warn!("{:?}: {}", path, warning);
        }
        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config at {:?}, using defaults", path);
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config {:?}: {}, using defaults", path, e);
            Self::default()
        })
    }

    /// Seconds per simulation tick.
    pub fn tick_dt(&self) -> f32 {
        1.0 / f32::from(self.simulation.tick_rate_hz.max(1))
    }
}
