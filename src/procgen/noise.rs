/// Road shape synthesis and terrain noise
use crate::config::NoiseSettings;
use noise::{NoiseFn, Perlin};

const PERLIN_PERIOD: f64 = 256.0;

/// Smoothed road centerline sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RoadSample {
    /// Lateral centerline offset (meters)
    pub curve: f32,
    /// Centerline height (meters)
    pub elevation: f32,
}

/// Sum-of-sinusoids synthesizer for road curvature and elevation.
///
/// Curvature and elevation advance on independent phase accumulators and
/// are exponentially smoothed toward their targets, so consecutive samples
/// never jump.
#[derive(Debug, Clone)]
pub struct RoadNoise {
    settings: NoiseSettings,
    curve_phase: f64,
    elevation_phase: f64,
    curve: f32,
    elevation: f32,
}

impl RoadNoise {
    pub fn new(settings: &NoiseSettings) -> Self {
        Self {
            settings: settings.clone(),
            curve_phase: 0.0,
            elevation_phase: 0.0,
            curve: 0.0,
            elevation: 0.0,
        }
    }

    /// Start both accumulators at the given phases
    pub fn starting_at(mut self, curve_phase: f64, elevation_phase: f64) -> Self {
        self.curve_phase = curve_phase;
        self.elevation_phase = elevation_phase;
        self
    }

    /// Raw 4-term curvature target at phase `phase`
    pub fn curve_target(&self, phase: f64) -> f32 {
        let a = &self.settings.curve_amplitudes;
        let w = &self.settings.curve_frequencies;
        let term = |i: usize| f64::from(w[i]) * phase;

        (f64::from(a[0]) * term(0).sin()
            + f64::from(a[1]) * term(1).cos()
            + f64::from(a[2]) * term(2).sin()
            + f64::from(a[3]) * term(3).cos()) as f32
    }

    /// Raw 3-term elevation target at phase `phase`
    pub fn elevation_target(&self, phase: f64) -> f32 {
        let a = &self.settings.elevation_amplitudes;
        let w = &self.settings.elevation_frequencies;
        let term = |i: usize| f64::from(w[i]) * phase;

        (f64::from(a[0]) * term(0).sin()
            + f64::from(a[1]) * term(1).cos()
            + f64::from(a[2]) * term(2).sin()) as f32
    }

    /// Advance both phases by one step and return the smoothed sample
    pub fn next_sample(&mut self) -> RoadSample {
        self.curve_phase += self.settings.curve_phase_step;
        self.elevation_phase += self.settings.elevation_phase_step;

        let curve_target = self.curve_target(self.curve_phase);
        let elevation_target = self.elevation_target(self.elevation_phase);

        self.curve += (curve_target - self.curve) * self.settings.curve_smoothing;
        self.elevation += (elevation_target - self.elevation) * self.settings.elevation_smoothing;

        self.current()
    }

    /// Move both phases `steps` steps ahead without sampling.
    ///
    /// The smoothed values keep their old position, so callers should step a
    /// few samples afterwards before using the output.
    pub fn skip_phases(&mut self, steps: u64) {
        let steps = steps as f64;
        self.curve_phase += self.settings.curve_phase_step * steps;
        self.elevation_phase += self.settings.elevation_phase_step * steps;
    }

    pub fn current(&self) -> RoadSample {
        RoadSample {
            curve: self.curve,
            elevation: self.elevation,
        }
    }

    /// Upper bound of |curve_target|
    pub fn curve_amplitude_sum(&self) -> f32 {
        self.settings.curve_amplitudes.iter().map(|a| a.abs()).sum()
    }

    pub fn curve_smoothing(&self) -> f32 {
        self.settings.curve_smoothing
    }
}

/// Multi-layer noise sampler for terrain strip undulation
pub struct TerrainNoise {
    /// Low-frequency noise for base terrain shape
    low_freq: Perlin,
    /// Mid-frequency noise for medium detail
    mid_freq: Perlin,
    /// High-frequency noise for fine detail
    high_freq: Perlin,
}

impl TerrainNoise {
    /// Create a new terrain noise generator with the given seed
    pub fn new(seed: u32) -> Self {
        Self {
            low_freq: Perlin::new(seed),
            mid_freq: Perlin::new(seed.wrapping_add(1)),
            high_freq: Perlin::new(seed.wrapping_add(2)),
        }
    }

    /// Sample layered noise at world position
    ///
    /// Returns a value roughly in the range [-1.75, 1.75], combining three octaves
    /// weighted 1.0, 0.5 and 0.25.
    pub fn sample(&self, x: f32, z: f32, freq_multiplier: f32) -> f32 {
        // Perlin repeats every 256 lattice cells, so folding keeps far coordinates in range
        let at = |scale: f32| {
            [
                f64::from(x * freq_multiplier * scale).rem_euclid(PERLIN_PERIOD),
                f64::from(z * freq_multiplier * scale).rem_euclid(PERLIN_PERIOD),
            ]
        };

        let low = self.low_freq.get(at(0.01)) as f32;
        let mid = self.mid_freq.get(at(0.05)) as f32 * 0.5;
        let high = self.high_freq.get(at(0.1)) as f32 * 0.25;

        low + mid + high
    }
}
