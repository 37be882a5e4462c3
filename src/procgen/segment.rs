/// Per-index road, terrain and scenery generation
use super::biome::Biome;
use super::noise::{RoadNoise, TerrainNoise};
use crate::config::{NoiseSettings, WorldSettings};
use crate::data::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Largest scenery batch before biome density scaling
const MAX_BATCH: f32 = 5.0;
/// Scenery lateral offset range beyond the road edge (meters)
const SCENERY_OFFSET_MIN: f32 = 5.0;
const SCENERY_OFFSET_MAX: f32 = 85.0;
/// Phase accumulators start somewhere in this range, picked from the seed
const PHASE_SPREAD: f64 = 10_000.0;
/// Slices replayed in full before a skip target so the smoothing settles
const SKIP_WARMUP: SegmentIndex = 256;

/// Turns the road synthesizer into discrete slices of the world.
///
/// The harmonic phases and the RNG are the only state carried between calls,
/// so a fixed seed reproduces the same road.
pub struct SegmentGenerator {
    world: WorldSettings,
    noise_settings: NoiseSettings,
    seed: u64,
    road_noise: RoadNoise,
    terrain_noise: TerrainNoise,
    rng: SmallRng,
    last_index: Option<SegmentIndex>,
}

impl SegmentGenerator {
    pub fn new(world: &WorldSettings, noise_settings: &NoiseSettings) -> Self {
        let seed = world.seed.unwrap_or_else(rand::random);
        let (road_noise, terrain_noise, rng) = Self::seeded_state(noise_settings, seed);

        Self {
            world: world.clone(),
            noise_settings: noise_settings.clone(),
            seed,
            road_noise,
            terrain_noise,
            rng,
            last_index: None,
        }
    }

    fn seeded_state(noise_settings: &NoiseSettings, seed: u64) -> (RoadNoise, TerrainNoise, SmallRng) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let curve_phase = rng.gen_range(0.0..PHASE_SPREAD);
        let elevation_phase = rng.gen_range(0.0..PHASE_SPREAD);
        let terrain_seed: u32 = rng.gen();

        (
            RoadNoise::new(noise_settings).starting_at(curve_phase, elevation_phase),
            TerrainNoise::new(terrain_seed),
            rng,
        )
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restart the road from index 0.
    ///
    /// A configured seed replays the same road; otherwise a fresh seed is drawn.
    pub fn reset(&mut self) {
        if self.world.seed.is_none() {
            self.seed = rand::random();
        }
        let (road_noise, terrain_noise, rng) = Self::seeded_state(&self.noise_settings, self.seed);
        self.road_noise = road_noise;
        self.terrain_noise = terrain_noise;
        self.rng = rng;
        self.last_index = None;
    }

    /// Index the next call to [`generate_at`](Self::generate_at) must use
    pub fn next_index(&self) -> SegmentIndex {
        self.last_index.map_or(0, |last| last + 1)
    }

    /// Advance so the next slice generated is `index`, without returning the skipped slices.
    ///
    /// Long gaps jump the harmonic phases directly and only replay the last
    /// few slices, so the cost does not grow with the gap.
    pub fn skip_to(&mut self, index: SegmentIndex, biome: Biome) -> u64 {
        let next = self.next_index();
        if index <= next {
            return 0;
        }
        let gap = index - next;

        let replay_from = if gap > SKIP_WARMUP {
            let jump = index - SKIP_WARMUP;
            self.road_noise.skip_phases((jump - next) as u64);
            self.last_index = Some(jump - 1);
            jump
        } else {
            next
        };
        for i in replay_from..index {
            self.generate_at(i, biome);
        }
        gap as u64
    }

    /// Generate the slice for `index` using `biome` for terrain and scenery
    pub fn generate_at(&mut self, index: SegmentIndex, biome: Biome) -> GeneratedSlice {
        debug_assert_eq!(index, self.next_index(), "segments must be generated in order");
        self.last_index = Some(index);

        let sample = self.road_noise.next_sample();
        let segment = RoadSegment {
            index,
            z: index as f32 * self.world.segment_length,
            curve: sample.curve,
            elevation: sample.elevation,
            width: self.world.road_width,
        };

        let terrain = [
            self.terrain_chunk(&segment, Side::Left, biome),
            self.terrain_chunk(&segment, Side::Right, biome),
        ];

        let mut scenery = Vec::new();
        if self.rng.gen_bool(self.world.scenery_chance.clamp(0.0, 1.0)) {
            self.scatter_scenery(&segment, biome, &mut scenery);
        }

        let interval = SegmentIndex::from(self.world.sign_interval);
        if interval > 0 && index.rem_euclid(interval) == 0 {
            scenery.push(SceneryObject {
                kind: SceneryKind::Sign,
                x: segment.curve + Side::Right.sign() * (segment.width / 2.0 + self.world.sign_offset),
                y: segment.elevation,
                z: segment.z,
                biome,
            });
        }

        GeneratedSlice {
            segment,
            terrain,
            scenery,
        }
    }

    fn terrain_chunk(&self, segment: &RoadSegment, side: Side, biome: Biome) -> TerrainChunk {
        let params = biome.params();
        let x = segment.curve + side.sign() * (segment.width / 2.0 + self.world.terrain_margin);
        // Noise output spans roughly [-1.75, 1.75]
        let undulation = self.terrain_noise.sample(x, segment.z, params.roughness) / 1.75 * params.relief_m;

        TerrainChunk {
            index: segment.index,
            side,
            x,
            z: segment.z,
            elevation: segment.elevation + undulation,
            undulation,
            biome,
        }
    }

    fn scatter_scenery(&mut self, segment: &RoadSegment, biome: Biome, out: &mut Vec<SceneryObject>) {
        let density = biome.params().scenery_density;
        let count = (self.rng.gen_range(0.0..MAX_BATCH) * density) as usize;
        let road_edge = segment.width / 2.0;

        for _ in 0..count {
            let roll: f32 = self.rng.gen();
            let kind = if roll < 0.7 {
                SceneryKind::Tree
            } else if roll < 0.85 {
                SceneryKind::Rock
            } else {
                SceneryKind::Bush
            };
            let side = if self.rng.gen_bool(0.5) { Side::Left } else { Side::Right };
            let offset = road_edge + self.rng.gen_range(SCENERY_OFFSET_MIN..SCENERY_OFFSET_MAX);
            let along = self.rng.gen_range(0.0..self.world.segment_length.max(f32::EPSILON));

            out.push(SceneryObject {
                kind,
                x: segment.curve + side.sign() * offset,
                y: segment.elevation,
                z: segment.z + along,
                biome,
            });
        }
    }

    /// Largest number of scenery objects a single slice can carry
    pub fn max_scenery_per_slice() -> usize {
        (MAX_BATCH * Biome::max_scenery_density()).ceil() as usize + 1
    }
}
