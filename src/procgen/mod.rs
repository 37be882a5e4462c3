/// Procedural road generation
///
/// This module provides the harmonic road synthesizer, the static biome table
/// and the per-index slice generator that feeds the streaming window.

pub mod biome;
pub mod noise;
pub mod segment;

// Re-export main types for convenience
pub use biome::{Biome, BiomeParams};
pub use noise::{RoadNoise, RoadSample, TerrainNoise};
pub use segment::SegmentGenerator;
