//! Renderer collaborator boundary.
//!
//! The core never renders anything itself. It describes geometry as plain data,
//! hands it to a [`Scene`], keeps the returned handle, and later asks the scene
//! to dispose of it exactly once.

use crate::config::WorldSettings;
use crate::data::*;
use crate::error::SceneError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque renderer-owned geometry handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeometryHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Road,
    Terrain,
    Tree,
    Rock,
    Bush,
    Sign,
}

impl GeometryKind {
    pub const ALL: [GeometryKind; 6] = [
        GeometryKind::Road,
        GeometryKind::Terrain,
        GeometryKind::Tree,
        GeometryKind::Rock,
        GeometryKind::Bush,
        GeometryKind::Sign,
    ];

    fn slot(self) -> usize {
        match self {
            GeometryKind::Road => 0,
            GeometryKind::Terrain => 1,
            GeometryKind::Tree => 2,
            GeometryKind::Rock => 3,
            GeometryKind::Bush => 4,
            GeometryKind::Sign => 5,
        }
    }
}

impl From<SceneryKind> for GeometryKind {
    fn from(kind: SceneryKind) -> Self {
        match kind {
            SceneryKind::Tree => GeometryKind::Tree,
            SceneryKind::Rock => GeometryKind::Rock,
            SceneryKind::Bush => GeometryKind::Bush,
            SceneryKind::Sign => GeometryKind::Sign,
        }
    }
}

/// Plain-data description of one piece of geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryDescription {
    pub kind: GeometryKind,
    pub position: [f32; 3],
    /// Width (X), height (Y), depth (Z) in meters
    pub dimensions: [f32; 3],
    /// RGB tint (0-1 range)
    pub tint: [f32; 3],
}

/// Renderer collaborator
pub trait Scene {
    fn create_geometry(&mut self, description: &GeometryDescription) -> Result<GeometryHandle, SceneError>;
    fn dispose(&mut self, handle: GeometryHandle);
}

/// Base shape for one geometry kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryTemplate {
    pub dimensions: [f32; 3],
    pub tint: [f32; 3],
}

/// Arena of geometry templates keyed by kind.
///
/// Every description is an instance of one template; the streaming window never
/// authors dimensions ad hoc.
#[derive(Debug, Clone)]
pub struct GeometryTemplates {
    templates: [GeometryTemplate; 6],
}

impl GeometryTemplates {
    pub fn new(world: &WorldSettings) -> Self {
        let templates = GeometryKind::ALL.map(|kind| match kind {
            GeometryKind::Road => GeometryTemplate {
                dimensions: [world.road_width, 0.1, world.segment_length],
                tint: [0.20, 0.20, 0.22], // Asphalt
            },
            GeometryKind::Terrain => GeometryTemplate {
                dimensions: [world.terrain_strip_width, 0.5, world.segment_length],
                tint: [0.40, 0.60, 0.30],
            },
            GeometryKind::Tree => GeometryTemplate {
                dimensions: [3.0, 8.0, 3.0],
                tint: [0.20, 0.50, 0.15],
            },
            GeometryKind::Rock => GeometryTemplate {
                dimensions: [2.0, 1.5, 2.0],
                tint: [0.50, 0.50, 0.50],
            },
            GeometryKind::Bush => GeometryTemplate {
                dimensions: [1.5, 1.2, 1.5],
                tint: [0.25, 0.55, 0.20],
            },
            GeometryKind::Sign => GeometryTemplate {
                dimensions: [2.0, 3.0, 0.2],
                tint: [0.10, 0.45, 0.20], // Highway green
            },
        });

        Self { templates }
    }

    pub fn template(&self, kind: GeometryKind) -> &GeometryTemplate {
        &self.templates[kind.slot()]
    }

    /// Instantiate a template at `position`, optionally overriding its tint
    pub fn instantiate(&self, kind: GeometryKind, position: [f32; 3], tint: Option<[f32; 3]>) -> GeometryDescription {
        let template = self.template(kind);
        GeometryDescription {
            kind,
            position,
            dimensions: template.dimensions,
            tint: tint.unwrap_or(template.tint),
        }
    }

    pub fn describe_segment(&self, segment: &RoadSegment) -> GeometryDescription {
        self.instantiate(GeometryKind::Road, [segment.curve, segment.elevation, segment.z], None)
    }

    pub fn describe_terrain(&self, chunk: &TerrainChunk) -> GeometryDescription {
        let tint = chunk.biome.params().ground_tint;
        self.instantiate(GeometryKind::Terrain, [chunk.x, chunk.elevation, chunk.z], Some(tint))
    }

    pub fn describe_scenery(&self, object: &SceneryObject) -> GeometryDescription {
        let tint = match object.kind {
            SceneryKind::Tree | SceneryKind::Bush => Some(object.biome.params().foliage_tint),
            SceneryKind::Rock | SceneryKind::Sign => None,
        };
        self.instantiate(object.kind.into(), [object.x, object.y, object.z], tint)
    }
}

/// In-memory scene that records every create and dispose call.
///
/// Used by the headless binary and by tests to verify that each handle is
/// disposed exactly once. Creation can be refused on demand to exercise the
/// retry path.
#[derive(Debug, Default)]
pub struct RecordingScene {
    next_handle: u64,
    live: HashMap<GeometryHandle, GeometryKind>,
    created: u64,
    disposed: u64,
    double_disposals: Vec<GeometryHandle>,
    unknown_disposals: Vec<GeometryHandle>,
    refuse_remaining: u32,
    capacity: Option<usize>,
    peak_live: usize,
}

impl RecordingScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene that refuses creation once `capacity` handles are live
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn set_capacity(&mut self, capacity: Option<usize>) {
        self.capacity = capacity;
    }

    /// Refuse the next `count` create calls
    pub fn refuse_next(&mut self, count: u32) {
        self.refuse_remaining = count;
    }

    pub fn created_count(&self) -> u64 {
        self.created
    }

    pub fn disposed_count(&self) -> u64 {
        self.disposed
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn peak_live(&self) -> usize {
        self.peak_live
    }

    pub fn live_count_of(&self, kind: GeometryKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }

    pub fn is_live(&self, handle: GeometryHandle) -> bool {
        self.live.contains_key(&handle)
    }

    pub fn kind_of(&self, handle: GeometryHandle) -> Option<GeometryKind> {
        self.live.get(&handle).copied()
    }

    pub fn double_disposals(&self) -> &[GeometryHandle] {
        &self.double_disposals
    }

    pub fn unknown_disposals(&self) -> &[GeometryHandle] {
        &self.unknown_disposals
    }
}

impl Scene for RecordingScene {
    fn create_geometry(&mut self, description: &GeometryDescription) -> Result<GeometryHandle, SceneError> {
        if self.refuse_remaining > 0 {
            self.refuse_remaining -= 1;
            return Err(SceneError::Refused(format!("{:?} creation refused", description.kind)));
        }
        if let Some(capacity) = self.capacity {
            if self.live.len() >= capacity {
                return Err(SceneError::CapacityExhausted { live: self.live.len() });
            }
        }

        let handle = GeometryHandle(self.next_handle);
        self.next_handle += 1;
        self.created += 1;
        self.live.insert(handle, description.kind);
        self.peak_live = self.peak_live.max(self.live.len());
        Ok(handle)
    }

    fn dispose(&mut self, handle: GeometryHandle) {
        if self.live.remove(&handle).is_some() {
            self.disposed += 1;
        } else if handle.0 < self.next_handle {
            self.double_disposals.push(handle);
        } else {
            self.unknown_disposals.push(handle);
        }
    }
}
