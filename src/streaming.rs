//! Streaming window over road segment indices.
//!
//! The window keeps every segment from `vehicle_index - trailing_window` up to
//! the frontier alive, generates new slices ahead of the vehicle, and retires
//! old ones from the back. Road segments and terrain strips are retired by
//! index from the front of their queues; scenery is filtered by distance.
//!
//! Live segment and terrain collections are always sorted and contiguous, so
//! both rules are O(1) amortized per tick.

use crate::config::{NoiseSettings, WorldSettings};
use crate::data::*;
use crate::error::SceneError;
use crate::procgen::{Biome, RoadSample, SegmentGenerator};
use crate::scene::{GeometryDescription, GeometryHandle, GeometryTemplates, Scene};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info, trace, warn};

/// Failed attempts between repeated warnings for the same pending slice
const PENDING_WARN_EVERY: u32 = 60;
/// Vehicle indices are clamped to this magnitude so window arithmetic cannot overflow
const MAX_VEHICLE_INDEX: SegmentIndex = SegmentIndex::MAX / 4;

/// A world record together with the renderer handle created for it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placed<T> {
    pub item: T,
    pub handle: GeometryHandle,
}

/// Slice whose geometry the scene refused; retried once per tick
#[derive(Debug)]
struct PendingSlice {
    slice: GeneratedSlice,
    attempts: u32,
}

/// What a single initialize/update call changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamReport {
    pub generated: usize,
    pub skipped: usize,
    pub retired_segments: usize,
    pub retired_terrain: usize,
    pub retired_scenery: usize,
    /// True when the frontier could not advance because the scene refused geometry
    pub stalled: bool,
}

/// Lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamingStats {
    pub slices_generated: u64,
    pub slices_skipped: u64,
    pub segments_retired: u64,
    pub terrain_retired: u64,
    pub scenery_retired: u64,
    pub failed_attempts: u64,
}

pub struct StreamingWindow {
    segment_length: f32,
    render_distance: SegmentIndex,
    trailing_window: SegmentIndex,
    scenery_retire_distance: f32,
    generator: SegmentGenerator,
    templates: GeometryTemplates,
    segments: VecDeque<Placed<RoadSegment>>,
    terrain: VecDeque<Placed<TerrainChunk>>,
    scenery: Vec<Placed<SceneryObject>>,
    /// Highest materialized index
    frontier: Option<SegmentIndex>,
    vehicle_index: SegmentIndex,
    pending: Option<PendingSlice>,
    stats: StreamingStats,
}

impl StreamingWindow {
    pub fn new(world: &WorldSettings, noise: &NoiseSettings) -> Self {
        let render_distance = SegmentIndex::from(world.render_distance.max(1));
        let trailing_window = SegmentIndex::from(world.trailing_window);
        let capacity = (render_distance + trailing_window + 1) as usize;

        Self {
            segment_length: world.segment_length.max(0.01),
            render_distance,
            trailing_window,
            scenery_retire_distance: world.scenery_retire_distance.max(0.0),
            generator: SegmentGenerator::new(world, noise),
            templates: GeometryTemplates::new(world),
            segments: VecDeque::with_capacity(capacity),
            terrain: VecDeque::with_capacity(capacity * 2),
            scenery: Vec::new(),
            frontier: None,
            vehicle_index: 0,
            pending: None,
            stats: StreamingStats::default(),
        }
    }

    /// Generate the initial `render_distance` segments starting at index 0
    pub fn initialize(&mut self, scene: &mut dyn Scene, biome: Biome) -> StreamReport {
        if self.frontier.is_some() || self.pending.is_some() {
            warn!("Streaming window already initialized, ignoring");
            return StreamReport::default();
        }

        self.vehicle_index = 0;
        let mut report = StreamReport::default();
        self.advance_to(scene, self.render_distance - 1, biome, &mut report);

        info!(
            "Streaming window initialized: {} segments (frontier {:?}, seed {})",
            self.segments.len(),
            self.frontier,
            self.generator.seed()
        );
        report
    }

    /// Run the advance and retire rules for a vehicle at longitudinal position `vehicle_z`
    pub fn update(&mut self, scene: &mut dyn Scene, vehicle_z: f32, biome: Biome) -> StreamReport {
        let mut report = StreamReport::default();
        if !vehicle_z.is_finite() {
            warn!("Ignoring non-finite vehicle position {}", vehicle_z);
            return report;
        }
        self.vehicle_index =
            ((vehicle_z / self.segment_length).floor() as SegmentIndex).clamp(-MAX_VEHICLE_INDEX, MAX_VEHICLE_INDEX);

        self.advance_to(scene, self.vehicle_index + self.render_distance, biome, &mut report);
        self.retire_indexed(scene, &mut report);
        report.retired_scenery = self.retire_scenery(scene, vehicle_z);

        debug_assert!(self.is_contiguous(), "live segments must be contiguous");

        if report.generated > 0 || report.retired_segments > 0 {
            trace!(
                "Vehicle index {}: +{} slices, -{} segments, -{} scenery, frontier {:?}",
                self.vehicle_index,
                report.generated,
                report.retired_segments,
                report.retired_scenery,
                self.frontier
            );
        }
        report
    }

    /// Dispose every tracked handle and forget the road.
    ///
    /// The generator restarts from index 0, so the window can be initialized again.
    pub fn dispose_all(&mut self, scene: &mut dyn Scene) -> usize {
        let mut disposed = 0;
        for placed in self.segments.drain(..) {
            scene.dispose(placed.handle);
            disposed += 1;
        }
        for placed in self.terrain.drain(..) {
            scene.dispose(placed.handle);
            disposed += 1;
        }
        for placed in self.scenery.drain(..) {
            scene.dispose(placed.handle);
            disposed += 1;
        }

        self.pending = None;
        self.frontier = None;
        self.vehicle_index = 0;
        self.generator.reset();

        debug!("Disposed {} live geometry handles", disposed);
        disposed
    }

    /// Dispose everything currently tracked, then initialize again
    pub fn reset(&mut self, scene: &mut dyn Scene, biome: Biome) -> StreamReport {
        self.dispose_all(scene);
        self.initialize(scene, biome)
    }

    fn next_index(&self) -> SegmentIndex {
        self.frontier.map_or(0, |frontier| frontier + 1)
    }

    fn advance_to(&mut self, scene: &mut dyn Scene, target: SegmentIndex, biome: Biome, report: &mut StreamReport) {
        // Slices that would be retired immediately are generated without geometry
        let cutoff = self.vehicle_index - self.trailing_window;
        let next = self.next_index();
        if next < cutoff {
            // A pending slice was already drawn from the generator, so dropping it is enough
            self.pending = None;
            self.generator.skip_to(cutoff, biome);
            let skipped = (cutoff - next) as usize;

            self.frontier = Some(cutoff - 1);
            self.stats.slices_skipped += skipped as u64;
            report.skipped += skipped;
            debug!("Skipped {} slices behind the trailing window", skipped);
        }

        while self.next_index() <= target {
            let index = self.next_index();
            let mut pending = match self.pending.take() {
                Some(pending) => pending,
                None => PendingSlice {
                    slice: self.generator.generate_at(index, biome),
                    attempts: 0,
                },
            };
            debug_assert_eq!(pending.slice.segment.index, index);

            match self.materialize(scene, &pending.slice) {
                Ok(()) => report.generated += 1,
                Err(e) => {
                    pending.attempts += 1;
                    self.stats.failed_attempts += 1;
                    if pending.attempts == 1 || pending.attempts % PENDING_WARN_EVERY == 0 {
                        warn!("Segment {} pending after {} attempt(s): {}", index, pending.attempts, e);
                    }
                    self.pending = Some(pending);
                    report.stalled = true;
                    return;
                }
            }
        }
    }

    fn materialize(&mut self, scene: &mut dyn Scene, slice: &GeneratedSlice) -> Result<(), SceneError> {
        debug_assert_eq!(slice.segment.index, self.next_index(), "frontier must grow by one");

        let mut descriptions = Vec::with_capacity(3 + slice.scenery.len());
        descriptions.push(self.templates.describe_segment(&slice.segment));
        descriptions.extend(slice.terrain.iter().map(|chunk| self.templates.describe_terrain(chunk)));
        descriptions.extend(slice.scenery.iter().map(|object| self.templates.describe_scenery(object)));

        let handles = create_all(scene, &descriptions)?;

        self.segments.push_back(Placed {
            item: slice.segment,
            handle: handles[0],
        });
        for (chunk, handle) in slice.terrain.iter().zip(&handles[1..3]) {
            self.terrain.push_back(Placed {
                item: *chunk,
                handle: *handle,
            });
        }
        for (object, handle) in slice.scenery.iter().zip(&handles[3..]) {
            self.scenery.push(Placed {
                item: *object,
                handle: *handle,
            });
        }

        self.frontier = Some(slice.segment.index);
        self.stats.slices_generated += 1;
        Ok(())
    }

    fn retire_indexed(&mut self, scene: &mut dyn Scene, report: &mut StreamReport) {
        let cutoff = self.vehicle_index - self.trailing_window;

        while let Some(front) = self.segments.front() {
            if front.item.index >= cutoff {
                break;
            }
            let handle = front.handle;
            self.segments.pop_front();
            scene.dispose(handle);
            report.retired_segments += 1;
        }

        while let Some(front) = self.terrain.front() {
            if front.item.index >= cutoff {
                break;
            }
            let handle = front.handle;
            self.terrain.pop_front();
            scene.dispose(handle);
            report.retired_terrain += 1;
        }

        self.stats.segments_retired += report.retired_segments as u64;
        self.stats.terrain_retired += report.retired_terrain as u64;
    }

    fn retire_scenery(&mut self, scene: &mut dyn Scene, vehicle_z: f32) -> usize {
        let limit = vehicle_z - self.scenery_retire_distance;
        let mut retired = 0;

        self.scenery.retain(|placed| {
            if placed.item.z < limit {
                scene.dispose(placed.handle);
                retired += 1;
                false
            } else {
                true
            }
        });

        self.stats.scenery_retired += retired as u64;
        retired
    }

    /// Segments and terrain strips form one gap-free ascending run, two strips per index
    pub fn is_contiguous(&self) -> bool {
        let segments_ok = self
            .segments
            .iter()
            .zip(self.segments.iter().skip(1))
            .all(|(a, b)| b.item.index == a.item.index + 1);

        let terrain_ok = self.terrain.len() == self.segments.len() * 2
            && self
                .terrain
                .iter()
                .enumerate()
                .all(|(i, placed)| self.segments.get(i / 2).map(|s| s.item.index) == Some(placed.item.index));

        let frontier_ok = self.segments.back().map(|s| s.item.index) == self.frontier || self.segments.is_empty();

        segments_ok && terrain_ok && frontier_ok
    }

    // --- Queries ---

    pub fn segments(&self) -> &VecDeque<Placed<RoadSegment>> {
        &self.segments
    }

    pub fn terrain(&self) -> &VecDeque<Placed<TerrainChunk>> {
        &self.terrain
    }

    pub fn scenery(&self) -> &[Placed<SceneryObject>] {
        &self.scenery
    }

    pub fn frontier(&self) -> Option<SegmentIndex> {
        self.frontier
    }

    pub fn oldest_index(&self) -> Option<SegmentIndex> {
        self.segments.front().map(|placed| placed.item.index)
    }

    pub fn vehicle_index(&self) -> SegmentIndex {
        self.vehicle_index
    }

    pub fn live_handle_count(&self) -> usize {
        self.segments.len() + self.terrain.len() + self.scenery.len()
    }

    pub fn is_stalled(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_attempts(&self) -> u32 {
        self.pending.as_ref().map_or(0, |pending| pending.attempts)
    }

    pub fn stats(&self) -> &StreamingStats {
        &self.stats
    }

    pub fn segment_length(&self) -> f32 {
        self.segment_length
    }

    pub fn render_distance(&self) -> SegmentIndex {
        self.render_distance
    }

    pub fn trailing_window(&self) -> SegmentIndex {
        self.trailing_window
    }

    pub fn seed(&self) -> u64 {
        self.generator.seed()
    }

    /// Live segment with the given index
    pub fn segment(&self, index: SegmentIndex) -> Option<&RoadSegment> {
        let oldest = self.oldest_index()?;
        let offset = usize::try_from(index.checked_sub(oldest)?).ok()?;
        self.segments.get(offset).map(|placed| &placed.item)
    }

    /// Road centerline at longitudinal position `z`, interpolated between live segments
    pub fn road_at(&self, z: f32) -> Option<RoadSample> {
        if !z.is_finite() {
            return None;
        }
        let position = z / self.segment_length;
        let index = position.floor() as SegmentIndex;
        let current = self.segment(index)?;

        let sample = match self.segment(index + 1) {
            Some(next) => {
                let t = position - index as f32;
                RoadSample {
                    curve: current.curve + (next.curve - current.curve) * t,
                    elevation: current.elevation + (next.elevation - current.elevation) * t,
                }
            }
            None => RoadSample {
                curve: current.curve,
                elevation: current.elevation,
            },
        };
        Some(sample)
    }
}

/// Create every description, rolling back the partial slice on the first refusal
fn create_all(scene: &mut dyn Scene, descriptions: &[GeometryDescription]) -> Result<Vec<GeometryHandle>, SceneError> {
    let mut handles = Vec::with_capacity(descriptions.len());
    for description in descriptions {
        match scene.create_geometry(description) {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                for handle in handles {
                    scene.dispose(handle);
                }
                return Err(e);
            }
        }
    }
    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::RecordingScene;

    fn window() -> StreamingWindow {
        let world = WorldSettings {
            seed: Some(42),
            ..WorldSettings::default()
        };
        StreamingWindow::new(&world, &NoiseSettings::default())
    }

    #[test]
    fn test_initialize_generates_render_distance() {
        let mut scene = RecordingScene::new();
        let mut window = window();

        let report = window.initialize(&mut scene, Biome::Grassland);

        assert_eq!(report.generated, 60);
        assert_eq!(window.segments().len(), 60);
        assert_eq!(window.oldest_index(), Some(0));
        assert_eq!(window.frontier(), Some(59));
        assert_eq!(window.terrain().len(), 120);
        assert_eq!(scene.live_count(), window.live_handle_count());
        assert!(window.is_contiguous());
    }

    #[test]
    fn test_double_initialize_is_ignored() {
        let mut scene = RecordingScene::new();
        let mut window = window();
        window.initialize(&mut scene, Biome::Grassland);
        let created = scene.created_count();

        let report = window.initialize(&mut scene, Biome::Grassland);
        assert_eq!(report.generated, 0);
        assert_eq!(scene.created_count(), created);
    }

    #[test]
    fn test_update_advances_and_retires() {
        let mut scene = RecordingScene::new();
        let mut window = window();
        window.initialize(&mut scene, Biome::Grassland);

        let report = window.update(&mut scene, 25.0 * 10.0, Biome::Grassland);

        assert_eq!(window.vehicle_index(), 25);
        assert_eq!(window.frontier(), Some(85));
        assert_eq!(window.oldest_index(), Some(5));
        assert_eq!(report.generated, 26);
        assert_eq!(report.retired_segments, 5);
        assert_eq!(report.retired_terrain, 10);
        assert!(window.is_contiguous());
    }

    #[test]
    fn test_vehicle_behind_start_changes_nothing() {
        let mut scene = RecordingScene::new();
        let mut window = window();
        window.initialize(&mut scene, Biome::Grassland);

        let report = window.update(&mut scene, -35.0, Biome::Grassland);
        assert_eq!(window.vehicle_index(), -4);
        assert_eq!(report, StreamReport::default());
        assert_eq!(window.segments().len(), 60);
    }

    #[test]
    fn test_large_jump_skips_geometry_behind_window() {
        let mut scene = RecordingScene::new();
        let mut window = window();
        window.initialize(&mut scene, Biome::Grassland);

        let report = window.update(&mut scene, 1000.0 * 10.0, Biome::Grassland);

        assert_eq!(window.oldest_index(), Some(980));
        assert_eq!(window.frontier(), Some(1060));
        assert_eq!(report.skipped, 980 - 60);
        assert_eq!(window.segments().len(), 81);
        assert!(window.is_contiguous());
        assert_eq!(scene.live_count(), window.live_handle_count());
    }

    #[test]
    fn test_refused_geometry_stalls_then_recovers() {
        let mut scene = RecordingScene::new();
        let mut window = window();
        window.initialize(&mut scene, Biome::Grassland);

        scene.refuse_next(1);
        let report = window.update(&mut scene, 10.0, Biome::Grassland);
        assert!(report.stalled);
        assert!(window.is_stalled());
        assert_eq!(window.frontier(), Some(59));
        assert_eq!(window.pending_attempts(), 1);

        let report = window.update(&mut scene, 10.0, Biome::Grassland);
        assert!(!report.stalled);
        assert_eq!(report.generated, 2);
        assert_eq!(window.frontier(), Some(61));
        assert_eq!(window.stats().failed_attempts, 1);
    }

    #[test]
    fn test_partial_failure_rolls_back_handles() {
        let mut scene = RecordingScene::new();
        let mut window = window();
        window.initialize(&mut scene, Biome::Grassland);

        // Room for the road and one terrain strip only
        scene.set_capacity(Some(scene.live_count() + 2));
        let live_before = scene.live_count();
        let report = window.update(&mut scene, 10.0, Biome::Grassland);

        assert!(report.stalled);
        assert_eq!(scene.live_count(), live_before);
        assert_eq!(scene.live_count(), window.live_handle_count());
        assert!(scene.double_disposals().is_empty());
    }

    #[test]
    fn test_road_at_interpolates() {
        let mut scene = RecordingScene::new();
        let mut window = window();
        window.initialize(&mut scene, Biome::Grassland);

        let a = *window.segment(3).unwrap();
        let b = *window.segment(4).unwrap();
        let mid = window.road_at(35.0).unwrap();

        assert!((mid.curve - (a.curve + b.curve) / 2.0).abs() < 1e-3);
        assert!((mid.elevation - (a.elevation + b.elevation) / 2.0).abs() < 1e-3);
        assert!(window.road_at(-5.0).is_none());
        assert!(window.road_at(10_000.0).is_none());
    }

    #[test]
    fn test_dispose_all_releases_everything() {
        let mut scene = RecordingScene::new();
        let mut window = window();
        window.initialize(&mut scene, Biome::Forest);
        for step in 1..200 {
            window.update(&mut scene, step as f32 * 7.5, Biome::Forest);
        }

        let disposed = window.dispose_all(&mut scene);
        assert!(disposed > 0);
        assert_eq!(scene.live_count(), 0);
        assert_eq!(scene.created_count(), scene.disposed_count());
        assert_eq!(window.frontier(), None);
        assert_eq!(window.live_handle_count(), 0);
    }

    #[test]
    fn test_non_finite_position_is_ignored() {
        let mut scene = RecordingScene::new();
        let mut window = window();
        window.initialize(&mut scene, Biome::Grassland);

        for z in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
            let report = window.update(&mut scene, z, Biome::Grassland);
            assert_eq!(report, StreamReport::default());
        }
        assert_eq!(window.frontier(), Some(59));
        assert_eq!(window.vehicle_index(), 0);
        assert!(window.road_at(f32::INFINITY).is_none());
        assert!(window.road_at(-1.0e30).is_none());
    }

    #[test]
    fn test_huge_jump_is_bounded() {
        let mut scene = RecordingScene::new();
        let mut window = window();
        window.initialize(&mut scene, Biome::Grassland);

        let report = window.update(&mut scene, 1.0e12, Biome::Grassland);
        let vehicle_index = window.vehicle_index();
        assert!(vehicle_index > 99_000_000_000);
        assert_eq!(window.frontier(), Some(vehicle_index + 60));
        assert_eq!(window.oldest_index(), Some(vehicle_index - 20));
        assert_eq!(report.generated, 81);
        assert_eq!(window.segments().len(), 81);
        assert!(window.is_contiguous());

        window.update(&mut scene, 1.0e30, Biome::Grassland);
        assert_eq!(window.vehicle_index(), MAX_VEHICLE_INDEX);
        assert_eq!(window.frontier(), Some(MAX_VEHICLE_INDEX + 60));
        assert_eq!(window.segments().len(), 81);
        assert!(window.is_contiguous());
        assert_eq!(scene.live_count(), window.live_handle_count());
        assert_eq!(scene.created_count(), scene.disposed_count() + scene.live_count() as u64);
        assert!(scene.double_disposals().is_empty());
    }

    #[test]
    fn test_reset_while_pending_leaves_no_handles() {
        let mut scene = RecordingScene::new();
        let mut window = window();
        window.initialize(&mut scene, Biome::Grassland);

        scene.set_capacity(Some(scene.live_count() + 2));
        window.update(&mut scene, 50.0, Biome::Grassland);
        window.update(&mut scene, 50.0, Biome::Grassland);
        assert!(window.is_stalled());
        assert_eq!(window.pending_attempts(), 2);

        window.reset(&mut scene, Biome::Grassland);
        assert_eq!(window.frontier(), Some(59));
        assert_eq!(scene.live_count(), window.live_handle_count());
        assert_eq!(scene.created_count(), scene.disposed_count() + scene.live_count() as u64);
        assert!(scene.double_disposals().is_empty());
        assert!(scene.unknown_disposals().is_empty());

        scene.set_capacity(None);
        let report = window.update(&mut scene, 0.0, Biome::Grassland);
        assert!(!report.stalled);
        assert!(!window.is_stalled());
        assert_eq!(window.oldest_index(), Some(0));
        assert_eq!(window.frontier(), Some(60));
        assert!(window.is_contiguous());
        assert_eq!(scene.live_count(), window.live_handle_count());
    }
}
