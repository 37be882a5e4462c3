//! World facade.
//!
//! Owns the scene collaborator, the streaming window and the vehicle, and runs
//! one tick per `update(dt)`: physics first, then streaming around the new
//! vehicle position, then the vehicle is pinned to the road height.

use crate::car_catalog::{CarCatalog, CarSpec, UnlockRequirement};
use crate::config::DriveConfig;
use crate::data::*;
use crate::physics;
use crate::procgen::Biome;
use crate::profile::{Customization, Profile};
use crate::scene::Scene;
use crate::streaming::{StreamReport, StreamingWindow};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Outcome of [`World::select_car`]
#[derive(Debug, Clone, PartialEq)]
pub enum CarSelection {
    Selected(CarId),
    /// The id was not in the catalog; the default car is driven instead
    UnknownFallback { requested: String, fallback: CarId },
    /// The car exists but the profile has not unlocked it; nothing changed
    Locked { requested: CarId, requirement: UnlockRequirement },
}

/// Statistics of the current run, cleared by reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub ticks: u64,
    pub elapsed_s: f64,
    pub distance_m: f64,
    pub top_speed_kmh: f32,
}

/// Serializable view of the world for HUDs and logs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub position: [f32; 3],
    pub speed_kmh: f32,
    pub heading_rad: f32,
    pub drift: f32,
    pub headlights: bool,
    pub car: CarId,
    pub biome: Biome,
    pub weather: Weather,
    pub vehicle_index: SegmentIndex,
    pub frontier: Option<SegmentIndex>,
    pub live_segments: usize,
    pub live_terrain: usize,
    pub live_scenery: usize,
    /// Distance from the road centerline, positive to the left
    pub lateral_offset_m: Option<f32>,
    pub stalled: bool,
    pub distance_m: f64,
    pub top_speed_kmh: f32,
}

pub struct World<S: Scene> {
    config: DriveConfig,
    scene: S,
    catalog: CarCatalog,
    profile: Profile,
    profile_dirty: bool,
    streaming: StreamingWindow,
    vehicle: VehicleState,
    car: CarSpec,
    biome: Biome,
    weather: Weather,
    initialized: bool,
    run: RunStats,
}

impl<S: Scene> World<S> {
    pub fn new(config: DriveConfig, scene: S, catalog: CarCatalog, mut profile: Profile) -> Self {
        let car = match catalog.get(&profile.selected_car) {
            Some(car) if car.unlock.is_met(&profile.stats) => car.clone(),
            Some(car) => {
                warn!(
                    "Profile car '{}' is locked ({:?}), driving '{}'",
                    car.id,
                    car.unlock,
                    catalog.default_car().id
                );
                catalog.default_car().clone()
            }
            None => catalog.get_or_default(&profile.selected_car).clone(),
        };
        let profile_dirty = profile.selected_car != car.id;
        if profile_dirty {
            profile.selected_car = car.id.clone();
        }
        let streaming = StreamingWindow::new(&config.world, &config.noise);

        Self {
            config,
            scene,
            catalog,
            profile,
            profile_dirty,
            streaming,
            vehicle: VehicleState::default(),
            car,
            biome: Biome::default(),
            weather: Weather::default(),
            initialized: false,
            run: RunStats::default(),
        }
    }

    /// Stream the first window of road and place the vehicle on segment 0
    pub fn initialize(&mut self) -> StreamReport {
        if self.initialized {
            warn!("World already initialized");
            return StreamReport::default();
        }

        let report = self.streaming.initialize(&mut self.scene, self.biome);
        self.place_vehicle_at_start();
        self.initialized = true;

        info!(
            "World initialized: car '{}', biome {}, seed {}",
            self.car.id,
            self.biome,
            self.streaming.seed()
        );
        report
    }

    fn place_vehicle_at_start(&mut self) {
        // Driver-owned state survives the move
        let (headlights, inputs) = (self.vehicle.headlights, self.vehicle.inputs);
        let start = self.streaming.road_at(0.0).unwrap_or_default();
        self.vehicle = VehicleState::at(start.curve, start.elevation, 0.0);
        self.vehicle.headlights = headlights;
        self.vehicle.inputs = inputs;
    }

    /// Advance the world by `dt` seconds
    pub fn update(&mut self, dt: f32) -> StreamReport {
        if !self.initialized {
            self.initialize();
        }
        if !dt.is_finite() || dt <= 0.0 {
            return StreamReport::default();
        }

        let (prev_x, prev_z) = (self.vehicle.pos_x, self.vehicle.pos_z);
        physics::update_vehicle(&mut self.vehicle, &self.car, &self.config.physics, dt);

        let report = self.streaming.update(&mut self.scene, self.vehicle.pos_z, self.biome);
        if let Some(road) = self.streaming.road_at(self.vehicle.pos_z) {
            physics::settle_on_road(&mut self.vehicle, road.elevation);
        }

        let moved = f64::from((self.vehicle.pos_x - prev_x).hypot(self.vehicle.pos_z - prev_z));
        self.run.ticks += 1;
        self.run.elapsed_s += f64::from(dt);
        self.run.distance_m += moved;
        self.run.top_speed_kmh = self.run.top_speed_kmh.max(self.vehicle.speed_kmh);

        report
    }

    /// Replace the level-triggered inputs for the next tick
    pub fn set_input(&mut self, inputs: InputState) {
        self.vehicle.inputs = inputs;
    }

    pub fn toggle_headlights(&mut self) -> bool {
        self.vehicle.headlights = !self.vehicle.headlights;
        debug!("Headlights {}", if self.vehicle.headlights { "on" } else { "off" });
        self.vehicle.headlights
    }

    /// Dispose every live handle, forget the road and start over at segment 0
    pub fn reset(&mut self) -> StreamReport {
        self.finish_run();
        let report = self.streaming.reset(&mut self.scene, self.biome);
        self.place_vehicle_at_start();
        self.initialized = true;
        info!("World reset (seed {})", self.streaming.seed());
        report
    }

    /// Dispose every live handle without generating a new road
    pub fn teardown(&mut self) -> usize {
        self.finish_run();
        let disposed = self.streaming.dispose_all(&mut self.scene);
        self.initialized = false;
        info!("World torn down, {} handles disposed", disposed);
        disposed
    }

    fn finish_run(&mut self) {
        if self.run.distance_m > 0.0 {
            self.profile.record_run(self.run.distance_m, self.run.top_speed_kmh);
            self.profile_dirty = true;
        }
        self.run = RunStats::default();
    }

    // --- Biome / weather ---

    /// Only segments generated after the change use the new biome
    pub fn set_biome(&mut self, biome: Biome) {
        if biome != self.biome {
            info!("Biome changed: {} -> {}", self.biome, biome);
            self.biome = biome;
        }
    }

    pub fn cycle_biome(&mut self) -> Biome {
        self.set_biome(self.biome.next());
        self.biome
    }

    pub fn set_weather(&mut self, weather: Weather) {
        if weather != self.weather {
            info!("Weather changed: {:?} -> {:?}", self.weather, weather);
            self.weather = weather;
        }
    }

    pub fn cycle_weather(&mut self) -> Weather {
        self.set_weather(self.weather.next());
        self.weather
    }

    // --- Cars / profile ---

    pub fn select_car(&mut self, id: &str) -> CarSelection {
        let selection = match self.catalog.get(id) {
            None => {
                let fallback = self.catalog.get_or_default(id).clone();
                let selection = CarSelection::UnknownFallback {
                    requested: id.to_string(),
                    fallback: fallback.id.clone(),
                };
                self.car = fallback;
                selection
            }
            Some(car) if !car.unlock.is_met(&self.profile.stats) => {
                info!("Car '{}' is locked ({:?})", car.id, car.unlock);
                return CarSelection::Locked {
                    requested: car.id.clone(),
                    requirement: car.unlock,
                };
            }
            Some(car) => {
                self.car = car.clone();
                CarSelection::Selected(car.id.clone())
            }
        };

        self.vehicle.speed_kmh = self.vehicle.speed_kmh.min(self.car.max_speed_kmh);
        if self.profile.selected_car != self.car.id {
            self.profile.selected_car = self.car.id.clone();
            self.profile_dirty = true;
        }
        info!("Driving '{}' ({})", self.car.id, self.car.name);
        selection
    }

    pub fn customize(&mut self, customization: Customization) {
        if self.profile.customization != customization {
            self.profile.customization = customization;
            self.profile_dirty = true;
        }
    }

    /// Profile to persist, if it changed since the last call
    pub fn take_profile_changes(&mut self) -> Option<Profile> {
        if self.profile_dirty {
            self.profile_dirty = false;
            Some(self.profile.clone())
        } else {
            None
        }
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let lateral_offset_m = self
            .streaming
            .road_at(self.vehicle.pos_z)
            .map(|road| physics::lateral_offset(&self.vehicle, road.curve));

        WorldSnapshot {
            tick: self.run.ticks,
            position: [self.vehicle.pos_x, self.vehicle.pos_y, self.vehicle.pos_z],
            speed_kmh: self.vehicle.speed_kmh,
            heading_rad: self.vehicle.heading_rad,
            drift: self.vehicle.drift,
            headlights: self.vehicle.headlights,
            car: self.car.id.clone(),
            biome: self.biome,
            weather: self.weather,
            vehicle_index: self.streaming.vehicle_index(),
            frontier: self.streaming.frontier(),
            live_segments: self.streaming.segments().len(),
            live_terrain: self.streaming.terrain().len(),
            live_scenery: self.streaming.scenery().len(),
            lateral_offset_m,
            stalled: self.streaming.is_stalled(),
            distance_m: self.run.distance_m,
            top_speed_kmh: self.run.top_speed_kmh,
        }
    }

    // --- Accessors ---

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn vehicle(&self) -> &VehicleState {
        &self.vehicle
    }

    pub fn car(&self) -> &CarSpec {
        &self.car
    }

    pub fn catalog(&self) -> &CarCatalog {
        &self.catalog
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn biome(&self) -> Biome {
        self.biome
    }

    pub fn weather(&self) -> Weather {
        self.weather
    }

    pub fn streaming(&self) -> &StreamingWindow {
        &self.streaming
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn run_stats(&self) -> &RunStats {
        &self.run
    }
}
