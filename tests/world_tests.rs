use endless_drive::autopilot::Autopilot;
use endless_drive::car_catalog::CarCatalog;
use endless_drive::config::{DriveConfig, PhysicsSettings};
use endless_drive::data::{InputState, VehicleState, Weather};
use endless_drive::physics;
use endless_drive::procgen::Biome;
use endless_drive::profile::Profile;
use endless_drive::scene::RecordingScene;
use endless_drive::world::{CarSelection, World};
use proptest::prelude::*;

const DT: f32 = 1.0 / 60.0;

fn seeded_world(seed: u64, profile: Profile) -> World<RecordingScene> {
    let mut config = DriveConfig::default();
    config.world.seed = Some(seed);
    World::new(config, RecordingScene::new(), CarCatalog::builtin(), profile)
}

fn full_throttle() -> InputState {
    InputState {
        accelerate: true,
        ..InputState::default()
    }
}

#[test]
fn test_run_then_reset_then_teardown_is_leak_free() {
    let mut world = seeded_world(10, Profile::default());
    world.initialize();
    world.set_input(full_throttle());
    for _ in 0..3_600 {
        world.update(DT);
    }
    assert!(world.streaming().oldest_index().unwrap() > 0);

    world.reset();
    assert_eq!(world.streaming().oldest_index(), Some(0));
    assert_eq!(world.streaming().frontier(), Some(59));
    assert_eq!(world.scene().live_count(), world.streaming().live_handle_count());

    world.teardown();
    let scene = world.scene();
    assert_eq!(scene.live_count(), 0);
    assert_eq!(scene.created_count(), scene.disposed_count());
    assert!(scene.double_disposals().is_empty());
    assert!(scene.unknown_disposals().is_empty());
}

#[test]
fn test_biome_is_captured_when_chunks_are_created() {
    let mut world = seeded_world(11, Profile::default());
    world.initialize();
    world.set_input(full_throttle());
    for _ in 0..300 {
        world.update(DT);
    }

    let frontier_at_switch = world.streaming().frontier().unwrap();
    world.set_biome(Biome::Canyon);
    for _ in 0..300 {
        world.update(DT);
    }
    assert!(world.streaming().frontier().unwrap() > frontier_at_switch);

    for placed in world.streaming().terrain() {
        let expected = if placed.item.index > frontier_at_switch {
            Biome::Canyon
        } else {
            Biome::Grassland
        };
        assert_eq!(placed.item.biome, expected, "index {}", placed.item.index);
    }
}

#[test]
fn test_unknown_profile_car_drives_default() {
    let profile = Profile {
        selected_car: "hovercraft".to_string(),
        ..Profile::default()
    };
    let mut world = seeded_world(12, profile);
    assert_eq!(world.car().id, "sedan");
    assert_eq!(world.take_profile_changes().unwrap().selected_car, "sedan");
}

#[test]
fn test_locked_profile_car_is_not_driven() {
    let profile = Profile {
        selected_car: "supercar".to_string(),
        ..Profile::default()
    };
    let mut world = seeded_world(19, profile);
    assert_eq!(world.car().id, "sedan");
    assert_eq!(world.profile().selected_car, "sedan");
    assert_eq!(world.take_profile_changes().unwrap().selected_car, "sedan");

    let mut unlocked = Profile {
        selected_car: "supercar".to_string(),
        ..Profile::default()
    };
    unlocked.stats.total_distance_km = 1.0e6;
    unlocked.stats.top_speed_kmh = 1.0e3;
    let mut world = seeded_world(19, unlocked);
    assert_eq!(world.car().id, "supercar");
    assert!(world.take_profile_changes().is_none());
}

#[test]
fn test_huge_time_step_does_not_break_streaming() {
    let mut world = seeded_world(20, Profile::default());
    world.initialize();
    world.set_input(full_throttle());
    world.update(1.0e30);
    let far = world.vehicle().pos_z;
    assert!(far.is_finite() && far > 1.0e30);

    world.set_input(InputState {
        accelerate: true,
        steer_left: true,
        ..InputState::default()
    });
    world.update(f32::MAX);
    world.update(DT);
    assert!(world.vehicle().pos_x.is_finite());
    assert!(world.vehicle().pos_z.is_finite());

    let streaming = world.streaming();
    assert!(streaming.is_contiguous());
    assert_eq!(streaming.segments().len(), 81);
    assert_eq!(world.scene().live_count(), streaming.live_handle_count());
    assert!(world.vehicle().heading_rad.is_finite());
    assert!(world.vehicle().speed_kmh <= world.car().max_speed_kmh);

    world.teardown();
    assert_eq!(world.scene().live_count(), 0);
    assert!(world.scene().double_disposals().is_empty());
}

#[test]
fn test_unlocked_car_selection_is_persisted() {
    let mut profile = Profile::default();
    profile.stats.total_distance_km = 20.0;
    let mut world = seeded_world(13, profile);

    assert_eq!(world.select_car("pickup"), CarSelection::Selected("pickup".to_string()));
    assert_eq!(world.car().max_speed_kmh, 150.0);
    let saved = world.take_profile_changes().unwrap();
    assert_eq!(saved.selected_car, "pickup");
    assert!(world.take_profile_changes().is_none());
}

#[test]
fn test_brake_dominates_in_world() {
    let mut world = seeded_world(14, Profile::default());
    world.set_input(full_throttle());
    for _ in 0..240 {
        world.update(DT);
    }
    let cruising = world.vehicle().speed_kmh;
    assert!(cruising > 50.0);

    world.set_input(InputState {
        accelerate: true,
        brake: true,
        ..InputState::default()
    });
    world.update(DT);
    assert!(world.vehicle().speed_kmh < cruising);

    for _ in 0..600 {
        world.update(DT);
    }
    assert_eq!(world.vehicle().speed_kmh, 0.0);
}

#[test]
fn test_vehicle_follows_road_elevation() {
    let mut world = seeded_world(15, Profile::default());
    world.set_input(full_throttle());
    for _ in 0..600 {
        world.update(DT);
    }
    let vehicle = world.vehicle();
    let road = world.streaming().road_at(vehicle.pos_z).unwrap();
    assert!((vehicle.pos_y - road.elevation).abs() < 1e-4);
}

#[test]
fn test_autopilot_stays_on_road() {
    let mut world = seeded_world(16, Profile::default());
    let autopilot = Autopilot::default();
    let half_road = world.config().world.road_width / 2.0;
    world.initialize();

    for _ in 0..(60 * 90) {
        let input = autopilot.drive(world.vehicle(), world.streaming());
        world.set_input(input);
        world.update(DT);

        let offset = world.snapshot().lateral_offset_m.unwrap();
        assert!(offset.abs() < half_road, "offset {} at z {}", offset, world.vehicle().pos_z);
    }
    assert!(world.run_stats().distance_m > 1_500.0);
}

#[test]
fn test_snapshot_serializes() {
    let mut world = seeded_world(17, Profile::default());
    world.initialize();
    world.set_weather(Weather::Fog);
    world.toggle_headlights();

    let json = serde_json::to_value(world.snapshot()).unwrap();
    assert_eq!(json["weather"], "fog");
    assert_eq!(json["biome"], "grassland");
    assert_eq!(json["headlights"], true);
    assert_eq!(json["frontier"], 59);
    assert_eq!(json["live_segments"], 60);
}

#[test]
fn test_reset_keeps_headlights_and_clears_run() {
    let mut world = seeded_world(18, Profile::default());
    world.toggle_headlights();
    world.set_input(full_throttle());
    for _ in 0..120 {
        world.update(DT);
    }

    world.reset();
    assert!(world.vehicle().headlights);
    assert_eq!(world.vehicle().speed_kmh, 0.0);
    assert_eq!(world.run_stats().ticks, 0);
    assert!(world.profile().stats.total_distance_km > 0.0);
}

fn input_strategy() -> impl Strategy<Value = InputState> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(accelerate, brake, steer_left, steer_right)| {
        InputState {
            accelerate,
            brake,
            steer_left,
            steer_right,
        }
    })
}

proptest! {
    #[test]
    fn prop_speed_stays_within_car_limits(
        car_index in 0usize..7,
        inputs in prop::collection::vec((input_strategy(), 1usize..120), 1..40),
    ) {
        let catalog = CarCatalog::builtin();
        let car = catalog.iter().nth(car_index).unwrap().clone();
        let settings = PhysicsSettings::default();
        let mut state = VehicleState::default();

        for (input, ticks) in inputs {
            state.inputs = input;
            for _ in 0..ticks {
                let before = state.speed_kmh;
                physics::update_vehicle(&mut state, &car, &settings, DT);

                prop_assert!(state.speed_kmh >= 0.0);
                prop_assert!(state.speed_kmh <= car.max_speed_kmh);
                prop_assert!(state.heading_rad.abs() <= std::f32::consts::PI + 1e-4);
                prop_assert!((0.0..=1.0).contains(&state.drift));
                if input.brake {
                    prop_assert!(state.speed_kmh <= before);
                }
            }
        }
    }
}
