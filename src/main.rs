use clap::Parser;
use endless_drive::{
    autopilot::Autopilot,
    car_catalog::CarCatalog,
    config::DriveConfig,
    procgen::Biome,
    profile::Profile,
    scene::RecordingScene,
    world::{CarSelection, World},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Ticks between cooperative yields when running unpaced
const FAST_YIELD_EVERY: u64 = 1024;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless endless-road run driven by the autopilot", long_about = None)]
struct Args {
    /// Path to drive.toml configuration file
    #[arg(short, long, default_value = "./drive.toml")]
    config: String,

    /// Override log level (trace|debug|info|warn|error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Stop after this many simulated seconds (runs until Ctrl+C when unset)
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Run ticks back to back instead of pacing them in real time
    #[arg(long)]
    fast: bool,

    /// Car id to drive (falls back to the profile's car)
    #[arg(long)]
    car: Option<String>,

    /// Fixed road seed
    #[arg(long)]
    seed: Option<u64>,

    /// Starting biome
    #[arg(long)]
    biome: Option<String>,

    /// Autopilot cruising speed (km/h)
    #[arg(long, default_value_t = 100.0)]
    target_speed: f32,

    /// Simulated seconds between progress logs
    #[arg(long, default_value_t = 5.0)]
    report_every: f64,
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = DriveConfig::load_or_default(&args.config);
    let log_level = args.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    init_tracing(&log_level, args.json_logs);

    info!("Starting endless-drive v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", args.config);

    if args.seed.is_some() {
        config.world.seed = args.seed;
    }
    info!("Tick rate: {}Hz", config.simulation.tick_rate_hz);
    info!(
        "Render distance: {} segments ahead, {} behind",
        config.world.render_distance, config.world.trailing_window
    );

    let mut catalog = CarCatalog::builtin();
    catalog.load_dir(&config.simulation.cars_dir);
    info!("{} car(s) available", catalog.len());

    let profile_path = config.simulation.profile_path.clone();
    let mut profile = Profile::load_or_default(&profile_path);
    if profile.selected_car.is_empty() {
        profile.selected_car = config.simulation.default_car.clone();
    }

    let mut world = World::new(config, RecordingScene::new(), catalog, profile);

    if let Some(name) = &args.biome {
        match Biome::from_name(name) {
            Some(biome) => world.set_biome(biome),
            None => warn!("Unknown biome '{}', keeping {}", name, world.biome()),
        }
    }
    if let Some(car) = &args.car {
        match world.select_car(car) {
            CarSelection::Selected(id) => info!("Selected car '{}'", id),
            CarSelection::UnknownFallback { requested, fallback } => {
                warn!("Unknown car '{}', driving '{}'", requested, fallback)
            }
            CarSelection::Locked { requested, requirement } => {
                warn!("Car '{}' is locked ({:?}), driving '{}'", requested, requirement, world.car().id)
            }
        }
    }

    world.initialize();

    let stop = Arc::new(AtomicBool::new(false));
    let signal_stop = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received. Cleaning up...");
            signal_stop.store(true, Ordering::SeqCst);
        }
    });

    match args.seconds {
        Some(seconds) => info!("Driving for {:.0}s of simulated time", seconds),
        None => info!("Driving until Ctrl+C"),
    }

    let autopilot = Autopilot::with_target_speed(args.target_speed);
    run_drive_loop(&mut world, &autopilot, &args, &stop).await;

    let summary = world.snapshot();
    let run = *world.run_stats();
    let disposed = world.teardown();

    let scene = world.scene();
    info!(
        "Run finished: {:.2} km, top speed {:.0} km/h, {} ticks",
        run.distance_m / 1000.0,
        run.top_speed_kmh,
        run.ticks
    );
    info!(
        "Geometry: {} created, {} disposed ({} at teardown), peak {} live",
        scene.created_count(),
        scene.disposed_count(),
        disposed,
        scene.peak_live()
    );
    if scene.live_count() != 0 || !scene.double_disposals().is_empty() || !scene.unknown_disposals().is_empty() {
        warn!(
            "Geometry leak detected: {} live, {} double disposals, {} unknown disposals",
            scene.live_count(),
            scene.double_disposals().len(),
            scene.unknown_disposals().len()
        );
    }

    if let Some(profile) = world.take_profile_changes() {
        match profile.save(&profile_path) {
            Ok(()) => info!("Profile saved to {}", profile_path),
            Err(e) => warn!("Failed to save profile {}: {}", profile_path, e),
        }
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run_drive_loop(world: &mut World<RecordingScene>, autopilot: &Autopilot, args: &Args, stop: &AtomicBool) {
    let dt = world.config().tick_dt();
    let tick_rate = world.config().simulation.tick_rate_hz.max(1);
    let biome_cycle = f64::from(world.config().simulation.biome_cycle_seconds);

    let tick_duration = Duration::from_micros((1_000_000.0 / f64::from(tick_rate)) as u64);
    let mut ticker = interval(tick_duration);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut next_report = args.report_every.max(0.1);
    let mut next_biome = if biome_cycle > 0.0 { biome_cycle } else { f64::INFINITY };
    let mut tick_count = 0u64;

    loop {
        if args.fast {
            if tick_count % FAST_YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
        } else {
            ticker.tick().await;
        }
        if stop.load(Ordering::SeqCst) {
            break;
        }
        tick_count += 1;

        let input = autopilot.drive(world.vehicle(), world.streaming());
        world.set_input(input);
        let report = world.update(dt);
        if report.stalled {
            debug!("Frontier stalled at {:?}", world.streaming().frontier());
        }

        let elapsed = world.run_stats().elapsed_s;
        if elapsed >= next_biome {
            let biome = world.cycle_biome();
            debug!("Cycled biome to {}", biome);
            next_biome += biome_cycle;
        }
        if elapsed >= next_report {
            let snapshot = world.snapshot();
            info!(
                "t={:.0}s z={:.0}m speed={:.0}km/h offset={:.1}m biome={} segments={} scenery={} frontier={:?}",
                elapsed,
                snapshot.position[2],
                snapshot.speed_kmh,
                snapshot.lateral_offset_m.unwrap_or(f32::NAN),
                snapshot.biome,
                snapshot.live_segments,
                snapshot.live_scenery,
                snapshot.frontier
            );
            next_report += args.report_every.max(0.1);
        }

        if args.seconds.is_some_and(|limit| elapsed >= limit) {
            break;
        }
    }
}
