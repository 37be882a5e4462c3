use clap::Parser;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use endless_drive::{
    car_catalog::CarCatalog,
    config::DriveConfig,
    data::{InputState, SceneryKind},
    profile::Profile,
    scene::RecordingScene,
    world::{CarSelection, World},
};
use std::fs::File;
use std::io::{self, Write};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Terminals only report key presses (and auto-repeat), so a control counts
/// as held until this long after its last press.
const KEY_HOLD: Duration = Duration::from_millis(180);
const DRAW_INTERVAL: Duration = Duration::from_millis(50);
const HUD_ROWS: u16 = 4;
const METERS_PER_ROW: f32 = 4.0;
const METERS_PER_COL: f32 = 1.0;

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive the endless road in the terminal", long_about = None)]
struct Args {
    /// Path to drive.toml configuration file
    #[arg(short, long, default_value = "./drive.toml")]
    config: String,

    /// Override log level (trace|debug|info|warn|error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Logs go to this file while the terminal is in raw mode
    #[arg(long, default_value = "./drive.log")]
    log_file: String,

    /// Fixed road seed
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Default)]
struct Controls {
    accelerate: Option<Instant>,
    brake: Option<Instant>,
    left: Option<Instant>,
    right: Option<Instant>,
}

impl Controls {
    fn slot(&mut self, code: KeyCode) -> Option<&mut Option<Instant>> {
        match code {
            KeyCode::Up | KeyCode::Char('w') => Some(&mut self.accelerate),
            KeyCode::Down | KeyCode::Char('s') | KeyCode::Char(' ') => Some(&mut self.brake),
            KeyCode::Left | KeyCode::Char('a') => Some(&mut self.left),
            KeyCode::Right | KeyCode::Char('d') => Some(&mut self.right),
            _ => None,
        }
    }

    fn press(&mut self, code: KeyCode, now: Instant) {
        if let Some(slot) = self.slot(code) {
            *slot = Some(now);
        }
    }

    fn release(&mut self, code: KeyCode) {
        if let Some(slot) = self.slot(code) {
            *slot = None;
        }
    }

    fn input(&self, now: Instant) -> InputState {
        let held = |pressed: Option<Instant>| pressed.is_some_and(|at| now.duration_since(at) < KEY_HOLD);
        InputState {
            accelerate: held(self.accelerate),
            brake: held(self.brake),
            steer_left: held(self.left),
            steer_right: held(self.right),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = DriveConfig::load_or_default(&args.config);
    if args.seed.is_some() {
        config.world.seed = args.seed;
    }

    let log_level = args.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    let log_file = File::create(&args.log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    info!("Starting interactive drive");

    let mut catalog = CarCatalog::builtin();
    catalog.load_dir(&config.simulation.cars_dir);
    let profile_path = config.simulation.profile_path.clone();
    let profile = Profile::load_or_default(&profile_path);

    let mut world = World::new(config, RecordingScene::new(), catalog, profile);
    world.initialize();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let result = run(&mut world, &mut stdout);

    // Cleanup terminal
    execute!(stdout, Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;

    let run = *world.run_stats();
    world.teardown();
    if let Some(profile) = world.take_profile_changes() {
        if let Err(e) = profile.save(&profile_path) {
            warn!("Failed to save profile {}: {}", profile_path, e);
        }
    }
    println!(
        "Drove {:.2} km, top speed {:.0} km/h",
        run.distance_m / 1000.0,
        run.top_speed_kmh
    );

    result?;
    Ok(())
}

fn run(world: &mut World<RecordingScene>, out: &mut impl Write) -> io::Result<()> {
    let dt = world.config().tick_dt();
    let tick = Duration::from_secs_f32(dt);
    let mut controls = Controls::default();
    let mut last_draw: Option<Instant> = None;
    let mut status = String::new();

    loop {
        let frame_start = Instant::now();

        while event::poll(Duration::ZERO)? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind == KeyEventKind::Release {
                controls.release(key.code);
                continue;
            }
            if is_quit(&key) {
                return Ok(());
            }
            match key.code {
                KeyCode::Char('h') => {
                    let on = world.toggle_headlights();
                    status = format!("Headlights {}", if on { "on" } else { "off" });
                }
                KeyCode::Char('b') => status = format!("Biome: {}", world.cycle_biome()),
                KeyCode::Char('f') => status = format!("Weather: {:?}", world.cycle_weather()),
                KeyCode::Char('r') => {
                    world.reset();
                    controls = Controls::default();
                    status = "Road reset".to_string();
                }
                KeyCode::Char('n') => status = switch_car(world),
                code => controls.press(code, frame_start),
            }
        }

        world.set_input(controls.input(frame_start));
        world.update(dt);

        if last_draw.map_or(true, |at| frame_start.duration_since(at) >= DRAW_INTERVAL) {
            draw(out, world, &status)?;
            last_draw = Some(frame_start);
        }

        if let Some(remaining) = tick.checked_sub(frame_start.elapsed()) {
            thread::sleep(remaining);
        }
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Move to the next unlocked car in catalog order
fn switch_car(world: &mut World<RecordingScene>) -> String {
    let stats = world.profile().stats;
    let unlocked: Vec<String> = world.catalog().unlocked(&stats).map(|car| car.id.clone()).collect();
    let next = match unlocked.iter().position(|id| *id == world.car().id) {
        Some(i) => unlocked[(i + 1) % unlocked.len()].clone(),
        None => match unlocked.first() {
            Some(id) => id.clone(),
            None => return "No cars unlocked".to_string(),
        },
    };

    match world.select_car(&next) {
        CarSelection::Selected(id) => format!("Car: {}", id),
        CarSelection::UnknownFallback { fallback, .. } => format!("Car: {}", fallback),
        CarSelection::Locked { requested, .. } => format!("{} is locked", requested),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}

fn draw(out: &mut impl Write, world: &World<RecordingScene>, status: &str) -> io::Result<()> {
    let (width, height) = terminal::size()?;
    let cols = usize::from(width.max(20));
    let view_rows = usize::from(height.saturating_sub(HUD_ROWS + 1).max(1));
    let snapshot = world.snapshot();

    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;

    let hud = [
        format!(
            " {} | {:>3.0} km/h | heading {:+.2} | drift {:.2} | lights {}",
            world.car().name,
            snapshot.speed_kmh,
            snapshot.heading_rad,
            snapshot.drift,
            if snapshot.headlights { "on" } else { "off" }
        ),
        format!(
            " {} | {:?} | {:.2} km | top {:.0} km/h | offset {:+.1} m",
            snapshot.biome,
            snapshot.weather,
            snapshot.distance_m / 1000.0,
            snapshot.top_speed_kmh,
            snapshot.lateral_offset_m.unwrap_or(0.0)
        ),
        format!(
            " segments {} | terrain {} | scenery {} | frontier {:?}{}  {}",
            snapshot.live_segments,
            snapshot.live_terrain,
            snapshot.live_scenery,
            snapshot.frontier,
            if snapshot.stalled { " | STALLED" } else { "" },
            status
        ),
        " arrows/WASD drive  h lights  b biome  f weather  n car  r reset  q quit".to_string(),
    ];
    for (row, line) in hud.iter().enumerate() {
        queue!(out, MoveTo(0, row as u16), Print(truncate(line, cols)))?;
    }

    let grid = render_road(world, cols, view_rows);
    for (row, line) in grid.iter().enumerate() {
        let text: String = line.iter().collect();
        queue!(out, MoveTo(0, HUD_ROWS + row as u16), Print(text))?;
    }

    // Car marker on the bottom row
    queue!(
        out,
        MoveTo((cols / 2) as u16, HUD_ROWS + view_rows as u16 - 1),
        SetForegroundColor(Color::Yellow),
        Print('A'),
        ResetColor
    )?;

    out.flush()
}

/// Top-down view ahead of the car; screen left is the car's left (+X)
fn render_road(world: &World<RecordingScene>, cols: usize, rows: usize) -> Vec<Vec<char>> {
    let vehicle = world.vehicle();
    let half_road = world.config().world.road_width / 2.0;
    let half_cols = cols as f32 / 2.0;
    let mut grid = vec![vec![' '; cols]; rows];

    let to_col = |x: f32| -> Option<usize> {
        let col = (half_cols - (x - vehicle.pos_x) / METERS_PER_COL).floor();
        (col >= 0.0 && col < cols as f32).then_some(col as usize)
    };

    for (row, line) in grid.iter_mut().enumerate() {
        let z = vehicle.pos_z + (rows - 1 - row) as f32 * METERS_PER_ROW;
        let Some(road) = world.streaming().road_at(z) else {
            continue;
        };
        for (col, cell) in line.iter_mut().enumerate() {
            let x = vehicle.pos_x + (half_cols - col as f32) * METERS_PER_COL;
            let from_center = (x - road.curve).abs();
            if (from_center - half_road).abs() < METERS_PER_COL / 2.0 {
                *cell = '|';
            } else if from_center < half_road {
                *cell = '.';
            }
        }
    }

    for placed in world.streaming().scenery() {
        let ahead = placed.item.z - vehicle.pos_z;
        if ahead < 0.0 {
            continue;
        }
        let from_bottom = (ahead / METERS_PER_ROW) as usize;
        if from_bottom >= rows {
            continue;
        }
        if let Some(col) = to_col(placed.item.x) {
            grid[rows - 1 - from_bottom][col] = match placed.item.kind {
                SceneryKind::Tree => 'T',
                SceneryKind::Rock => 'o',
                SceneryKind::Bush => '*',
                SceneryKind::Sign => '#',
            };
        }
    }

    grid
}
