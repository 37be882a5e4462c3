use crate::data::CarId;
use crate::error::CatalogError;
use crate::profile::DriveStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_CAR: &str = "sedan";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarType {
    Sedan,
    Hatchback,
    Suv,
    Sports,
    Muscle,
    Pickup,
    Supercar,
}

/// Body box in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BodyDimensions {
    pub length_m: f32,
    pub width_m: f32,
    pub height_m: f32,
}

impl CarType {
    pub fn dimensions(self) -> BodyDimensions {
        let (length_m, width_m, height_m) = match self {
            CarType::Sedan => (4.6, 1.8, 1.45),
            CarType::Hatchback => (4.0, 1.75, 1.45),
            CarType::Suv => (4.8, 1.95, 1.75),
            CarType::Sports => (4.4, 1.85, 1.25),
            CarType::Muscle => (4.8, 1.9, 1.35),
            CarType::Pickup => (5.3, 2.0, 1.85),
            CarType::Supercar => (4.5, 2.0, 1.15),
        };
        BodyDimensions {
            length_m,
            width_m,
            height_m,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnlockRequirement {
    #[default]
    None,
    /// Lifetime distance driven
    Distance { km: f64 },
    /// Top speed reached in any run
    TopSpeed { kmh: f32 },
}

impl UnlockRequirement {
    pub fn is_met(&self, stats: &DriveStats) -> bool {
        match *self {
            UnlockRequirement::None => true,
            UnlockRequirement::Distance { km } => stats.total_distance_km >= km,
            UnlockRequirement::TopSpeed { kmh } => stats.top_speed_kmh >= kmh,
        }
    }
}

/// Static performance figures for one car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarSpec {
    pub id: CarId,
    pub name: String,
    pub car_type: CarType,
    pub max_speed_kmh: f32,
    /// km/h gained per second at full throttle
    pub acceleration: f32,
    /// Steering responsiveness (0-1)
    pub handling: f32,
    pub weight_kg: f32,
    pub unlock: UnlockRequirement,
}

impl CarSpec {
    #[allow(clippy::too_many_arguments)]
    fn builtin(
        id: &str,
        name: &str,
        car_type: CarType,
        max_speed_kmh: f32,
        acceleration: f32,
        handling: f32,
        weight_kg: f32,
        unlock: UnlockRequirement,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            car_type,
            max_speed_kmh,
            acceleration,
            handling,
            weight_kg,
            unlock,
        }
    }
}

// --- car.toml layout ---

#[derive(Debug, Deserialize)]
struct CarToml {
    id: String,
    name: String,
    #[serde(rename = "type")]
    car_type: CarType,
    performance: PerformanceToml,
    #[serde(default)]
    unlock: Option<UnlockToml>,
}

#[derive(Debug, Deserialize)]
struct PerformanceToml {
    max_speed_kmh: f32,
    acceleration: f32,
    handling: f32,
    #[serde(default)]
    weight_kg: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct UnlockToml {
    #[serde(default)]
    distance_km: Option<f64>,
    #[serde(default)]
    top_speed_kmh: Option<f32>,
}

/// Cars keyed by id, with a guaranteed fallback entry
#[derive(Debug, Clone)]
pub struct CarCatalog {
    default: CarSpec,
    cars: BTreeMap<CarId, CarSpec>,
}

impl CarCatalog {
    pub fn builtin() -> Self {
        use CarType::*;
        use UnlockRequirement as U;

        let cars = [
            CarSpec::builtin("sedan", "Sedan", Sedan, 180.0, 25.0, 0.7, 1400.0, U::None),
            CarSpec::builtin("hatchback", "Hatchback", Hatchback, 170.0, 28.0, 0.8, 1100.0, U::Distance { km: 5.0 }),
            CarSpec::builtin("suv", "SUV", Suv, 160.0, 20.0, 0.55, 2100.0, U::Distance { km: 10.0 }),
            CarSpec::builtin("pickup", "Pickup", Pickup, 150.0, 18.0, 0.5, 2300.0, U::Distance { km: 15.0 }),
            CarSpec::builtin("muscle", "Muscle", Muscle, 230.0, 35.0, 0.6, 1700.0, U::TopSpeed { kmh: 170.0 }),
            CarSpec::builtin("sports", "Sports", Sports, 250.0, 40.0, 0.85, 1300.0, U::Distance { km: 50.0 }),
            CarSpec::builtin("supercar", "Supercar", Supercar, 320.0, 55.0, 0.95, 1450.0, U::TopSpeed { kmh: 240.0 }),
        ];

        let default = cars[0].clone();
        let cars = cars.into_iter().map(|car| (car.id.clone(), car)).collect();
        Self { default, cars }
    }

    pub fn get(&self, id: &str) -> Option<&CarSpec> {
        self.cars.get(id)
    }

    /// Look up `id`, falling back to the default car
    pub fn get_or_default(&self, id: &str) -> &CarSpec {
        match self.cars.get(id) {
            Some(car) => car,
            None => {
                warn!("Unknown car '{}', falling back to '{}'", id, self.default.id);
                &self.default
            }
        }
    }

    pub fn default_car(&self) -> &CarSpec {
        &self.default
    }

    /// Add or replace a car; replacing the default id also replaces the fallback
    pub fn insert(&mut self, car: CarSpec) {
        if car.id == self.default.id {
            self.default = car.clone();
        }
        self.cars.insert(car.id.clone(), car);
    }

    pub fn iter(&self) -> impl Iterator<Item = &CarSpec> {
        self.cars.values()
    }

    pub fn len(&self) -> usize {
        self.cars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }

    /// Cars whose unlock requirement the stats satisfy
    pub fn unlocked<'a>(&'a self, stats: &'a DriveStats) -> impl Iterator<Item = &'a CarSpec> + 'a {
        self.cars.values().filter(move |car| car.unlock.is_met(stats))
    }

    /// Merge every `car.toml` under `dir` into the catalog, returning how many loaded
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> usize {
        let dir = dir.as_ref();
        if !dir.exists() {
            info!("Cars directory not found at {:?}, using built-in cars", dir);
            return 0;
        }
        let loaded = self.load_recursive(dir);
        info!("Loaded {} custom cars from {:?}", loaded, dir);
        loaded
    }

    fn load_recursive(&mut self, dir: &Path) -> usize {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read cars directory {:?}: {}", dir, e);
                return 0;
            }
        };

        let mut loaded = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                loaded += self.load_recursive(&path);
            } else if path.file_name().and_then(|s| s.to_str()) == Some("car.toml") {
                match load_car_file(&path) {
                    Ok(car) => {
                        debug!("Loaded car '{}' from {:?}", car.id, path);
                        self.insert(car);
                        loaded += 1;
                    }
                    Err(e) => warn!("Failed to load car from {:?}: {}", path, e),
                }
            }
        }
        loaded
    }
}

impl Default for CarCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Parse and validate a single `car.toml`
pub fn load_car_file(path: &Path) -> Result<CarSpec, CatalogError> {
    let content = std::fs::read_to_string(path)?;
    let car_toml: CarToml = toml::from_str(&content)?;

    let invalid = |reason: &str| CatalogError::Invalid {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if car_toml.id.trim().is_empty() {
        return Err(invalid("empty id"));
    }
    let perf = &car_toml.performance;
    if !perf.max_speed_kmh.is_finite() || perf.max_speed_kmh <= 0.0 {
        return Err(invalid("max_speed_kmh must be positive"));
    }
    if !perf.acceleration.is_finite() || perf.acceleration <= 0.0 {
        return Err(invalid("acceleration must be positive"));
    }
    if !(0.0..=1.0).contains(&perf.handling) {
        return Err(invalid("handling must be within 0-1"));
    }

    let unlock = match car_toml.unlock.unwrap_or_default() {
        UnlockToml {
            distance_km: Some(km), ..
        } => UnlockRequirement::Distance { km },
        UnlockToml {
            top_speed_kmh: Some(kmh),
            ..
        } => UnlockRequirement::TopSpeed { kmh },
        _ => UnlockRequirement::None,
    };

    Ok(CarSpec {
        id: car_toml.id,
        name: car_toml.name,
        car_type: car_toml.car_type,
        max_speed_kmh: perf.max_speed_kmh,
        acceleration: perf.acceleration,
        handling: perf.handling,
        weight_kg: perf.weight_kg.unwrap_or(1400.0),
        unlock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const RALLY: &str = r#"
id = "rally"
name = "Rally Hatch"
type = "hatchback"

[performance]
max_speed_kmh = 195.0
acceleration = 33.0
handling = 0.9

[unlock]
distance_km = 25.0
"#;

    #[test]
    fn test_builtin_catalog() {
        let catalog = CarCatalog::builtin();
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.default_car().id, DEFAULT_CAR);
        for car in catalog.iter() {
            assert!(car.handling > 0.0 && car.handling <= 1.0, "{}", car.id);
            assert!(car.max_speed_kmh > 0.0);
        }
        assert_eq!(catalog.get("supercar").unwrap().car_type, CarType::Supercar);
    }

    #[test]
    fn test_unknown_id_falls_back() {
        let catalog = CarCatalog::builtin();
        assert!(catalog.get("hovercraft").is_none());
        assert_eq!(catalog.get_or_default("hovercraft").id, "sedan");
    }

    #[test]
    fn test_unlock_requirements() {
        let catalog = CarCatalog::builtin();
        let fresh = DriveStats::default();
        let unlocked: Vec<_> = catalog.unlocked(&fresh).map(|c| c.id.as_str()).collect();
        assert_eq!(unlocked, vec!["sedan"]);

        let veteran = DriveStats {
            total_distance_km: 12.0,
            best_run_km: 6.0,
            top_speed_kmh: 175.0,
        };
        let muscle = catalog.get("muscle").unwrap();
        let pickup = catalog.get("pickup").unwrap();
        assert!(muscle.unlock.is_met(&veteran));
        assert!(!pickup.unlock.is_met(&veteran));
        assert_eq!(catalog.unlocked(&veteran).count(), 4);
    }

    #[test]
    fn test_dimensions_by_type() {
        let suv = CarType::Suv.dimensions();
        let supercar = CarType::Supercar.dimensions();
        assert!(suv.height_m > supercar.height_m);
        assert!(CarType::Pickup.dimensions().length_m > CarType::Hatchback.dimensions().length_m);
    }

    #[test]
    fn test_load_car_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("car.toml");
        fs::write(&path, RALLY).unwrap();

        let car = load_car_file(&path).unwrap();
        assert_eq!(car.id, "rally");
        assert_eq!(car.car_type, CarType::Hatchback);
        assert_eq!(car.unlock, UnlockRequirement::Distance { km: 25.0 });
        assert_eq!(car.weight_kg, 1400.0);
    }

    #[test]
    fn test_invalid_handling_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("car.toml");
        fs::write(&path, RALLY.replace("handling = 0.9", "handling = 1.5")).unwrap();

        assert!(matches!(load_car_file(&path), Err(CatalogError::Invalid { .. })));
    }

    #[test]
    fn test_load_dir_recursive_skips_broken() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("rally");
        let broken = dir.path().join("broken");
        fs::create_dir_all(&good).unwrap();
        fs::create_dir_all(&broken).unwrap();
        fs::write(good.join("car.toml"), RALLY).unwrap();
        fs::write(broken.join("car.toml"), "id = ").unwrap();
        fs::write(dir.path().join("notes.toml"), RALLY).unwrap();

        let mut catalog = CarCatalog::builtin();
        assert_eq!(catalog.load_dir(dir.path()), 1);
        assert_eq!(catalog.len(), 8);
        assert!(catalog.get("rally").is_some());
    }

    #[test]
    fn test_shipped_cars_load() {
        let mut catalog = CarCatalog::builtin();
        let loaded = catalog.load_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/content/cars"));
        assert!(loaded >= 1);
        assert_eq!(catalog.get("rally").unwrap().car_type, CarType::Hatchback);
    }

    #[test]
    fn test_missing_dir_is_not_an_error() {
        let mut catalog = CarCatalog::builtin();
        assert_eq!(catalog.load_dir("/definitely/not/a/cars/dir"), 0);
        assert_eq!(catalog.len(), 7);
    }
}
