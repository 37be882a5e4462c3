use crate::data::CarId;
use crate::error::ProfileError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Cosmetic car options; they never affect physics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customization {
    /// Paint color as "#rrggbb"
    pub paint: String,
    pub rims: String,
    pub spoiler: bool,
}

impl Default for Customization {
    fn default() -> Self {
        Self {
            paint: "#c0392b".to_string(),
            rims: "standard".to_string(),
            spoiler: false,
        }
    }
}

/// Lifetime driving statistics used for car unlocks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveStats {
    pub total_distance_km: f64,
    pub best_run_km: f64,
    pub top_speed_kmh: f32,
}

/// Persisted player profile (JSON)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub selected_car: CarId,
    pub customization: Customization,
    pub stats: DriveStats,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            selected_car: "sedan".to_string(),
            customization: Customization::default(),
            stats: DriveStats::default(),
        }
    }
}

impl Profile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProfileError> {
        let contents = fs::read_to_string(path)?;
        let profile = serde_json::from_str(&contents)?;
        Ok(profile)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No profile at {:?}, starting fresh", path);
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            warn!("Failed to load profile {:?}: {}, starting fresh", path, e);
            Self::default()
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ProfileError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Fold a finished run into the lifetime stats
    pub fn record_run(&mut self, distance_m: f64, top_speed_kmh: f32) {
        let km = distance_m.max(0.0) / 1000.0;
        self.stats.total_distance_km += km;
        self.stats.best_run_km = self.stats.best_run_km.max(km);
        self.stats.top_speed_kmh = self.stats.top_speed_kmh.max(top_speed_kmh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profile.json");

        let mut profile = Profile::default();
        profile.selected_car = "muscle".to_string();
        profile.customization.spoiler = true;
        profile.record_run(12_500.0, 190.0);
        profile.save(&path).unwrap();

        let loaded = Profile::load(&path).unwrap();
        assert_eq!(loaded, profile);
        assert_eq!(loaded.stats.best_run_km, 12.5);
    }

    #[test]
    fn test_record_run_keeps_best() {
        let mut profile = Profile::default();
        profile.record_run(8_000.0, 150.0);
        profile.record_run(2_000.0, 170.0);

        assert_eq!(profile.stats.total_distance_km, 10.0);
        assert_eq!(profile.stats.best_run_km, 8.0);
        assert_eq!(profile.stats.top_speed_kmh, 170.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, r#"{ "selected_car": "suv" }"#).unwrap();

        let profile = Profile::load(&path).unwrap();
        assert_eq!(profile.selected_car, "suv");
        assert_eq!(profile.customization, Customization::default());
    }

    #[test]
    fn test_corrupt_profile_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Profile::load(&path), Err(ProfileError::Json(_))));
        assert_eq!(Profile::load_or_default(&path), Profile::default());
    }
}
