use std::path::PathBuf;
use thiserror::Error;

/// Raised by a [`crate::scene::Scene`] that cannot create geometry right now.
///
/// The streaming window treats this as recoverable and retries on the next tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("Scene refused geometry: {0}")]
    Refused(String),
    #[error("Scene capacity exhausted ({live} live handles)")]
    CapacityExhausted { live: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid car file {path:?}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}
