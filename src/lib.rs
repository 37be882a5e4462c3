//! Endless driving core: procedural road generation, chunk streaming around a
//! moving vehicle, and arcade vehicle physics.
//!
//! Rendering is delegated to a [`scene::Scene`] collaborator that only receives
//! create and dispose requests.

pub mod autopilot;
pub mod car_catalog;
pub mod config;
pub mod data;
pub mod error;
pub mod physics;
pub mod procgen;
pub mod profile;
pub mod scene;
pub mod streaming;
pub mod world;
