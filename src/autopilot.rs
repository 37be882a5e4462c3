//! Autopilot for headless runs.
//!
//! Produces the same level-triggered [`InputState`] a human driver would:
//! steer toward the road centerline a fixed distance ahead (pure pursuit with
//! a deadband, since steering is on/off), and hold a target speed with simple
//! throttle/brake bands.

use crate::data::*;
use crate::physics::normalize_angle;
use crate::streaming::StreamingWindow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Autopilot {
    pub target_speed_kmh: f32,
    /// Distance ahead of the car where the centerline is aimed at (meters)
    pub look_ahead_m: f32,
    /// Heading errors smaller than this are left alone (radians)
    pub steer_deadband_rad: f32,
    /// Overspeed tolerated before braking (km/h)
    pub brake_margin_kmh: f32,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self {
            target_speed_kmh: 100.0,
            look_ahead_m: 30.0,
            steer_deadband_rad: 0.02,
            brake_margin_kmh: 10.0,
        }
    }
}

impl Autopilot {
    pub fn with_target_speed(target_speed_kmh: f32) -> Self {
        Self {
            target_speed_kmh,
            ..Self::default()
        }
    }

    /// Inputs for the next tick
    pub fn drive(&self, vehicle: &VehicleState, road: &StreamingWindow) -> InputState {
        let (accelerate, brake) = self.throttle_brake(vehicle.speed_kmh);
        let steer = self.steering(vehicle, road);

        InputState {
            accelerate,
            brake,
            steer_left: steer > 0,
            steer_right: steer < 0,
        }
    }

    fn throttle_brake(&self, speed_kmh: f32) -> (bool, bool) {
        if speed_kmh > self.target_speed_kmh + self.brake_margin_kmh {
            (false, true)
        } else if speed_kmh < self.target_speed_kmh {
            (true, false)
        } else {
            // Coast inside the band
            (false, false)
        }
    }

    /// +1 steer left, -1 steer right, 0 hold
    fn steering(&self, vehicle: &VehicleState, road: &StreamingWindow) -> i8 {
        let look_ahead = self.look_ahead_m.max(1.0);
        let target_z = vehicle.pos_z + look_ahead;
        let Some(target) = road.road_at(target_z) else {
            return 0;
        };

        // Heading 0 faces +Z and positive heading turns toward +X
        let dx = target.curve - vehicle.pos_x;
        let dz = target_z - vehicle.pos_z;
        let error = normalize_angle(dx.atan2(dz) - vehicle.heading_rad);

        if error > self.steer_deadband_rad {
            1
        } else if error < -self.steer_deadband_rad {
            -1
        } else {
            0
        }
    }
}
