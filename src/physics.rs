//! Arcade vehicle physics
//!
//! One fixed-step integration per tick:
//! - Longitudinal speed from throttle, brake or rolling friction
//! - Heading from steering, scaled by handling and speed
//! - Position along the heading vector
//! - Cosmetic drift factor with exponential smoothing
//!
//! There is no reverse gear; speed never drops below zero.

use crate::car_catalog::CarSpec;
use crate::config::PhysicsSettings;
use crate::data::*;
use std::f32::consts::PI;

/// Braking decelerates at this multiple of the car's acceleration
const BRAKE_FACTOR: f32 = 2.0;

/// Advance `state` by `dt` seconds using its current inputs
pub fn update_vehicle(state: &mut VehicleState, car: &CarSpec, settings: &PhysicsSettings, dt: f32) {
    if !dt.is_finite() || dt <= 0.0 {
        return;
    }

    // 1. Longitudinal
    let accel = longitudinal_acceleration(&state.inputs, car, settings);
    let max_speed = car.max_speed_kmh.max(0.0);
    state.speed_kmh = (state.speed_kmh + accel * dt * settings.speed_scale).clamp(0.0, max_speed);

    // 2. Heading
    let steering_rate = state.inputs.steer_axis() * car.handling;
    if settings.reference_speed > 0.0 {
        let turn = steering_rate * dt * (state.speed_kmh / settings.reference_speed);
        if turn.is_finite() {
            state.heading_rad = normalize_angle(state.heading_rad + turn);
        }
    }

    // 3. Position
    let distance = state.speed_kmh / settings.speed_unit_divisor * dt;
    if settings.speed_unit_divisor > 0.0 && distance.is_finite() {
        state.pos_x += state.heading_rad.sin() * distance;
        state.pos_z += state.heading_rad.cos() * distance;
    }

    // 4. Drift
    update_drift(state, steering_rate, settings, dt);
}

/// Brake dominates throttle when both are held
fn longitudinal_acceleration(inputs: &InputState, car: &CarSpec, settings: &PhysicsSettings) -> f32 {
    if inputs.brake {
        -BRAKE_FACTOR * car.acceleration
    } else if inputs.accelerate {
        car.acceleration
    } else {
        -settings.friction
    }
}

fn update_drift(state: &mut VehicleState, steering_rate: f32, settings: &PhysicsSettings, dt: f32) {
    let drifting = steering_rate.abs() > settings.drift_steer_threshold && state.speed_kmh > settings.drift_speed_threshold;

    let (target, rate) = if drifting {
        (1.0, settings.drift_rise_rate)
    } else {
        (0.0, settings.drift_decay_rate)
    };
    let blend = (rate * dt).clamp(0.0, 1.0);
    state.drift = (state.drift + (target - state.drift) * blend).clamp(0.0, 1.0);
}

/// Pin the vehicle to the road height under it
pub fn settle_on_road(state: &mut VehicleState, road_elevation: f32) {
    if road_elevation.is_finite() {
        state.pos_y = road_elevation;
    }
}

/// Signed lateral distance from the road centerline (positive = left of it)
pub fn lateral_offset(state: &VehicleState, road_curve: f32) -> f32 {
    state.pos_x - road_curve
}

/// Wrap an angle into [-PI, PI]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}
