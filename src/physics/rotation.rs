//! Rotational dynamics and attitude control
//!
//! The hull is modeled as an elongated cylinder. Two torque sources exist:
//! thrust-vector gimbal (high authority, only while the main engine burns)
//! and reaction-control thrusters (low authority, always available). Turns
//! use bang-bang control: accelerate to the midpoint, decelerate to arrive
//! at rest.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;
use crate::physics::kinematics::{KinematicState, MAX_GIMBAL_ANGLE_DEG};

/// Angular tolerance below which a rotation counts as complete, rad (~0.6 deg)
pub const ANGLE_TOLERANCE_RAD: f64 = 0.01;
/// Angular velocity below which the hull counts as settled, rad/s
pub const VELOCITY_TOLERANCE_RAD_S: f64 = 0.01;
/// Lever arm from center of mass to the engine gimbal, as a fraction of hull length
pub const GIMBAL_LEVER_FRACTION: f64 = 0.45;

/// Pitch/yaw moment of inertia for a uniform rod of mass m, length l (kg m^2)
pub fn moment_of_inertia_pitch(mass_kg: f64, length_m: f64) -> f64 {
    mass_kg * length_m * length_m / 12.0
}

/// Roll moment of inertia, treating the hull radius as length/8 (kg m^2)
pub fn moment_of_inertia_roll(mass_kg: f64, length_m: f64) -> f64 {
    let radius = length_m / 8.0;
    0.5 * mass_kg * radius * radius
}

/// Angular acceleration from full gimbal deflection, rad/s^2
pub fn gimbal_angular_accel(thrust_n: f64, mass_kg: f64, length_m: f64) -> f64 {
    let inertia = moment_of_inertia_pitch(mass_kg, length_m);
    if inertia <= 0.0 {
        return 0.0;
    }
    let lever_m = GIMBAL_LEVER_FRACTION * length_m;
    let torque = thrust_n * MAX_GIMBAL_ANGLE_DEG.to_radians().sin() * lever_m;
    torque / inertia
}

/// Bang-bang time to turn through `angle_rad` starting and ending at rest:
/// accelerate to the midpoint, then decelerate. t = 2 * sqrt(angle / accel).
pub fn time_to_rotate_s(angle_rad: f64, angular_accel_rad_s2: f64) -> f64 {
    if angular_accel_rad_s2 <= 0.0 || angle_rad <= 0.0 {
        return f64::INFINITY;
    }
    2.0 * (angle_rad / angular_accel_rad_s2).sqrt()
}

/// Attitude-control authority for one hull class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttitudeControl {
    /// Thrust-vectoring angular acceleration, deg/s^2 (engines on only)
    #[serde(default = "default_tv_accel")]
    pub tv_angular_accel_deg_s2: f64,
    /// Thrust-vectoring max turn rate, deg/s
    #[serde(default = "default_tv_max_vel")]
    pub tv_max_angular_vel_deg_s: f64,
    /// Reaction-control angular acceleration, deg/s^2 (always available)
    #[serde(default = "default_rcs_accel")]
    pub rcs_angular_accel_deg_s2: f64,
    /// Reaction-control max turn rate, deg/s
    #[serde(default = "default_rcs_max_vel")]
    pub rcs_max_angular_vel_deg_s: f64,
}

fn default_tv_accel() -> f64 {
    2.445
}
fn default_tv_max_vel() -> f64 {
    6.39
}
fn default_rcs_accel() -> f64 {
    0.1227
}
fn default_rcs_max_vel() -> f64 {
    0.87
}

impl Default for AttitudeControl {
    fn default() -> Self {
        Self {
            tv_angular_accel_deg_s2: default_tv_accel(),
            tv_max_angular_vel_deg_s: default_tv_max_vel(),
            rcs_angular_accel_deg_s2: default_rcs_accel(),
            rcs_max_angular_vel_deg_s: default_rcs_max_vel(),
        }
    }
}

impl AttitudeControl {
    /// Available (accel rad/s^2, max rate rad/s) given engine state and the
    /// engine-effectiveness fraction from damage. RCS is unaffected by
    /// engine damage.
    pub fn authority(&self, engines_on: bool, engine_effectiveness: f64) -> (f64, f64) {
        let eff = engine_effectiveness.clamp(0.0, 1.0);
        if engines_on {
            let accel = (self.tv_angular_accel_deg_s2 * eff + self.rcs_angular_accel_deg_s2).to_radians();
            let max_vel = (self.tv_max_angular_vel_deg_s * eff)
                .max(self.rcs_max_angular_vel_deg_s)
                .to_radians();
            (accel, max_vel)
        } else {
            (
                self.rcs_angular_accel_deg_s2.to_radians(),
                self.rcs_max_angular_vel_deg_s.to_radians(),
            )
        }
    }
}

/// Rotate the hull toward `target_dir` for one timestep using bang-bang
/// control. Returns true once the hull is settled on the target direction.
pub fn rotate_toward(
    state: &mut KinematicState,
    target_dir: Vec3,
    attitude: &AttitudeControl,
    engines_on: bool,
    engine_effectiveness: f64,
    dt: f64,
) -> bool {
    let target = target_dir.normalized();
    if target == Vec3::zero() {
        return true;
    }

    let angle_to_target = state.forward.angle_to(&target);
    if angle_to_target < ANGLE_TOLERANCE_RAD
        && state.angular_velocity_rad_s.abs() < VELOCITY_TOLERANCE_RAD_S
    {
        state.angular_velocity_rad_s = 0.0;
        return true;
    }

    let (angular_accel, max_angular_vel) = attitude.authority(engines_on, engine_effectiveness);
    if angular_accel <= 0.0 {
        return false;
    }

    let mut axis = state.forward.cross(&target);
    if axis.magnitude() < 1e-6 {
        // Directly ahead or astern; pick the hull up vector for a flip.
        if angle_to_target < ANGLE_TOLERANCE_RAD {
            state.angular_velocity_rad_s = 0.0;
            return true;
        }
        axis = state.up;
    }
    let axis = axis.normalized();

    // Bang-bang: brake when the stopping angle reaches the remaining angle.
    let omega = state.angular_velocity_rad_s.abs();
    let stopping_angle = omega * omega / (2.0 * angular_accel);

    let new_omega = if angle_to_target <= stopping_angle + ANGLE_TOLERANCE_RAD {
        (omega - angular_accel * dt).max(0.0)
    } else if omega >= max_angular_vel {
        omega
    } else {
        (omega + angular_accel * dt).min(max_angular_vel)
    };
    state.angular_velocity_rad_s = new_omega;

    let rotation = (new_omega * dt).min(angle_to_target);
    if rotation > 0.0 {
        state.forward = state.forward.rotate_around_axis(&axis, rotation).normalized();
        state.up = state.up.rotate_around_axis(&axis, rotation).normalized();
    }

    state.forward.angle_to(&target) < ANGLE_TOLERANCE_RAD
        && state.angular_velocity_rad_s < VELOCITY_TOLERANCE_RAD_S
}
