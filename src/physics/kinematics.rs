//! Translational kinematics and propellant bookkeeping
//!
//! Thrust integrates Newtonian acceleration at the simulation timestep.
//! Propellant consumption follows the rocket equation: mass flow is
//! thrust / exhaust_velocity, and remaining delta-v is
//! v_e * ln(m_wet / m_dry). A ship with empty tanks gets zero thrust, not
//! an error.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;

/// Maximum main-engine gimbal deflection from the hull axis, degrees.
pub const MAX_GIMBAL_ANGLE_DEG: f64 = 3.0;

/// Static description of a ship's main drive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveSpec {
    /// Maximum thrust in newtons
    #[serde(default = "default_thrust")]
    pub max_thrust_n: f64,
    /// Effective exhaust velocity in m/s
    #[serde(default = "default_exhaust_velocity")]
    pub exhaust_velocity_ms: f64,
    /// Propellant load at battle start in kg
    #[serde(default = "default_propellant")]
    pub propellant_kg: f64,
}

fn default_thrust() -> f64 {
    5.0e6
}
fn default_exhaust_velocity() -> f64 {
    80_000.0
}
fn default_propellant() -> f64 {
    1.0e6
}

impl Default for DriveSpec {
    fn default() -> Self {
        Self {
            max_thrust_n: default_thrust(),
            exhaust_velocity_ms: default_exhaust_velocity(),
            propellant_kg: default_propellant(),
        }
    }
}

impl DriveSpec {
    /// Propellant mass flow at full throttle, kg/s
    pub fn mass_flow_kg_s(&self) -> f64 {
        if self.exhaust_velocity_ms <= 0.0 {
            return 0.0;
        }
        self.max_thrust_n / self.exhaust_velocity_ms
    }
}

/// Position, velocity, orientation, and mass state of one hull
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KinematicState {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Unit vector along the hull axis
    pub forward: Vec3,
    /// Unit vector completing the hull frame with `forward`
    pub up: Vec3,
    /// Magnitude of the current turn rate, rad/s
    pub angular_velocity_rad_s: f64,
    /// Hull mass without propellant, kg
    pub dry_mass_kg: f64,
    pub propellant_kg: f64,
    pub drive: DriveSpec,
}

impl KinematicState {
    pub fn new(position: Vec3, velocity: Vec3, forward: Vec3, dry_mass_kg: f64, drive: DriveSpec) -> Self {
        let forward = forward.normalized();
        // Any up orthogonal to forward works as a starting frame.
        let reference = if forward.z.abs() < 0.9 { Vec3::unit_z() } else { Vec3::unit_x() };
        let right = forward.cross(&reference).normalized();
        let up = right.cross(&forward).normalized();
        Self {
            position,
            velocity,
            forward,
            up,
            angular_velocity_rad_s: 0.0,
            dry_mass_kg,
            propellant_kg: drive.propellant_kg,
            drive,
        }
    }

    pub fn total_mass_kg(&self) -> f64 {
        self.dry_mass_kg + self.propellant_kg
    }

    pub fn has_propellant(&self) -> bool {
        self.propellant_kg > 1e-9
    }

    /// Remaining delta-v from the rocket equation, m/s
    pub fn delta_v_remaining_ms(&self) -> f64 {
        if self.dry_mass_kg <= 0.0 || !self.has_propellant() {
            return 0.0;
        }
        self.drive.exhaust_velocity_ms * (self.total_mass_kg() / self.dry_mass_kg).ln()
    }

    /// Propellant needed for a given delta-v at current mass, kg.
    ///
    /// From m_wet / m_dry = exp(dv / v_e): burn = m * (1 - exp(-dv / v_e)).
    pub fn propellant_for_delta_v(&self, delta_v_ms: f64) -> f64 {
        if self.drive.exhaust_velocity_ms <= 0.0 || delta_v_ms <= 0.0 {
            return 0.0;
        }
        self.total_mass_kg() * (1.0 - (-delta_v_ms / self.drive.exhaust_velocity_ms).exp())
    }

    /// Current maximum acceleration in g
    pub fn max_acceleration_g(&self) -> f64 {
        let m = self.total_mass_kg();
        if m <= 0.0 || !self.has_propellant() {
            return 0.0;
        }
        self.drive.max_thrust_n / m / 9.81
    }

    /// Apply thrust along `direction` for `dt` seconds at `throttle` in [0, 1].
    ///
    /// Consumes propellant at throttle-scaled mass flow; thrust silently
    /// drops to whatever the remaining propellant supports. Direction is
    /// the world-frame thrust direction (the maneuver layer is responsible
    /// for pointing the hull and honoring gimbal limits).
    pub fn apply_thrust(&mut self, direction: Vec3, throttle: f64, dt: f64) {
        let throttle = throttle.clamp(0.0, 1.0);
        if throttle <= 0.0 || dt <= 0.0 {
            return;
        }
        let dir = direction.normalized();
        if dir == Vec3::zero() {
            return;
        }

        let demanded_burn = self.drive.mass_flow_kg_s() * throttle * dt;
        if demanded_burn <= 0.0 {
            return;
        }
        let burned = demanded_burn.min(self.propellant_kg);
        if burned <= 0.0 {
            return;
        }
        let burn_fraction = burned / demanded_burn;

        let thrust_n = self.drive.max_thrust_n * throttle * burn_fraction;
        let accel = thrust_n / self.total_mass_kg();

        self.velocity = self.velocity + dir * (accel * dt);
        self.propellant_kg = (self.propellant_kg - burned).max(0.0);
    }

    /// Advance position by current velocity (Euler integration)
    pub fn coast(&mut self, dt: f64) {
        self.position = self.position + self.velocity * dt;
    }
}
