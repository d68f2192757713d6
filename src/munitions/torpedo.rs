//! Self-propelled guided torpedoes
//!
//! Torpedoes inherit the launcher's velocity, then burn a propellant-limited
//! drive under one of three guidance laws. Fuel exhaustion drops the bird
//! into an unguided coast. A torpedo closer to its launch point than the
//! safe-arming distance cannot detonate even on contact.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;

/// Minimum distance from the launch point before the warhead arms, meters
pub const SAFE_ARMING_DISTANCE_M: f64 = 500.0;
/// Range at which guidance drops to maximum-authority pursuit, meters
pub const TERMINAL_APPROACH_DISTANCE_M: f64 = 10_000.0;
/// Range inside which proportional navigation takes over from cruise, meters
pub const PROPORTIONAL_NAV_RANGE_M: f64 = 50_000.0;
/// Navigation constant N' for proportional navigation
pub const PROPORTIONAL_NAV_CONSTANT: f64 = 3.0;

/// Static torpedo description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorpedoSpec {
    /// All-up launch mass, kg
    #[serde(default = "default_mass")]
    pub mass_kg: f64,
    /// Fraction of launch mass that is propellant
    #[serde(default = "default_propellant_fraction")]
    pub propellant_fraction: f64,
    #[serde(default = "default_exhaust_velocity")]
    pub exhaust_velocity_kps: f64,
    /// Main drive thrust, N; zero means "size for 10 g at launch mass"
    #[serde(default)]
    pub thrust_n: f64,
    /// Dense kinetic penetrator mass, kg
    #[serde(default = "default_penetrator_mass")]
    pub penetrator_mass_kg: f64,
    /// Warhead yield, GJ; zero for pure kinetic penetrators
    #[serde(default)]
    pub warhead_yield_gj: f64,
}

fn default_mass() -> f64 {
    1200.0
}
fn default_propellant_fraction() -> f64 {
    0.55
}
fn default_exhaust_velocity() -> f64 {
    20.0
}
fn default_penetrator_mass() -> f64 {
    250.0
}

impl Default for TorpedoSpec {
    fn default() -> Self {
        Self {
            mass_kg: default_mass(),
            propellant_fraction: default_propellant_fraction(),
            exhaust_velocity_kps: default_exhaust_velocity(),
            thrust_n: 0.0,
            penetrator_mass_kg: default_penetrator_mass(),
            warhead_yield_gj: 0.0,
        }
    }
}

impl TorpedoSpec {
    pub fn propellant_mass_kg(&self) -> f64 {
        self.mass_kg * self.propellant_fraction.clamp(0.0, 0.95)
    }

    pub fn dry_mass_kg(&self) -> f64 {
        self.mass_kg - self.propellant_mass_kg()
    }

    pub fn effective_thrust_n(&self) -> f64 {
        if self.thrust_n > 0.0 {
            self.thrust_n
        } else {
            self.mass_kg * 98.1
        }
    }

    /// Total delta-v budget, km/s
    pub fn total_delta_v_kps(&self) -> f64 {
        let dry = self.dry_mass_kg();
        if dry <= 0.0 {
            return 0.0;
        }
        self.exhaust_velocity_kps * (self.mass_kg / dry).ln()
    }
}

/// Guidance law currently steering the torpedo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuidanceMode {
    /// Aim at the target's current position
    Pursuit,
    /// Null the line-of-sight rotation rate
    ProportionalNav,
    /// Maximum-authority pursuit inside the terminal distance
    Terminal,
    /// No guidance; fuel exhausted or electronics disabled
    Coast,
}

/// One torpedo in flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Torpedo {
    pub spec: TorpedoSpec,
    pub position: Vec3,
    pub velocity: Vec3,
    pub guidance_mode: GuidanceMode,
    pub propellant_kg: f64,
    pub armed: bool,
    launch_position: Vec3,
}

impl Torpedo {
    /// Launch with velocity inheritance from the firing ship.
    pub fn launch(spec: TorpedoSpec, position: Vec3, ship_velocity: Vec3, boost_direction: Vec3) -> Self {
        // Tube ejection gives a small separation kick along the launch axis.
        let velocity = ship_velocity + boost_direction.normalized() * 50.0;
        let propellant = spec.propellant_mass_kg();
        Self {
            spec,
            position,
            velocity,
            guidance_mode: GuidanceMode::Pursuit,
            propellant_kg: propellant,
            armed: false,
            launch_position: position,
        }
    }

    pub fn total_mass_kg(&self) -> f64 {
        self.spec.dry_mass_kg() + self.propellant_kg
    }

    pub fn fuel_exhausted(&self) -> bool {
        self.propellant_kg <= 1e-9
    }

    pub fn remaining_delta_v_kps(&self) -> f64 {
        let dry = self.spec.dry_mass_kg();
        if dry <= 0.0 || self.fuel_exhausted() {
            return 0.0;
        }
        self.spec.exhaust_velocity_kps * (self.total_mass_kg() / dry).ln()
    }

    pub fn distance_from_launch(&self) -> f64 {
        self.position.distance_to(&self.launch_position)
    }

    /// Advance one tick: update guidance mode by range, burn toward the
    /// commanded direction, arm past the safe distance, and integrate
    /// position. Returns true if the drive went dry this tick.
    pub fn update(&mut self, target_pos: &Vec3, target_vel: &Vec3, dt: f64) -> bool {
        let was_fueled = !self.fuel_exhausted();

        self.advance_guidance_mode(target_pos);
        let steer = self.guidance_direction(target_pos, target_vel);
        if steer != Vec3::zero() && self.guidance_mode != GuidanceMode::Coast {
            self.burn(steer, 1.0, dt);
        }

        if !self.armed && self.distance_from_launch() >= SAFE_ARMING_DISTANCE_M {
            self.armed = true;
        }

        self.position = self.position + self.velocity * dt;

        let went_dry = was_fueled && self.fuel_exhausted();
        if went_dry {
            self.guidance_mode = GuidanceMode::Coast;
        }
        went_dry
    }

    /// Electronics kill from point defense: guidance stops, the body
    /// coasts ballistically.
    pub fn disable(&mut self) {
        self.guidance_mode = GuidanceMode::Coast;
    }

    fn advance_guidance_mode(&mut self, target_pos: &Vec3) {
        if self.guidance_mode == GuidanceMode::Coast {
            return;
        }
        let distance = self.position.distance_to(target_pos);
        if distance <= TERMINAL_APPROACH_DISTANCE_M {
            self.guidance_mode = GuidanceMode::Terminal;
        } else if distance <= PROPORTIONAL_NAV_RANGE_M && self.guidance_mode == GuidanceMode::Pursuit {
            self.guidance_mode = GuidanceMode::ProportionalNav;
        }
    }

    /// Thrust direction for the current guidance law.
    pub fn guidance_direction(&self, target_pos: &Vec3, target_vel: &Vec3) -> Vec3 {
        match self.guidance_mode {
            GuidanceMode::Pursuit | GuidanceMode::Terminal => {
                (*target_pos - self.position).normalized()
            }
            GuidanceMode::ProportionalNav => self.proportional_nav(target_pos, target_vel),
            GuidanceMode::Coast => Vec3::zero(),
        }
    }

    // a = N' * Vc * omega_los, applied perpendicular to the line of sight
    // with a bias along it to keep closing.
    fn proportional_nav(&self, target_pos: &Vec3, target_vel: &Vec3) -> Vec3 {
        let los = *target_pos - self.position;
        let distance = los.magnitude();
        if distance < 1.0 {
            return Vec3::zero();
        }
        let los_unit = los.normalized();
        let rel_vel = *target_vel - self.velocity;
        let closing_velocity = -rel_vel.dot(&los_unit);

        let omega_los = los.cross(&rel_vel) * (1.0 / (distance * distance));
        let accel_perpendicular =
            los_unit.cross(&omega_los) * (PROPORTIONAL_NAV_CONSTANT * closing_velocity);

        let direction = if closing_velocity > 0.0 {
            accel_perpendicular + los_unit * 0.3
        } else {
            los_unit
        };

        if direction.magnitude() < 0.01 {
            los_unit
        } else {
            direction.normalized()
        }
    }

    /// Burn toward `direction`, limited by remaining propellant.
    fn burn(&mut self, direction: Vec3, throttle: f64, dt: f64) {
        let throttle = throttle.clamp(0.0, 1.0);
        let exhaust_ms = self.spec.exhaust_velocity_kps * 1000.0;
        if exhaust_ms <= 0.0 || throttle <= 0.0 {
            return;
        }
        let mass_flow = self.spec.effective_thrust_n() / exhaust_ms;
        let demanded = mass_flow * throttle * dt;
        if demanded <= 0.0 {
            return;
        }
        let burned = demanded.min(self.propellant_kg);
        if burned <= 0.0 {
            return;
        }
        let thrust = self.spec.effective_thrust_n() * throttle * (burned / demanded);
        let accel = thrust / self.total_mass_kg();
        self.velocity = self.velocity + direction.normalized() * (accel * dt);
        self.propellant_kg = (self.propellant_kg - burned).max(0.0);
    }
}

/// Torpedo magazine and launch gating for one ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorpedoLauncher {
    pub spec: TorpedoSpec,
    pub magazine: u32,
    pub cooldown_s: f64,
    cooldown_remaining_s: f64,
}

impl TorpedoLauncher {
    pub fn new(spec: TorpedoSpec, magazine: u32, cooldown_s: f64) -> Self {
        Self { spec, magazine, cooldown_s, cooldown_remaining_s: 0.0 }
    }

    pub fn can_launch(&self) -> bool {
        self.magazine > 0 && self.cooldown_remaining_s <= 0.0
    }

    pub fn update(&mut self, dt: f64) {
        self.cooldown_remaining_s = (self.cooldown_remaining_s - dt).max(0.0);
    }

    /// Expend a round and start the cooldown. Returns false with no state
    /// change when the launcher is not ready.
    pub fn expend(&mut self) -> bool {
        if !self.can_launch() {
            return false;
        }
        self.magazine -= 1;
        self.cooldown_remaining_s = self.cooldown_s;
        true
    }
}

impl Default for TorpedoLauncher {
    fn default() -> Self {
        Self::new(TorpedoSpec::default(), 16, 30.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bird_at(position: Vec3, velocity: Vec3) -> Torpedo {
        Torpedo::launch(TorpedoSpec::default(), position, velocity, Vec3::unit_x())
    }

    #[test]
    fn test_launch_inherits_ship_velocity() {
        let torpedo = bird_at(Vec3::zero(), Vec3::new(2_000.0, 0.0, 0.0));
        assert!((torpedo.velocity.x - 2_050.0).abs() < 1e-9);
    }

    #[test]
    fn test_arms_only_past_safe_distance() {
        let mut torpedo = bird_at(Vec3::zero(), Vec3::zero());
        let target = Vec3::new(100_000.0, 0.0, 0.0);
        torpedo.update(&target, &Vec3::zero(), 1.0);
        assert!(!torpedo.armed, "armed inside safe distance");
        for _ in 0..60 {
            torpedo.update(&target, &Vec3::zero(), 1.0);
            if torpedo.armed {
                break;
            }
        }
        assert!(torpedo.armed);
        assert!(torpedo.distance_from_launch() >= SAFE_ARMING_DISTANCE_M);
    }

    #[test]
    fn test_guidance_mode_tightens_with_range() {
        let target = Vec3::new(200_000.0, 0.0, 0.0);
        let mut torpedo = bird_at(Vec3::zero(), Vec3::zero());
        torpedo.advance_guidance_mode(&target);
        assert_eq!(torpedo.guidance_mode, GuidanceMode::Pursuit);

        torpedo.position = Vec3::new(160_000.0, 0.0, 0.0);
        torpedo.advance_guidance_mode(&target);
        assert_eq!(torpedo.guidance_mode, GuidanceMode::ProportionalNav);

        torpedo.position = Vec3::new(195_000.0, 0.0, 0.0);
        torpedo.advance_guidance_mode(&target);
        assert_eq!(torpedo.guidance_mode, GuidanceMode::Terminal);
    }

    #[test]
    fn test_fuel_exhaustion_drops_to_coast() {
        let mut torpedo = bird_at(Vec3::zero(), Vec3::zero());
        torpedo.propellant_kg = 0.5;
        let target = Vec3::new(500_000.0, 0.0, 0.0);
        let mut went_dry = false;
        for _ in 0..10 {
            if torpedo.update(&target, &Vec3::zero(), 1.0) {
                went_dry = true;
                break;
            }
        }
        assert!(went_dry);
        assert_eq!(torpedo.guidance_mode, GuidanceMode::Coast);
        let velocity_before = torpedo.velocity;
        torpedo.update(&target, &Vec3::zero(), 1.0);
        assert_eq!(torpedo.velocity, velocity_before);
    }

    #[test]
    fn test_pn_steers_against_los_rotation() {
        let mut torpedo = bird_at(Vec3::zero(), Vec3::zero());
        torpedo.velocity = Vec3::new(1_000.0, 0.0, 0.0);
        torpedo.guidance_mode = GuidanceMode::ProportionalNav;
        // Target crossing left to right ahead of the torpedo.
        let target_pos = Vec3::new(30_000.0, 0.0, 0.0);
        let target_vel = Vec3::new(0.0, 300.0, 0.0);
        let steer = torpedo.guidance_direction(&target_pos, &target_vel);
        // Command leads into the target's motion.
        assert!(steer.y > 0.0);
    }

    #[test]
    fn test_delta_v_budget_positive_and_spent_by_burning() {
        let torpedo = bird_at(Vec3::zero(), Vec3::zero());
        let budget = torpedo.remaining_delta_v_kps();
        assert!(budget > 1.0);

        let mut burned = torpedo.clone();
        burned.burn(Vec3::unit_x(), 1.0, 5.0);
        assert!(burned.remaining_delta_v_kps() < budget);
    }

    #[test]
    fn test_launcher_cooldown_and_magazine() {
        let mut launcher = TorpedoLauncher::new(TorpedoSpec::default(), 2, 30.0);
        assert!(launcher.expend());
        assert!(!launcher.can_launch());
        for _ in 0..30 {
            launcher.update(1.0);
        }
        assert!(launcher.expend());
        assert!(!launcher.expend(), "magazine should be empty");
    }
}
