//! Weapon mounts: readiness gating and fire-direction geometry

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;
use crate::power::WeaponCategory;
use crate::targeting::lead_point;

/// Static description of one weapon mount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponSpec {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: WeaponCategory,
    #[serde(default = "default_muzzle_velocity")]
    pub muzzle_velocity_kps: f64,
    #[serde(default = "default_slug_mass")]
    pub slug_mass_kg: f64,
    #[serde(default = "default_cooldown")]
    pub cooldown_s: f64,
    /// Capacitor sizing for this mount
    #[serde(default = "default_capacitor_mj")]
    pub capacitor_mj: f64,
    #[serde(default = "default_capacitor_rate")]
    pub capacitor_charge_mw: f64,
    /// Half-angle of the firing cone around the mount axis, degrees.
    /// Turrets get a hemisphere; spinal mounts a few degrees.
    #[serde(default = "default_arc")]
    pub firing_arc_half_angle_deg: f64,
    #[serde(default)]
    pub turreted: bool,
    #[serde(default = "default_range")]
    pub max_range_km: f64,
    #[serde(default = "default_ammo")]
    pub ammo: u32,
}

fn default_category() -> WeaponCategory {
    WeaponCategory::Kinetic
}
fn default_muzzle_velocity() -> f64 {
    8.0
}
fn default_slug_mass() -> f64 {
    10.0
}
fn default_cooldown() -> f64 {
    20.0
}
fn default_capacitor_mj() -> f64 {
    400.0
}
fn default_capacitor_rate() -> f64 {
    30.0
}
fn default_arc() -> f64 {
    30.0
}
fn default_range() -> f64 {
    2000.0
}
fn default_ammo() -> u32 {
    200
}

impl Default for WeaponSpec {
    fn default() -> Self {
        Self {
            name: "coilgun".to_string(),
            category: default_category(),
            muzzle_velocity_kps: default_muzzle_velocity(),
            slug_mass_kg: default_slug_mass(),
            cooldown_s: default_cooldown(),
            capacitor_mj: default_capacitor_mj(),
            capacitor_charge_mw: default_capacitor_rate(),
            firing_arc_half_angle_deg: default_arc(),
            turreted: false,
            max_range_km: default_range(),
            ammo: default_ammo(),
        }
    }
}

/// Why a fire command produced no shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FireFailure {
    CoolingDown,
    OutOfAmmo,
    WeaponDestroyed,
    TargetOutsideArc,
}

/// Mutable readiness state for one mounted weapon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponState {
    pub spec: WeaponSpec,
    pub cooldown_remaining_s: f64,
    pub operational: bool,
    pub ammo_remaining: u32,
    /// Index into the ship's capacitor bank; order doubles as charge priority
    pub capacitor_index: usize,
}

impl WeaponState {
    pub fn new(spec: WeaponSpec, capacitor_index: usize) -> Self {
        let ammo = spec.ammo;
        Self {
            spec,
            cooldown_remaining_s: 0.0,
            operational: true,
            ammo_remaining: ammo,
            capacitor_index,
        }
    }

    /// Advance the cooldown. Reactor damage stretches recovery through
    /// `cooldown_rate`, 1.0 for a healthy plant.
    pub fn update(&mut self, dt: f64, cooldown_rate: f64) {
        self.cooldown_remaining_s = (self.cooldown_remaining_s - dt * cooldown_rate).max(0.0);
    }

    /// Readiness gate, not counting the capacitor (the ship checks that
    /// against its bank). The weapon fires only when this returns Ok and
    /// the capacitor is full.
    pub fn ready(&self) -> Result<(), FireFailure> {
        if !self.operational {
            return Err(FireFailure::WeaponDestroyed);
        }
        if self.ammo_remaining == 0 {
            return Err(FireFailure::OutOfAmmo);
        }
        if self.cooldown_remaining_s > 0.0 {
            return Err(FireFailure::CoolingDown);
        }
        Ok(())
    }

    /// Commit a shot: spend a round and restart the cooldown.
    pub fn expend(&mut self) {
        self.ammo_remaining = self.ammo_remaining.saturating_sub(1);
        self.cooldown_remaining_s = self.spec.cooldown_s;
    }

    /// World-frame fire direction for this mount, or the arc failure when
    /// the solution falls outside the cone.
    ///
    /// Turrets aim straight at the lead point within their hemisphere.
    /// Fixed mounts fire along the hull axis and only when the lead point
    /// sits inside the (gimbal-sized) cone.
    pub fn fire_direction(
        &self,
        ship_position: &Vec3,
        ship_velocity: &Vec3,
        ship_forward: &Vec3,
        target_position: &Vec3,
        target_velocity: &Vec3,
    ) -> Result<Vec3, FireFailure> {
        let muzzle_ms = self.spec.muzzle_velocity_kps * 1000.0;
        let aim_point = lead_point(ship_position, ship_velocity, target_position, target_velocity, muzzle_ms);
        let to_aim = (aim_point - *ship_position).normalized();
        if to_aim == Vec3::zero() {
            return Err(FireFailure::TargetOutsideArc);
        }

        let off_axis_deg = ship_forward.angle_to(&to_aim).to_degrees();
        if off_axis_deg > self.spec.firing_arc_half_angle_deg {
            return Err(FireFailure::TargetOutsideArc);
        }

        // For a spinal mount the arc check above bounded the gimbal; either
        // way the shot leaves along the corrected aim line.
        Ok(to_aim)
    }
}
