//! Ballistic kinetic slugs
//!
//! A fired slug's velocity is the vector sum of the shooter's velocity and
//! the muzzle velocity along the firing direction. That sum is what carries
//! into kinetic energy for damage; muzzle-relative speed alone never does.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KineticProjectile {
    pub position: Vec3,
    /// World-frame velocity including the launcher's velocity, m/s
    pub velocity: Vec3,
    pub mass_kg: f64,
    /// Mass vaporized off the slug by point-defense fire, kg
    pub ablated_mass_kg: f64,
}

impl KineticProjectile {
    /// Launch with velocity inheritance: the slug leaves at
    /// shooter_velocity + fire_direction * muzzle_velocity.
    pub fn from_launch(
        shooter_position: Vec3,
        shooter_velocity: Vec3,
        fire_direction: Vec3,
        muzzle_velocity_ms: f64,
        mass_kg: f64,
    ) -> Self {
        let velocity = shooter_velocity + fire_direction.normalized() * muzzle_velocity_ms;
        Self {
            position: shooter_position,
            velocity,
            mass_kg,
            ablated_mass_kg: 0.0,
        }
    }

    /// Mass still on the slug after point-defense ablation, kg.
    /// Never reported below 0.1 kg; a fully vaporized slug is removed from
    /// flight instead.
    pub fn remaining_mass_kg(&self) -> f64 {
        (self.mass_kg - self.ablated_mass_kg).max(0.1)
    }

    pub fn is_vaporized(&self) -> bool {
        self.ablated_mass_kg >= self.mass_kg
    }

    /// Kinetic energy in the rest frame from total velocity, GJ
    pub fn kinetic_energy_gj(&self) -> f64 {
        0.5 * self.remaining_mass_kg() * self.velocity.magnitude_squared() / 1e9
    }

    /// Kinetic energy relative to a moving target, GJ
    pub fn impact_energy_gj(&self, target_velocity: &Vec3) -> f64 {
        let rel = self.velocity - *target_velocity;
        0.5 * self.remaining_mass_kg() * rel.magnitude_squared() / 1e9
    }

    pub fn coast(&mut self, dt: f64) {
        self.position = self.position + self.velocity * dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_inheritance() {
        let shooter_vel = Vec3::new(3000.0, 0.0, 0.0);
        let slug = KineticProjectile::from_launch(
            Vec3::zero(),
            shooter_vel,
            Vec3::unit_y(),
            10_000.0,
            50.0,
        );
        assert_eq!(slug.velocity, Vec3::new(3000.0, 10_000.0, 0.0));
    }

    #[test]
    fn test_kinetic_energy_uses_total_velocity() {
        // Firing dead ahead from a moving ship: energy comes from the sum.
        let slug = KineticProjectile::from_launch(
            Vec3::zero(),
            Vec3::new(5_000.0, 0.0, 0.0),
            Vec3::unit_x(),
            10_000.0,
            50.0,
        );
        let expected_gj = 0.5 * 50.0 * 15_000.0f64.powi(2) / 1e9;
        assert!((slug.kinetic_energy_gj() - expected_gj).abs() < 1e-9);
    }

    #[test]
    fn test_ablation_reduces_impact_energy() {
        let mut slug = KineticProjectile::from_launch(
            Vec3::zero(),
            Vec3::zero(),
            Vec3::unit_x(),
            10_000.0,
            50.0,
        );
        let full = slug.kinetic_energy_gj();
        slug.ablated_mass_kg = 25.0;
        assert!((slug.kinetic_energy_gj() - full / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_impact_energy_is_relative() {
        let slug = KineticProjectile::from_launch(
            Vec3::zero(),
            Vec3::zero(),
            Vec3::unit_x(),
            10_000.0,
            50.0,
        );
        // Target running away at 4 km/s sees a 6 km/s impact.
        let energy = slug.impact_energy_gj(&Vec3::new(4_000.0, 0.0, 0.0));
        let expected = 0.5 * 50.0 * 6_000.0f64.powi(2) / 1e9;
        assert!((energy - expected).abs() < 1e-9);
    }
}
