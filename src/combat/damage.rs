//! Damage cones: how a breach propagates through the module layout
//!
//! A penetrating hit opens a cone behind the breach. The cone expands
//! linearly with its half-angle, sheds energy exponentially with distance,
//! and splits a fraction of its remaining energy into a wider spalling cone
//! whenever it kills a module outright.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combat::modules::{ModuleLayout, ShipModule};
use crate::core::types::Vec3;

/// Fraction of remaining energy that spalls off a destroyed module
pub const SPALLING_ENERGY_FACTOR: f64 = 0.25;
/// Spalling fragments stop mattering past this range, meters
pub const SPALLING_RANGE_M: f64 = 15.0;
/// Cones below this carry no meaningful damage, GJ
pub const MIN_CONE_ENERGY_GJ: f64 = 0.01;

/// Damage profile of the penetrator. Angle is the cone half-angle;
/// dissipation is the fractional energy loss per meter of hull interior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageKind {
    Kinetic,
    Explosive,
    Laser,
    Spalling,
}

impl DamageKind {
    pub fn cone_half_angle_deg(&self) -> f64 {
        match self {
            DamageKind::Kinetic => 15.0,
            DamageKind::Explosive => 60.0,
            DamageKind::Laser => 5.0,
            DamageKind::Spalling => 45.0,
        }
    }

    pub fn dissipation_per_m(&self) -> f64 {
        match self {
            DamageKind::Kinetic => 0.005,
            DamageKind::Explosive => 0.02,
            DamageKind::Laser => 0.001,
            DamageKind::Spalling => 0.03,
        }
    }
}

/// What happened to one module in a cone's path
#[derive(Debug, Clone)]
pub struct ModuleDamage {
    pub module_name: String,
    pub damage_gj: f64,
    pub health_after: f64,
    pub destroyed: bool,
    pub from_spalling: bool,
}

/// An expanding cone of destruction in hull-local coordinates
#[derive(Debug, Clone)]
pub struct DamageCone {
    pub entry_point: Vec3,
    pub direction: Vec3,
    pub kind: DamageKind,
    pub energy_gj: f64,
}

impl DamageCone {
    pub fn new(entry_point: Vec3, direction: Vec3, kind: DamageKind, energy_gj: f64) -> Self {
        Self {
            entry_point,
            direction: direction.normalized(),
            kind,
            energy_gj,
        }
    }

    /// Axial distance from the entry point to a position. Negative means
    /// behind the breach.
    pub fn axial_distance_m(&self, position: &Vec3) -> f64 {
        (*position - self.entry_point).dot(&self.direction)
    }

    pub fn contains(&self, position: &Vec3) -> bool {
        let to_position = *position - self.entry_point;
        let along = to_position.dot(&self.direction);
        if along <= 0.0 {
            return false;
        }
        let magnitude = to_position.magnitude();
        if magnitude == 0.0 {
            return true;
        }
        let cos_angle = (along / magnitude).clamp(-1.0, 1.0);
        cos_angle.acos() <= self.kind.cone_half_angle_deg().to_radians()
    }

    /// E(d) = E0 * exp(-rate * d)
    pub fn energy_at_m(&self, distance_m: f64) -> f64 {
        if distance_m <= 0.0 {
            return self.energy_gj;
        }
        (self.energy_gj * (-self.kind.dissipation_per_m() * distance_m).exp()).max(0.0)
    }

    pub fn radius_at_m(&self, distance_m: f64) -> f64 {
        if distance_m <= 0.0 {
            return 0.0;
        }
        distance_m * self.kind.cone_half_angle_deg().to_radians().tan()
    }

    /// Fraction of the cone's cross-section a module intercepts at its
    /// distance, capped at 1.
    pub fn hit_fraction(&self, module: &ShipModule) -> f64 {
        if !self.contains(&module.position) {
            return 0.0;
        }
        let distance = self.axial_distance_m(&module.position);
        if distance <= 0.0 {
            return 1.0;
        }
        let cone_radius = self.radius_at_m(distance);
        if cone_radius <= 0.0 {
            return 1.0;
        }
        let ratio = (module.radius_m * module.radius_m) / (cone_radius * cone_radius);
        ratio.min(1.0)
    }
}

/// Walk a cone through the layout front-to-back, damaging everything in its
/// path until the energy runs out. Destroyed modules spall a secondary cone
/// over their neighbors; spalling does not chain.
pub fn propagate(cone: &DamageCone, layout: &mut ModuleLayout) -> Vec<ModuleDamage> {
    let mut results = Vec::new();

    let mut in_path: Vec<usize> = layout
        .modules
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.is_destroyed() && cone.contains(&m.position))
        .map(|(i, _)| i)
        .collect();
    in_path.sort_by_key(|&i| OrderedFloat(cone.axial_distance_m(&layout.modules[i].position)));

    let mut energy = cone.energy_gj;
    let mut last_distance = 0.0;

    for index in in_path {
        if energy < MIN_CONE_ENERGY_GJ {
            break;
        }
        let module_distance = cone.axial_distance_m(&layout.modules[index].position);
        let travelled = module_distance - last_distance;
        if travelled > 0.0 {
            energy *= (-cone.kind.dissipation_per_m() * travelled).exp();
        }
        if energy < MIN_CONE_ENERGY_GJ {
            break;
        }

        let hit_fraction = cone.hit_fraction(&layout.modules[index]);
        if hit_fraction <= 0.0 {
            continue;
        }

        let module = &mut layout.modules[index];
        let absorbed = module.take_damage(energy * hit_fraction);
        energy -= absorbed;

        let destroyed = module.is_destroyed();
        debug!(
            module = %module.name,
            absorbed_gj = absorbed,
            destroyed,
            "cone damage"
        );
        results.push(ModuleDamage {
            module_name: module.name.clone(),
            damage_gj: absorbed,
            health_after: module.health,
            destroyed,
            from_spalling: false,
        });

        if destroyed {
            let origin = layout.modules[index].position;
            let spall_energy = energy * SPALLING_ENERGY_FACTOR;
            if spall_energy >= MIN_CONE_ENERGY_GJ {
                let spall = DamageCone::new(origin, cone.direction, DamageKind::Spalling, spall_energy);
                results.extend(spall_nearby(&spall, index, layout));
            }
        }

        last_distance = module_distance;
        if module_distance > layout.ship_length_m {
            break;
        }
    }

    results
}

fn spall_nearby(spall: &DamageCone, source_index: usize, layout: &mut ModuleLayout) -> Vec<ModuleDamage> {
    let mut results = Vec::new();
    for index in 0..layout.modules.len() {
        if index == source_index || layout.modules[index].is_destroyed() {
            continue;
        }
        let distance = (layout.modules[index].position - spall.entry_point).magnitude();
        if distance > SPALLING_RANGE_M || !spall.contains(&layout.modules[index].position) {
            continue;
        }
        let hit_fraction = spall.hit_fraction(&layout.modules[index]);
        if hit_fraction <= 0.0 {
            continue;
        }
        let damage = spall.energy_at_m(distance) * hit_fraction;
        if damage < MIN_CONE_ENERGY_GJ {
            continue;
        }
        let module = &mut layout.modules[index];
        let absorbed = module.take_damage(damage);
        results.push(ModuleDamage {
            module_name: module.name.clone(),
            damage_gj: absorbed,
            health_after: module.health,
            destroyed: module.is_destroyed(),
            from_spalling: true,
        });
    }
    results
}
