//! Hit resolution: probability, facing roll, armor, and interior damage
//!
//! One impact flows through four stages: a hit-probability gate, a weighted
//! facing roll (nose 15% / lateral 70% / tail 15%), the facing's armor, and
//! a damage cone through the module layout when the armor breaches.
//! Radiators hang outside the armor and get their own exposure roll.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combat::damage::{self, DamageCone, DamageKind, ModuleDamage};
use crate::combat::modules::{entry_point_for_location, ModuleLayout};
use crate::defense::armor::{ArmorImpact, ArmorSection};
use crate::physics::geometry::HitLocation;
use crate::thermal::ThermalSystem;

pub const NOSE_HIT_WEIGHT: f64 = 0.15;
pub const LATERAL_HIT_WEIGHT: f64 = 0.70;
pub const TAIL_HIT_WEIGHT: f64 = 0.15;

/// Guided munitions track; they get a flat velocity factor instead of the
/// muzzle-velocity curve
pub const GUIDED_VELOCITY_FACTOR: f64 = 0.8;
/// Evasive maneuvering halves the chance to hit
pub const EVASION_FACTOR: f64 = 0.5;

pub const RADIATOR_HIT_CHANCE_EXTENDED: f64 = 0.20;
/// Radiators carry token shielding: 10% damage reduction
pub const RADIATOR_ARMOR_RATING: f64 = 0.10;

/// How fast the incoming round flies, for the evadability term
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AttackVelocity {
    /// Unguided slug at the given muzzle velocity, km/s
    Ballistic(f64),
    /// Terminal-guided munition
    Guided,
}

/// Chance to hit, in [0, 1]. Falls off with the square of range, scales
/// with how hard the round is to dodge, and is halved outright when the
/// target is flying evasively.
pub fn hit_probability(
    attack: AttackVelocity,
    distance_km: f64,
    max_range_km: f64,
    target_evading: bool,
    tracking_modifier: f64,
) -> f64 {
    if max_range_km <= 0.0 || distance_km > max_range_km {
        return 0.0;
    }
    let range_factor = 1.0 - (distance_km / max_range_km).powi(2);
    let velocity_factor = match attack {
        AttackVelocity::Ballistic(kps) if kps > 0.0 => (kps / 10.0).min(1.0),
        AttackVelocity::Ballistic(_) => 0.0,
        AttackVelocity::Guided => GUIDED_VELOCITY_FACTOR,
    };
    let evasion_factor = if target_evading { EVASION_FACTOR } else { 1.0 };
    (range_factor * velocity_factor * evasion_factor * tracking_modifier).clamp(0.0, 1.0)
}

/// Weighted facing roll
pub fn roll_hit_location<R: Rng>(rng: &mut R) -> HitLocation {
    let roll: f64 = rng.gen();
    if roll < NOSE_HIT_WEIGHT {
        HitLocation::Nose
    } else if roll < NOSE_HIT_WEIGHT + LATERAL_HIT_WEIGHT {
        HitLocation::Lateral
    } else {
        HitLocation::Tail
    }
}

/// Radiator damage attached to a hull hit
#[derive(Debug, Clone)]
pub struct RadiatorHit {
    pub radiator_index: usize,
    pub damage_gj: f64,
    pub destroyed: bool,
}

/// Everything one resolved impact did to the target
#[derive(Debug, Clone)]
pub struct HitResolution {
    pub location: HitLocation,
    pub armor: ArmorImpact,
    pub module_damage: Vec<ModuleDamage>,
    pub radiator_hit: Option<RadiatorHit>,
    /// A critical module died in this impact
    pub critical_destroyed: bool,
}

/// Resolve a confirmed hit against one ship's defenses. The caller has
/// already rolled the hit-probability gate; this applies the facing roll's
/// consequences. `armor_sections` must hold one section per facing.
#[allow(clippy::too_many_arguments)]
pub fn resolve_impact<R: Rng>(
    energy_gj: f64,
    kind: DamageKind,
    location: HitLocation,
    impact_angle_deg: f64,
    impact_area_m2: f64,
    armor_sections: &mut [ArmorSection],
    layout: &mut ModuleLayout,
    thermal: &mut ThermalSystem,
    rng: &mut R,
) -> HitResolution {
    let armor_result = armor_sections
        .iter_mut()
        .find(|s| s.facing == location)
        .map(|section| section.apply_impact(energy_gj, impact_angle_deg, impact_area_m2))
        .unwrap_or(ArmorImpact {
            absorbed_gj: 0.0,
            ablated_cm: 0.0,
            penetrated: true,
            penetrating_gj: energy_gj,
        });

    let module_damage = if armor_result.penetrated && armor_result.penetrating_gj > 0.0 {
        let (entry, direction) = entry_point_for_location(location, layout.ship_length_m);
        let cone = DamageCone::new(entry, direction, kind, armor_result.penetrating_gj);
        damage::propagate(&cone, layout)
    } else {
        Vec::new()
    };

    let radiator_hit = resolve_radiator_exposure(energy_gj, thermal, rng);
    let critical_destroyed = layout.critical_destroyed();

    debug!(
        location = location.name(),
        penetrated = armor_result.penetrated,
        modules_hit = module_damage.len(),
        critical_destroyed,
        "impact resolved"
    );

    HitResolution {
        location,
        armor: armor_result,
        module_damage,
        radiator_hit,
        critical_destroyed,
    }
}

/// Radiators sit outboard of the armor: a hit anywhere on the hull has a
/// chance to clip one, but only extended panels present a target.
fn resolve_radiator_exposure<R: Rng>(
    energy_gj: f64,
    thermal: &mut ThermalSystem,
    rng: &mut R,
) -> Option<RadiatorHit> {
    if thermal.radiators.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..thermal.radiators.len());
    if !thermal.radiators[index].is_extended() {
        return None;
    }
    if rng.gen::<f64>() > RADIATOR_HIT_CHANCE_EXTENDED {
        return None;
    }
    let damage_gj = energy_gj * (1.0 - RADIATOR_ARMOR_RATING);
    let state = thermal.radiators[index].apply_damage(damage_gj);
    Some(RadiatorHit {
        radiator_index: index,
        damage_gj,
        destroyed: state == crate::thermal::RadiatorState::Destroyed,
    })
}
