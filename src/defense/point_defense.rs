//! Point-defense lasers with diffraction-limited optics
//!
//! Spot diameter grows linearly with range as (wavelength / aperture) * r,
//! so intensity falls with the square of range. Slugs are killed by mass
//! ablation, torpedoes by accumulated heat against two ordered thresholds
//! (electronics first, then warhead), and ship armor only by raw intensity
//! against thin plating at very close range.

use serde::{Deserialize, Serialize};

use crate::data::materials::MaterialTable;

/// Heat that disables a torpedo's guidance electronics, joules
pub const TORPEDO_DISABLE_THRESHOLD_J: f64 = 10_000.0;
/// Heat that cooks off a torpedo's warhead, joules; strictly above disable
pub const TORPEDO_DESTROY_THRESHOLD_J: f64 = 100_000.0;
/// Effective torpedo cross-section for beam coupling, m^2
pub const TORPEDO_CROSS_SECTION_M2: f64 = 1.0;
/// Minimum effective intensity that ablates ship armor at all, W/m^2.
/// High enough that only thin plating at close range qualifies.
pub const MIN_ARMOR_DAMAGE_INTENSITY: f64 = 1e12;

/// One point-defense laser turret
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdLaser {
    #[serde(default = "default_power")]
    pub power_mw: f64,
    #[serde(default = "default_aperture")]
    pub aperture_m: f64,
    #[serde(default = "default_wavelength")]
    pub wavelength_nm: f64,
    #[serde(default = "default_range")]
    pub range_km: f64,
    #[serde(default = "default_cooldown")]
    pub cooldown_s: f64,
}

fn default_power() -> f64 {
    5.0
}
fn default_aperture() -> f64 {
    0.5
}
fn default_wavelength() -> f64 {
    1000.0
}
fn default_range() -> f64 {
    100.0
}
fn default_cooldown() -> f64 {
    0.5
}

impl Default for PdLaser {
    fn default() -> Self {
        Self {
            power_mw: default_power(),
            aperture_m: default_aperture(),
            wavelength_nm: default_wavelength(),
            range_km: default_range(),
            cooldown_s: default_cooldown(),
        }
    }
}

impl PdLaser {
    pub fn power_w(&self) -> f64 {
        self.power_mw * 1e6
    }

    pub fn is_in_range(&self, distance_km: f64) -> bool {
        distance_km > 0.0 && distance_km <= self.range_km
    }

    /// Diffraction-limited spot diameter at range, meters:
    /// (wavelength / aperture) * distance.
    pub fn spot_diameter_m(&self, distance_km: f64) -> f64 {
        let wavelength_m = self.wavelength_nm * 1e-9;
        (wavelength_m / self.aperture_m) * distance_km * 1000.0
    }

    pub fn spot_area_m2(&self, distance_km: f64) -> f64 {
        let radius = self.spot_diameter_m(distance_km) / 2.0;
        std::f64::consts::PI * radius * radius
    }

    /// Beam intensity at range, W/m^2
    pub fn intensity_w_m2(&self, distance_km: f64) -> f64 {
        let area = self.spot_area_m2(distance_km);
        if area <= 0.0 {
            return f64::INFINITY;
        }
        self.power_w() / area
    }

    /// Mass ablation rate against a slug of the given material, kg/s:
    /// power / vaporization_energy.
    pub fn ablation_rate_kg_s(&self, material_vaporization_mj_kg: f64) -> f64 {
        if material_vaporization_mj_kg <= 0.0 {
            return 0.0;
        }
        self.power_w() / (material_vaporization_mj_kg * 1e6)
    }

    /// Power actually coupled into a torpedo body at range, watts. Once
    /// the spot outgrows the torpedo cross-section the overspill is lost.
    pub fn coupled_power_w(&self, distance_km: f64) -> f64 {
        let spot = self.spot_area_m2(distance_km);
        if spot <= TORPEDO_CROSS_SECTION_M2 {
            self.power_w()
        } else {
            self.power_w() * (TORPEDO_CROSS_SECTION_M2 / spot)
        }
    }

    /// Heat delivered to a torpedo over a dwell, joules
    pub fn heat_transfer_j(&self, distance_km: f64, dwell_s: f64) -> f64 {
        self.coupled_power_w(distance_km) * dwell_s.max(0.0)
    }

    /// Whether the beam can ablate ship armor of the given thickness at
    /// this range. Thick armor sinks the heat faster than the spot can
    /// deliver it: effectiveness scales by 1 / (1 + cm / 10).
    pub fn can_damage_armor(&self, distance_km: f64, armor_thickness_cm: f64) -> bool {
        let thickness_factor = 1.0 / (1.0 + armor_thickness_cm.max(0.0) / 10.0);
        self.intensity_w_m2(distance_km) * thickness_factor >= MIN_ARMOR_DAMAGE_INTENSITY
    }
}

/// What a point-defense turret is shooting at. Lower priority numbers are
/// engaged first; a slug already on a collision course outranks everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatClass {
    SlugOnIntercept,
    TorpedoOnCollision,
    TorpedoManeuvering,
    AlliedDefense,
    EnemyShip,
}

impl ThreatClass {
    pub fn priority(&self) -> u8 {
        match self {
            ThreatClass::SlugOnIntercept => 1,
            ThreatClass::TorpedoOnCollision => 2,
            ThreatClass::TorpedoManeuvering => 3,
            ThreatClass::AlliedDefense => 4,
            ThreatClass::EnemyShip => 10,
        }
    }
}

/// How an engagement ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngagementOutcome {
    Destroyed,
    Disabled,
    Damaged,
    OutOfRange,
    Ineffective,
}

/// Result of one engagement cycle
#[derive(Debug, Clone)]
pub struct EngagementResult {
    pub outcome: EngagementOutcome,
    pub distance_km: f64,
    pub energy_delivered_j: f64,
    pub mass_ablated_kg: f64,
}

impl EngagementResult {
    fn no_op(distance_km: f64) -> Self {
        Self {
            outcome: EngagementOutcome::OutOfRange,
            distance_km,
            energy_delivered_j: 0.0,
            mass_ablated_kg: 0.0,
        }
    }
}

/// Engage a kinetic slug for one dwell period: vaporize mass off the body.
/// Returns the mass removed this cycle; the caller owns the slug record.
pub fn engage_slug(
    laser: &PdLaser,
    distance_km: f64,
    dwell_s: f64,
    slug_material: &str,
    slug_remaining_kg: f64,
    materials: &MaterialTable,
) -> EngagementResult {
    if !laser.is_in_range(distance_km) {
        return EngagementResult::no_op(distance_km);
    }
    let vaporization = materials.get(slug_material).vaporization_mj_kg;
    let ablated = (laser.ablation_rate_kg_s(vaporization) * dwell_s).min(slug_remaining_kg);
    let outcome = if ablated >= slug_remaining_kg - 1e-12 {
        EngagementOutcome::Destroyed
    } else if ablated > 0.0 {
        EngagementOutcome::Damaged
    } else {
        EngagementOutcome::Ineffective
    };
    EngagementResult {
        outcome,
        distance_km,
        energy_delivered_j: ablated * vaporization * 1e6,
        mass_ablated_kg: ablated,
    }
}

/// Engage a torpedo for one dwell period. `heat_absorbed_j` is the bird's
/// running total before this cycle; the returned energy must be added to it
/// by the caller. Disable always precedes destroy on the same accumulation
/// curve because its threshold is strictly lower.
pub fn engage_torpedo(
    laser: &PdLaser,
    distance_km: f64,
    dwell_s: f64,
    heat_absorbed_j: f64,
) -> EngagementResult {
    if !laser.is_in_range(distance_km) {
        return EngagementResult::no_op(distance_km);
    }
    let delivered = laser.heat_transfer_j(distance_km, dwell_s);
    let total = heat_absorbed_j + delivered;
    let outcome = if total >= TORPEDO_DESTROY_THRESHOLD_J {
        EngagementOutcome::Destroyed
    } else if total >= TORPEDO_DISABLE_THRESHOLD_J {
        EngagementOutcome::Disabled
    } else if delivered > 0.0 {
        EngagementOutcome::Damaged
    } else {
        EngagementOutcome::Ineffective
    };
    EngagementResult {
        outcome,
        distance_km,
        energy_delivered_j: delivered,
        mass_ablated_kg: 0.0,
    }
}

/// Engage ship armor at close range. Mostly a deterrent: returns Damaged
/// only against thin plating inside the intensity floor.
pub fn engage_ship_armor(
    laser: &PdLaser,
    distance_km: f64,
    dwell_s: f64,
    armor_thickness_cm: f64,
) -> EngagementResult {
    if !laser.is_in_range(distance_km) {
        return EngagementResult::no_op(distance_km);
    }
    let delivered = laser.power_w() * dwell_s.max(0.0);
    let outcome = if laser.can_damage_armor(distance_km, armor_thickness_cm) {
        EngagementOutcome::Damaged
    } else {
        EngagementOutcome::Ineffective
    };
    EngagementResult {
        outcome,
        distance_km,
        energy_delivered_j: delivered,
        mass_ablated_kg: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spot_grows_linearly_with_range() {
        let laser = PdLaser::default();
        let d1 = laser.spot_diameter_m(10.0);
        let d2 = laser.spot_diameter_m(20.0);
        assert!((d2 / d1 - 2.0).abs() < 1e-9);
        // 1 micron through a 0.5 m aperture at 10 km: 2e-6 rad * 1e4 m.
        assert!((d1 - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_intensity_falls_with_square_of_range() {
        let laser = PdLaser::default();
        let i1 = laser.intensity_w_m2(10.0);
        let i2 = laser.intensity_w_m2(20.0);
        assert!((i1 / i2 - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_ablation_rate_formula() {
        let laser = PdLaser::default();
        // 5 MW into steel at 30 MJ/kg: 1/6 kg/s.
        let rate = laser.ablation_rate_kg_s(30.0);
        assert!((rate - 5.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_is_no_op() {
        let laser = PdLaser::default();
        let result = engage_torpedo(&laser, 500.0, 1.0, 0.0);
        assert_eq!(result.outcome, EngagementOutcome::OutOfRange);
        assert_eq!(result.energy_delivered_j, 0.0);
    }

    #[test]
    fn test_slug_destroyed_by_sufficient_dwell() {
        let laser = PdLaser::default();
        let materials = MaterialTable::builtin();
        // 1/6 kg/s against a 1 kg steel slug: 6 s vaporizes it.
        let result = engage_slug(&laser, 10.0, 10.0, "steel", 1.0, &materials);
        assert_eq!(result.outcome, EngagementOutcome::Destroyed);
        assert!((result.mass_ablated_kg - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_torpedo_heat_matches_closed_form_at_short_range() {
        let laser = PdLaser::default();
        // At 5 km the spot (1e-4 m^2 scale) is far smaller than the body:
        // full power couples.
        assert!(laser.spot_area_m2(5.0) < TORPEDO_CROSS_SECTION_M2);
        let result = engage_torpedo(&laser, 5.0, 0.002, 0.0);
        assert!((result.energy_delivered_j - 5e6 * 0.002).abs() < 1e-6);
    }

    #[test]
    fn test_torpedo_coupling_loss_at_long_range() {
        let laser = PdLaser {
            aperture_m: 0.01,
            ..Default::default()
        };
        // Tiny aperture spreads the spot beyond 1 m^2: coupled power drops.
        let distance = 100.0;
        assert!(laser.spot_area_m2(distance) > TORPEDO_CROSS_SECTION_M2);
        assert!(laser.coupled_power_w(distance) < laser.power_w());
    }

    #[test]
    fn test_disable_before_destroy() {
        let laser = PdLaser::default();
        let mut heat = 0.0;
        let mut disabled_at = None;
        let mut destroyed_at = None;
        for cycle in 0..200 {
            let result = engage_torpedo(&laser, 5.0, 0.005, heat);
            heat += result.energy_delivered_j;
            if disabled_at.is_none() && result.outcome == EngagementOutcome::Disabled {
                disabled_at = Some(cycle);
            }
            if result.outcome == EngagementOutcome::Destroyed {
                destroyed_at = Some(cycle);
                break;
            }
        }
        let (d, k) = (disabled_at.unwrap(), destroyed_at.unwrap());
        assert!(d < k, "disable ({d}) must precede destroy ({k})");
    }

    #[test]
    fn test_thick_armor_shrugs_off_pd_fire() {
        let laser = PdLaser::default();
        let close = 0.5;
        let thin = engage_ship_armor(&laser, close, 1.0, 0.5);
        let thick = engage_ship_armor(&laser, close, 1.0, 500.0);
        assert_eq!(thin.outcome, EngagementOutcome::Damaged);
        assert_eq!(thick.outcome, EngagementOutcome::Ineffective);
    }
}
