//! Armor facings: half-value attenuation and vaporization ablation
//!
//! Protection follows an exponential half-value law: each half-value
//! thickness of armor stops half of the incoming energy. The energy that
//! gets through vaporizes armor off the facing; once the facing is ablated
//! to nothing, the remainder passes inside to the module layout. Thickness
//! only ever goes down.

use serde::{Deserialize, Serialize};

use crate::data::materials::Material;
use crate::physics::geometry::HitLocation;

/// Oblique impacts cap at 80 degrees from normal (a 5.76x path multiplier)
pub const MIN_IMPACT_COS: f64 = 0.1736;
/// Fraction of unstopped energy that actually reaches modules after
/// penetration; the rest is lost to spall and ejecta at the breach
pub const PENETRATION_TRANSFER: f64 = 0.90;

/// Outcome of one impact against a facing
#[derive(Debug, Clone, Copy, Default)]
pub struct ArmorImpact {
    /// Energy stopped by the facing, GJ
    pub absorbed_gj: f64,
    /// Thickness vaporized off the facing, cm
    pub ablated_cm: f64,
    pub penetrated: bool,
    /// Energy delivered to the interior, GJ
    pub penetrating_gj: f64,
}

/// One armor facing of a hull
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmorSection {
    pub facing: HitLocation,
    pub thickness_cm: f64,
    pub material_name: String,
    pub half_value_cm: f64,
    pub density_kg_m3: f64,
    pub ablation_mj_kg: f64,
    /// Facing surface area, m^2
    pub area_m2: f64,
}

impl ArmorSection {
    pub fn new(facing: HitLocation, thickness_cm: f64, material_name: &str, material: &Material, area_m2: f64) -> Self {
        Self {
            facing,
            thickness_cm,
            material_name: material_name.to_string(),
            half_value_cm: material.half_value_cm,
            density_kg_m3: material.density_kg_m3,
            ablation_mj_kg: material.ablation_mj_kg,
            area_m2,
        }
    }

    /// Line-of-sight thickness at an impact angle from the surface normal.
    pub fn effective_thickness_cm(&self, impact_angle_deg: f64) -> f64 {
        let cos = impact_angle_deg.abs().to_radians().cos().max(MIN_IMPACT_COS);
        self.thickness_cm / cos
    }

    /// Fraction of incoming energy stopped: 1 - 0.5^(effective / half_value).
    pub fn protection(&self, impact_angle_deg: f64) -> f64 {
        if self.half_value_cm <= 0.0 || self.thickness_cm <= 0.0 {
            return 0.0;
        }
        1.0 - 0.5f64.powf(self.effective_thickness_cm(impact_angle_deg) / self.half_value_cm)
    }

    /// Thickness vaporized by depositing `energy_gj` over `impact_area_m2`.
    fn energy_to_ablation_cm(&self, energy_gj: f64, impact_area_m2: f64) -> f64 {
        if self.ablation_mj_kg <= 0.0 || impact_area_m2 <= 0.0 || self.density_kg_m3 <= 0.0 {
            return 0.0;
        }
        let energy_j = energy_gj * 1e9;
        let ablation_j_kg = self.ablation_mj_kg * 1e6;
        let thickness_m = energy_j / (self.density_kg_m3 * impact_area_m2 * ablation_j_kg);
        thickness_m * 100.0
    }

    /// Resolve one impact. The attenuated fraction is stopped outright; the
    /// remainder eats thickness, and whatever the facing cannot stop passes
    /// inside (scaled by the breach transfer fraction).
    pub fn apply_impact(&mut self, energy_gj: f64, impact_angle_deg: f64, impact_area_m2: f64) -> ArmorImpact {
        if energy_gj <= 0.0 {
            return ArmorImpact::default();
        }
        if self.thickness_cm <= 0.0 {
            // Bare hull: everything goes inside.
            return ArmorImpact {
                absorbed_gj: 0.0,
                ablated_cm: 0.0,
                penetrated: true,
                penetrating_gj: energy_gj * PENETRATION_TRANSFER,
            };
        }

        let reduction = self.protection(impact_angle_deg);
        let stopped_gj = energy_gj * reduction;
        let through_gj = energy_gj - stopped_gj;

        let demanded_ablation_cm = self.energy_to_ablation_cm(through_gj, impact_area_m2);
        if demanded_ablation_cm <= self.thickness_cm {
            self.thickness_cm -= demanded_ablation_cm;
            return ArmorImpact {
                absorbed_gj: energy_gj,
                ablated_cm: demanded_ablation_cm,
                penetrated: false,
                penetrating_gj: 0.0,
            };
        }

        // Facing fully ablated: only part of the through-energy was spent.
        let spent_fraction = if demanded_ablation_cm > 0.0 {
            self.thickness_cm / demanded_ablation_cm
        } else {
            0.0
        };
        let spent_gj = through_gj * spent_fraction;
        let excess_gj = through_gj - spent_gj;
        let ablated = self.thickness_cm;
        self.thickness_cm = 0.0;

        ArmorImpact {
            absorbed_gj: stopped_gj + spent_gj,
            ablated_cm: ablated,
            penetrated: true,
            penetrating_gj: excess_gj * PENETRATION_TRANSFER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::materials::MaterialTable;

    fn titanium_section(thickness_cm: f64) -> ArmorSection {
        let table = MaterialTable::builtin();
        ArmorSection::new(HitLocation::Lateral, thickness_cm, "titanium", table.get("titanium"), 100.0)
    }

    #[test]
    fn test_protection_zero_at_zero_thickness() {
        let section = titanium_section(0.0);
        assert_eq!(section.protection(0.0), 0.0);
    }

    #[test]
    fn test_protection_half_at_half_value() {
        let section = titanium_section(10.5);
        assert!((section.protection(0.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_protection_approaches_one() {
        let section = titanium_section(200.0);
        assert!(section.protection(0.0) > 0.999);
    }

    #[test]
    fn test_oblique_impact_sees_thicker_armor() {
        let section = titanium_section(10.0);
        assert!(section.protection(60.0) > section.protection(0.0));
        // Clamp at 80 degrees: beyond it protection stops growing.
        assert!((section.effective_thickness_cm(89.0) - section.effective_thickness_cm(80.0)).abs() < 1e-6);
    }

    #[test]
    fn test_thickness_non_increasing_and_non_negative() {
        let mut section = titanium_section(20.0);
        let mut last = section.thickness_cm;
        for _ in 0..50 {
            section.apply_impact(5.0, 0.0, 0.1);
            assert!(section.thickness_cm <= last);
            assert!(section.thickness_cm >= 0.0);
            last = section.thickness_cm;
        }
    }

    #[test]
    fn test_light_hit_absorbed_without_penetration() {
        let mut section = titanium_section(50.0);
        let impact = section.apply_impact(0.5, 0.0, 0.1);
        assert!(!impact.penetrated);
        assert_eq!(impact.penetrating_gj, 0.0);
        assert!((impact.absorbed_gj - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_massive_hit_penetrates_with_transfer_loss() {
        let mut section = titanium_section(2.0);
        let impact = section.apply_impact(50.0, 0.0, 0.1);
        assert!(impact.penetrated);
        assert_eq!(section.thickness_cm, 0.0);
        assert!(impact.penetrating_gj > 0.0);
        // Whatever got through lost the breach fraction.
        assert!(impact.penetrating_gj < 50.0 * PENETRATION_TRANSFER);
    }

    #[test]
    fn test_bare_hull_passes_energy_straight_through() {
        let mut section = titanium_section(0.0);
        let impact = section.apply_impact(10.0, 0.0, 0.1);
        assert!(impact.penetrated);
        assert!((impact.penetrating_gj - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_energy_accounting_balances() {
        let mut section = titanium_section(5.0);
        let energy = 30.0;
        let impact = section.apply_impact(energy, 0.0, 0.1);
        let recovered = impact.absorbed_gj + impact.penetrating_gj / PENETRATION_TRANSFER;
        assert!((recovered - energy).abs() < 1e-6);
    }
}
