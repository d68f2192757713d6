//! Material constants table
//!
//! Armor half-value thicknesses, densities, and vaporization energies are
//! empirically tuned numbers, not derivable from the mechanics. They live in
//! a swappable table: built-in defaults cover the stock materials, and a
//! TOML file with the same shape can replace or extend them per scenario.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::Result;

/// Physical constants for one hull/munition material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    /// Armor thickness that attenuates penetrating energy by half (cm)
    pub half_value_cm: f64,
    /// Density in kg/m^3
    pub density_kg_m3: f64,
    /// Energy to ablate 1 kg of armor under impact, including spall losses (MJ/kg)
    pub ablation_mj_kg: f64,
    /// Energy to fully heat, melt, and vaporize 1 kg under laser fire (MJ/kg)
    pub vaporization_mj_kg: f64,
}

/// Lookup table of materials by lowercase name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialTable {
    materials: AHashMap<String, Material>,
}

impl Default for MaterialTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MaterialTable {
    /// The stock material set
    pub fn builtin() -> Self {
        let mut materials = AHashMap::new();
        materials.insert(
            "titanium".to_string(),
            Material {
                half_value_cm: 10.5,
                density_kg_m3: 4820.0,
                ablation_mj_kg: 8.77,
                vaporization_mj_kg: 25.0,
            },
        );
        materials.insert(
            "steel".to_string(),
            Material {
                half_value_cm: 12.0,
                density_kg_m3: 7850.0,
                ablation_mj_kg: 9.8,
                vaporization_mj_kg: 30.0,
            },
        );
        materials.insert(
            "tungsten".to_string(),
            Material {
                half_value_cm: 6.5,
                density_kg_m3: 19300.0,
                ablation_mj_kg: 17.0,
                vaporization_mj_kg: 60.0,
            },
        );
        materials.insert(
            "aluminum".to_string(),
            Material {
                half_value_cm: 18.0,
                density_kg_m3: 2700.0,
                ablation_mj_kg: 6.2,
                vaporization_mj_kg: 15.0,
            },
        );
        Self { materials }
    }

    /// Load a table from TOML, merged over the builtin defaults so a file
    /// only needs to list the materials it changes.
    pub fn load_toml(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let overlay: AHashMap<String, Material> = toml::from_str(&text)?;
        let mut table = Self::builtin();
        for (name, mat) in overlay {
            table.materials.insert(name.to_lowercase(), mat);
        }
        Ok(table)
    }

    /// Look up a material by name (case-insensitive). Unknown materials fall
    /// back to titanium, the neutral default for hull construction.
    pub fn get(&self, name: &str) -> &Material {
        self.materials
            .get(&name.to_lowercase())
            .or_else(|| self.materials.get("titanium"))
            .unwrap_or(&FALLBACK)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.materials.contains_key(&name.to_lowercase())
    }
}

// Used only if a caller constructs an empty table through deserialization.
static FALLBACK: Material = Material {
    half_value_cm: 10.5,
    density_kg_m3: 4820.0,
    ablation_mj_kg: 8.77,
    vaporization_mj_kg: 25.0,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_stock_materials() {
        let table = MaterialTable::builtin();
        for name in ["titanium", "steel", "tungsten", "aluminum"] {
            assert!(table.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = MaterialTable::builtin();
        assert_eq!(table.get("Tungsten").vaporization_mj_kg, 60.0);
    }

    #[test]
    fn test_unknown_material_falls_back_to_titanium() {
        let table = MaterialTable::builtin();
        assert_eq!(table.get("unobtainium").density_kg_m3, 4820.0);
    }
}
