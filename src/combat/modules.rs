//! Internal ship modules and their spatial layout
//!
//! Modules live in hull-local coordinates: +X forward toward the nose,
//! +Y starboard, +Z dorsal. Damage cones from armor breaches walk this
//! layout front-to-back to decide what burns.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;

/// Functional role of a module. Reactor and bridge kills are catastrophic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleKind {
    Sensors,
    Bridge,
    Reactor,
    Engine,
    Weapon,
    Magazine,
    LifeSupport,
    HeatSink,
    Battery,
    FuelTank,
}

impl ModuleKind {
    pub fn is_critical_by_default(&self) -> bool {
        matches!(
            self,
            ModuleKind::Bridge | ModuleKind::Reactor | ModuleKind::Engine | ModuleKind::Magazine | ModuleKind::LifeSupport
        )
    }
}

/// One internal module with health and a position in the hull
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipModule {
    pub name: String,
    pub kind: ModuleKind,
    /// Hull-local position, meters from ship center
    pub position: Vec3,
    pub health: f64,
    pub max_health: f64,
    /// Approximate radius for cone hit-fraction purposes, meters
    pub radius_m: f64,
    pub is_critical: bool,
    /// Fraction of incoming damage shrugged off by internal shielding
    #[serde(default)]
    pub damage_resistance: f64,
}

impl ShipModule {
    pub fn new(name: &str, kind: ModuleKind, position: Vec3, max_health: f64, radius_m: f64) -> Self {
        Self {
            name: name.to_string(),
            kind,
            position,
            health: max_health,
            max_health,
            radius_m,
            is_critical: kind.is_critical_by_default(),
            damage_resistance: 0.0,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }

    pub fn health_fraction(&self) -> f64 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        self.health / self.max_health
    }

    /// Output multiplier for the subsystem this module drives. Degrades
    /// linearly with health.
    pub fn effectiveness(&self) -> f64 {
        self.health_fraction().clamp(0.0, 1.0)
    }

    /// Apply damage, bounded by remaining health. Returns the amount
    /// actually absorbed.
    pub fn take_damage(&mut self, damage_gj: f64) -> f64 {
        if self.is_destroyed() || damage_gj <= 0.0 {
            return 0.0;
        }
        let effective = damage_gj * (1.0 - self.damage_resistance);
        let absorbed = effective.min(self.health);
        self.health -= absorbed;
        if self.health <= 0.0 {
            self.health = 0.0;
        }
        absorbed
    }
}

/// Spatial arrangement of modules inside one hull
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleLayout {
    pub modules: Vec<ShipModule>,
    pub ship_length_m: f64,
}

impl ModuleLayout {
    pub fn new(ship_length_m: f64) -> Self {
        Self {
            modules: Vec::new(),
            ship_length_m,
        }
    }

    /// Standard single-hull arrangement scaled to the ship's length:
    /// sensors and bridge forward, reactor and engines aft, magazine and
    /// support gear amidships.
    pub fn standard(ship_length_m: f64) -> Self {
        let half = ship_length_m / 2.0;
        let mut layout = Self::new(ship_length_m);
        let specs: [(&str, ModuleKind, f64, f64, f64, f64, f64); 10] = [
            // (name, kind, x_fraction, y, z, health, radius)
            ("sensors", ModuleKind::Sensors, 0.4, 0.0, 0.5, 25.0, 1.5),
            ("bridge", ModuleKind::Bridge, 0.35, 0.0, 1.0, 50.0, 3.0),
            ("life_support", ModuleKind::LifeSupport, 0.1, 0.0, 2.0, 30.0, 2.0),
            ("magazine", ModuleKind::Magazine, 0.0, 2.0, 0.0, 60.0, 2.5),
            ("heat_sink", ModuleKind::HeatSink, 0.0, -2.0, 0.0, 40.0, 2.0),
            ("dorsal_turret", ModuleKind::Weapon, 0.15, 0.0, 3.0, 45.0, 2.5),
            ("ventral_turret", ModuleKind::Weapon, 0.15, 0.0, -3.0, 45.0, 2.5),
            ("battery", ModuleKind::Battery, -0.2, 0.0, -1.0, 35.0, 2.0),
            ("reactor", ModuleKind::Reactor, -0.1, 0.0, 0.0, 100.0, 4.0),
            ("engine", ModuleKind::Engine, -0.4, 0.0, 0.0, 80.0, 5.0),
        ];
        for (name, kind, x_frac, y, z, health, radius) in specs {
            layout.add(ShipModule::new(name, kind, Vec3::new(x_frac * half, y, z), health, radius));
        }
        layout
    }

    pub fn add(&mut self, module: ShipModule) {
        self.modules.push(module);
    }

    pub fn by_name(&self, name: &str) -> Option<&ShipModule> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut ShipModule> {
        self.modules.iter_mut().find(|m| m.name == name)
    }

    pub fn of_kind(&self, kind: ModuleKind) -> impl Iterator<Item = &ShipModule> {
        self.modules.iter().filter(move |m| m.kind == kind)
    }

    /// Aggregate effectiveness of all surviving modules of a kind, 0 when
    /// every one is gone. Drives thrust, reactor output, and sensor quality
    /// degradation.
    pub fn kind_effectiveness(&self, kind: ModuleKind) -> f64 {
        let mut total = 0.0;
        let mut count = 0usize;
        for module in self.of_kind(kind) {
            total += module.effectiveness();
            count += 1;
        }
        if count == 0 {
            1.0
        } else {
            total / count as f64
        }
    }

    /// True when a critical module has been destroyed. The hull is finished.
    pub fn critical_destroyed(&self) -> bool {
        self.modules.iter().any(|m| m.is_critical && m.is_destroyed())
    }

    /// Surviving health over total health, as a percentage
    pub fn integrity_percent(&self) -> f64 {
        let max: f64 = self.modules.iter().map(|m| m.max_health).sum();
        if max <= 0.0 {
            return 0.0;
        }
        let current: f64 = self.modules.iter().map(|m| m.health).sum();
        current / max * 100.0
    }
}

/// Hull-local entry point and travel direction for a hit on a facing
pub fn entry_point_for_location(
    location: crate::physics::geometry::HitLocation,
    ship_length_m: f64,
) -> (Vec3, Vec3) {
    use crate::physics::geometry::HitLocation;
    let half = ship_length_m / 2.0;
    let radius = ship_length_m / 8.0;
    match location {
        HitLocation::Nose => (Vec3::new(half, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)),
        HitLocation::Tail => (Vec3::new(-half, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
        HitLocation::Lateral => (Vec3::new(0.0, radius, 0.0), Vec3::new(0.0, -1.0, 0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::geometry::HitLocation;

    #[test]
    fn test_effectiveness_degrades_linearly() {
        let mut module = ShipModule::new("engine", ModuleKind::Engine, Vec3::zero(), 80.0, 5.0);
        assert_eq!(module.effectiveness(), 1.0);
        module.take_damage(40.0);
        assert!((module.effectiveness() - 0.5).abs() < 1e-9);
        module.take_damage(100.0);
        assert_eq!(module.effectiveness(), 0.0);
        assert!(module.is_destroyed());
    }

    #[test]
    fn test_take_damage_bounded_by_health() {
        let mut module = ShipModule::new("sensors", ModuleKind::Sensors, Vec3::zero(), 25.0, 1.5);
        let absorbed = module.take_damage(100.0);
        assert!((absorbed - 25.0).abs() < 1e-9);
        assert_eq!(module.take_damage(10.0), 0.0);
    }

    #[test]
    fn test_damage_resistance_shrugs_off_fraction() {
        let mut module = ShipModule::new("reactor", ModuleKind::Reactor, Vec3::zero(), 100.0, 4.0);
        module.damage_resistance = 0.5;
        module.take_damage(40.0);
        assert!((module.health - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_standard_layout_criticals() {
        let layout = ModuleLayout::standard(100.0);
        assert!(!layout.critical_destroyed());
        assert!(layout.by_name("reactor").unwrap().is_critical);
        assert!(!layout.by_name("sensors").unwrap().is_critical);
        assert!((layout.integrity_percent() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_critical_destroyed_flags_reactor_kill() {
        let mut layout = ModuleLayout::standard(100.0);
        layout.by_name_mut("reactor").unwrap().take_damage(1000.0);
        assert!(layout.critical_destroyed());
    }

    #[test]
    fn test_kind_effectiveness_averages_turrets() {
        let mut layout = ModuleLayout::standard(100.0);
        layout.by_name_mut("dorsal_turret").unwrap().take_damage(1000.0);
        let eff = layout.kind_effectiveness(ModuleKind::Weapon);
        assert!((eff - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_entry_points_match_facings() {
        let (nose_entry, nose_dir) = entry_point_for_location(HitLocation::Nose, 100.0);
        assert!(nose_entry.x > 0.0 && nose_dir.x < 0.0);
        let (tail_entry, tail_dir) = entry_point_for_location(HitLocation::Tail, 100.0);
        assert!(tail_entry.x < 0.0 && tail_dir.x > 0.0);
        let (lat_entry, lat_dir) = entry_point_for_location(HitLocation::Lateral, 100.0);
        assert!(lat_entry.y > 0.0 && lat_dir.y < 0.0);
    }
}
