//! One ship's complete combat state, and the TOML spec it is built from
//!
//! ShipState composes every subsystem: kinematics, attitude, thermal,
//! power, weapons, torpedoes, point defense, armor, modules, targeting.
//! Module damage feeds back into subsystem performance through the
//! effectiveness accessors.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::combat::modules::{ModuleKind, ModuleLayout};
use crate::core::types::{ShipId, Vec3};
use crate::data::materials::MaterialTable;
use crate::defense::armor::ArmorSection;
use crate::defense::point_defense::PdLaser;
use crate::munitions::torpedo::{TorpedoLauncher, TorpedoSpec};
use crate::munitions::weapons::{WeaponSpec, WeaponState};
use crate::physics::geometry::{HitLocation, HullGeometry};
use crate::physics::kinematics::{DriveSpec, KinematicState};
use crate::physics::rotation::AttitudeControl;
use crate::power::{Battery, PowerSystem, Reactor, WeaponCapacitor};
use crate::simulation::commands::{Maneuver, WeaponsOrder};
use crate::targeting::{EcmSystem, FiringSolution, TargetingComputer};
use crate::thermal::{Radiator, ThermalSystem};

/// A point-defense turret: one laser plus its firing cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdTurret {
    pub laser: PdLaser,
    pub cooldown_remaining_s: f64,
}

impl PdTurret {
    pub fn new(laser: PdLaser) -> Self {
        Self {
            laser,
            cooldown_remaining_s: 0.0,
        }
    }

    pub fn can_fire(&self) -> bool {
        self.cooldown_remaining_s <= 0.0
    }

    pub fn update(&mut self, dt: f64) {
        self.cooldown_remaining_s = (self.cooldown_remaining_s - dt).max(0.0);
    }

    pub fn engage(&mut self) {
        self.cooldown_remaining_s = self.laser.cooldown_s;
    }
}

/// Per-facing armor description in a ship spec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmorLoadout {
    #[serde(default = "default_nose_cm")]
    pub nose_cm: f64,
    #[serde(default = "default_lateral_cm")]
    pub lateral_cm: f64,
    #[serde(default = "default_tail_cm")]
    pub tail_cm: f64,
    #[serde(default = "default_material")]
    pub material: String,
}

fn default_nose_cm() -> f64 {
    40.0
}
fn default_lateral_cm() -> f64 {
    15.0
}
fn default_tail_cm() -> f64 {
    10.0
}
fn default_material() -> String {
    "titanium".to_string()
}

impl Default for ArmorLoadout {
    fn default() -> Self {
        Self {
            nose_cm: default_nose_cm(),
            lateral_cm: default_lateral_cm(),
            tail_cm: default_tail_cm(),
            material: default_material(),
        }
    }
}

/// Torpedo armament in a ship spec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorpedoArmament {
    #[serde(default)]
    pub spec: TorpedoSpec,
    #[serde(default = "default_magazine")]
    pub magazine: u32,
    #[serde(default = "default_launcher_cooldown")]
    pub cooldown_s: f64,
}

fn default_magazine() -> u32 {
    16
}
fn default_launcher_cooldown() -> f64 {
    30.0
}

/// Complete ship description, loadable from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipSpec {
    pub name: String,
    pub faction: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub velocity: Vec3,
    #[serde(default = "default_forward")]
    pub forward: Vec3,
    #[serde(default = "default_dry_mass")]
    pub dry_mass_kg: f64,
    #[serde(default)]
    pub drive: DriveSpec,
    #[serde(default)]
    pub attitude: AttitudeControl,
    #[serde(default = "default_hull_length")]
    pub hull_length_m: f64,
    #[serde(default)]
    pub armor: ArmorLoadout,
    #[serde(default = "default_reactor_mw")]
    pub reactor_mw: f64,
    #[serde(default = "default_battery_mj")]
    pub battery_mj: f64,
    #[serde(default = "default_battery_charge_mw")]
    pub battery_charge_mw: f64,
    #[serde(default = "default_drive_draw_mw")]
    pub drive_draw_mw: f64,
    #[serde(default = "default_heat_sink_gj")]
    pub heat_sink_gj: f64,
    /// Cooling capacity of each radiator panel, GW
    #[serde(default = "default_radiators")]
    pub radiators_gw: Vec<f64>,
    /// Reactor idle heat, GJ/s, always active
    #[serde(default = "default_reactor_heat")]
    pub reactor_heat_gj_s: f64,
    /// Drive heat at full throttle, GJ/s, active while burning
    #[serde(default = "default_engine_heat")]
    pub engine_heat_gj_s: f64,
    #[serde(default)]
    pub weapons: Vec<WeaponSpec>,
    #[serde(default)]
    pub torpedoes: Option<TorpedoArmament>,
    #[serde(default)]
    pub pd_turrets: Vec<PdLaser>,
    #[serde(default)]
    pub ecm: EcmSystem,
    #[serde(default)]
    pub computer: TargetingComputer,
}

fn default_forward() -> Vec3 {
    Vec3::unit_x()
}
fn default_dry_mass() -> f64 {
    2.0e6
}
fn default_hull_length() -> f64 {
    100.0
}
fn default_reactor_mw() -> f64 {
    150.0
}
fn default_battery_mj() -> f64 {
    2000.0
}
fn default_battery_charge_mw() -> f64 {
    20.0
}
fn default_drive_draw_mw() -> f64 {
    40.0
}
fn default_heat_sink_gj() -> f64 {
    50.0
}
fn default_radiators() -> Vec<f64> {
    vec![0.5, 0.5]
}
fn default_reactor_heat() -> f64 {
    0.05
}
fn default_engine_heat() -> f64 {
    0.3
}

/// Live state of one ship in the battle
#[derive(Debug, Clone)]
pub struct ShipState {
    pub id: ShipId,
    pub name: String,
    pub faction: String,
    pub kinematics: KinematicState,
    pub attitude: AttitudeControl,
    pub geometry: HullGeometry,
    pub thermal: ThermalSystem,
    pub power: PowerSystem,
    /// Keyed by weapon slot name
    pub weapons: AHashMap<String, WeaponState>,
    /// Slot names in mount order; fixes iteration order for determinism
    pub weapon_order: Vec<String>,
    /// Weapon-kind module name to the weapon slot mounted on it
    pub weapon_mounts: AHashMap<String, String>,
    pub torpedo_launcher: Option<TorpedoLauncher>,
    pub pd_turrets: Vec<PdTurret>,
    pub armor: Vec<ArmorSection>,
    pub layout: ModuleLayout,
    pub ecm: EcmSystem,
    pub computer: TargetingComputer,
    pub solution: FiringSolution,
    pub primary_target: Option<ShipId>,
    pub maneuver: Option<Maneuver>,
    pub weapons_orders: AHashMap<String, WeaponsOrder>,
    pub destroyed: bool,
    pub kill_credit: Option<ShipId>,
    pub damage_dealt_gj: f64,
    pub damage_taken_gj: f64,
}

impl ShipState {
    pub fn from_spec(spec: &ShipSpec, materials: &MaterialTable) -> Self {
        let geometry = HullGeometry::new(spec.hull_length_m);
        let kinematics = KinematicState::new(
            spec.position,
            spec.velocity,
            spec.forward,
            spec.dry_mass_kg,
            spec.drive.clone(),
        );

        let material = materials.get(&spec.armor.material);
        let armor = vec![
            ArmorSection::new(
                HitLocation::Nose,
                spec.armor.nose_cm,
                &spec.armor.material,
                material,
                geometry.nose_cross_section_m2(),
            ),
            ArmorSection::new(
                HitLocation::Lateral,
                spec.armor.lateral_cm,
                &spec.armor.material,
                material,
                geometry.lateral_cross_section_m2(),
            ),
            ArmorSection::new(
                HitLocation::Tail,
                spec.armor.tail_cm,
                &spec.armor.material,
                material,
                geometry.tail_cross_section_m2(),
            ),
        ];

        let radiators = spec.radiators_gw.iter().map(|&gw| Radiator::new(gw)).collect();
        let mut thermal = ThermalSystem::new(spec.heat_sink_gj, radiators);
        thermal.register_source("reactor", spec.reactor_heat_gj_s);
        thermal.set_source_active("reactor", true);
        thermal.register_source("engines", spec.engine_heat_gj_s);

        let mut power = PowerSystem::new(
            Reactor::new(spec.reactor_mw),
            Battery::new(spec.battery_mj, spec.battery_charge_mw),
            spec.drive_draw_mw,
        );

        let mut weapons = AHashMap::new();
        let mut weapon_order = Vec::new();
        for weapon_spec in &spec.weapons {
            let capacitor_index = power.capacitors.len();
            power.capacitors.push(WeaponCapacitor::new(
                weapon_spec.capacitor_mj,
                weapon_spec.capacitor_charge_mw,
                weapon_spec.category,
            ));
            weapon_order.push(weapon_spec.name.clone());
            weapons.insert(
                weapon_spec.name.clone(),
                WeaponState::new(weapon_spec.clone(), capacitor_index),
            );
        }

        let torpedo_launcher = spec
            .torpedoes
            .as_ref()
            .map(|t| TorpedoLauncher::new(t.spec.clone(), t.magazine, t.cooldown_s));

        // Pair weapon slots with the layout's weapon modules in mount
        // order; a destroyed mount then knocks out its own weapon.
        let layout = ModuleLayout::standard(spec.hull_length_m);
        let mut weapon_mounts = AHashMap::new();
        for (module, slot) in layout.of_kind(ModuleKind::Weapon).zip(weapon_order.iter()) {
            weapon_mounts.insert(module.name.clone(), slot.clone());
        }

        Self {
            id: ShipId::new(),
            name: spec.name.clone(),
            faction: spec.faction.clone(),
            kinematics,
            attitude: spec.attitude.clone(),
            geometry,
            thermal,
            power,
            weapons,
            weapon_order,
            weapon_mounts,
            torpedo_launcher,
            pd_turrets: spec.pd_turrets.iter().cloned().map(PdTurret::new).collect(),
            armor,
            layout,
            ecm: spec.ecm.clone(),
            computer: spec.computer.clone(),
            solution: FiringSolution::new(),
            primary_target: None,
            maneuver: None,
            weapons_orders: AHashMap::new(),
            destroyed: false,
            kill_credit: None,
            damage_dealt_gj: 0.0,
            damage_taken_gj: 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.kinematics.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.kinematics.velocity
    }

    pub fn forward(&self) -> Vec3 {
        self.kinematics.forward
    }

    pub fn distance_to(&self, other: &ShipState) -> f64 {
        self.position().distance_to(&other.position())
    }

    /// Positive when the ships are approaching
    pub fn closing_speed_to(&self, other: &ShipState) -> f64 {
        let to_other = (other.position() - self.position()).normalized();
        (self.velocity() - other.velocity()).dot(&to_other)
    }

    pub fn engine_effectiveness(&self) -> f64 {
        self.layout.kind_effectiveness(ModuleKind::Engine)
    }

    pub fn reactor_effectiveness(&self) -> f64 {
        self.layout.kind_effectiveness(ModuleKind::Reactor)
    }

    pub fn sensor_effectiveness(&self) -> f64 {
        self.layout.kind_effectiveness(ModuleKind::Sensors)
    }

    /// Damaged sensors erode the tracking bonus proportionally
    pub fn effective_computer(&self) -> TargetingComputer {
        TargetingComputer {
            tracking_bonus: self.computer.tracking_bonus * self.sensor_effectiveness(),
            sensor_range_km: self.computer.sensor_range_km,
        }
    }

    /// A destroyed weapon mount takes its mounted weapon out of action.
    /// Non-weapon modules leave the mounts alone.
    pub fn on_module_destroyed(&mut self, module_name: &str) {
        if let Some(slot) = self.weapon_mounts.get(module_name) {
            if let Some(weapon) = self.weapons.get_mut(slot) {
                weapon.operational = false;
            }
        }
    }

    /// Weapon cooldowns recover at reactor effectiveness rate
    pub fn weapon_cooldown_rate(&self) -> f64 {
        self.reactor_effectiveness().max(0.1)
    }

    pub fn hull_integrity_percent(&self) -> f64 {
        self.layout.integrity_percent()
    }

    pub fn is_evading(&self) -> bool {
        self.maneuver.as_ref().is_some_and(|m| m.order.is_evasive())
    }

    /// A ship dies when a critical module is destroyed or the interior is
    /// wrecked wholesale.
    pub fn check_destruction(&self) -> bool {
        self.layout.critical_destroyed() || self.hull_integrity_percent() <= 0.0
    }
}
