//! Reactor, battery, and weapon-capacitor power flow
//!
//! Energy is tracked in megajoules and power in megawatts. Every tick the
//! reactor output, less the drive draw at the current throttle, charges
//! weapon capacitors in priority order; the battery covers any shortfall up
//! to its discharge bound and soaks any surplus up to its recharge bound.

use serde::{Deserialize, Serialize};

/// Battery discharge rate bound as a multiple of its recharge rate
pub const BATTERY_DISCHARGE_RATIO: f64 = 10.0;

/// Weapon family, which fixes the capacitor's discharge efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponCategory {
    Kinetic,
    Laser,
    TorpedoLauncher,
}

impl WeaponCategory {
    /// Fraction of stored capacitor energy delivered to the weapon on
    /// discharge; the remainder becomes waste heat.
    pub fn capacitor_efficiency(&self) -> f64 {
        match self {
            WeaponCategory::Kinetic => 0.70,
            WeaponCategory::Laser => 0.25,
            WeaponCategory::TorpedoLauncher => 0.90,
        }
    }
}

/// Fixed-output power plant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reactor {
    pub output_mw: f64,
}

impl Reactor {
    pub fn new(output_mw: f64) -> Self {
        Self { output_mw }
    }
}

/// Energy buffer between the reactor and the loads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battery {
    pub capacity_mj: f64,
    pub max_charge_mw: f64,
    charge_mj: f64,
}

impl Battery {
    pub fn new(capacity_mj: f64, max_charge_mw: f64) -> Self {
        Self { capacity_mj, max_charge_mw, charge_mj: capacity_mj }
    }

    pub fn charge_mj(&self) -> f64 {
        self.charge_mj
    }

    pub fn max_discharge_mw(&self) -> f64 {
        self.max_charge_mw * BATTERY_DISCHARGE_RATIO
    }

    /// Draw energy over `dt`, bounded by the discharge rate and the stored
    /// charge. Returns the energy actually supplied.
    pub fn discharge(&mut self, demand_mj: f64, dt: f64) -> f64 {
        let bound = self.max_discharge_mw() * dt;
        let supplied = demand_mj.min(bound).min(self.charge_mj).max(0.0);
        self.charge_mj -= supplied;
        supplied
    }

    /// Store energy over `dt`, bounded by the recharge rate and capacity.
    /// Returns the energy actually stored.
    pub fn recharge(&mut self, surplus_mj: f64, dt: f64) -> f64 {
        let bound = self.max_charge_mw * dt;
        let space = (self.capacity_mj - self.charge_mj).max(0.0);
        let stored = surplus_mj.min(bound).min(space).max(0.0);
        self.charge_mj += stored;
        stored
    }
}

/// Per-weapon energy gate: the weapon fires only from a full capacitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponCapacitor {
    pub capacity_mj: f64,
    /// Maximum charging power, MW
    pub charge_rate_mw: f64,
    pub category: WeaponCategory,
    charge_mj: f64,
}

impl WeaponCapacitor {
    pub fn new(capacity_mj: f64, charge_rate_mw: f64, category: WeaponCategory) -> Self {
        Self { capacity_mj, charge_rate_mw, category, charge_mj: 0.0 }
    }

    pub fn charge_mj(&self) -> f64 {
        self.charge_mj
    }

    pub fn is_full(&self) -> bool {
        self.charge_mj >= self.capacity_mj - 1e-9
    }

    pub fn charge_fraction(&self) -> f64 {
        if self.capacity_mj <= 0.0 {
            return 1.0;
        }
        self.charge_mj / self.capacity_mj
    }

    /// Energy this capacitor wants over `dt`, MJ
    fn demand_mj(&self, dt: f64) -> f64 {
        (self.capacity_mj - self.charge_mj).max(0.0).min(self.charge_rate_mw * dt)
    }

    fn add_energy(&mut self, energy_mj: f64) {
        self.charge_mj = (self.charge_mj + energy_mj).min(self.capacity_mj);
    }

    /// Full instantaneous discharge. Returns (delivered_mj, waste_heat_gj).
    /// The waste heat is the category inefficiency applied to the full
    /// capacity and belongs in the thermal system.
    pub fn discharge(&mut self) -> (f64, f64) {
        let efficiency = self.category.capacitor_efficiency();
        let delivered = self.capacity_mj * efficiency;
        let waste_gj = self.capacity_mj * (1.0 - efficiency) / 1000.0;
        self.charge_mj = 0.0;
        (delivered, waste_gj)
    }
}

/// One ship's power plant and distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerSystem {
    pub reactor: Reactor,
    pub battery: Battery,
    /// Charged in order; index is the weapon slot's capacitor priority
    pub capacitors: Vec<WeaponCapacitor>,
    /// Drive power draw at full throttle, MW
    pub drive_draw_mw: f64,
    drive_throttle: f64,
}

impl PowerSystem {
    pub fn new(reactor: Reactor, battery: Battery, drive_draw_mw: f64) -> Self {
        Self {
            reactor,
            battery,
            capacitors: Vec::new(),
            drive_draw_mw,
            drive_throttle: 0.0,
        }
    }

    pub fn set_drive_throttle(&mut self, throttle: f64) {
        self.drive_throttle = throttle.clamp(0.0, 1.0);
    }

    /// Distribute one tick of reactor output. Capacitors charge in priority
    /// order; the battery covers shortfall and absorbs surplus within its
    /// rate bounds.
    pub fn update(&mut self, dt: f64) {
        let drive_mj = self.drive_draw_mw * self.drive_throttle * dt;
        let mut available_mj = (self.reactor.output_mw * dt - drive_mj).max(0.0);

        let total_demand: f64 = self.capacitors.iter().map(|c| c.demand_mj(dt)).sum();
        if total_demand > available_mj {
            available_mj += self.battery.discharge(total_demand - available_mj, dt);
        }

        for capacitor in &mut self.capacitors {
            let demand = capacitor.demand_mj(dt);
            let granted = demand.min(available_mj);
            capacitor.add_energy(granted);
            available_mj -= granted;
            if available_mj <= 0.0 {
                break;
            }
        }

        if available_mj > 0.0 {
            self.battery.recharge(available_mj, dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant() -> PowerSystem {
        let mut power = PowerSystem::new(
            Reactor::new(100.0),
            Battery::new(1000.0, 10.0),
            50.0,
        );
        power.capacitors.push(WeaponCapacitor::new(200.0, 40.0, WeaponCategory::Kinetic));
        power.capacitors.push(WeaponCapacitor::new(400.0, 40.0, WeaponCategory::Laser));
        power
    }

    #[test]
    fn test_capacitors_charge_in_priority_order() {
        let mut power = plant();
        power.battery.charge_mj = 0.0;
        power.update(1.0);
        // 100 MJ available, first capacitor takes its full 40 MJ rate.
        assert!((power.capacitors[0].charge_mj() - 40.0).abs() < 1e-9);
        assert!((power.capacitors[1].charge_mj() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_drive_draw_reduces_charging() {
        let mut power = plant();
        power.battery.charge_mj = 0.0;
        power.set_drive_throttle(1.0);
        power.update(1.0);
        // 100 - 50 = 50 MJ available: 40 to slot 0, 10 to slot 1.
        assert!((power.capacitors[0].charge_mj() - 40.0).abs() < 1e-9);
        assert!((power.capacitors[1].charge_mj() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_battery_covers_shortfall_within_bound() {
        let mut power = PowerSystem::new(Reactor::new(0.0), Battery::new(1000.0, 10.0), 0.0);
        power.capacitors.push(WeaponCapacitor::new(500.0, 500.0, WeaponCategory::Kinetic));
        power.update(1.0);
        // Discharge bound is 10 * 10 = 100 MW, so 100 MJ in one second.
        assert!((power.capacitors[0].charge_mj() - 100.0).abs() < 1e-9);
        assert!((power.battery.charge_mj() - 900.0).abs() < 1e-9);
    }

    #[test]
    fn test_surplus_recharges_battery_within_bound() {
        let mut power = plant();
        power.battery.charge_mj = 0.0;
        power.capacitors.clear();
        power.update(1.0);
        // 100 MJ surplus, recharge bound 10 MW.
        assert!((power.battery.charge_mj() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_discharge_is_full_and_heats() {
        let mut capacitor = WeaponCapacitor::new(300.0, 50.0, WeaponCategory::Laser);
        capacitor.add_energy(300.0);
        assert!(capacitor.is_full());
        let (delivered, waste_gj) = capacitor.discharge();
        assert_eq!(capacitor.charge_mj(), 0.0);
        assert!((delivered - 75.0).abs() < 1e-9);
        assert!((waste_gj - 0.225).abs() < 1e-9);
    }

    #[test]
    fn test_category_efficiencies() {
        assert_eq!(WeaponCategory::Kinetic.capacitor_efficiency(), 0.70);
        assert_eq!(WeaponCategory::Laser.capacitor_efficiency(), 0.25);
        assert_eq!(WeaponCategory::TorpedoLauncher.capacitor_efficiency(), 0.90);
    }

    #[test]
    fn test_charge_bounded_by_capacity() {
        let mut capacitor = WeaponCapacitor::new(100.0, 1000.0, WeaponCategory::Kinetic);
        capacitor.add_energy(500.0);
        assert_eq!(capacitor.charge_mj(), 100.0);
    }
}
