//! Heat sinks, radiator array, and heat-source accounting
//!
//! Heat is tracked in gigajoules. Sources (engine burn, weapon discharge
//! losses, laser firing) feed the sink every tick; dissipation happens only
//! through extended radiators. Retracted radiators are invulnerable but
//! cool nothing; extended radiators are a valid hit location and lose
//! cooling capacity permanently when damaged.

use serde::{Deserialize, Serialize};

use ahash::AHashMap;

/// Heat fraction at which the warning event fires
pub const WARNING_THRESHOLD: f64 = 0.80;
/// Heat fraction at which the critical event fires and weapons refuse to fire
pub const CRITICAL_THRESHOLD: f64 = 0.95;
/// Cooling capacity lost per GJ of damage to an extended radiator
pub const RADIATOR_DAMAGE_PER_GJ: f64 = 0.20;

/// Bounded heat store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatSink {
    pub capacity_gj: f64,
    stored_gj: f64,
}

impl HeatSink {
    pub fn new(capacity_gj: f64) -> Self {
        Self { capacity_gj, stored_gj: 0.0 }
    }

    pub fn stored_gj(&self) -> f64 {
        self.stored_gj
    }

    pub fn fraction(&self) -> f64 {
        if self.capacity_gj <= 0.0 {
            return 0.0;
        }
        self.stored_gj / self.capacity_gj
    }

    /// Absorb heat, returning the overflow that did not fit.
    pub fn absorb(&mut self, heat_gj: f64) -> f64 {
        if heat_gj <= 0.0 {
            return 0.0;
        }
        let space = (self.capacity_gj - self.stored_gj).max(0.0);
        let taken = heat_gj.min(space);
        self.stored_gj += taken;
        heat_gj - taken
    }

    /// Remove heat, bounded at zero.
    pub fn dissipate(&mut self, heat_gj: f64) {
        self.stored_gj = (self.stored_gj - heat_gj.max(0.0)).max(0.0);
    }
}

/// Radiator panel deployment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadiatorState {
    /// Stowed: invulnerable, no cooling
    Retracted,
    /// Deployed: full cooling, can be hit
    Extended,
    /// Deployed with reduced capacity
    Damaged,
    /// No remaining capacity
    Destroyed,
}

/// One radiator panel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Radiator {
    /// Cooling power when healthy and extended, GJ/s
    pub cooling_gw: f64,
    pub state: RadiatorState,
    /// Accumulated damage as a fraction of capacity lost, in [0, 1]
    damage_fraction: f64,
}

impl Radiator {
    pub fn new(cooling_gw: f64) -> Self {
        Self { cooling_gw, state: RadiatorState::Retracted, damage_fraction: 0.0 }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self.state, RadiatorState::Extended | RadiatorState::Damaged)
    }

    /// Effective cooling power right now, GJ/s
    pub fn effective_cooling_gw(&self) -> f64 {
        if !self.is_extended() {
            return 0.0;
        }
        self.cooling_gw * (1.0 - self.damage_fraction)
    }

    /// Transition is instantaneous; a destroyed panel stays destroyed.
    pub fn set_extended(&mut self, extend: bool) {
        if self.state == RadiatorState::Destroyed {
            return;
        }
        self.state = match (extend, self.damage_fraction > 0.0) {
            (true, true) => RadiatorState::Damaged,
            (true, false) => RadiatorState::Extended,
            (false, _) => RadiatorState::Retracted,
        };
    }

    /// Apply hit damage; only extended panels can be struck. Returns the
    /// new state.
    pub fn apply_damage(&mut self, energy_gj: f64) -> RadiatorState {
        if !self.is_extended() || energy_gj <= 0.0 {
            return self.state;
        }
        self.damage_fraction = (self.damage_fraction + energy_gj * RADIATOR_DAMAGE_PER_GJ).min(1.0);
        self.state = if self.damage_fraction >= 1.0 {
            RadiatorState::Destroyed
        } else {
            RadiatorState::Damaged
        };
        self.state
    }
}

/// Named continuous heat source
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HeatSource {
    rate_gj_s: f64,
    active: bool,
}

/// What happened to the thermal state during one tick
#[derive(Debug, Clone, Copy, Default)]
pub struct ThermalTick {
    pub heat_fraction: f64,
    /// Upward crossing of the warning threshold this tick
    pub crossed_warning: bool,
    /// Upward crossing of the critical threshold this tick
    pub crossed_critical: bool,
    /// Heat that could not be stored anywhere this tick, GJ
    pub overflow_gj: f64,
}

/// One ship's complete thermal plant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalSystem {
    pub heat_sink: HeatSink,
    pub radiators: Vec<Radiator>,
    sources: AHashMap<String, HeatSource>,
    // Threshold latches: armed while below, fire once on the upward crossing.
    warning_latched: bool,
    critical_latched: bool,
}

impl ThermalSystem {
    pub fn new(sink_capacity_gj: f64, radiators: Vec<Radiator>) -> Self {
        Self {
            heat_sink: HeatSink::new(sink_capacity_gj),
            radiators,
            sources: AHashMap::new(),
            warning_latched: false,
            critical_latched: false,
        }
    }

    pub fn register_source(&mut self, name: &str, rate_gj_s: f64) {
        self.sources.insert(name.to_string(), HeatSource { rate_gj_s, active: false });
    }

    pub fn set_source_active(&mut self, name: &str, active: bool) {
        if let Some(source) = self.sources.get_mut(name) {
            source.active = active;
        }
    }

    /// One-shot heat deposit (weapon discharge losses, laser pulse)
    pub fn add_heat(&mut self, heat_gj: f64) -> f64 {
        self.heat_sink.absorb(heat_gj)
    }

    pub fn heat_fraction(&self) -> f64 {
        self.heat_sink.fraction()
    }

    /// Weapons are inhibited while the sink is at or above critical.
    pub fn weapons_inhibited(&self) -> bool {
        self.heat_fraction() >= CRITICAL_THRESHOLD
    }

    /// Total cooling available right now, GJ/s
    pub fn dissipation_gw(&self) -> f64 {
        self.radiators.iter().map(Radiator::effective_cooling_gw).sum()
    }

    pub fn set_radiators_extended(&mut self, extend: bool) {
        for radiator in &mut self.radiators {
            radiator.set_extended(extend);
        }
    }

    pub fn any_radiator_extended(&self) -> bool {
        self.radiators.iter().any(Radiator::is_extended)
    }

    /// Integrate sources and radiators over one tick. Threshold crossings
    /// are edge-triggered: each reports true exactly once per upward
    /// crossing, and the latch rearms when the level falls back below.
    pub fn update(&mut self, dt: f64) -> ThermalTick {
        let generated: f64 = self
            .sources
            .values()
            .filter(|s| s.active)
            .map(|s| s.rate_gj_s * dt)
            .sum();
        let overflow = self.heat_sink.absorb(generated);
        self.heat_sink.dissipate(self.dissipation_gw() * dt);

        let fraction = self.heat_fraction();

        let crossed_warning = fraction >= WARNING_THRESHOLD && !self.warning_latched;
        if crossed_warning {
            self.warning_latched = true;
        } else if fraction < WARNING_THRESHOLD {
            self.warning_latched = false;
        }

        let crossed_critical = fraction >= CRITICAL_THRESHOLD && !self.critical_latched;
        if crossed_critical {
            self.critical_latched = true;
        } else if fraction < CRITICAL_THRESHOLD {
            self.critical_latched = false;
        }

        ThermalTick {
            heat_fraction: fraction,
            crossed_warning,
            crossed_critical,
            overflow_gj: overflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system() -> ThermalSystem {
        let mut sys = ThermalSystem::new(10.0, vec![Radiator::new(0.5), Radiator::new(0.5)]);
        sys.register_source("engines", 1.0);
        sys
    }

    #[test]
    fn test_sink_never_exceeds_capacity() {
        let mut sink = HeatSink::new(5.0);
        let overflow = sink.absorb(8.0);
        assert_eq!(sink.stored_gj(), 5.0);
        assert_eq!(overflow, 3.0);
    }

    #[test]
    fn test_retracted_radiators_dissipate_nothing() {
        let mut sys = system();
        sys.add_heat(5.0);
        sys.update(1.0);
        assert_eq!(sys.heat_sink.stored_gj(), 5.0);
    }

    #[test]
    fn test_extended_radiators_cool() {
        let mut sys = system();
        sys.add_heat(5.0);
        sys.set_radiators_extended(true);
        sys.update(1.0);
        assert_eq!(sys.heat_sink.stored_gj(), 4.0);
    }

    #[test]
    fn test_warning_fires_once_per_crossing() {
        let mut sys = system();
        sys.add_heat(8.5);
        let first = sys.update(1.0);
        assert!(first.crossed_warning);
        // Still above threshold next tick, but no new event.
        let second = sys.update(1.0);
        assert!(!second.crossed_warning);
    }

    #[test]
    fn test_warning_rearms_after_cooling_below() {
        let mut sys = system();
        sys.add_heat(8.5);
        assert!(sys.update(1.0).crossed_warning);
        // Cool below the threshold, then heat back above it.
        sys.set_radiators_extended(true);
        for _ in 0..3 {
            sys.update(1.0);
        }
        assert!(sys.heat_fraction() < WARNING_THRESHOLD);
        sys.set_radiators_extended(false);
        sys.add_heat(3.0);
        assert!(sys.update(1.0).crossed_warning);
    }

    #[test]
    fn test_critical_inhibits_weapons() {
        let mut sys = system();
        sys.add_heat(9.6);
        let tick = sys.update(1.0);
        assert!(tick.crossed_critical);
        assert!(sys.weapons_inhibited());
    }

    #[test]
    fn test_radiator_damage_reduces_cooling_permanently() {
        let mut radiator = Radiator::new(1.0);
        radiator.set_extended(true);
        radiator.apply_damage(2.0);
        assert_eq!(radiator.state, RadiatorState::Damaged);
        assert!((radiator.effective_cooling_gw() - 0.6).abs() < 1e-9);
        // Retract and redeploy: damage stays.
        radiator.set_extended(false);
        radiator.set_extended(true);
        assert!((radiator.effective_cooling_gw() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_radiator_destroyed_at_full_damage() {
        let mut radiator = Radiator::new(1.0);
        radiator.set_extended(true);
        radiator.apply_damage(5.0);
        assert_eq!(radiator.state, RadiatorState::Destroyed);
        assert_eq!(radiator.effective_cooling_gw(), 0.0);
        radiator.set_extended(true);
        assert_eq!(radiator.state, RadiatorState::Destroyed);
    }

    #[test]
    fn test_retracted_radiator_cannot_be_damaged() {
        let mut radiator = Radiator::new(1.0);
        radiator.apply_damage(2.0);
        assert_eq!(radiator.state, RadiatorState::Retracted);
        radiator.set_extended(true);
        assert_eq!(radiator.effective_cooling_gw(), 1.0);
    }
}
