//! Battle event log
//!
//! Every observable thing that happens during a battle lands in one
//! append-only log as a typed event. The log is the single source of truth
//! for battle reconstruction; consumers poll it with the query methods
//! rather than registering callbacks.

use serde::{Deserialize, Serialize};

use crate::core::types::{ShipId, SimTime};
use crate::physics::geometry::HitLocation;

/// Everything that can happen in a battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    SimulationStarted,
    SimulationEnded {
        ships_destroyed: usize,
        projectiles_in_flight: usize,
    },
    DecisionPoint,
    CommandAccepted {
        description: String,
    },
    CommandRejected {
        reason: String,
    },

    ManeuverStarted {
        maneuver: String,
    },
    ManeuverCompleted {
        maneuver: String,
    },

    ProjectileLaunched {
        weapon: String,
        muzzle_velocity_kps: f64,
    },
    ProjectileImpact {
        location: HitLocation,
        energy_gj: f64,
        penetrated: bool,
    },
    ProjectileMiss {
        closest_approach_km: f64,
    },

    TorpedoLaunched {
        remaining_in_magazine: u32,
    },
    TorpedoImpact {
        kinetic_gj: f64,
        warhead_gj: f64,
        impact_speed_kps: f64,
        location: HitLocation,
    },
    TorpedoMiss {
        closest_approach_km: f64,
    },
    TorpedoFuelExhausted,

    ModuleDamaged {
        module: String,
        damage_gj: f64,
    },
    ModuleDestroyed {
        module: String,
    },
    ArmorPenetrated {
        location: HitLocation,
        penetrating_gj: f64,
    },
    RadiatorDamaged {
        destroyed: bool,
    },
    ShipDestroyed,

    ThermalWarning {
        heat_fraction: f64,
    },
    ThermalCritical {
        heat_fraction: f64,
    },
    RadiatorsExtended,
    RadiatorsRetracted,

    TargetLocked,
    TargetLockBroken,
    TargetReacquired,

    PdEngaged {
        target_kind: String,
        distance_km: f64,
    },
    PdTorpedoDisabled,
    PdTorpedoDestroyed,
    PdSlugDamaged {
        mass_ablated_kg: f64,
    },
    PdSlugDestroyed,
}

impl EventKind {
    /// Stable short label for filtering and display
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::SimulationStarted => "simulation_started",
            EventKind::SimulationEnded { .. } => "simulation_ended",
            EventKind::DecisionPoint => "decision_point",
            EventKind::CommandAccepted { .. } => "command_accepted",
            EventKind::CommandRejected { .. } => "command_rejected",
            EventKind::ManeuverStarted { .. } => "maneuver_started",
            EventKind::ManeuverCompleted { .. } => "maneuver_completed",
            EventKind::ProjectileLaunched { .. } => "projectile_launched",
            EventKind::ProjectileImpact { .. } => "projectile_impact",
            EventKind::ProjectileMiss { .. } => "projectile_miss",
            EventKind::TorpedoLaunched { .. } => "torpedo_launched",
            EventKind::TorpedoImpact { .. } => "torpedo_impact",
            EventKind::TorpedoMiss { .. } => "torpedo_miss",
            EventKind::TorpedoFuelExhausted => "torpedo_fuel_exhausted",
            EventKind::ModuleDamaged { .. } => "module_damaged",
            EventKind::ModuleDestroyed { .. } => "module_destroyed",
            EventKind::ArmorPenetrated { .. } => "armor_penetrated",
            EventKind::RadiatorDamaged { .. } => "radiator_damaged",
            EventKind::ShipDestroyed => "ship_destroyed",
            EventKind::ThermalWarning { .. } => "thermal_warning",
            EventKind::ThermalCritical { .. } => "thermal_critical",
            EventKind::RadiatorsExtended => "radiators_extended",
            EventKind::RadiatorsRetracted => "radiators_retracted",
            EventKind::TargetLocked => "target_locked",
            EventKind::TargetLockBroken => "target_lock_broken",
            EventKind::TargetReacquired => "target_reacquired",
            EventKind::PdEngaged { .. } => "pd_engaged",
            EventKind::PdTorpedoDisabled => "pd_torpedo_disabled",
            EventKind::PdTorpedoDestroyed => "pd_torpedo_destroyed",
            EventKind::PdSlugDamaged { .. } => "pd_slug_damaged",
            EventKind::PdSlugDestroyed => "pd_slug_destroyed",
        }
    }
}

/// One timestamped entry in the battle log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    pub timestamp: SimTime,
    pub ship: Option<ShipId>,
    pub target: Option<ShipId>,
    pub kind: EventKind,
}

/// Append-only record of a battle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<SimulationEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, timestamp: SimTime, ship: Option<ShipId>, target: Option<ShipId>, kind: EventKind) {
        self.events.push(SimulationEvent {
            timestamp,
            ship,
            target,
            kind,
        });
    }

    pub fn all(&self) -> &[SimulationEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn since(&self, time: SimTime) -> impl Iterator<Item = &SimulationEvent> {
        self.events.iter().filter(move |e| e.timestamp >= time)
    }

    pub fn for_ship(&self, ship: ShipId) -> impl Iterator<Item = &SimulationEvent> {
        self.events
            .iter()
            .filter(move |e| e.ship == Some(ship) || e.target == Some(ship))
    }

    pub fn with_label(&self, label: &'static str) -> impl Iterator<Item = &SimulationEvent> {
        self.events.iter().filter(move |e| e.kind.label() == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_append_only_and_ordered() {
        let mut log = EventLog::new();
        let ship = ShipId::new();
        log.push(0.0, None, None, EventKind::SimulationStarted);
        log.push(5.0, Some(ship), None, EventKind::ThermalWarning { heat_fraction: 0.81 });
        log.push(12.0, Some(ship), None, EventKind::ShipDestroyed);
        assert_eq!(log.len(), 3);
        assert!(log.all().windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_queries_filter_by_time_ship_and_label() {
        let mut log = EventLog::new();
        let a = ShipId::new();
        let b = ShipId::new();
        log.push(0.0, Some(a), None, EventKind::TargetLocked);
        log.push(10.0, Some(b), Some(a), EventKind::ProjectileMiss { closest_approach_km: 2.0 });
        log.push(20.0, Some(b), None, EventKind::TargetLockBroken);

        assert_eq!(log.since(10.0).count(), 2);
        // Ship a appears as actor once and as target once.
        assert_eq!(log.for_ship(a).count(), 2);
        assert_eq!(log.with_label("target_locked").count(), 1);
    }
}
