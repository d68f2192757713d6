//! Commands injected into the simulation at decision points
//!
//! Commands arrive between ticks (typically from a captain making calls
//! every decision interval) and are applied as one batch per ship at the
//! next decision boundary. Everything is a closed enum; there is no string
//! dispatch.

use serde::{Deserialize, Serialize};

use crate::core::types::{ShipId, SimTime, Vec3};

/// Standing maneuver orders a ship can fly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ManeuverOrder {
    /// Collision-course burn toward a target
    Intercept { target: ShipId },
    /// Keep the nose on a target while jinking the gimbal
    Evasive { target: Option<ShipId> },
    /// Retrograde burn to kill velocity
    Brake,
    /// Coast on the current vector
    Maintain,
    /// Track a target with the nose, no thrust
    Padlock { target: ShipId },
    /// Rotate to and hold a fixed direction
    Heading { direction: Vec3 },
}

impl ManeuverOrder {
    pub fn name(&self) -> &'static str {
        match self {
            ManeuverOrder::Intercept { .. } => "intercept",
            ManeuverOrder::Evasive { .. } => "evasive",
            ManeuverOrder::Brake => "brake",
            ManeuverOrder::Maintain => "maintain",
            ManeuverOrder::Padlock { .. } => "padlock",
            ManeuverOrder::Heading { .. } => "heading",
        }
    }

    /// Evasive flight halves incoming fire's chance to hit
    pub fn is_evasive(&self) -> bool {
        matches!(self, ManeuverOrder::Evasive { .. })
    }
}

/// A maneuver in progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    pub order: ManeuverOrder,
    pub throttle: f64,
    /// Zero means indefinite
    pub duration_s: f64,
    pub started_at: SimTime,
}

impl Maneuver {
    pub fn new(order: ManeuverOrder, throttle: f64, duration_s: f64, started_at: SimTime) -> Self {
        Self {
            order,
            throttle: throttle.clamp(0.0, 1.0),
            duration_s,
            started_at,
        }
    }

    pub fn is_complete(&self, now: SimTime) -> bool {
        self.duration_s > 0.0 && now >= self.started_at + self.duration_s
    }
}

/// When a weapon under orders actually pulls the trigger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeaponsDoctrine {
    /// Fire as soon as the weapon is ready and a solution exists
    FireImmediate,
    /// Hold until the hit probability clears a floor
    FireWhenOptimal { min_hit_probability: f64 },
    /// Hold until the target closes inside a range
    FireAtRange { max_range_km: f64 },
    HoldFire,
}

/// Standing orders for one weapon slot, or for every slot at once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponsOrder {
    /// None applies the doctrine to all mounted weapons
    pub weapon_slot: Option<String>,
    pub doctrine: WeaponsDoctrine,
    /// None falls back to the ship's primary target
    pub target: Option<ShipId>,
}

/// Everything a captain can tell a ship to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    SetManeuver {
        order: ManeuverOrder,
        throttle: f64,
        duration_s: f64,
    },
    SetWeaponsOrder(WeaponsOrder),
    LaunchTorpedo {
        target: ShipId,
    },
    SetRadiators {
        extend: bool,
    },
    SetEcm {
        active: bool,
    },
    SetPrimaryTarget {
        target: ShipId,
    },
}

impl Command {
    pub fn describe(&self) -> String {
        match self {
            Command::SetManeuver { order, throttle, .. } => {
                format!("maneuver {} at {:.0}% throttle", order.name(), throttle * 100.0)
            }
            Command::SetWeaponsOrder(order) => {
                let slot = order.weapon_slot.as_deref().unwrap_or("all");
                format!("weapons order for {slot}")
            }
            Command::LaunchTorpedo { .. } => "launch torpedo".to_string(),
            Command::SetRadiators { extend } => {
                format!("radiators {}", if *extend { "out" } else { "in" })
            }
            Command::SetEcm { active } => format!("ecm {}", if *active { "on" } else { "off" }),
            Command::SetPrimaryTarget { .. } => "set primary target".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maneuver_completion() {
        let maneuver = Maneuver::new(ManeuverOrder::Brake, 1.0, 60.0, 100.0);
        assert!(!maneuver.is_complete(100.0));
        assert!(!maneuver.is_complete(159.0));
        assert!(maneuver.is_complete(160.0));
    }

    #[test]
    fn test_indefinite_maneuver_never_completes() {
        let maneuver = Maneuver::new(ManeuverOrder::Maintain, 0.0, 0.0, 0.0);
        assert!(!maneuver.is_complete(1e9));
    }

    #[test]
    fn test_throttle_clamped() {
        let maneuver = Maneuver::new(ManeuverOrder::Brake, 2.5, 0.0, 0.0);
        assert_eq!(maneuver.throttle, 1.0);
    }

    #[test]
    fn test_only_evasive_is_evasive() {
        assert!(ManeuverOrder::Evasive { target: None }.is_evasive());
        assert!(!ManeuverOrder::Brake.is_evasive());
        assert!(!ManeuverOrder::Heading { direction: Vec3::unit_x() }.is_evasive());
    }
}
