//! Battle orchestration: ships, commands, events, and the tick loop

pub mod commands;
pub mod events;
pub mod maneuvers;
pub mod runner;
pub mod ship;

pub use commands::{Command, Maneuver, ManeuverOrder, WeaponsDoctrine, WeaponsOrder};
pub use events::{EventKind, EventLog, SimulationEvent};
pub use runner::{BattleMetrics, BattleSnapshot, ContactReport, Simulation};
pub use ship::{ShipSpec, ShipState};
