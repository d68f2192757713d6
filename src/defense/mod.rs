pub mod armor;
pub mod point_defense;

pub use armor::{ArmorImpact, ArmorSection};
pub use point_defense::{EngagementOutcome, EngagementResult, PdLaser, ThreatClass};
