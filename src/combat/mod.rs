pub mod damage;
pub mod modules;
pub mod resolution;

pub use damage::{DamageCone, DamageKind, ModuleDamage};
pub use modules::{ModuleKind, ModuleLayout, ShipModule};
pub use resolution::{hit_probability, resolve_impact, AttackVelocity, HitResolution};
