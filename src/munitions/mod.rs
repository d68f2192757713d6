pub mod projectile;
pub mod torpedo;
pub mod weapons;

pub use projectile::KineticProjectile;
pub use torpedo::{GuidanceMode, Torpedo, TorpedoLauncher, TorpedoSpec, SAFE_ARMING_DISTANCE_M};
pub use weapons::{FireFailure, WeaponSpec, WeaponState};
