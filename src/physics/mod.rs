pub mod geometry;
pub mod kinematics;
pub mod rotation;

pub use geometry::{HitLocation, HullGeometry};
pub use kinematics::{DriveSpec, KinematicState, MAX_GIMBAL_ANGLE_DEG};
pub use rotation::{rotate_toward, AttitudeControl};
