//! Core type definitions used throughout the kernel

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a ship in a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipId(pub Uuid);

impl ShipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShipId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a kinetic projectile in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectileId(pub Uuid);

impl ProjectileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectileId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a torpedo in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TorpedoId(pub Uuid);

impl TorpedoId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TorpedoId {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulation time in seconds since battle start
pub type SimTime = f64;

/// 3D vector, right-handed, +X forward / +Y right / +Z up.
///
/// Positions are in meters and velocities in m/s unless a field name
/// says otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }

    pub const fn unit_x() -> Self {
        Self { x: 1.0, y: 0.0, z: 0.0 }
    }

    pub const fn unit_y() -> Self {
        Self { x: 0.0, y: 1.0, z: 0.0 }
    }

    pub const fn unit_z() -> Self {
        Self { x: 0.0, y: 0.0, z: 1.0 }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn magnitude_squared(&self) -> f64 {
        self.dot(self)
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Unit vector in the same direction, or zero for a degenerate input.
    pub fn normalized(&self) -> Self {
        let len = self.magnitude();
        if len > 1e-10 {
            *self * (1.0 / len)
        } else {
            Self::zero()
        }
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        (*self - *other).magnitude()
    }

    /// Angle between this vector and another, in radians, in [0, pi].
    pub fn angle_to(&self, other: &Self) -> f64 {
        let denom = self.magnitude() * other.magnitude();
        if denom < 1e-10 {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos()
    }

    /// Rotate around a unit axis by `angle_rad` (Rodrigues' formula).
    pub fn rotate_around_axis(&self, axis: &Self, angle_rad: f64) -> Self {
        let k = axis.normalized();
        let cos_a = angle_rad.cos();
        let sin_a = angle_rad.sin();
        *self * cos_a + k.cross(self) * sin_a + k * (k.dot(self) * (1.0 - cos_a))
    }

}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y, z: self.z + rhs.z }
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y, z: self.z - rhs.z }
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs, z: self.z * rhs }
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self { x: -self.x, y: -self.y, z: -self.z }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_cross_product_right_handed() {
        let x = Vec3::unit_x();
        let y = Vec3::unit_y();
        let z = x.cross(&y);
        assert!((z.z - 1.0).abs() < EPS);
        assert!(z.x.abs() < EPS && z.y.abs() < EPS);
    }

    #[test]
    fn test_normalized_degenerate_is_zero() {
        assert_eq!(Vec3::zero().normalized(), Vec3::zero());
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = Vec3::unit_x();
        let r = v.rotate_around_axis(&Vec3::unit_z(), std::f64::consts::FRAC_PI_2);
        assert!((r.y - 1.0).abs() < EPS);
        assert!(r.x.abs() < EPS);
    }

    #[test]
    fn test_rotation_preserves_magnitude() {
        let v = Vec3::new(3.0, -4.0, 12.0);
        let r = v.rotate_around_axis(&Vec3::new(1.0, 1.0, 0.0), 1.234);
        assert!((r.magnitude() - v.magnitude()).abs() < 1e-9);
    }

    #[test]
    fn test_angle_to_orthogonal() {
        let a = Vec3::unit_x().angle_to(&Vec3::unit_z());
        assert!((a - std::f64::consts::FRAC_PI_2).abs() < EPS);
    }
}
