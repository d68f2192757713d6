//! Burn-direction logic for the standing maneuver orders
//!
//! Pure functions over kinematic state; the runner owns rotation and
//! thrust application. Intercept uses collision-course guidance: build
//! closing speed first, then trade thrust into cancelling lateral drift.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::types::{ShipId, Vec3};

/// Minimum closing speed an intercept burn tries to hold, m/s
pub const MIN_CLOSING_SPEED_MS: f64 = 2_000.0;
/// Lateral drift worth correcting while building speed, m/s
pub const LATERAL_DRIFT_COARSE_MS: f64 = 100.0;
/// Lateral drift worth correcting once closing fast enough, m/s
pub const LATERAL_DRIFT_FINE_MS: f64 = 50.0;

/// Half-period of the evasive jink, seconds. Three seconds one way, three
/// seconds back to cancel the lateral velocity.
pub const JINK_HALF_PERIOD_S: f64 = 3.0;
/// Jink deflection off the main thrust axis, degrees; inside the gimbal
pub const JINK_DEFLECTION_DEG: f64 = 0.9;

/// Burn direction that closes on the target without drifting past it.
///
/// Four phases: not closing burns straight at the target; closing too
/// slowly blends 80/20 toward target and drift cancellation; closing fast
/// enough trades up to 60% of the burn into drift cancellation; a clean
/// course burns straight in.
pub fn intercept_direction(
    ship_position: &Vec3,
    ship_velocity: &Vec3,
    ship_forward: &Vec3,
    target_position: &Vec3,
    target_velocity: &Vec3,
) -> Vec3 {
    let to_target = *target_position - *ship_position;
    if to_target.magnitude() < 100.0 {
        return *ship_forward;
    }
    let los = to_target.normalized();

    let rel_vel = *ship_velocity - *target_velocity;
    let closing_speed = rel_vel.dot(&los);
    let lateral_vel = rel_vel - los * closing_speed;
    let lateral_speed = lateral_vel.magnitude();

    if closing_speed <= 0.0 {
        return los;
    }

    if closing_speed < MIN_CLOSING_SPEED_MS {
        if lateral_speed > LATERAL_DRIFT_COARSE_MS {
            let correction = (-lateral_vel).normalized();
            return (los * 0.8 + correction * 0.2).normalized();
        }
        return los;
    }

    if lateral_speed > LATERAL_DRIFT_FINE_MS {
        let correction = (-lateral_vel).normalized();
        let lateral_ratio = (lateral_speed / 500.0).min(1.0);
        let weight_lateral = lateral_ratio * 0.6;
        return (los * (1.0 - weight_lateral) + correction * weight_lateral).normalized();
    }

    los
}

/// Retrograde burn direction, or None when already nearly stationary
pub fn brake_direction(velocity: &Vec3) -> Option<Vec3> {
    if velocity.magnitude() < 0.1 {
        return None;
    }
    Some(-velocity.normalized())
}

fn jink_seed(ship: ShipId, cycle: u64) -> u64 {
    let bytes = ship.0.as_bytes();
    let mut seed = u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]);
    seed ^= cycle.wrapping_mul(0x9e37_79b9_7f4a_7c15);
    seed
}

/// Deflect a thrust direction into the jink pattern for evasive flight.
///
/// Each six-second cycle picks a random perpendicular direction from the
/// ship's own seed, deflects the burn that way for three seconds, then
/// mirrors the deflection for three seconds to cancel the lateral velocity
/// it built. Net drift stays near zero while position stays unpredictable.
pub fn evasive_thrust_direction(base_direction: &Vec3, up: &Vec3, time_s: f64, ship: ShipId) -> Vec3 {
    let base = base_direction.normalized();
    if base == Vec3::zero() {
        return *base_direction;
    }

    let full_period = JINK_HALF_PERIOD_S * 2.0;
    let cycle = (time_s / full_period) as u64;
    let first_half = time_s % full_period < JINK_HALF_PERIOD_S;

    let mut rng = ChaCha8Rng::seed_from_u64(jink_seed(ship, cycle));
    let jink_angle: f64 = rng.gen::<f64>() * std::f64::consts::TAU;

    let mut e1 = base.cross(up).normalized();
    if e1 == Vec3::zero() {
        // Up is parallel to the burn axis; any perpendicular will do.
        e1 = base.cross(&Vec3::unit_y()).normalized();
        if e1 == Vec3::zero() {
            e1 = base.cross(&Vec3::unit_z()).normalized();
        }
    }
    let e2 = base.cross(&e1).normalized();

    let deflection = JINK_DEFLECTION_DEG.to_radians().tan();
    let mut lateral = (e1 * jink_angle.cos() + e2 * jink_angle.sin()) * deflection;
    if !first_half {
        lateral = -lateral;
    }

    (base + lateral).normalized()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_closing_burns_at_target() {
        // Opening at 1 km/s: burn straight down the line of sight.
        let direction = intercept_direction(
            &Vec3::zero(),
            &Vec3::new(-1000.0, 0.0, 0.0),
            &Vec3::unit_x(),
            &Vec3::new(500_000.0, 0.0, 0.0),
            &Vec3::zero(),
        );
        assert!((direction - Vec3::unit_x()).magnitude() < 1e-9);
    }

    #[test]
    fn test_fast_closure_trades_into_lateral_correction() {
        // Closing at 5 km/s with 400 m/s of lateral drift.
        let direction = intercept_direction(
            &Vec3::zero(),
            &Vec3::new(5_000.0, 400.0, 0.0),
            &Vec3::unit_x(),
            &Vec3::new(500_000.0, 0.0, 0.0),
            &Vec3::zero(),
        );
        // Burn pulls against the drift.
        assert!(direction.y < -0.1);
        assert!(direction.x > 0.5);
    }

    #[test]
    fn test_clean_course_burns_straight_in() {
        let direction = intercept_direction(
            &Vec3::zero(),
            &Vec3::new(5_000.0, 10.0, 0.0),
            &Vec3::unit_x(),
            &Vec3::new(500_000.0, 0.0, 0.0),
            &Vec3::zero(),
        );
        assert!((direction - Vec3::unit_x()).magnitude() < 0.05);
    }

    #[test]
    fn test_brake_is_retrograde() {
        let direction = brake_direction(&Vec3::new(3_000.0, 0.0, 0.0)).unwrap();
        assert!((direction + Vec3::unit_x()).magnitude() < 1e-9);
        assert!(brake_direction(&Vec3::zero()).is_none());
    }

    #[test]
    fn test_jink_reverses_between_half_cycles() {
        let ship = ShipId::new();
        let base = Vec3::unit_x();
        let up = Vec3::unit_z();
        let first = evasive_thrust_direction(&base, &up, 1.0, ship);
        let second = evasive_thrust_direction(&base, &up, 4.0, ship);
        let first_lateral = first - base * first.dot(&base);
        let second_lateral = second - base * second.dot(&base);
        // Same cycle, opposite halves: deflections cancel.
        assert!((first_lateral + second_lateral).magnitude() < 1e-9);
    }

    #[test]
    fn test_jink_stays_within_deflection_limit() {
        let ship = ShipId::new();
        let base = Vec3::unit_x();
        let up = Vec3::unit_z();
        for step in 0..120 {
            let t = step as f64 * 0.5;
            let dir = evasive_thrust_direction(&base, &up, t, ship);
            let off_axis = dir.angle_to(&base).to_degrees();
            assert!(off_axis <= JINK_DEFLECTION_DEG + 1e-6);
        }
    }

    #[test]
    fn test_jink_is_deterministic_per_ship() {
        let ship = ShipId::new();
        let other = ShipId::new();
        let base = Vec3::unit_x();
        let up = Vec3::unit_z();
        let a = evasive_thrust_direction(&base, &up, 10.0, ship);
        let b = evasive_thrust_direction(&base, &up, 10.0, ship);
        assert_eq!(a, b);
        // Different ships jink differently (overwhelmingly likely).
        let c = evasive_thrust_direction(&base, &up, 10.0, other);
        assert!((a - c).magnitude() > 1e-12);
    }
}
