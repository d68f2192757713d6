//! Firing solutions: sensor locks, ECM interference, and lead solving

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;

/// Base time to acquire a lock with no ECM interference, seconds
pub const BASE_LOCK_TIME_S: f64 = 3.0;
/// Cooldown before reacquisition can begin after an ECM break, seconds
pub const REACQUISITION_COOLDOWN_S: f64 = 5.0;
/// ECM gets one break roll per this much time while a lock is held
pub const ECM_CHECK_INTERVAL_S: f64 = 1.0;

/// Electronic countermeasures fitted to a hull
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcmSystem {
    /// 0.0 (none) to 1.0 (maximum); the per-interval chance of breaking an
    /// enemy lock before their tracking bonus is applied
    #[serde(default)]
    pub strength: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Default for EcmSystem {
    fn default() -> Self {
        Self { strength: 0.0, active: true }
    }
}

impl EcmSystem {
    pub fn effective_strength(&self) -> f64 {
        if self.active {
            self.strength.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Tracking computer quality on the shooting side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetingComputer {
    /// Flat reduction of enemy ECM effectiveness, 0.0 to 0.5
    #[serde(default = "default_tracking_bonus")]
    pub tracking_bonus: f64,
    /// Sensor range in km; locks cannot be held beyond it
    #[serde(default = "default_sensor_range")]
    pub sensor_range_km: f64,
}

fn default_tracking_bonus() -> f64 {
    0.1
}

fn default_sensor_range() -> f64 {
    100_000.0
}

impl Default for TargetingComputer {
    fn default() -> Self {
        Self {
            tracking_bonus: default_tracking_bonus(),
            sensor_range_km: default_sensor_range(),
        }
    }
}

impl TargetingComputer {
    /// Enemy ECM after this computer's counter-countermeasures
    pub fn effective_ecm(&self, ecm_strength: f64) -> f64 {
        (ecm_strength - self.tracking_bonus).max(0.0)
    }
}

/// Lock acquisition state machine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LockState {
    Unlocked,
    /// First acquisition in progress, 0.0..1.0
    Locking { progress: f64 },
    Locked,
    /// ECM broke the lock; cooldown before reacquisition can begin
    Broken { cooldown_s: f64 },
    /// Reacquisition after a break, 0.0..1.0
    Relocking { progress: f64 },
}

/// A shooter's targeting solution against one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiringSolution {
    pub state: LockState,
    // Time since the last ECM break roll while locked.
    ecm_check_accum_s: f64,
}

impl Default for FiringSolution {
    fn default() -> Self {
        Self::new()
    }
}

impl FiringSolution {
    pub fn new() -> Self {
        Self { state: LockState::Unlocked, ecm_check_accum_s: 0.0 }
    }

    pub fn is_locked(&self) -> bool {
        self.state == LockState::Locked
    }

    /// Advance the solution by one tick. While locked, ECM rolls once per
    /// check interval to break the lock; stronger effective ECM both slows
    /// acquisition and breaks locks more often.
    pub fn update<R: Rng>(
        &mut self,
        dt: f64,
        ecm_strength: f64,
        computer: &TargetingComputer,
        rng: &mut R,
    ) -> LockTransition {
        let effective_ecm = computer.effective_ecm(ecm_strength);
        // ECM slows acquisition by up to half at full strength.
        let lock_speed = 1.0 - effective_ecm * 0.5;
        let progress_per_s = lock_speed / BASE_LOCK_TIME_S;

        match self.state {
            LockState::Unlocked => {
                self.state = LockState::Locking { progress: progress_per_s * dt };
                self.settle_progress(false)
            }
            LockState::Locking { progress } => {
                self.state = LockState::Locking { progress: progress + progress_per_s * dt };
                self.settle_progress(false)
            }
            LockState::Relocking { progress } => {
                self.state = LockState::Relocking { progress: progress + progress_per_s * dt };
                self.settle_progress(true)
            }
            LockState::Broken { cooldown_s } => {
                let remaining = cooldown_s - dt;
                self.state = if remaining > 0.0 {
                    LockState::Broken { cooldown_s: remaining }
                } else {
                    LockState::Relocking { progress: 0.0 }
                };
                LockTransition::None
            }
            LockState::Locked => {
                self.ecm_check_accum_s += dt;
                while self.ecm_check_accum_s >= ECM_CHECK_INTERVAL_S {
                    self.ecm_check_accum_s -= ECM_CHECK_INTERVAL_S;
                    if rng.gen::<f64>() < effective_ecm {
                        self.state = LockState::Broken { cooldown_s: REACQUISITION_COOLDOWN_S };
                        self.ecm_check_accum_s = 0.0;
                        return LockTransition::Broken;
                    }
                }
                LockTransition::None
            }
        }
    }

    fn settle_progress(&mut self, relock: bool) -> LockTransition {
        let progress = match self.state {
            LockState::Locking { progress } | LockState::Relocking { progress } => progress,
            _ => return LockTransition::None,
        };
        if progress >= 1.0 {
            self.state = LockState::Locked;
            self.ecm_check_accum_s = 0.0;
            if relock {
                LockTransition::Reacquired
            } else {
                LockTransition::Acquired
            }
        } else {
            LockTransition::None
        }
    }

    pub fn reset(&mut self) {
        self.state = LockState::Unlocked;
        self.ecm_check_accum_s = 0.0;
    }
}

/// Observable lock changes from one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTransition {
    None,
    Acquired,
    Reacquired,
    Broken,
}

/// Solve for the intercept time of a constant-speed munition against a
/// target in uniform motion, in the shooter's rest frame.
///
/// With D = relative position, V = relative velocity, M = munition speed:
/// (M^2 - V^2) T^2 - 2 (D.V) T - D^2 = 0. Returns the smallest positive
/// root, or None when the munition can never catch the target.
pub fn intercept_time(relative_pos: &Vec3, relative_vel: &Vec3, munition_speed: f64) -> Option<f64> {
    if munition_speed <= 0.0 {
        return None;
    }
    let d_sq = relative_pos.magnitude_squared();
    if d_sq < 1e-12 {
        return Some(0.0);
    }
    let a = munition_speed * munition_speed - relative_vel.magnitude_squared();
    let b = -2.0 * relative_pos.dot(relative_vel);
    let c = -d_sq;

    if a.abs() < 1e-9 {
        // Munition exactly matches closing speed: linear case.
        if b.abs() < 1e-9 {
            return None;
        }
        let t = -c / b;
        return (t > 0.0).then_some(t);
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_disc = discriminant.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);
    [t1, t2]
        .into_iter()
        .filter(|t| *t > 0.0)
        .min_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal))
}

/// Aim point for a shooter at `shooter_pos` firing a munition of
/// `munition_speed` (m/s, relative to the shooter) at a moving target.
///
/// A stationary target's lead point is its current position. If no
/// intercept exists the target's current position is returned as the best
/// available aim point; accuracy degrades with transverse velocity either
/// way, which the hit-probability model accounts for.
pub fn lead_point(
    shooter_pos: &Vec3,
    shooter_vel: &Vec3,
    target_pos: &Vec3,
    target_vel: &Vec3,
    munition_speed: f64,
) -> Vec3 {
    let relative_pos = *target_pos - *shooter_pos;
    let relative_vel = *target_vel - *shooter_vel;

    match intercept_time(&relative_pos, &relative_vel, munition_speed) {
        Some(t) => *target_pos + relative_vel * t,
        None => iterative_lead(shooter_pos, target_pos, &relative_vel, munition_speed),
    }
}

// Fixed-point refinement fallback for the degenerate cases the quadratic
// cannot handle cleanly.
fn iterative_lead(shooter_pos: &Vec3, target_pos: &Vec3, relative_vel: &Vec3, munition_speed: f64) -> Vec3 {
    if munition_speed <= 0.0 {
        return *target_pos;
    }
    let mut t = target_pos.distance_to(shooter_pos) / munition_speed;
    for _ in 0..10 {
        let predicted = *target_pos + *relative_vel * t;
        let new_t = predicted.distance_to(shooter_pos) / munition_speed;
        if (new_t - t).abs() < 1e-6 {
            t = new_t;
            break;
        }
        t = new_t;
    }
    *target_pos + *relative_vel * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn test_lock_progresses_to_locked() {
        let mut solution = FiringSolution::new();
        let computer = TargetingComputer::default();
        let mut rng = rng();
        let mut acquired = false;
        for _ in 0..10 {
            if solution.update(1.0, 0.0, &computer, &mut rng) == LockTransition::Acquired {
                acquired = true;
                break;
            }
        }
        assert!(acquired);
        assert!(solution.is_locked());
    }

    #[test]
    fn test_ecm_slows_acquisition() {
        let computer = TargetingComputer { tracking_bonus: 0.0, ..Default::default() };
        let mut rng = rng();

        let mut clean = FiringSolution::new();
        clean.update(2.0, 0.0, &computer, &mut rng);
        let mut jammed = FiringSolution::new();
        jammed.update(2.0, 1.0, &computer, &mut rng);

        let progress = |s: &FiringSolution| match s.state {
            LockState::Locking { progress } => progress,
            LockState::Locked => 1.0,
            _ => 0.0,
        };
        assert!(progress(&clean) > progress(&jammed));
    }

    #[test]
    fn test_max_ecm_breaks_lock_and_cools_down() {
        let computer = TargetingComputer { tracking_bonus: 0.0, ..Default::default() };
        let mut solution = FiringSolution::new();
        solution.state = LockState::Locked;
        let mut rng = rng();
        // Effective ECM of 1.0 breaks on the first interval roll.
        let transition = solution.update(1.0, 1.0, &computer, &mut rng);
        assert_eq!(transition, LockTransition::Broken);
        assert!(matches!(solution.state, LockState::Broken { .. }));
        // Cooldown holds for its full duration before relocking begins.
        for _ in 0..4 {
            solution.update(1.0, 1.0, &computer, &mut rng);
            assert!(matches!(solution.state, LockState::Broken { .. }));
        }
        solution.update(1.0, 1.0, &computer, &mut rng);
        assert!(matches!(solution.state, LockState::Relocking { .. }));
    }

    #[test]
    fn test_tracking_bonus_cancels_weak_ecm() {
        let computer = TargetingComputer { tracking_bonus: 0.3, ..Default::default() };
        assert_eq!(computer.effective_ecm(0.2), 0.0);
        assert!((computer.effective_ecm(0.5) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_stationary_target_lead_is_current_position() {
        let target = Vec3::new(10_000.0, 0.0, 0.0);
        let lead = lead_point(&Vec3::zero(), &Vec3::zero(), &target, &Vec3::zero(), 5_000.0);
        assert!(lead.distance_to(&target) < 1e-6);
    }

    #[test]
    fn test_crossing_target_lead_is_ahead_of_target() {
        let target_pos = Vec3::new(10_000.0, 0.0, 0.0);
        let target_vel = Vec3::new(0.0, 500.0, 0.0);
        let lead = lead_point(&Vec3::zero(), &Vec3::zero(), &target_pos, &target_vel, 5_000.0);
        assert!(lead.y > 0.0);
        // Aiming at the lead point at munition speed reaches it as the
        // target does.
        let t = intercept_time(&target_pos, &target_vel, 5_000.0).unwrap();
        let target_at_t = target_pos + target_vel * t;
        assert!(lead.distance_to(&target_at_t) < 1e-6);
    }

    #[test]
    fn test_intercept_impossible_for_slow_munition() {
        // Target running directly away faster than the munition.
        let t = intercept_time(
            &Vec3::new(10_000.0, 0.0, 0.0),
            &Vec3::new(6_000.0, 0.0, 0.0),
            5_000.0,
        );
        assert!(t.is_none());
    }
}
