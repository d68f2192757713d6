//! Simulation configuration with documented constants
//!
//! All kernel-level tunables are collected here with explanations of their
//! purpose. The config is owned by the `Simulation` context and passed down
//! explicitly; there is no process-wide config state.

use serde::{Deserialize, Serialize};

/// Configuration for one simulation run
///
/// These values have been tuned for destroyer-scale duels at ranges of
/// hundreds to thousands of kilometers. Changing them changes pacing, not
/// correctness: every invariant holds at any positive timestep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    // === TIME ===
    /// Fixed simulation timestep in seconds
    ///
    /// One second is coarse enough to step hour-long battles cheaply and
    /// fine enough for thermal/power integration. Projectile terminal
    /// flight uses its own micro-steps below this.
    pub time_step_s: f64,

    /// Seconds between opportunities for an external decision-maker to
    /// submit a command batch
    ///
    /// Commands injected between decision points are held and applied at
    /// the next boundary; one batch per ship per interval is honored.
    pub decision_interval_s: f64,

    /// Hard wall-clock limit on battle duration in simulated seconds
    pub max_battle_duration_s: f64,

    // === DETERMINISM ===
    /// Seed for the simulation RNG
    ///
    /// Two runs with identical specs, commands, and seed produce identical
    /// event streams.
    pub seed: u64,

    // === PROJECTILE FLIGHT ===
    /// Time-to-closest-approach below which projectile integration switches
    /// from the coarse timestep to micro-steps (seconds)
    pub terminal_tca_threshold_s: f64,

    /// Micro-timestep used for terminal hit detection (seconds)
    pub terminal_micro_step_s: f64,

    /// Extra radius added to the hull cylinder during sweep tests (meters)
    ///
    /// Stands in for dispersion and fire-control error that the per-shot
    /// hit-probability roll has already accounted for.
    pub hit_tolerance_m: f64,

    /// Distance from every hostile ship beyond which a projectile is
    /// written off as a miss (meters)
    pub projectile_cleanup_range_m: f64,

    /// Torpedo flight time limit in seconds
    pub torpedo_flight_limit_s: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_step_s: 1.0,
            decision_interval_s: 30.0,
            max_battle_duration_s: 7200.0,
            seed: 42,
            terminal_tca_threshold_s: 4.0,
            terminal_micro_step_s: 0.001,
            hit_tolerance_m: 500.0,
            projectile_cleanup_range_m: 5_000_000.0,
            torpedo_flight_limit_s: 3600.0,
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> crate::core::error::Result<()> {
        use crate::core::error::SimError;

        if self.time_step_s <= 0.0 {
            return Err(SimError::InvalidConfig("time_step_s must be positive".into()));
        }
        if self.decision_interval_s < self.time_step_s {
            return Err(SimError::InvalidConfig(format!(
                "decision_interval_s ({}) must be >= time_step_s ({})",
                self.decision_interval_s, self.time_step_s
            )));
        }
        if self.terminal_micro_step_s <= 0.0 || self.terminal_micro_step_s > self.time_step_s {
            return Err(SimError::InvalidConfig(format!(
                "terminal_micro_step_s ({}) must be in (0, time_step_s]",
                self.terminal_micro_step_s
            )));
        }
        if self.hit_tolerance_m < 0.0 {
            return Err(SimError::InvalidConfig("hit_tolerance_m must be >= 0".into()));
        }
        Ok(())
    }
}
