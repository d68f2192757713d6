//! The battle orchestrator
//!
//! One `Simulation` owns every ship, every munition in flight, the event
//! log, the metrics, and the RNG. There is no global state: everything a
//! tick needs lives on the context object, and two simulations built from
//! the same specs and seed replay identically.
//!
//! Tick order is fixed: decision point, ship kinematics, thermal and
//! power, munition flight and point defense, hit resolution, then command
//! application. Commands injected mid-tick take effect at the tick's end.

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::combat::damage::DamageKind;
use crate::combat::resolution::{self, AttackVelocity};
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{ProjectileId, ShipId, SimTime, TorpedoId, Vec3};
use crate::data::materials::MaterialTable;
use crate::defense::point_defense::{self, EngagementOutcome, ThreatClass, TORPEDO_DESTROY_THRESHOLD_J};
use crate::munitions::projectile::KineticProjectile;
use crate::munitions::torpedo::Torpedo;
use crate::physics::geometry::{self, HullGeometry};
use crate::physics::rotation;
use crate::simulation::commands::{Command, Maneuver, ManeuverOrder, WeaponsDoctrine};
use crate::simulation::events::{EventKind, EventLog};
use crate::simulation::maneuvers;
use crate::simulation::ship::{ShipSpec, ShipState};
use crate::targeting::{lead_point, LockTransition};

/// A slug in flight, bound to the target it was fired at
#[derive(Debug, Clone)]
pub struct ProjectileInFlight {
    pub id: ProjectileId,
    pub projectile: KineticProjectile,
    pub source: ShipId,
    pub target: ShipId,
    pub damage_kind: DamageKind,
    pub slug_material: String,
    pub launch_time: SimTime,
    prev_distance_m: f64,
    min_distance_m: f64,
}

/// A torpedo in flight with its point-defense damage state
#[derive(Debug, Clone)]
pub struct TorpedoInFlight {
    pub id: TorpedoId,
    pub torpedo: Torpedo,
    pub source: ShipId,
    pub target: ShipId,
    pub launch_time: SimTime,
    pub heat_absorbed_j: f64,
    pub disabled: bool,
    prev_distance_m: f64,
    min_distance_m: f64,
}

/// Battle-wide counters, filled in as the fight runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BattleMetrics {
    pub shots_fired: u64,
    pub torpedoes_launched: u64,
    pub projectile_hits: u64,
    pub projectile_misses: u64,
    pub torpedo_hits: u64,
    pub torpedo_misses: u64,
    pub pd_slugs_destroyed: u64,
    pub pd_torpedoes_disabled: u64,
    pub pd_torpedoes_destroyed: u64,
    pub total_damage_gj: f64,
    pub ships_destroyed: Vec<ShipId>,
    pub battle_duration_s: f64,
}

impl BattleMetrics {
    pub fn projectile_hit_rate(&self) -> f64 {
        let total = self.projectile_hits + self.projectile_misses;
        if total == 0 {
            return 0.0;
        }
        self.projectile_hits as f64 / total as f64
    }
}

/// One contact as seen from a ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactReport {
    pub ship: ShipId,
    pub name: String,
    pub faction: String,
    pub distance_km: f64,
    pub closing_speed_kps: f64,
    pub destroyed: bool,
}

/// Battle state from one ship's perspective, for decision making
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleSnapshot {
    pub time_s: SimTime,
    pub ship: ShipId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub delta_v_remaining_kps: f64,
    pub heat_fraction: f64,
    pub hull_integrity_percent: f64,
    pub locked: bool,
    pub torpedoes_remaining: u32,
    pub inbound_torpedoes: usize,
    pub contacts: Vec<ContactReport>,
}

// Immutable per-ship data captured at phase boundaries so munition and
// weapon phases can read target state while mutating shooters.
#[derive(Debug, Clone)]
struct ShipView {
    position: Vec3,
    velocity: Vec3,
    forward: Vec3,
    faction: String,
    evading: bool,
    destroyed: bool,
    hull_length_m: f64,
    ecm_strength: f64,
    armor_thickness_cm: f64,
}

/// The whole battle
pub struct Simulation {
    pub config: SimulationConfig,
    pub materials: MaterialTable,
    ships: AHashMap<ShipId, ShipState>,
    /// Insertion order; fixes iteration for determinism
    ship_order: Vec<ShipId>,
    projectiles: Vec<ProjectileInFlight>,
    torpedoes: Vec<TorpedoInFlight>,
    pub events: EventLog,
    pub metrics: BattleMetrics,
    rng: ChaCha8Rng,
    time: SimTime,
    last_decision: SimTime,
    pending_commands: Vec<(ShipId, Command)>,
    /// Decision interval in which each ship last had a batch honored;
    /// further submissions inside that interval are dropped, not queued
    honored_intervals: AHashMap<ShipId, u64>,
    running: bool,
}

impl Simulation {
    pub fn new(config: SimulationConfig, materials: MaterialTable) -> Result<Self> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        // Backdated so the first tick opens with a decision point.
        let last_decision = -config.decision_interval_s;
        Ok(Self {
            config,
            materials,
            ships: AHashMap::new(),
            ship_order: Vec::new(),
            projectiles: Vec::new(),
            torpedoes: Vec::new(),
            events: EventLog::new(),
            metrics: BattleMetrics::default(),
            rng,
            time: 0.0,
            last_decision,
            pending_commands: Vec::new(),
            honored_intervals: AHashMap::new(),
            running: false,
        })
    }

    pub fn add_ship(&mut self, spec: &ShipSpec) -> ShipId {
        let ship = ShipState::from_spec(spec, &self.materials);
        let id = ship.id;
        info!(ship = %ship.name, faction = %ship.faction, "ship added");
        self.ship_order.push(id);
        self.ships.insert(id, ship);
        id
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn ship(&self, id: ShipId) -> Option<&ShipState> {
        self.ships.get(&id)
    }

    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut ShipState> {
        self.ships.get_mut(&id)
    }

    pub fn ship_ids(&self) -> &[ShipId] {
        &self.ship_order
    }

    pub fn projectiles_in_flight(&self) -> usize {
        self.projectiles.len()
    }

    pub fn torpedoes_in_flight(&self) -> usize {
        self.torpedoes.len()
    }

    pub fn enemies_of(&self, id: ShipId) -> Vec<ShipId> {
        let faction = match self.ships.get(&id) {
            Some(s) => &s.faction,
            None => return Vec::new(),
        };
        self.ship_order
            .iter()
            .filter(|&&other| {
                self.ships
                    .get(&other)
                    .is_some_and(|s| !s.destroyed && s.faction != *faction)
            })
            .copied()
            .collect()
    }

    /// Surviving same-faction ships, excluding the ship itself
    pub fn allies_of(&self, id: ShipId) -> Vec<ShipId> {
        let faction = match self.ships.get(&id) {
            Some(s) => &s.faction,
            None => return Vec::new(),
        };
        self.ship_order
            .iter()
            .filter(|&&other| {
                other != id
                    && self
                        .ships
                        .get(&other)
                        .is_some_and(|s| !s.destroyed && s.faction == *faction)
            })
            .copied()
            .collect()
    }

    /// Queue a command for a ship. Commands accumulate into one batch that
    /// is applied at the next decision boundary; an interval in which the
    /// ship already had a batch honored rejects further submissions, and
    /// exact duplicates already queued are dropped.
    pub fn inject_command(&mut self, ship: ShipId, command: Command) -> Result<()> {
        if !self.ships.contains_key(&ship) {
            return Err(SimError::ShipNotFound(ship));
        }
        let interval = self.interval_index(self.time);
        if self.honored_intervals.get(&ship) == Some(&interval) {
            debug!(?ship, interval, "batch already honored this interval, command dropped");
            self.events.push(
                self.time,
                Some(ship),
                None,
                EventKind::CommandRejected {
                    reason: format!("{} arrived after this interval's batch", command.describe()),
                },
            );
            return Ok(());
        }
        if self.pending_commands.iter().any(|(s, c)| *s == ship && *c == command) {
            debug!(?ship, "duplicate command dropped");
            return Ok(());
        }
        self.pending_commands.push((ship, command));
        Ok(())
    }

    fn interval_index(&self, t: SimTime) -> u64 {
        (t / self.config.decision_interval_s + 1e-9).floor() as u64
    }

    /// Run until the duration elapses or one faction remains
    pub fn run(&mut self, duration_s: f64) {
        self.running = true;
        self.events.push(self.time, None, None, EventKind::SimulationStarted);
        let end_time = (self.time + duration_s).min(self.config.max_battle_duration_s);
        while self.running && self.time < end_time {
            self.step();
        }
        self.metrics.battle_duration_s = self.time;
        self.events.push(
            self.time,
            None,
            None,
            EventKind::SimulationEnded {
                ships_destroyed: self.metrics.ships_destroyed.len(),
                projectiles_in_flight: self.projectiles.len(),
            },
        );
    }

    /// Advance the battle by one tick
    pub fn step(&mut self) {
        let dt = self.config.time_step_s;

        let decision_point = self.time - self.last_decision >= self.config.decision_interval_s;
        if decision_point {
            self.events.push(self.time, None, None, EventKind::DecisionPoint);
            self.last_decision = self.time;
        }

        self.update_ships(dt);
        self.process_weapons_orders();
        self.update_projectiles(dt);
        self.update_point_defense(dt);
        self.update_torpedoes(dt);
        // Batches queued mid-interval stay queued; standing orders change
        // only on a decision-point tick.
        if decision_point {
            self.apply_pending_commands();
        }
        self.check_destruction_sweep();
        self.check_battle_end();

        self.time += dt;
    }

    fn views(&self) -> AHashMap<ShipId, ShipView> {
        self.ships
            .iter()
            .map(|(&id, ship)| {
                (
                    id,
                    ShipView {
                        position: ship.position(),
                        velocity: ship.velocity(),
                        forward: ship.forward(),
                        faction: ship.faction.clone(),
                        evading: ship.is_evading(),
                        destroyed: ship.destroyed,
                        hull_length_m: ship.geometry.length_m,
                        ecm_strength: ship.ecm.effective_strength(),
                        armor_thickness_cm: ship
                            .armor
                            .first()
                            .map(|a| a.thickness_cm)
                            .unwrap_or(0.0),
                    },
                )
            })
            .collect()
    }

    // ---------------------------------------------------------------------
    // Phase 1: ships (kinematics, thermal, power, locks)
    // ---------------------------------------------------------------------

    fn update_ships(&mut self, dt: f64) {
        let views = self.views();
        let order = self.ship_order.clone();
        let now = self.time;

        for id in order {
            let mut tick_events: Vec<EventKind> = Vec::new();

            let Some(ship) = self.ships.get_mut(&id) else { continue };
            if ship.destroyed {
                continue;
            }

            // Maneuver: rotate toward the order's direction, then thrust
            // along the hull axis.
            let mut throttle = 0.0;
            let mut jink = false;
            let mut completed: Option<String> = None;

            if let Some(maneuver) = &ship.maneuver {
                if maneuver.is_complete(now) {
                    completed = Some(maneuver.order.name().to_string());
                } else {
                    throttle = maneuver.throttle;
                    let desired = match &maneuver.order {
                        ManeuverOrder::Intercept { target } | ManeuverOrder::Padlock { target } => {
                            views.get(target).filter(|v| !v.destroyed).map(|v| {
                                maneuvers::intercept_direction(
                                    &ship.kinematics.position,
                                    &ship.kinematics.velocity,
                                    &ship.kinematics.forward,
                                    &v.position,
                                    &v.velocity,
                                )
                            })
                        }
                        ManeuverOrder::Evasive { target } => {
                            jink = true;
                            let toward = target
                                .and_then(|t| views.get(&t).filter(|v| !v.destroyed))
                                .or_else(|| {
                                    // Nearest live enemy.
                                    views
                                        .values()
                                        .filter(|v| !v.destroyed && v.faction != ship.faction)
                                        .min_by_key(|v| {
                                            OrderedFloat(ship.kinematics.position.distance_to(&v.position))
                                        })
                                });
                            toward.map(|v| {
                                maneuvers::intercept_direction(
                                    &ship.kinematics.position,
                                    &ship.kinematics.velocity,
                                    &ship.kinematics.forward,
                                    &v.position,
                                    &v.velocity,
                                )
                            })
                        }
                        ManeuverOrder::Brake => maneuvers::brake_direction(&ship.kinematics.velocity),
                        ManeuverOrder::Maintain => None,
                        ManeuverOrder::Heading { direction } => Some(direction.normalized()),
                    };
                    // No burn without a burn direction (brake complete,
                    // target gone); padlock tracks on RCS alone.
                    if desired.is_none() || matches!(maneuver.order, ManeuverOrder::Padlock { .. }) {
                        throttle = 0.0;
                    }
                    if let Some(direction) = desired {
                        let engines_on = throttle > 0.0;
                        let engine_eff = ship.engine_effectiveness();
                        rotation::rotate_toward(
                            &mut ship.kinematics,
                            direction,
                            &ship.attitude,
                            engines_on,
                            engine_eff,
                            dt,
                        );
                    }
                }
            }

            if let Some(name) = completed {
                ship.maneuver = None;
                tick_events.push(EventKind::ManeuverCompleted { maneuver: name });
            }

            // Engine damage scales thrust.
            let effective_throttle = throttle * ship.engine_effectiveness();
            if effective_throttle > 0.0 {
                let mut burn_direction = ship.kinematics.forward;
                if jink {
                    burn_direction = maneuvers::evasive_thrust_direction(
                        &burn_direction,
                        &ship.kinematics.up,
                        now,
                        ship.id,
                    );
                }
                ship.kinematics.apply_thrust(burn_direction, effective_throttle, dt);
            } else {
                ship.kinematics.coast(dt);
            }

            // Thermal: engines dump heat while burning; edge-triggered
            // threshold crossings become events.
            ship.thermal.set_source_active("engines", effective_throttle > 0.0);
            let thermal_tick = ship.thermal.update(dt);
            if thermal_tick.crossed_critical {
                tick_events.push(EventKind::ThermalCritical {
                    heat_fraction: thermal_tick.heat_fraction,
                });
            } else if thermal_tick.crossed_warning {
                tick_events.push(EventKind::ThermalWarning {
                    heat_fraction: thermal_tick.heat_fraction,
                });
            }

            // Power: reactor damage scales output through the tick.
            let reactor_eff = ship.reactor_effectiveness();
            let nominal_output = ship.power.reactor.output_mw;
            ship.power.reactor.output_mw = nominal_output * reactor_eff;
            ship.power.set_drive_throttle(effective_throttle);
            ship.power.update(dt);
            ship.power.reactor.output_mw = nominal_output;

            // Weapon cooldowns and the torpedo tube.
            let cooldown_rate = ship.weapon_cooldown_rate();
            for weapon in ship.weapons.values_mut() {
                weapon.update(dt, cooldown_rate);
            }
            if let Some(launcher) = &mut ship.torpedo_launcher {
                launcher.update(dt);
            }

            // Sensor lock on the primary target.
            let target_view = ship.primary_target.and_then(|t| views.get(&t));
            match target_view {
                Some(view) if !view.destroyed => {
                    let computer = ship.effective_computer();
                    let distance_km =
                        ship.kinematics.position.distance_to(&view.position) / 1000.0;
                    if distance_km > computer.sensor_range_km {
                        // Outside sensor range no lock survives.
                        if ship.solution.is_locked() {
                            tick_events.push(EventKind::TargetLockBroken);
                        }
                        ship.solution.reset();
                    } else {
                        let transition =
                            ship.solution
                                .update(dt, view.ecm_strength, &computer, &mut self.rng);
                        match transition {
                            LockTransition::Acquired => tick_events.push(EventKind::TargetLocked),
                            LockTransition::Reacquired => {
                                tick_events.push(EventKind::TargetReacquired)
                            }
                            LockTransition::Broken => {
                                tick_events.push(EventKind::TargetLockBroken)
                            }
                            LockTransition::None => {}
                        }
                    }
                }
                _ => ship.solution.reset(),
            }

            let target = ship.primary_target;
            for kind in tick_events {
                self.events.push(now, Some(id), target, kind);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Phase 2: weapons orders
    // ---------------------------------------------------------------------

    fn process_weapons_orders(&mut self) {
        let views = self.views();
        let order_ids = self.ship_order.clone();
        let now = self.time;

        for id in order_ids {
            let Some(ship) = self.ships.get(&id) else { continue };
            if ship.destroyed || ship.weapons_orders.is_empty() {
                continue;
            }

            // Decide every shot first against the immutable view, then
            // commit them. Slot order is fixed for determinism.
            let mut shots: Vec<(String, ShipId, Vec3, f64)> = Vec::new();
            for slot in &ship.weapon_order {
                let Some(weapons_order) = ship.weapons_orders.get(slot) else { continue };
                if weapons_order.doctrine == WeaponsDoctrine::HoldFire {
                    continue;
                }
                let Some(weapon) = ship.weapons.get(slot) else { continue };
                if weapon.ready().is_err() {
                    continue;
                }
                if !ship.power.capacitors[weapon.capacitor_index].is_full() {
                    continue;
                }
                if ship.thermal.weapons_inhibited() {
                    continue;
                }
                if !ship.solution.is_locked() {
                    continue;
                }
                let Some(target_id) = weapons_order.target.or(ship.primary_target) else {
                    continue;
                };
                let Some(target) = views.get(&target_id).filter(|v| !v.destroyed) else {
                    continue;
                };

                let Ok(direction) = weapon.fire_direction(
                    &ship.kinematics.position,
                    &ship.kinematics.velocity,
                    &ship.kinematics.forward,
                    &target.position,
                    &target.velocity,
                ) else {
                    continue;
                };

                let distance_km = ship.kinematics.position.distance_to(&target.position) / 1000.0;
                let probability = resolution::hit_probability(
                    AttackVelocity::Ballistic(weapon.spec.muzzle_velocity_kps),
                    distance_km,
                    weapon.spec.max_range_km,
                    target.evading,
                    1.0,
                );
                let clear = match weapons_order.doctrine {
                    WeaponsDoctrine::FireImmediate => probability > 0.0,
                    WeaponsDoctrine::FireWhenOptimal { min_hit_probability } => {
                        probability >= min_hit_probability
                    }
                    WeaponsDoctrine::FireAtRange { max_range_km } => distance_km <= max_range_km,
                    WeaponsDoctrine::HoldFire => false,
                };
                if clear {
                    shots.push((slot.clone(), target_id, direction, probability));
                }
            }

            if shots.is_empty() {
                continue;
            }

            let Some(ship) = self.ships.get_mut(&id) else { continue };
            for (slot, target_id, direction, probability) in shots {
                let Some(weapon) = ship.weapons.get_mut(&slot) else { continue };
                let muzzle_velocity_kps = weapon.spec.muzzle_velocity_kps;
                let slug_mass_kg = weapon.spec.slug_mass_kg;
                let damage_kind = match weapon.spec.category {
                    crate::power::WeaponCategory::Laser => DamageKind::Laser,
                    _ => DamageKind::Kinetic,
                };
                let capacitor_index = weapon.capacitor_index;
                weapon.expend();

                let (_delivered_mj, waste_heat_gj) = ship.power.capacitors[capacitor_index].discharge();
                ship.thermal.add_heat(waste_heat_gj);

                let projectile = KineticProjectile::from_launch(
                    ship.kinematics.position,
                    ship.kinematics.velocity,
                    direction,
                    muzzle_velocity_kps * 1000.0,
                    slug_mass_kg,
                );
                debug!(
                    ship = %ship.name,
                    slot = %slot,
                    probability,
                    "weapon fired"
                );
                self.projectiles.push(ProjectileInFlight {
                    id: ProjectileId::new(),
                    projectile,
                    source: id,
                    target: target_id,
                    damage_kind,
                    slug_material: "tungsten".to_string(),
                    launch_time: now,
                    prev_distance_m: f64::INFINITY,
                    min_distance_m: f64::INFINITY,
                });
                self.metrics.shots_fired += 1;
                self.events.push(
                    now,
                    Some(id),
                    Some(target_id),
                    EventKind::ProjectileLaunched {
                        weapon: slot,
                        muzzle_velocity_kps,
                    },
                );
            }
        }
    }

    // ---------------------------------------------------------------------
    // Phase 3: projectile flight with adaptive terminal stepping
    // ---------------------------------------------------------------------

    fn update_projectiles(&mut self, dt: f64) {
        let views = self.views();
        let now = self.time;
        let mut finished: Vec<usize> = Vec::new();
        let mut impacts: Vec<(usize, ShipId, Vec3)> = Vec::new();

        for (index, flight) in self.projectiles.iter_mut().enumerate() {
            let Some(target) = views.get(&flight.target).filter(|v| !v.destroyed) else {
                finished.push(index);
                continue;
            };

            let geometry = HullGeometry::new(target.hull_length_m);
            let (tca, _) = geometry::time_to_closest_approach(
                &flight.projectile.position,
                &flight.projectile.velocity,
                &target.position,
                &target.velocity,
            );

            // Close approaches get millisecond substeps so a multi-km/s
            // slug cannot tunnel through the hull between ticks.
            let hit = if (0.0..=self.config.terminal_tca_threshold_s).contains(&tca) {
                let micro = self.config.terminal_micro_step_s;
                let steps = ((dt / micro) as usize).min(5000);
                let mut hit = None;
                let mut target_pos = target.position;
                for _ in 0..steps {
                    let start = flight.projectile.position;
                    flight.projectile.coast(micro);
                    target_pos = target_pos + target.velocity * micro;
                    if let Some((point, _)) = geometry::segment_hits_cylinder(
                        &start,
                        &flight.projectile.position,
                        &target_pos,
                        &target.forward,
                        &geometry,
                        self.config.hit_tolerance_m,
                    ) {
                        hit = Some(point);
                        break;
                    }
                }
                hit
            } else {
                let start = flight.projectile.position;
                flight.projectile.coast(dt);
                geometry::segment_hits_cylinder(
                    &start,
                    &flight.projectile.position,
                    &target.position,
                    &target.forward,
                    &geometry,
                    self.config.hit_tolerance_m,
                )
                .map(|(point, _)| point)
            };

            if let Some(point) = hit {
                impacts.push((index, flight.target, point));
                finished.push(index);
                continue;
            }

            let distance = flight.projectile.position.distance_to(&target.position);
            flight.min_distance_m = flight.min_distance_m.min(distance);

            // Past closest approach and opening: that was the miss.
            if distance > flight.prev_distance_m && flight.min_distance_m < 100_000.0 {
                self.metrics.projectile_misses += 1;
                self.events.push(
                    now,
                    Some(flight.source),
                    Some(flight.target),
                    EventKind::ProjectileMiss {
                        closest_approach_km: flight.min_distance_m / 1000.0,
                    },
                );
                finished.push(index);
                continue;
            }
            flight.prev_distance_m = distance;

            if distance > self.config.projectile_cleanup_range_m {
                finished.push(index);
            }
        }

        for (index, target_id, _point) in impacts {
            let Some(target) = views.get(&target_id) else { continue };
            let flight = &self.projectiles[index];
            let rel = flight.projectile.velocity - target.velocity;
            let damage_kind = flight.damage_kind;
            let impact_dir = rel.normalized();
            let energy_gj = flight.projectile.impact_energy_gj(&target.velocity);
            let source = flight.source;
            self.metrics.projectile_hits += 1;
            self.resolve_ship_impact(source, target_id, energy_gj, damage_kind, impact_dir, 0.1);
        }

        finished.sort_unstable();
        finished.dedup();
        for index in finished.into_iter().rev() {
            self.projectiles.swap_remove(index);
        }
    }

    // ---------------------------------------------------------------------
    // Phase 4: point defense
    // ---------------------------------------------------------------------

    fn update_point_defense(&mut self, dt: f64) {
        let views = self.views();
        let order_ids = self.ship_order.clone();
        let now = self.time;

        for id in order_ids {
            let Some(ship) = self.ships.get(&id) else { continue };
            if ship.destroyed || ship.pd_turrets.is_empty() {
                continue;
            }
            let Some(ship_view) = views.get(&id) else { continue };

            // Threat list: (class, time_to_impact, distance_km, index into
            // the munition list or target id).
            #[derive(Clone)]
            enum PdTarget {
                Torpedo(usize),
                Slug(usize),
                Ship(ShipId),
            }
            let mut threats: Vec<(ThreatClass, f64, f64, PdTarget)> = Vec::new();

            let allied: Vec<&ShipView> = views
                .values()
                .filter(|v| !v.destroyed && v.faction == ship_view.faction)
                .collect();

            for (t_index, flight) in self.torpedoes.iter().enumerate() {
                if flight.disabled {
                    continue;
                }
                if views
                    .get(&flight.source)
                    .is_some_and(|v| v.faction == ship_view.faction)
                {
                    continue;
                }
                let distance_m = flight.torpedo.position.distance_to(&ship_view.position);
                let threatens_self = flight.target == id
                    || on_collision_course(
                        &flight.torpedo.position,
                        &flight.torpedo.velocity,
                        &ship_view.position,
                        &ship_view.velocity,
                    );
                let threatens_ally = allied.iter().any(|ally| {
                    on_collision_course(
                        &flight.torpedo.position,
                        &flight.torpedo.velocity,
                        &ally.position,
                        &ally.velocity,
                    )
                });
                if !threatens_self && !threatens_ally {
                    continue;
                }
                let class = if threatens_self
                    && on_collision_course(
                        &flight.torpedo.position,
                        &flight.torpedo.velocity,
                        &ship_view.position,
                        &ship_view.velocity,
                    ) {
                    ThreatClass::TorpedoOnCollision
                } else if !flight.torpedo.fuel_exhausted() {
                    ThreatClass::TorpedoManeuvering
                } else {
                    ThreatClass::AlliedDefense
                };
                let closing = closing_speed(
                    &flight.torpedo.position,
                    &flight.torpedo.velocity,
                    &ship_view.position,
                    &ship_view.velocity,
                );
                let tti = if closing > 0.0 { distance_m / closing } else { f64::INFINITY };
                threats.push((class, tti, distance_m / 1000.0, PdTarget::Torpedo(t_index)));
            }

            for (p_index, flight) in self.projectiles.iter().enumerate() {
                if views
                    .get(&flight.source)
                    .is_some_and(|v| v.faction == ship_view.faction)
                {
                    continue;
                }
                let on_self = on_collision_course(
                    &flight.projectile.position,
                    &flight.projectile.velocity,
                    &ship_view.position,
                    &ship_view.velocity,
                );
                let on_ally = allied.iter().any(|ally| {
                    on_collision_course(
                        &flight.projectile.position,
                        &flight.projectile.velocity,
                        &ally.position,
                        &ally.velocity,
                    )
                });
                if !on_self && !on_ally {
                    continue;
                }
                let class = if on_self {
                    ThreatClass::SlugOnIntercept
                } else {
                    ThreatClass::AlliedDefense
                };
                let distance_m = flight.projectile.position.distance_to(&ship_view.position);
                let closing = closing_speed(
                    &flight.projectile.position,
                    &flight.projectile.velocity,
                    &ship_view.position,
                    &ship_view.velocity,
                );
                let tti = if closing > 0.0 { distance_m / closing } else { f64::INFINITY };
                threats.push((class, tti, distance_m / 1000.0, PdTarget::Slug(p_index)));
            }

            for (&other_id, other) in &views {
                if other.destroyed || other.faction == ship_view.faction {
                    continue;
                }
                let distance_km = ship_view.position.distance_to(&other.position) / 1000.0;
                threats.push((ThreatClass::EnemyShip, f64::INFINITY, distance_km, PdTarget::Ship(other_id)));
            }

            threats.sort_by_key(|(class, tti, distance, _)| {
                (class.priority(), OrderedFloat(*tti), OrderedFloat(*distance))
            });

            // Assign turrets most-urgent first, spreading past overkill.
            let ready: Vec<usize> = ship
                .pd_turrets
                .iter()
                .enumerate()
                .filter(|(_, t)| t.can_fire())
                .map(|(i, _)| i)
                .collect();
            let mut assignments: Vec<(usize, ThreatClass, f64, PdTarget)> = Vec::new();
            let mut next_turret = 0usize;
            for (class, _tti, distance_km, target) in &threats {
                if next_turret >= ready.len() {
                    break;
                }
                if !ship.pd_turrets[ready[next_turret]].laser.is_in_range(*distance_km) {
                    continue;
                }
                let needed = match target {
                    PdTarget::Torpedo(t_index) => {
                        let flight = &self.torpedoes[*t_index];
                        let laser = &ship.pd_turrets[ready[next_turret]].laser;
                        let per_cycle = laser.heat_transfer_j(*distance_km, laser.cooldown_s);
                        let remaining = (TORPEDO_DESTROY_THRESHOLD_J - flight.heat_absorbed_j).max(0.0);
                        ((remaining / per_cycle.max(1.0)).ceil() as usize).clamp(1, ready.len())
                    }
                    PdTarget::Slug(_) => 1,
                    PdTarget::Ship(_) => 1,
                };
                for _ in 0..needed {
                    if next_turret >= ready.len() {
                        break;
                    }
                    assignments.push((ready[next_turret], *class, *distance_km, target.clone()));
                    next_turret += 1;
                }
            }

            // Execute. Turret cooldowns tick regardless of assignment.
            let mut engagement_events: Vec<(Option<ShipId>, EventKind)> = Vec::new();
            let mut dead_slugs: Vec<usize> = Vec::new();
            let mut dead_torpedoes: Vec<usize> = Vec::new();

            let Some(ship) = self.ships.get_mut(&id) else { continue };
            for turret in &mut ship.pd_turrets {
                turret.update(dt);
            }
            for (turret_index, _class, distance_km, target) in assignments {
                let turret = &mut ship.pd_turrets[turret_index];
                if !turret.can_fire() {
                    continue;
                }
                let dwell = turret.laser.cooldown_s;
                match target {
                    PdTarget::Slug(p_index) => {
                        let flight = &mut self.projectiles[p_index];
                        let result = point_defense::engage_slug(
                            &turret.laser,
                            distance_km,
                            dwell,
                            &flight.slug_material,
                            flight.projectile.remaining_mass_kg(),
                            &self.materials,
                        );
                        turret.engage();
                        flight.projectile.ablated_mass_kg += result.mass_ablated_kg;
                        engagement_events.push((
                            Some(flight.source),
                            EventKind::PdEngaged {
                                target_kind: "slug".to_string(),
                                distance_km,
                            },
                        ));
                        if result.outcome == EngagementOutcome::Destroyed
                            || flight.projectile.is_vaporized()
                        {
                            dead_slugs.push(p_index);
                            engagement_events.push((Some(flight.source), EventKind::PdSlugDestroyed));
                        } else if result.mass_ablated_kg > 0.0 {
                            engagement_events.push((
                                Some(flight.source),
                                EventKind::PdSlugDamaged {
                                    mass_ablated_kg: result.mass_ablated_kg,
                                },
                            ));
                        }
                    }
                    PdTarget::Torpedo(t_index) => {
                        let flight = &mut self.torpedoes[t_index];
                        let result = point_defense::engage_torpedo(
                            &turret.laser,
                            distance_km,
                            dwell,
                            flight.heat_absorbed_j,
                        );
                        turret.engage();
                        flight.heat_absorbed_j += result.energy_delivered_j;
                        engagement_events.push((
                            Some(flight.source),
                            EventKind::PdEngaged {
                                target_kind: "torpedo".to_string(),
                                distance_km,
                            },
                        ));
                        match result.outcome {
                            EngagementOutcome::Destroyed => {
                                dead_torpedoes.push(t_index);
                                engagement_events
                                    .push((Some(flight.source), EventKind::PdTorpedoDestroyed));
                            }
                            EngagementOutcome::Disabled if !flight.disabled => {
                                flight.disabled = true;
                                flight.torpedo.disable();
                                engagement_events
                                    .push((Some(flight.source), EventKind::PdTorpedoDisabled));
                            }
                            _ => {}
                        }
                    }
                    PdTarget::Ship(other_id) => {
                        // Harassment fire against hull plating at close range.
                        let thickness = views
                            .get(&other_id)
                            .map(|v| v.armor_thickness_cm)
                            .unwrap_or(0.0);
                        let _ = point_defense::engage_ship_armor(&turret.laser, distance_km, dwell, thickness);
                        turret.engage();
                        engagement_events.push((
                            Some(other_id),
                            EventKind::PdEngaged {
                                target_kind: "ship".to_string(),
                                distance_km,
                            },
                        ));
                    }
                }
            }

            for (target, kind) in engagement_events {
                match kind {
                    EventKind::PdTorpedoDestroyed => self.metrics.pd_torpedoes_destroyed += 1,
                    EventKind::PdTorpedoDisabled => self.metrics.pd_torpedoes_disabled += 1,
                    EventKind::PdSlugDestroyed => self.metrics.pd_slugs_destroyed += 1,
                    _ => {}
                }
                self.events.push(now, Some(id), target, kind);
            }

            dead_slugs.sort_unstable();
            dead_slugs.dedup();
            for index in dead_slugs.into_iter().rev() {
                self.projectiles.swap_remove(index);
            }
            dead_torpedoes.sort_unstable();
            dead_torpedoes.dedup();
            for index in dead_torpedoes.into_iter().rev() {
                self.torpedoes.swap_remove(index);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Phase 5: torpedo flight and terminal resolution
    // ---------------------------------------------------------------------

    fn update_torpedoes(&mut self, dt: f64) {
        let views = self.views();
        let now = self.time;
        let mut finished: Vec<usize> = Vec::new();
        let mut strikes: Vec<(usize, ShipId)> = Vec::new();

        for (index, flight) in self.torpedoes.iter_mut().enumerate() {
            let Some(target) = views.get(&flight.target).filter(|v| !v.destroyed) else {
                finished.push(index);
                continue;
            };

            if flight.disabled {
                // Ballistic coast, no guidance.
                let velocity = flight.torpedo.velocity;
                flight.torpedo.position = flight.torpedo.position + velocity * dt;
            } else {
                let went_dry = flight.torpedo.update(&target.position, &target.velocity, dt);
                if went_dry {
                    self.events.push(
                        now,
                        Some(flight.source),
                        Some(flight.target),
                        EventKind::TorpedoFuelExhausted,
                    );
                }
            }

            let distance = flight.torpedo.position.distance_to(&target.position);
            flight.min_distance_m = flight.min_distance_m.min(distance);

            let at_closest_approach = flight.prev_distance_m.is_finite()
                && distance > flight.prev_distance_m
                && flight.min_distance_m < 50_000.0;

            if at_closest_approach && flight.torpedo.armed {
                // Terminal resolution: hit probability at closest approach,
                // guided velocity factor, evasion halves.
                let probability = resolution::hit_probability(
                    AttackVelocity::Guided,
                    flight.min_distance_m / 1000.0,
                    50.0,
                    target.evading,
                    1.0,
                );
                let roll: f64 = self.rng.gen();
                if roll < probability {
                    strikes.push((index, flight.target));
                } else {
                    self.metrics.torpedo_misses += 1;
                    self.events.push(
                        now,
                        Some(flight.source),
                        Some(flight.target),
                        EventKind::TorpedoMiss {
                            closest_approach_km: flight.min_distance_m / 1000.0,
                        },
                    );
                }
                finished.push(index);
                continue;
            }
            flight.prev_distance_m = distance;

            let flight_time = now - flight.launch_time;
            if flight_time > self.config.torpedo_flight_limit_s
                || distance > self.config.projectile_cleanup_range_m
            {
                finished.push(index);
            }
        }

        for (index, target_id) in strikes {
            let Some(target) = views.get(&target_id) else { continue };
            let flight = &self.torpedoes[index];
            let rel = flight.torpedo.velocity - target.velocity;
            let speed = rel.magnitude();
            let kinetic_gj = 0.5 * flight.torpedo.spec.penetrator_mass_kg * speed * speed / 1e9;
            let warhead_gj = flight.torpedo.spec.warhead_yield_gj;
            let impact_dir = rel.normalized();
            let impact_speed_kps = speed / 1000.0;
            let source = flight.source;
            let location =
                HullGeometry::new(target.hull_length_m).hit_location(&impact_dir, &target.forward);
            self.metrics.torpedo_hits += 1;
            self.events.push(
                now,
                Some(source),
                Some(target_id),
                EventKind::TorpedoImpact {
                    kinetic_gj,
                    warhead_gj,
                    impact_speed_kps,
                    location,
                },
            );

            // Penetrator first, then the warhead through the same breach.
            self.resolve_ship_impact(source, target_id, kinetic_gj, DamageKind::Kinetic, impact_dir, 0.1);
            if warhead_gj > 0.01 {
                self.resolve_ship_impact(source, target_id, warhead_gj, DamageKind::Explosive, impact_dir, 0.5);
            }
        }

        finished.sort_unstable();
        finished.dedup();
        for index in finished.into_iter().rev() {
            self.torpedoes.swap_remove(index);
        }
    }

    // ---------------------------------------------------------------------
    // Shared hit resolution
    // ---------------------------------------------------------------------

    fn resolve_ship_impact(
        &mut self,
        source: ShipId,
        target_id: ShipId,
        energy_gj: f64,
        kind: DamageKind,
        impact_dir: Vec3,
        impact_area_m2: f64,
    ) {
        let now = self.time;
        let mut out_events: Vec<EventKind> = Vec::new();
        let mut destroyed = false;

        {
            let Some(target) = self.ships.get_mut(&target_id) else { return };
            if target.destroyed {
                return;
            }
            let location = target.geometry.hit_location(&impact_dir, &target.kinematics.forward);
            let impact_angle = 0.0;
            let result = resolution::resolve_impact(
                energy_gj,
                kind,
                location,
                impact_angle,
                impact_area_m2,
                &mut target.armor,
                &mut target.layout,
                &mut target.thermal,
                &mut self.rng,
            );

            target.damage_taken_gj += energy_gj;
            self.metrics.total_damage_gj += energy_gj;

            out_events.push(EventKind::ProjectileImpact {
                location,
                energy_gj,
                penetrated: result.armor.penetrated,
            });
            if result.armor.penetrated && result.armor.penetrating_gj > 0.0 {
                out_events.push(EventKind::ArmorPenetrated {
                    location,
                    penetrating_gj: result.armor.penetrating_gj,
                });
            }
            for damage in &result.module_damage {
                out_events.push(EventKind::ModuleDamaged {
                    module: damage.module_name.clone(),
                    damage_gj: damage.damage_gj,
                });
                if damage.destroyed {
                    out_events.push(EventKind::ModuleDestroyed {
                        module: damage.module_name.clone(),
                    });
                    target.on_module_destroyed(&damage.module_name);
                }
            }
            if let Some(radiator) = &result.radiator_hit {
                out_events.push(EventKind::RadiatorDamaged {
                    destroyed: radiator.destroyed,
                });
            }

            if target.check_destruction() {
                target.destroyed = true;
                target.kill_credit = Some(source);
                destroyed = true;
            }
        }

        if let Some(s) = self.ships.get_mut(&source) {
            s.damage_dealt_gj += energy_gj;
        }

        for kind in out_events {
            self.events.push(now, Some(source), Some(target_id), kind);
        }
        if destroyed {
            info!(?target_id, "ship destroyed");
            self.metrics.ships_destroyed.push(target_id);
            self.events.push(now, Some(source), Some(target_id), EventKind::ShipDestroyed);
        }
    }

    // ---------------------------------------------------------------------
    // Phase 6: command application
    // ---------------------------------------------------------------------

    // Runs only on decision-point ticks; whatever has accumulated per ship
    // is that ship's one honored batch for the interval opening now.
    fn apply_pending_commands(&mut self) {
        let commands = std::mem::take(&mut self.pending_commands);
        let now = self.time;
        let interval = self.interval_index(now);
        for (ship_id, command) in commands {
            self.honored_intervals.insert(ship_id, interval);
            let description = command.describe();
            let accepted = self.apply_command(ship_id, command);
            let kind = if accepted {
                EventKind::CommandAccepted { description }
            } else {
                EventKind::CommandRejected { reason: description }
            };
            self.events.push(now, Some(ship_id), None, kind);
        }
    }

    fn apply_command(&mut self, ship_id: ShipId, command: Command) -> bool {
        let now = self.time;
        let views = self.views();
        let Some(ship) = self.ships.get_mut(&ship_id) else { return false };
        if ship.destroyed {
            return false;
        }
        match command {
            Command::SetManeuver { order, throttle, duration_s } => {
                let name = order.name().to_string();
                ship.maneuver = Some(Maneuver::new(order, throttle, duration_s, now));
                self.events.push(
                    now,
                    Some(ship_id),
                    None,
                    EventKind::ManeuverStarted { maneuver: name },
                );
                true
            }
            Command::SetWeaponsOrder(order) => {
                match &order.weapon_slot {
                    Some(slot) => {
                        if !ship.weapons.contains_key(slot) {
                            return false;
                        }
                        ship.weapons_orders.insert(slot.clone(), order);
                    }
                    None => {
                        for slot in ship.weapon_order.clone() {
                            let mut per_slot = order.clone();
                            per_slot.weapon_slot = Some(slot.clone());
                            ship.weapons_orders.insert(slot, per_slot);
                        }
                    }
                }
                true
            }
            Command::LaunchTorpedo { target } => {
                let Some(target_view) = views.get(&target).filter(|v| !v.destroyed) else {
                    return false;
                };
                let Some(launcher) = &mut ship.torpedo_launcher else { return false };
                if !launcher.can_launch() || !launcher.expend() {
                    return false;
                }
                let remaining = launcher.magazine;
                let spec = launcher.spec.clone();
                let boost = lead_point(
                    &ship.kinematics.position,
                    &ship.kinematics.velocity,
                    &target_view.position,
                    &target_view.velocity,
                    spec.total_delta_v_kps() * 500.0,
                ) - ship.kinematics.position;
                let torpedo = Torpedo::launch(
                    spec,
                    ship.kinematics.position,
                    ship.kinematics.velocity,
                    boost.normalized(),
                );
                self.torpedoes.push(TorpedoInFlight {
                    id: TorpedoId::new(),
                    torpedo,
                    source: ship_id,
                    target,
                    launch_time: now,
                    heat_absorbed_j: 0.0,
                    disabled: false,
                    prev_distance_m: f64::INFINITY,
                    min_distance_m: f64::INFINITY,
                });
                self.metrics.torpedoes_launched += 1;
                self.events.push(
                    now,
                    Some(ship_id),
                    Some(target),
                    EventKind::TorpedoLaunched {
                        remaining_in_magazine: remaining,
                    },
                );
                true
            }
            Command::SetRadiators { extend } => {
                ship.thermal.set_radiators_extended(extend);
                let kind = if extend {
                    EventKind::RadiatorsExtended
                } else {
                    EventKind::RadiatorsRetracted
                };
                self.events.push(now, Some(ship_id), None, kind);
                true
            }
            Command::SetEcm { active } => {
                ship.ecm.active = active;
                true
            }
            Command::SetPrimaryTarget { target } => {
                if !views.contains_key(&target) {
                    return false;
                }
                if ship.primary_target != Some(target) {
                    ship.primary_target = Some(target);
                    ship.solution.reset();
                }
                true
            }
        }
    }

    // Catches kills that did not come through an impact this tick, such as
    // spalling finishing off a critical module.
    fn check_destruction_sweep(&mut self) {
        let order = self.ship_order.clone();
        for id in order {
            let Some(ship) = self.ships.get_mut(&id) else { continue };
            if !ship.destroyed && ship.check_destruction() {
                ship.destroyed = true;
                info!(ship = %ship.name, "ship destroyed");
                self.metrics.ships_destroyed.push(id);
                self.events.push(self.time, None, Some(id), EventKind::ShipDestroyed);
            }
        }
    }

    fn check_battle_end(&mut self) {
        if !self.running {
            return;
        }
        let mut active_factions: Vec<&str> = self
            .ships
            .values()
            .filter(|s| !s.destroyed)
            .map(|s| s.faction.as_str())
            .collect();
        active_factions.sort_unstable();
        active_factions.dedup();
        if active_factions.len() <= 1 {
            self.running = false;
        }
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn snapshot(&self, ship_id: ShipId) -> Result<BattleSnapshot> {
        let ship = self.ships.get(&ship_id).ok_or(SimError::ShipNotFound(ship_id))?;
        let contacts = self
            .ship_order
            .iter()
            .filter(|&&other| other != ship_id)
            .filter_map(|&other| self.ships.get(&other))
            .map(|other| ContactReport {
                ship: other.id,
                name: other.name.clone(),
                faction: other.faction.clone(),
                distance_km: ship.distance_to(other) / 1000.0,
                closing_speed_kps: ship.closing_speed_to(other) / 1000.0,
                destroyed: other.destroyed,
            })
            .collect();
        let inbound_torpedoes = self
            .torpedoes
            .iter()
            .filter(|t| t.target == ship_id && !t.disabled)
            .count();
        Ok(BattleSnapshot {
            time_s: self.time,
            ship: ship_id,
            position: ship.position(),
            velocity: ship.velocity(),
            delta_v_remaining_kps: ship.kinematics.delta_v_remaining_ms() / 1000.0,
            heat_fraction: ship.thermal.heat_fraction(),
            hull_integrity_percent: ship.hull_integrity_percent(),
            locked: ship.solution.is_locked(),
            torpedoes_remaining: ship.torpedo_launcher.as_ref().map(|l| l.magazine).unwrap_or(0),
            inbound_torpedoes,
            contacts,
        })
    }
}

fn closing_speed(pos: &Vec3, vel: &Vec3, target_pos: &Vec3, target_vel: &Vec3) -> f64 {
    let to_target = (*target_pos - *pos).normalized();
    (*vel - *target_vel).dot(&to_target)
}

/// On a collision course when closing and the miss distance at closest
/// approach is inside a couple of hull lengths.
fn on_collision_course(pos: &Vec3, vel: &Vec3, target_pos: &Vec3, target_vel: &Vec3) -> bool {
    let (tca, miss_m) = geometry::time_to_closest_approach(pos, vel, target_pos, target_vel);
    tca > 0.0 && miss_m < 500.0
}
