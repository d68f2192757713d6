//! Ironkeel - scenario runner
//!
//! Loads a scenario TOML, runs the battle to completion, and prints a
//! summary. Ships open with an intercept order on the nearest enemy and
//! weapons free; anything fancier comes through the command API.

use std::fs;
use std::path::PathBuf;

use clap::Parser;

use ironkeel::core::config::SimulationConfig;
use ironkeel::core::error::{Result, SimError};
use ironkeel::core::types::ShipId;
use ironkeel::data::materials::MaterialTable;
use ironkeel::simulation::commands::{Command, ManeuverOrder, WeaponsDoctrine, WeaponsOrder};
use ironkeel::simulation::runner::Simulation;
use ironkeel::simulation::ship::ShipSpec;

#[derive(Parser, Debug)]
#[command(name = "ironkeel", about = "Deterministic spacecraft duel simulator")]
struct Args {
    /// Scenario TOML file
    scenario: PathBuf,

    /// Override the scenario's battle duration, seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Override the scenario's RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Material table TOML; built-in table when omitted
    #[arg(long)]
    materials: Option<PathBuf>,

    /// Dump the full event log as JSON after the summary
    #[arg(long)]
    events: bool,
}

#[derive(Debug, serde::Deserialize)]
struct Scenario {
    name: String,
    #[serde(default = "default_duration")]
    duration_s: f64,
    #[serde(default)]
    config: Option<SimulationConfig>,
    ships: Vec<ShipSpec>,
}

fn default_duration() -> f64 {
    1800.0
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ironkeel=info")),
        )
        .init();

    let args = Args::parse();

    let scenario: Scenario = toml::from_str(&fs::read_to_string(&args.scenario)?)?;
    if scenario.ships.len() < 2 {
        return Err(SimError::ScenarioError(format!(
            "scenario '{}' needs at least two ships",
            scenario.name
        )));
    }

    let mut config = scenario.config.clone().unwrap_or_default();
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let duration = args.duration.unwrap_or(scenario.duration_s);

    let materials = match &args.materials {
        Some(path) => MaterialTable::load_toml(path)?,
        None => MaterialTable::builtin(),
    };

    let mut sim = Simulation::new(config, materials)?;
    let ids: Vec<ShipId> = scenario.ships.iter().map(|s| sim.add_ship(s)).collect();

    // Standing orders: run down the nearest enemy, shoot when the odds
    // clear 30%.
    for &id in &ids {
        let Some(target) = nearest_enemy(&sim, id) else { continue };
        sim.inject_command(id, Command::SetPrimaryTarget { target })?;
        sim.inject_command(
            id,
            Command::SetManeuver {
                order: ManeuverOrder::Intercept { target },
                throttle: 1.0,
                duration_s: 0.0,
            },
        )?;
        sim.inject_command(
            id,
            Command::SetWeaponsOrder(WeaponsOrder {
                weapon_slot: None,
                doctrine: WeaponsDoctrine::FireWhenOptimal {
                    min_hit_probability: 0.3,
                },
                target: Some(target),
            }),
        )?;
    }

    println!("=== {} ===", scenario.name);
    sim.run(duration);

    println!("battle over at t={:.0}s", sim.time());
    let metrics = &sim.metrics;
    println!(
        "shots fired: {} ({} hits, {:.0}% hit rate)",
        metrics.shots_fired,
        metrics.projectile_hits,
        metrics.projectile_hit_rate() * 100.0
    );
    println!(
        "torpedoes: {} launched, {} hit, {} disabled by PD, {} destroyed by PD",
        metrics.torpedoes_launched,
        metrics.torpedo_hits,
        metrics.pd_torpedoes_disabled,
        metrics.pd_torpedoes_destroyed
    );
    println!("total damage: {:.1} GJ", metrics.total_damage_gj);

    for &id in &ids {
        let snap = sim.snapshot(id)?;
        let ship = sim.ship(id).ok_or(SimError::ShipNotFound(id))?;
        let status = if ship.destroyed { "DESTROYED" } else { "alive" };
        println!(
            "  {} [{}] {}: hull {:.0}%, heat {:.0}%, dv {:.1} km/s, {:.1} GJ dealt",
            ship.name,
            ship.faction,
            status,
            snap.hull_integrity_percent,
            snap.heat_fraction * 100.0,
            snap.delta_v_remaining_kps,
            ship.damage_dealt_gj
        );
    }

    if args.events {
        println!("{}", serde_json::to_string_pretty(sim.events.all())?);
    }

    Ok(())
}

fn nearest_enemy(sim: &Simulation, id: ShipId) -> Option<ShipId> {
    let ship = sim.ship(id)?;
    sim.enemies_of(id)
        .into_iter()
        .filter_map(|other| sim.ship(other).map(|o| (other, ship.distance_to(o))))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(other, _)| other)
}
