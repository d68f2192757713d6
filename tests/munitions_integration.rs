//! Torpedo and point-defense integration tests
//!
//! A launch platform puts torpedoes on a stationary target; the defended
//! variants carry PD lasers that must burn the inbound birds down before
//! terminal approach.

use ironkeel::core::config::SimulationConfig;
use ironkeel::core::types::ShipId;
use ironkeel::data::materials::MaterialTable;
use ironkeel::simulation::commands::{Command, ManeuverOrder, WeaponsDoctrine, WeaponsOrder};
use ironkeel::simulation::runner::Simulation;
use ironkeel::simulation::ship::ShipSpec;

fn platform(name: &str, faction: &str, x_km: f64, defended: bool) -> ShipSpec {
    let pd = if defended { "\n[[pd_turrets]]\npower_mw = 5.0\n" } else { "" };
    toml::from_str(&format!(
        r#"
        name = "{name}"
        faction = "{faction}"
        position = {{ x = {x}, y = 0.0, z = 0.0 }}
        forward = {{ x = {fx}, y = 0.0, z = 0.0 }}

        [torpedoes]
        magazine = 4
        {pd}
        "#,
        name = name,
        faction = faction,
        x = x_km * 1000.0,
        fx = if x_km > 0.0 { -1.0 } else { 1.0 },
        pd = pd,
    ))
    .unwrap()
}

fn setup(defended: bool, seed: u64) -> (Simulation, ShipId, ShipId) {
    let config = SimulationConfig { seed, ..Default::default() };
    let mut sim = Simulation::new(config, MaterialTable::builtin()).unwrap();
    let attacker = sim.add_ship(&platform("lance", "red", 0.0, false));
    let defender = sim.add_ship(&platform("redoubt", "blue", if defended { 80.0 } else { 150.0 }, defended));
    sim.inject_command(attacker, Command::SetPrimaryTarget { target: defender }).unwrap();
    (sim, attacker, defender)
}

#[test]
fn test_torpedo_launch_decrements_magazine() {
    let (mut sim, attacker, defender) = setup(false, 21);
    sim.inject_command(attacker, Command::LaunchTorpedo { target: defender }).unwrap();
    sim.step();

    assert_eq!(sim.events.with_label("torpedo_launched").count(), 1);
    assert_eq!(sim.metrics.torpedoes_launched, 1);
    assert_eq!(sim.torpedoes_in_flight(), 1);
    let launcher = sim.ship(attacker).unwrap().torpedo_launcher.as_ref().unwrap();
    assert_eq!(launcher.magazine, 3);
}

#[test]
fn test_torpedo_flight_resolves_against_stationary_target() {
    let (mut sim, attacker, defender) = setup(false, 21);
    sim.inject_command(attacker, Command::LaunchTorpedo { target: defender }).unwrap();

    for _ in 0..1200 {
        sim.step();
        if sim.torpedoes_in_flight() == 0 && sim.metrics.torpedoes_launched > 0 {
            break;
        }
    }

    assert_eq!(sim.torpedoes_in_flight(), 0, "torpedo never resolved");
    assert_eq!(sim.metrics.torpedo_hits + sim.metrics.torpedo_misses, 1);
    if sim.metrics.torpedo_hits == 1 {
        assert_eq!(sim.events.with_label("torpedo_impact").count(), 1);
        assert!(sim.ship(defender).unwrap().damage_taken_gj > 0.0);
    } else {
        assert_eq!(sim.events.with_label("torpedo_miss").count(), 1);
    }
}

#[test]
fn test_point_defense_burns_down_inbound_torpedo() {
    // Launch from 80 km: the whole approach happens inside PD range.
    let (mut sim, attacker, defender) = setup(true, 33);
    sim.inject_command(attacker, Command::LaunchTorpedo { target: defender }).unwrap();

    for _ in 0..600 {
        sim.step();
        if sim.torpedoes_in_flight() == 0 && sim.metrics.torpedoes_launched > 0 {
            break;
        }
    }

    assert!(sim.events.with_label("pd_engaged").count() > 0, "PD never engaged");
    assert!(
        sim.metrics.pd_torpedoes_destroyed + sim.metrics.pd_torpedoes_disabled >= 1,
        "PD never stopped the torpedo"
    );
    assert_eq!(sim.metrics.torpedo_hits, 0);
}

#[test]
fn test_fire_at_range_doctrine_holds_until_close() {
    let config = SimulationConfig { seed: 17, ..Default::default() };
    let mut sim = Simulation::new(config, MaterialTable::builtin()).unwrap();

    let gunship: ShipSpec = toml::from_str(
        r#"
        name = "gunship"
        faction = "red"
        velocity = { x = 2000.0, y = 0.0, z = 0.0 }

        [[weapons]]
        name = "spinal_coilgun"
        "#,
    )
    .unwrap();
    let target: ShipSpec = toml::from_str(
        r#"
        name = "barge"
        faction = "blue"
        position = { x = 1500000.0, y = 0.0, z = 0.0 }
        velocity = { x = -2000.0, y = 0.0, z = 0.0 }
        forward = { x = -1.0, y = 0.0, z = 0.0 }
        "#,
    )
    .unwrap();
    let a = sim.add_ship(&gunship);
    let b = sim.add_ship(&target);

    sim.inject_command(a, Command::SetPrimaryTarget { target: b }).unwrap();
    sim.inject_command(
        a,
        Command::SetManeuver {
            order: ManeuverOrder::Maintain,
            throttle: 0.0,
            duration_s: 0.0,
        },
    )
    .unwrap();
    sim.inject_command(
        a,
        Command::SetWeaponsOrder(WeaponsOrder {
            weapon_slot: None,
            doctrine: WeaponsDoctrine::FireAtRange { max_range_km: 300.0 },
            target: Some(b),
        }),
    )
    .unwrap();

    // Closing at 4 km/s from 1500 km: still outside 300 km after 120 s.
    for _ in 0..120 {
        sim.step();
    }
    assert_eq!(sim.metrics.shots_fired, 0);

    // By t = 330 s the range has dropped inside the doctrine's gate.
    for _ in 0..210 {
        sim.step();
    }
    assert!(sim.metrics.shots_fired > 0);
}
