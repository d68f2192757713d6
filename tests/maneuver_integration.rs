//! Maneuver-order integration tests: brake, heading, padlock

use ironkeel::core::config::SimulationConfig;
use ironkeel::core::types::{ShipId, Vec3};
use ironkeel::data::materials::MaterialTable;
use ironkeel::simulation::commands::{Command, ManeuverOrder};
use ironkeel::simulation::runner::Simulation;
use ironkeel::simulation::ship::ShipSpec;

fn ship(name: &str, faction: &str, position: Vec3, velocity: Vec3) -> ShipSpec {
    toml::from_str(&format!(
        r#"
        name = "{name}"
        faction = "{faction}"
        position = {{ x = {px}, y = {py}, z = {pz} }}
        velocity = {{ x = {vx}, y = {vy}, z = {vz} }}
        "#,
        name = name,
        faction = faction,
        px = position.x,
        py = position.y,
        pz = position.z,
        vx = velocity.x,
        vy = velocity.y,
        vz = velocity.z,
    ))
    .unwrap()
}

fn solo(spec: &ShipSpec) -> (Simulation, ShipId, ShipId) {
    let mut sim =
        Simulation::new(SimulationConfig::default(), MaterialTable::builtin()).unwrap();
    let a = sim.add_ship(spec);
    // A distant bystander keeps two factions alive so the battle-end check
    // never trips.
    let b = sim.add_ship(&ship(
        "bystander",
        "blue",
        Vec3::new(0.0, 1.0e8, 0.0),
        Vec3::zero(),
    ));
    (sim, a, b)
}

#[test]
fn test_brake_flips_and_decelerates() {
    let spec = ship("runner", "red", Vec3::zero(), Vec3::new(1000.0, 0.0, 0.0));
    let (mut sim, a, _) = solo(&spec);
    sim.inject_command(
        a,
        Command::SetManeuver {
            order: ManeuverOrder::Brake,
            throttle: 1.0,
            duration_s: 0.0,
        },
    )
    .unwrap();

    for _ in 0..300 {
        sim.step();
    }

    let speed = sim.ship(a).unwrap().velocity().magnitude();
    assert!(speed < 700.0, "brake barely slowed the ship: {speed} m/s");
    // The hull ends up pointing retrograde.
    let forward = sim.ship(a).unwrap().forward();
    assert!(forward.x < 0.0);
}

#[test]
fn test_heading_order_rotates_on_rcs_without_thrust() {
    let spec = ship("turner", "red", Vec3::zero(), Vec3::zero());
    let (mut sim, a, _) = solo(&spec);
    sim.inject_command(
        a,
        Command::SetManeuver {
            order: ManeuverOrder::Heading { direction: Vec3::unit_y() },
            throttle: 0.0,
            duration_s: 0.0,
        },
    )
    .unwrap();

    for _ in 0..200 {
        sim.step();
    }

    let state = sim.ship(a).unwrap();
    assert!(state.forward().y > 0.99, "hull never came about: {:?}", state.forward());
    assert_eq!(state.velocity(), Vec3::zero());
    // RCS turns cost no propellant.
    assert_eq!(state.kinematics.propellant_kg, state.kinematics.drive.propellant_kg);
}

#[test]
fn test_padlock_tracks_without_closing() {
    let spec = ship("sentinel", "red", Vec3::zero(), Vec3::zero());
    let (mut sim, a, b) = solo(&spec);
    sim.inject_command(a, Command::SetPrimaryTarget { target: b }).unwrap();
    sim.inject_command(
        a,
        Command::SetManeuver {
            order: ManeuverOrder::Padlock { target: b },
            throttle: 1.0,
            duration_s: 0.0,
        },
    )
    .unwrap();

    for _ in 0..200 {
        sim.step();
    }

    let state = sim.ship(a).unwrap();
    // Nose on the target, but no burn even at full commanded throttle.
    assert!(state.forward().y > 0.99, "padlock never tracked: {:?}", state.forward());
    assert_eq!(state.velocity(), Vec3::zero());
}

#[test]
fn test_timed_maneuver_completes() {
    let spec = ship("sprinter", "red", Vec3::zero(), Vec3::zero());
    let (mut sim, a, _) = solo(&spec);
    sim.inject_command(
        a,
        Command::SetManeuver {
            order: ManeuverOrder::Heading { direction: Vec3::unit_x() },
            throttle: 1.0,
            duration_s: 20.0,
        },
    )
    .unwrap();

    for _ in 0..30 {
        sim.step();
    }

    assert!(sim.ship(a).unwrap().maneuver.is_none());
    assert_eq!(sim.events.with_label("maneuver_completed").count(), 1);
}
