//! Ironkeel - deterministic physics-and-combat kernel for spacecraft duels

pub mod combat;
pub mod core;
pub mod data;
pub mod defense;
pub mod munitions;
pub mod physics;
pub mod power;
pub mod simulation;
pub mod targeting;
pub mod thermal;
