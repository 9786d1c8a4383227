#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless driver for Tile Defence sessions.
//!
//! [`Scenario`] describes a session in TOML; [`Simulation`] steps the world
//! and every system in frame order and tallies the outcome.

mod scenario;
mod simulation;

pub use scenario::{Scenario, TowerPlan};
pub use simulation::{Simulation, Summary};
