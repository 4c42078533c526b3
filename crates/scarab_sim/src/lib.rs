//! # scarab_sim
//!
//! Configuration and the [`Simulation`] run loop that ties the Clock,
//! Event Queue, Event Router, Control Server, and Event Logger together
//! (spec §4.6).

pub mod config;
pub mod simulation;

pub use config::{ConfigError, EventLoggerConfig, SimulationConfig};
pub use simulation::Simulation;
