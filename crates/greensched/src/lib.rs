#![doc = include_str!("../readme.md")]

pub mod core;
pub mod experiment;
pub mod extensions;
pub mod log;
pub mod simulation;

pub use colored;
pub use simulation::ClusterSimulation;
