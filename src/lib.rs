//! Common functionality for femtosim.
//!
//! The library builds a macro/femto cellular network scenario from a small set of parameters and
//! hands the resulting network to a discrete-event simulator.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod builder;
pub mod channel;
pub mod cli;
pub mod distribution;
pub mod flow;
pub mod geometry;
pub mod id;
pub mod input;
pub mod log;
pub mod network;
pub mod output;
pub mod qos;
pub mod random;
pub mod scenario;
pub mod scheduler;
pub mod settings;
pub mod simulation;
pub mod spectrum;
pub mod station;
pub mod terminal;
pub mod topology;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the path to the femtosim configuration directory
pub fn get_femtosim_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("femtosim");

    path
}
