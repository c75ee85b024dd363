//! Seeding of the pseudo-random source used while constructing a scenario.
//!
//! A single generator is created once per scenario and passed explicitly to every construction
//! stage. Stages draw from it in a fixed order (building positions, femto activation, then
//! terminal positions and headings), so the same seed always yields the same network.
use crate::units::Radians;
use chrono::Utc;
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// The pseudo-random generator threaded through scenario construction
pub type ScenarioRng = ChaCha8Rng;

/// The seed a scenario was actually constructed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum ResolvedSeed {
    /// Taken from the scenario parameters
    Configured(u64),
    /// Taken from the wall clock because the configured seed was negative
    WallClock(u64),
}

impl ResolvedSeed {
    /// The numeric seed
    pub fn value(self) -> u64 {
        match self {
            Self::Configured(seed) | Self::WallClock(seed) => seed,
        }
    }
}

/// Resolve the configured seed, falling back on the wall clock for negative values
pub fn resolve_seed(seed: i64) -> ResolvedSeed {
    match u64::try_from(seed) {
        Ok(seed) => ResolvedSeed::Configured(seed),
        Err(_) => ResolvedSeed::WallClock(Utc::now().timestamp().unsigned_abs()),
    }
}

/// Create the scenario generator for the configured seed
pub fn seed_rng(seed: i64) -> (ScenarioRng, ResolvedSeed) {
    let resolved = resolve_seed(seed);
    match resolved {
        ResolvedSeed::Configured(value) => info!("Simulation with SEED = {value}"),
        ResolvedSeed::WallClock(value) => {
            info!("Simulation with SEED = {seed} (wall clock seed {value})");
        }
    }

    (ScenarioRng::seed_from_u64(resolved.value()), resolved)
}

/// Draw a value uniformly from `[0, 1)`
pub fn draw_unit<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.r#gen::<f64>()
}

/// Draw a heading as a whole number of degrees in `[0, 360)`, expressed in radians
pub fn draw_heading<R: Rng + ?Sized>(rng: &mut R) -> Radians {
    Radians::from_degrees(rng.gen_range(0..360))
}
