//! The registry holding every entity of a constructed scenario.
//!
//! Entities are stored in maps keyed by their IDs and refer to one another by ID only.
use crate::channel::{ChannelMap, Direction};
use crate::flow::FlowMap;
use crate::id::define_id_type;
use crate::random::ResolvedSeed;
use crate::scenario::{FrameConfiguration, ScenarioTotals};
use crate::scheduler::SchedulerType;
use crate::spectrum::SpectrumAllocation;
use crate::station::{RadioNode, StationMap};
use crate::terminal::{Terminal, TerminalMap};
use crate::topology::Topology;
use anyhow::{Context, Result, ensure};

define_id_type! {NodeID}

/// The node every application flow originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gateway {
    /// Unique identifier for the gateway
    pub id: NodeID,
}

/// A fully constructed scenario
#[derive(Debug)]
pub struct Network {
    /// The seed the scenario was constructed with
    pub seed: ResolvedSeed,
    /// Entity counts fixed when construction started
    pub totals: ScenarioTotals,
    /// The downlink scheduler used by every station
    pub scheduler: SchedulerType,
    /// The requested and applied frame structure
    pub frame: FrameConfiguration,
    /// Cells, buildings and femto cells
    pub topology: Topology,
    /// Spectrum blocks and their assignment
    pub spectrum: SpectrumAllocation,
    /// Downlink channels, one per cell slot
    pub dl_channels: ChannelMap,
    /// Uplink channels, one per cell slot
    pub ul_channels: ChannelMap,
    /// Macro and home stations, in creation order
    pub stations: StationMap,
    /// Terminals, in creation order
    pub terminals: TerminalMap,
    /// The source of every flow
    pub gateway: Gateway,
    /// Application flows, in creation order
    pub flows: FlowMap,
}

impl Network {
    /// Iterate over macro stations
    pub fn iter_macro_stations(&self) -> impl Iterator<Item = &RadioNode> {
        self.stations.values().filter(|station| !station.is_home())
    }

    /// Iterate over home stations
    pub fn iter_home_stations(&self) -> impl Iterator<Item = &RadioNode> {
        self.stations.values().filter(|station| station.is_home())
    }

    /// The station serving the given terminal
    pub fn serving_station(&self, terminal: &Terminal) -> Result<&RadioNode> {
        self.stations
            .get(&terminal.serving_node)
            .with_context(|| format!("Terminal {} has no serving station", terminal.id))
    }

    /// Check the relationships between entities hold.
    ///
    /// Each terminal must be registered with a station serving the terminal's cell, and must have
    /// exactly one downlink and one uplink realization with that station.
    pub fn check_consistency(&self) -> Result<()> {
        for terminal in self.terminals.values() {
            let station = self.serving_station(terminal)?;
            ensure!(
                station.cell_id == terminal.cell_id,
                "Terminal {} is in cell {} but its station serves cell {}",
                terminal.id,
                terminal.cell_id,
                station.cell_id
            );
            ensure!(
                station.iter_registered_terminals().any(|id| id == terminal.id),
                "Terminal {} is not registered with station {}",
                terminal.id,
                station.id
            );

            for direction in [Direction::Downlink, Direction::Uplink] {
                let (channels, transmitter, receiver, channel_id) = match direction {
                    Direction::Downlink => {
                        (&self.dl_channels, station.id, terminal.id, station.dl_channel)
                    }
                    Direction::Uplink => {
                        (&self.ul_channels, terminal.id, station.id, station.ul_channel)
                    }
                };
                let channel = channels
                    .get(&channel_id)
                    .with_context(|| format!("Missing {direction} channel {channel_id}"))?;
                ensure!(
                    channel
                        .propagation_loss
                        .get(transmitter, receiver)
                        .is_some(),
                    "Missing {direction} realization between station {} and terminal {}",
                    station.id,
                    terminal.id
                );
            }
        }

        Ok(())
    }
}
