//! Mobile terminals and their attachment to serving stations.
use crate::channel::{ChannelID, ChannelMap, ChannelRealization, Direction, Tier};
use crate::distribution::SpatialDistribution;
use crate::geometry::Position;
use crate::id::{IDCounter, define_id_getter, insert_unique};
use crate::network::{Network, NodeID};
use crate::random::draw_heading;
use crate::station::{AccessPolicy, RadioNode};
use crate::topology::CellID;
use crate::units::{KilometresPerHour, Radians};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::info;
use rand::Rng;
use strum::Display;

/// The interval between channel quality reports, in TTIs
pub const CQI_REPORTING_INTERVAL: u32 = 1;

/// A map of [`Terminal`]s, keyed by node ID
pub type TerminalMap = IndexMap<NodeID, Terminal>;

/// Channel quality reporting configuration.
///
/// Reports are periodic and cover the full band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CqiReporting {
    /// Reporting interval, in TTIs
    pub interval: u32,
}

impl Default for CqiReporting {
    fn default() -> Self {
        Self {
            interval: CQI_REPORTING_INTERVAL,
        }
    }
}

/// How a terminal moves during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "snake_case")]
pub enum MobilityModel {
    /// The terminal stays where it was placed
    #[default]
    ConstantPosition,
}

/// A mobile terminal
#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    /// Unique identifier, drawn after all cell IDs
    pub id: NodeID,
    /// Initial position
    pub position: Position,
    /// Speed of the terminal
    pub speed: KilometresPerHour,
    /// Direction of travel
    pub heading: Radians,
    /// The station the terminal is attached to
    pub serving_node: NodeID,
    /// The cell the terminal is in
    pub cell_id: CellID,
    /// Whether the terminal is inside a building
    pub indoor: bool,
    /// Channel quality reporting configuration
    pub cqi: CqiReporting,
    /// Mobility model
    pub mobility: MobilityModel,
    /// Whether the terminal may hand over to another station
    pub handover: bool,
    /// Downlink channel of the serving station
    pub dl_channel: ChannelID,
    /// Uplink channel of the serving station
    pub ul_channel: ChannelID,
}
define_id_getter! {Terminal, NodeID}

impl Terminal {
    /// The propagation tier of the terminal's links
    pub fn tier(&self) -> Tier {
        if self.indoor { Tier::Femto } else { Tier::Macro }
    }
}

/// Attach a new terminal to its serving station.
///
/// The terminal is registered with the station, recorded as a device on both of the station's
/// channels, and one realization per direction is added between the two.
fn attach_terminal(
    terminal: Terminal,
    station: &mut RadioNode,
    dl_channels: &mut ChannelMap,
    ul_channels: &mut ChannelMap,
    terminals: &mut TerminalMap,
) -> Result<()> {
    station.register_terminal(terminal.id);

    for direction in [Direction::Downlink, Direction::Uplink] {
        let (channels, channel_id, realization) = match direction {
            Direction::Downlink => (
                &mut *dl_channels,
                station.dl_channel,
                ChannelRealization::new(station.id, terminal.id, terminal.tier()),
            ),
            Direction::Uplink => (
                &mut *ul_channels,
                station.ul_channel,
                ChannelRealization::new(terminal.id, station.id, terminal.tier()),
            ),
        };
        let channel = channels
            .get_mut(&channel_id)
            .with_context(|| format!("No {direction} channel {channel_id} for station"))?;
        channel.add_device(terminal.id);
        channel.propagation_loss.add_realization(realization)?;
    }

    insert_unique(terminals, terminal)
}

/// Places terminals in the macro cells and active femto cells of a network
#[derive(Debug)]
pub struct UserProvisioner<'a, D> {
    distribution: &'a D,
    nb_ue: u32,
    nb_femto_ue: u32,
    speed: KilometresPerHour,
    ids: IDCounter<NodeID>,
}

impl<'a, D: SpatialDistribution> UserProvisioner<'a, D> {
    /// Create a provisioner whose first terminal ID is `first_id`
    pub fn new(
        distribution: &'a D,
        nb_ue: u32,
        nb_femto_ue: u32,
        speed: KilometresPerHour,
        first_id: u32,
    ) -> Self {
        Self {
            distribution,
            nb_ue,
            nb_femto_ue,
            speed,
            ids: IDCounter::starting_at(first_id),
        }
    }

    fn new_terminal(
        &mut self,
        position: Position,
        heading: Radians,
        station: &RadioNode,
        indoor: bool,
    ) -> Terminal {
        Terminal {
            id: self.ids.next_id(),
            position,
            speed: self.speed,
            heading,
            serving_node: station.id,
            cell_id: station.cell_id,
            indoor,
            cqi: CqiReporting::default(),
            mobility: MobilityModel::default(),
            handover: false,
            dl_channel: station.dl_channel,
            ul_channel: station.ul_channel,
        }
    }

    /// Place terminals in every macro cell, then in every active femto cell.
    ///
    /// Within each cell all positions are drawn first, followed by one heading per terminal.
    pub fn provision<R: Rng + ?Sized>(&mut self, rng: &mut R, network: &mut Network) -> Result<()> {
        self.provision_macro_terminals(rng, network)?;
        self.provision_femto_terminals(rng, network)
    }

    fn provision_macro_terminals<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        network: &mut Network,
    ) -> Result<()> {
        let Network {
            topology,
            stations,
            dl_channels,
            ul_channels,
            terminals,
            ..
        } = network;

        for cell in topology.cells.values() {
            let station = stations
                .get_mut(&NodeID(cell.id.0))
                .with_context(|| format!("No station for macro cell {}", cell.id))?;
            let positions = self.distribution.positions_in_cell(rng, cell, self.nb_ue);
            for position in positions {
                let heading = draw_heading(rng);
                let terminal = self.new_terminal(position, heading, station, false);
                info!(
                    "Created UE - id {} position {}, cell {}, target enb {}",
                    terminal.id, terminal.position, terminal.cell_id, station.id
                );
                attach_terminal(terminal, station, dl_channels, ul_channels, terminals)?;
            }
        }

        Ok(())
    }

    fn provision_femto_terminals<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        network: &mut Network,
    ) -> Result<()> {
        let Network {
            topology,
            stations,
            dl_channels,
            ul_channels,
            terminals,
            ..
        } = network;

        for station in stations.values_mut().filter(|station| station.is_home()) {
            let femto_cell = topology
                .femto_cells
                .get(&station.cell_id)
                .with_context(|| format!("No femto cell {} for home station", station.cell_id))?;
            let positions =
                self.distribution
                    .positions_in_femto_cell(rng, femto_cell, self.nb_femto_ue);
            for position in positions {
                let heading = draw_heading(rng);
                let terminal = self.new_terminal(position, heading, station, true);
                info!(
                    "Created UE in femto-cell - id {} position {}, cell {}, target enb {}",
                    terminal.id, terminal.position, terminal.cell_id, station.id
                );

                if let Some(access) = station.home_access_mut() {
                    if access.policy == AccessPolicy::Closed {
                        access.add_subscriber(terminal.id)?;
                    }
                }
                attach_terminal(terminal, station, dl_channels, ul_channels, terminals)?;
            }
        }

        Ok(())
    }
}
