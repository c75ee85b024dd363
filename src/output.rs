//! The module responsible for writing output data to disk.
use crate::channel::{ChannelID, Direction};
use crate::flow::{ApplicationFlow, ApplicationID, FlowKind};
use crate::network::{Network, NodeID};
use crate::simulation::RunSummary;
use crate::spectrum::SpectrumBlockID;
use crate::station::{RadioNode, StationKind};
use crate::terminal::Terminal;
use crate::topology::{BuildingID, CellID};
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which scenario-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "femtosim_results";

/// The output file name for macro cells
const CELLS_FILE_NAME: &str = "cells.csv";

/// The output file name for buildings
const BUILDINGS_FILE_NAME: &str = "buildings.csv";

/// The output file name for stations
const STATIONS_FILE_NAME: &str = "stations.csv";

/// The output file name for terminals
const TERMINALS_FILE_NAME: &str = "terminals.csv";

/// The output file name for application flows
const FLOWS_FILE_NAME: &str = "flows.csv";

/// The output file name for channel realizations
const CHANNEL_REALIZATIONS_FILE_NAME: &str = "channel_realizations.csv";

/// The output file name for the run summary
const SIMULATION_FILE_NAME: &str = "simulation.csv";

/// Get the scenario name from the specified directory path
pub fn get_output_dir(scenario_dir: &Path) -> Result<PathBuf> {
    // Get the scenario name from the dir path. This ends up being convoluted because we need to
    // check for all possible errors. Ugh.
    let scenario_dir = scenario_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to scenario")?;

    let scenario_name = scenario_dir
        .file_name()
        .context("Scenario cannot be in root folder")?
        .to_str()
        .context("Invalid chars in scenario dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, scenario_name].iter().collect())
}

/// Create a new output directory, removing any existing non-empty one if allowed.
///
/// # Returns
///
/// Whether an existing directory was overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut entries) = fs::read_dir(output_dir) {
        if entries.next().is_none() {
            // Already exists and is empty
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass the \
            --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the cells CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CellRow {
    cell_id: CellID,
    x: f64,
    y: f64,
    radius: f64,
    min_distance: f64,
}

/// Represents a row in the buildings CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct BuildingRow {
    building_id: BuildingID,
    building_type: String,
    floors: u32,
    x: f64,
    y: f64,
    first_femto_cell: CellID,
    femto_cell_count: u32,
}

/// Represents a row in the stations CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct StationRow {
    node_id: NodeID,
    cell_id: CellID,
    kind: String,
    x: f64,
    y: f64,
    scheduler: String,
    spectrum_block: SpectrumBlockID,
    dl_channel: ChannelID,
    ul_channel: ChannelID,
    access_policy: Option<String>,
    restricted_access: Option<bool>,
    subscribers: Option<usize>,
    registered_terminals: usize,
}

impl StationRow {
    fn new(station: &RadioNode) -> Self {
        let (kind, access) = match &station.kind {
            StationKind::Macro => ("macro", None),
            StationKind::Home(access) => ("home", Some(access)),
        };
        Self {
            node_id: station.id,
            cell_id: station.cell_id,
            kind: kind.into(),
            x: station.position.x,
            y: station.position.y,
            scheduler: station.scheduler.to_string(),
            spectrum_block: station.spectrum(),
            dl_channel: station.dl_channel,
            ul_channel: station.ul_channel,
            access_policy: access.map(|access| access.policy.to_string()),
            restricted_access: access.map(|access| access.is_restricted()),
            subscribers: access.map(|access| access.iter_subscribers().count()),
            registered_terminals: station.iter_registered_terminals().count(),
        }
    }
}

/// Represents a row in the terminals CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TerminalRow {
    node_id: NodeID,
    cell_id: CellID,
    serving_node: NodeID,
    x: f64,
    y: f64,
    speed: f64,
    heading: f64,
    indoor: bool,
    cqi_interval: u32,
    mobility: String,
    handover: bool,
}

impl TerminalRow {
    fn new(terminal: &Terminal) -> Self {
        Self {
            node_id: terminal.id,
            cell_id: terminal.cell_id,
            serving_node: terminal.serving_node,
            x: terminal.position.x,
            y: terminal.position.y,
            speed: terminal.speed.value(),
            heading: terminal.heading.value(),
            indoor: terminal.indoor,
            cqi_interval: terminal.cqi.interval,
            mobility: terminal.mobility.to_string(),
            handover: terminal.handover,
        }
    }
}

/// Represents a row in the flows CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FlowRow {
    application_id: ApplicationID,
    kind: String,
    source: NodeID,
    destination: NodeID,
    start: f64,
    stop: f64,
    qos: String,
    max_delay: Option<f64>,
    fls_coefficients: Option<u32>,
    protocol: String,
    source_port: u16,
    destination_port: u16,
    trace_file: Option<String>,
    cbr_interval: Option<f64>,
    cbr_packet_size: Option<u32>,
}

impl FlowRow {
    fn new(flow: &ApplicationFlow) -> Self {
        let (trace_file, cbr_interval, cbr_packet_size) = match &flow.kind {
            FlowKind::Video { trace_file } => {
                (Some(trace_file.to_string_lossy().into_owned()), None, None)
            }
            FlowKind::Cbr {
                interval,
                packet_size,
            } => (None, Some(interval.value()), Some(*packet_size)),
            FlowKind::VoIP | FlowKind::BestEffort => (None, None, None),
        };
        Self {
            application_id: flow.id,
            kind: flow.kind.to_string(),
            source: flow.source,
            destination: flow.destination,
            start: flow.start.value(),
            stop: flow.stop.value(),
            qos: flow.qos.to_string(),
            max_delay: flow.qos.max_delay().map(|delay| delay.value()),
            fls_coefficients: flow.qos.coefficient_count(),
            protocol: flow.classifier.protocol.to_string(),
            source_port: flow.classifier.source_port,
            destination_port: flow.classifier.destination_port,
            trace_file,
            cbr_interval,
            cbr_packet_size,
        }
    }
}

/// Represents a row in the channel realizations CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ChannelRealizationRow {
    channel_id: ChannelID,
    direction: String,
    transmitter: NodeID,
    receiver: NodeID,
    tier: String,
}

/// Write rows to a new CSV file
fn write_rows<T, I>(file_path: &Path, rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// An object for writing a network and its run to CSV files
pub struct DataWriter {
    output_path: PathBuf,
    debug_channels: bool,
}

impl DataWriter {
    /// Create a writer for the given output folder
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `debug_channels` - Whether to also write channel realizations
    pub fn create(output_path: &Path, debug_channels: bool) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            debug_channels,
        }
    }

    /// Write every entity of the network, in creation order
    pub fn write_network(&self, network: &Network) -> Result<()> {
        write_rows(
            &self.output_path.join(CELLS_FILE_NAME),
            network.topology.cells.values().map(|cell| CellRow {
                cell_id: cell.id,
                x: cell.centre.x,
                y: cell.centre.y,
                radius: cell.radius.value(),
                min_distance: cell.min_distance.value(),
            }),
        )?;
        write_rows(
            &self.output_path.join(BUILDINGS_FILE_NAME),
            network
                .topology
                .buildings
                .values()
                .map(|building| BuildingRow {
                    building_id: building.id,
                    building_type: building.building_type.to_string(),
                    floors: building.floors,
                    x: building.centre.x,
                    y: building.centre.y,
                    first_femto_cell: building.first_femto_cell,
                    femto_cell_count: building.femto_cell_count,
                }),
        )?;
        write_rows(
            &self.output_path.join(STATIONS_FILE_NAME),
            network.stations.values().map(StationRow::new),
        )?;
        write_rows(
            &self.output_path.join(TERMINALS_FILE_NAME),
            network.terminals.values().map(TerminalRow::new),
        )?;
        write_rows(
            &self.output_path.join(FLOWS_FILE_NAME),
            network.flows.values().map(FlowRow::new),
        )?;

        if self.debug_channels {
            self.write_channel_realizations(network)?;
        }

        Ok(())
    }

    fn write_channel_realizations(&self, network: &Network) -> Result<()> {
        let rows = [
            (Direction::Downlink, &network.dl_channels),
            (Direction::Uplink, &network.ul_channels),
        ]
        .into_iter()
        .flat_map(|(direction, channels)| {
            channels.values().flat_map(move |channel| {
                channel
                    .propagation_loss
                    .iter()
                    .map(move |realization| ChannelRealizationRow {
                        channel_id: channel.id,
                        direction: direction.to_string(),
                        transmitter: realization.transmitter,
                        receiver: realization.receiver,
                        tier: realization.tier.to_string(),
                    })
            })
        });

        write_rows(&self.output_path.join(CHANNEL_REALIZATIONS_FILE_NAME), rows)
    }

    /// Write the summary of a completed run
    pub fn write_summary(&self, summary: &RunSummary) -> Result<()> {
        write_rows(
            &self.output_path.join(SIMULATION_FILE_NAME),
            std::iter::once(summary),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_network;
    use crate::fixture::scenario_parameters;
    use crate::scenario::ScenarioParameters;
    use rstest::rstest;
    use serde::de::DeserializeOwned;
    use tempfile::tempdir;

    fn read_rows<T: DeserializeOwned>(file_path: &Path) -> Vec<T> {
        csv::Reader::from_path(file_path)
            .unwrap()
            .into_deserialize()
            .map(Result::unwrap)
            .collect()
    }

    #[test]
    fn test_create_output_directory_new() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());
    }

    #[rstest]
    #[case(false, false)]
    #[case(true, true)]
    fn test_create_output_directory_existing(#[case] allow_overwrite: bool, #[case] ok: bool) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cells.csv"), "old").unwrap();

        let result = create_output_directory(dir.path(), allow_overwrite);
        assert_eq!(result.is_ok(), ok);
        if ok {
            assert!(result.unwrap());
            assert!(!dir.path().join("cells.csv").exists());
        }
    }

    #[test]
    fn test_create_output_directory_empty() {
        let dir = tempdir().unwrap();
        assert!(!create_output_directory(dir.path(), false).unwrap());
    }

    #[rstest]
    fn test_write_network(scenario_parameters: ScenarioParameters) {
        let network = build_network(&scenario_parameters).unwrap();
        let dir = tempdir().unwrap();
        DataWriter::create(dir.path(), false)
            .write_network(&network)
            .unwrap();

        let stations: Vec<StationRow> = read_rows(&dir.path().join(STATIONS_FILE_NAME));
        assert_eq!(stations.len(), network.stations.len());
        assert_eq!(stations[0].kind, "macro");
        assert_eq!(stations[0].access_policy, None);
        assert_eq!(stations[1].kind, "home");
        assert_eq!(stations[1].subscribers, Some(1));

        let terminals: Vec<TerminalRow> = read_rows(&dir.path().join(TERMINALS_FILE_NAME));
        assert_eq!(terminals.len(), network.terminals.len());

        let flows: Vec<FlowRow> = read_rows(&dir.path().join(FLOWS_FILE_NAME));
        assert_eq!(flows.len(), network.flows.len());
        assert_eq!(flows[0].destination_port, 101);
        assert_eq!(
            flows[1].trace_file.as_deref(),
            Some("traces/foreman_H264_128k.dat")
        );
        assert_eq!(flows[3].cbr_packet_size, Some(5));

        assert!(!dir.path().join(CHANNEL_REALIZATIONS_FILE_NAME).exists());
    }

    #[rstest]
    fn test_write_channel_realizations(scenario_parameters: ScenarioParameters) {
        let network = build_network(&scenario_parameters).unwrap();
        let dir = tempdir().unwrap();
        DataWriter::create(dir.path(), true)
            .write_network(&network)
            .unwrap();

        let rows: Vec<ChannelRealizationRow> =
            read_rows(&dir.path().join(CHANNEL_REALIZATIONS_FILE_NAME));
        assert_eq!(rows.len(), 2 * network.terminals.len());
        assert_eq!(rows[0].direction, "downlink");
        assert_eq!(rows[0].tier, "macro");
        assert_eq!(rows.last().unwrap().direction, "uplink");
    }
}
