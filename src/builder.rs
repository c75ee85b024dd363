//! Construction of a network from scenario parameters.
//!
//! Stages run strictly in order, each one consuming what the previous ones produced: topology,
//! spectrum, channels, stations, terminals and finally flows.
use crate::channel::create_channels;
use crate::distribution::{SpatialDistribution, UniformDistribution};
use crate::flow::{FlowMap, FlowProvisioner};
use crate::network::{Gateway, Network, NodeID};
use crate::random::{ResolvedSeed, seed_rng};
use crate::scenario::{FrameConfiguration, ScenarioParameters};
use crate::spectrum::{ClusterReuse, REUSE_CLUSTER_SIZE, TOTAL_BANDWIDTH, allocate_spectrum};
use crate::station::StationFactory;
use crate::terminal::{TerminalMap, UserProvisioner};
use crate::topology::create_topology;
use anyhow::{Context, Result};
use log::info;
use rand::Rng;

/// Build the network for a scenario, seeding the random source from its parameters
pub fn build_network(params: &ScenarioParameters) -> Result<Network> {
    let (mut rng, seed) = seed_rng(params.seed);
    build_network_with_rng(params, &mut rng, seed, &UniformDistribution)
}

/// Build the network for a scenario, drawing from the supplied random source.
///
/// # Arguments
///
/// * `params` - The scenario parameters
/// * `rng` - The random source, used for nothing else during construction
/// * `seed` - The seed `rng` was created from, recorded on the network
/// * `distribution` - Places buildings and terminals
pub fn build_network_with_rng<R, D>(
    params: &ScenarioParameters,
    rng: &mut R,
    seed: ResolvedSeed,
    distribution: &D,
) -> Result<Network>
where
    R: Rng + ?Sized,
    D: SpatialDistribution,
{
    params.validate().context("Invalid scenario parameters")?;
    let totals = params.totals()?;
    let scheduler = params.scheduler();
    let frame = FrameConfiguration::new(params.frame_structure());
    info!(
        "Scenario with {} macro cell(s), {} femto cell slot(s) and up to {} terminal(s)",
        totals.nb_cell, totals.nb_femto_cells, totals.total_nb_ue
    );

    let topology = create_topology(
        rng,
        distribution,
        totals.nb_cell,
        params.radius,
        params.nb_buildings,
        params.building_type()?,
    )
    .context("Failed to create topology")?;

    let spectrum = allocate_spectrum(
        &ClusterReuse,
        totals.nb_cell,
        REUSE_CLUSTER_SIZE,
        TOTAL_BANDWIDTH,
    )
    .context("Failed to allocate spectrum")?;

    let (dl_channels, mut ul_channels) = create_channels(totals.total_nb_cell);

    let factory = StationFactory {
        scheduler,
        access_policy: params.access_policy()?,
        spectrum: &spectrum,
    };
    let mut stations = factory.create_macro_stations(&topology.cells, &mut ul_channels)?;
    factory.create_home_stations(
        rng,
        &topology.femto_cells,
        params.activity_ratio,
        &mut ul_channels,
        &mut stations,
    )?;

    let gateway = Gateway {
        id: NodeID(totals.total_nb_cell + totals.total_nb_ue),
    };

    let mut network = Network {
        seed,
        totals,
        scheduler,
        frame,
        topology,
        spectrum,
        dl_channels,
        ul_channels,
        stations,
        terminals: TerminalMap::new(),
        gateway,
        flows: FlowMap::new(),
    };

    UserProvisioner::new(
        distribution,
        params.nb_ue,
        params.nb_femto_ue,
        params.speed,
        totals.total_nb_cell,
    )
    .provision(rng, &mut network)
    .context("Failed to provision terminals")?;

    network.flows = FlowProvisioner::new(
        scheduler,
        params.max_delay,
        params.video_bit_rate(),
        params.flow_counts(),
    )
    .provision(&network.terminals, &network.stations, &network.gateway)
    .context("Failed to provision flows")?;

    network.check_consistency()?;
    info!(
        "Built network with {} station(s), {} terminal(s) and {} flow(s)",
        network.stations.len(),
        network.terminals.len(),
        network.flows.len()
    );

    Ok(network)
}
