//! Functionality for running a simulation over a constructed network.
use crate::flow::ApplicationID;
use crate::network::Network;
use crate::units::Seconds;
use anyhow::{Context, Result, ensure};
use log::{debug, info};
use serde::Serialize;
use strum::Display;

/// A simulation engine which runs a constructed network until a stop time
pub trait SimulationEngine {
    /// Set the simulated time at which the run ends
    fn set_stop(&mut self, time: Seconds);

    /// Run the network until the stop time
    fn run(&mut self, network: &Network) -> Result<RunSummary>;
}

/// What happens to a flow at an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
enum FlowEventKind {
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FlowEvent {
    time: Seconds,
    kind: FlowEventKind,
    flow_id: ApplicationID,
}

/// Totals for a completed run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    /// The simulated time at which the run ended
    pub stop_time: Seconds,
    /// Number of events handled
    pub events_processed: u32,
    /// Number of flows which started
    pub flows_started: u32,
    /// Number of flows which stopped
    pub flows_stopped: u32,
    /// Number of flows still running when the run ended
    pub flows_active_at_stop: u32,
}

/// Replays the start and stop events of every flow in time order
#[derive(Debug, Default)]
pub struct Simulator {
    stop: Option<Seconds>,
}

impl Simulator {
    /// Create a simulator with no stop time
    pub fn new() -> Self {
        Self::default()
    }
}

/// Collect the start and stop events of every flow, in the order they are handled
fn schedule_flow_events(network: &Network, stop: Seconds) -> Vec<FlowEvent> {
    let mut events: Vec<_> = network
        .flows
        .values()
        .flat_map(|flow| {
            [
                FlowEvent {
                    time: flow.start,
                    kind: FlowEventKind::Start,
                    flow_id: flow.id,
                },
                FlowEvent {
                    time: flow.stop,
                    kind: FlowEventKind::Stop,
                    flow_id: flow.id,
                },
            ]
        })
        .filter(|event| event.time <= stop)
        .collect();

    // Stable, so simultaneous events keep flow creation order
    events.sort_by(|a, b| a.time.value().total_cmp(&b.time.value()));

    events
}

impl SimulationEngine for Simulator {
    fn set_stop(&mut self, time: Seconds) {
        self.stop = Some(time);
    }

    fn run(&mut self, network: &Network) -> Result<RunSummary> {
        let stop_time = self.stop.context("Stop time must be set before running")?;
        ensure!(
            stop_time.is_finite() && stop_time >= Seconds(0.0),
            "Invalid stop time: {stop_time}"
        );

        let mut summary = RunSummary {
            stop_time,
            events_processed: 0,
            flows_started: 0,
            flows_stopped: 0,
            flows_active_at_stop: 0,
        };
        for event in schedule_flow_events(network, stop_time) {
            debug!("{}: flow {} {}", event.time, event.flow_id, event.kind);
            summary.events_processed += 1;
            match event.kind {
                FlowEventKind::Start => summary.flows_started += 1,
                FlowEventKind::Stop => summary.flows_stopped += 1,
            }
        }
        summary.flows_active_at_stop = summary.flows_started - summary.flows_stopped;

        Ok(summary)
    }
}

/// Run the network for the scenario duration.
///
/// # Arguments
///
/// * `network` - The network to run
/// * `engine` - The simulation engine
/// * `duration` - The total simulated time
pub fn run<E: SimulationEngine>(
    network: &Network,
    engine: &mut E,
    duration: Seconds,
) -> Result<RunSummary> {
    engine.set_stop(duration);
    info!("Running simulation until {duration}");
    let summary = engine.run(network)?;
    info!(
        "Simulation stopped at {}: {} flow(s) started, {} stopped",
        summary.stop_time, summary.flows_started, summary.flows_stopped
    );

    Ok(summary)
}
