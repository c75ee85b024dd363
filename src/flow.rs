//! Application flows from the gateway to each terminal.
use crate::id::{IDCounter, define_id_getter, define_id_type, insert_unique};
use crate::network::{Gateway, NodeID};
use crate::qos::QosParameters;
use crate::scheduler::SchedulerType;
use crate::station::StationMap;
use crate::terminal::TerminalMap;
use crate::units::Seconds;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::fmt;
use std::path::PathBuf;
use strum::Display;

define_id_type! {ApplicationID}

/// A map of [`ApplicationFlow`]s, keyed by application ID
pub type FlowMap = IndexMap<ApplicationID, ApplicationFlow>;

/// The time at which every flow starts
pub const FLOW_START: Seconds = Seconds::new(0.1);

/// How long each flow lasts
pub const FLOW_DURATION: Seconds = Seconds::new(20.0);

/// The interval between CBR packets
pub const CBR_INTERVAL: Seconds = Seconds::new(0.04);

/// The size of a CBR packet, in bytes
pub const CBR_PACKET_SIZE: u32 = 5;

/// The destination port of the first flow
pub const FIRST_DESTINATION_PORT: u16 = 101;

/// The directory holding video traces
const VIDEO_TRACE_DIR: &str = "traces";

/// Bit rates for which a video trace is available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum VideoBitRate {
    /// 128 kbps
    #[default]
    #[strum(to_string = "128")]
    Kbps128,
    /// 242 kbps
    #[strum(to_string = "242")]
    Kbps242,
    /// 440 kbps
    #[strum(to_string = "440")]
    Kbps440,
}

impl VideoBitRate {
    /// Convert the bit rate used in scenario files, in kbps.
    ///
    /// Unknown rates fall back on 128 kbps.
    pub fn from_selector(selector: i64) -> Self {
        match selector {
            128 => Self::Kbps128,
            242 => Self::Kbps242,
            440 => Self::Kbps440,
            other => {
                warn!("No video trace for a bit rate of {other} kbps: using 128 kbps");
                Self::Kbps128
            }
        }
    }

    /// Path of the trace file for this bit rate
    pub fn trace_file(self) -> PathBuf {
        PathBuf::from(VIDEO_TRACE_DIR).join(format!("foreman_H264_{self}k.dat"))
    }
}

/// Transport protocol matched by a classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TransportProtocol {
    /// User Datagram Protocol
    Udp,
}

/// The packet-matching key identifying a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierKey {
    /// Sending node
    pub source: NodeID,
    /// Receiving node
    pub destination: NodeID,
    /// Source port
    pub source_port: u16,
    /// Destination port, unique per flow
    pub destination_port: u16,
    /// Transport protocol
    pub protocol: TransportProtocol,
}

/// Traffic generated by a flow
#[derive(Debug, Clone, PartialEq, Display)]
pub enum FlowKind {
    /// Voice over IP
    #[strum(to_string = "VoIP")]
    VoIP,
    /// Video streamed from a trace file
    #[strum(to_string = "Video")]
    Video {
        /// Trace file describing the frames
        trace_file: PathBuf,
    },
    /// Infinite buffer, best effort
    #[strum(to_string = "BE")]
    BestEffort,
    /// Constant bit rate
    #[strum(to_string = "CBR")]
    Cbr {
        /// Interval between packets
        interval: Seconds,
        /// Packet size, in bytes
        packet_size: u32,
    },
}

/// The number of flows of each kind created for every terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowCounts {
    /// VoIP flows
    pub voip: u32,
    /// Video flows
    pub video: u32,
    /// Best effort flows
    pub best_effort: u32,
    /// CBR flows
    pub cbr: u32,
}

impl FlowCounts {
    /// The number of flows per terminal.
    ///
    /// Fails if the total does not fit in a `u32`.
    pub fn per_terminal(&self) -> Result<u32> {
        self.voip
            .checked_add(self.video)
            .and_then(|count| count.checked_add(self.best_effort))
            .and_then(|count| count.checked_add(self.cbr))
            .context("Scenario is too large: flow counts per terminal overflow")
    }
}

/// A unidirectional application flow from the gateway to a terminal
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationFlow {
    /// Unique identifier for the flow
    pub id: ApplicationID,
    /// Type of traffic
    pub kind: FlowKind,
    /// Sending node
    pub source: NodeID,
    /// Receiving terminal
    pub destination: NodeID,
    /// Start time
    pub start: Seconds,
    /// Stop time
    pub stop: Seconds,
    /// QoS parameters
    pub qos: QosParameters,
    /// Packet classifier
    pub classifier: ClassifierKey,
}
define_id_getter! {ApplicationFlow, ApplicationID}

impl fmt::Display for ApplicationFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} application, id {}, src {}, dst {}, port {}, start {}, stop {}, qos {}",
            self.kind,
            self.id,
            self.source,
            self.destination,
            self.classifier.destination_port,
            self.start,
            self.stop,
            self.qos
        )
    }
}

/// Hands out destination ports in increasing order
#[derive(Debug)]
struct PortAllocator {
    next: Option<u16>,
}

impl PortAllocator {
    fn starting_at(first: u16) -> Self {
        Self { next: Some(first) }
    }

    fn allocate(&mut self) -> Result<u16> {
        let port = self.next.context("Destination port range exhausted")?;
        self.next = port.checked_add(1);

        Ok(port)
    }
}

/// Creates the flows for every terminal of a network
#[derive(Debug)]
pub struct FlowProvisioner {
    scheduler: SchedulerType,
    max_delay: Seconds,
    video_bit_rate: VideoBitRate,
    counts: FlowCounts,
    ids: IDCounter<ApplicationID>,
    ports: PortAllocator,
}

impl FlowProvisioner {
    /// Create a provisioner with application IDs from zero and ports from
    /// [`FIRST_DESTINATION_PORT`]
    pub fn new(
        scheduler: SchedulerType,
        max_delay: Seconds,
        video_bit_rate: VideoBitRate,
        counts: FlowCounts,
    ) -> Self {
        Self {
            scheduler,
            max_delay,
            video_bit_rate,
            counts,
            ids: IDCounter::starting_at(0),
            ports: PortAllocator::starting_at(FIRST_DESTINATION_PORT),
        }
    }

    fn qos_for(&self, kind: &FlowKind) -> Result<QosParameters> {
        match kind {
            FlowKind::VoIP | FlowKind::Video { .. } => {
                QosParameters::for_scheduler(self.scheduler, self.max_delay)
            }
            FlowKind::BestEffort => Ok(QosParameters::base()),
            FlowKind::Cbr { .. } => Ok(QosParameters::base_with_delay(self.max_delay)),
        }
    }

    fn create_flow(
        &mut self,
        kind: FlowKind,
        gateway: &Gateway,
        destination: NodeID,
    ) -> Result<ApplicationFlow> {
        let qos = self.qos_for(&kind)?;
        let destination_port = self.ports.allocate()?;
        let flow = ApplicationFlow {
            id: self.ids.next_id(),
            kind,
            source: gateway.id,
            destination,
            start: FLOW_START,
            stop: FLOW_START + FLOW_DURATION,
            qos,
            classifier: ClassifierKey {
                source: gateway.id,
                destination,
                source_port: 0,
                destination_port,
                protocol: TransportProtocol::Udp,
            },
        };
        debug!("Created {flow}");

        Ok(flow)
    }

    /// Create the flows of every terminal, in terminal creation order.
    ///
    /// For each terminal, VoIP flows are created first, followed by video, best effort and CBR
    /// flows. Terminals of closed-access home stations must already be subscribers.
    pub fn provision(
        &mut self,
        terminals: &TerminalMap,
        stations: &StationMap,
        gateway: &Gateway,
    ) -> Result<FlowMap> {
        info!(
            "Creating {} flow(s) for each of {} terminal(s)",
            self.counts.per_terminal()?,
            terminals.len()
        );
        let mut flows = FlowMap::new();
        for terminal in terminals.values() {
            let station = stations
                .get(&terminal.serving_node)
                .with_context(|| format!("Terminal {} has no serving station", terminal.id))?;
            if let Some(access) = station.home_access() {
                ensure!(
                    access.admits(terminal.id),
                    "Terminal {} is not admitted by home station {}",
                    terminal.id,
                    station.id
                );
            }

            let kinds = [
                (self.counts.voip, FlowKind::VoIP),
                (
                    self.counts.video,
                    FlowKind::Video {
                        trace_file: self.video_bit_rate.trace_file(),
                    },
                ),
                (self.counts.best_effort, FlowKind::BestEffort),
                (
                    self.counts.cbr,
                    FlowKind::Cbr {
                        interval: CBR_INTERVAL,
                        packet_size: CBR_PACKET_SIZE,
                    },
                ),
            ];
            for (count, kind) in kinds {
                for _ in 0..count {
                    let flow = self.create_flow(kind.clone(), gateway, terminal.id)?;
                    insert_unique(&mut flows, flow)?;
                }
            }
        }

        Ok(flows)
    }
}
