//! Radio channels and the per-link channel realizations they carry.
use crate::id::{define_id_getter, define_id_type};
use crate::network::NodeID;
use anyhow::{Result, ensure};
use indexmap::{IndexMap, IndexSet};
use strum::Display;

define_id_type! {ChannelID}

/// A map of [`Channel`]s, keyed by channel ID
pub type ChannelMap = IndexMap<ChannelID, Channel>;

/// The direction of a channel or link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    /// Station to terminal
    Downlink,
    /// Terminal to station
    Uplink,
}

/// Which propagation environment a realization models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Tier {
    /// Outdoor macro cell in an urban area
    Macro,
    /// Indoor femto cell in an urban area
    Femto,
}

/// The propagation-loss instance for one ordered transmitter→receiver link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRealization {
    /// Transmitting node
    pub transmitter: NodeID,
    /// Receiving node
    pub receiver: NodeID,
    /// Propagation environment
    pub tier: Tier,
}

impl ChannelRealization {
    /// Create a realization for the link from `transmitter` to `receiver`
    pub fn new(transmitter: NodeID, receiver: NodeID, tier: Tier) -> Self {
        Self {
            transmitter,
            receiver,
            tier,
        }
    }
}

/// Accumulates the realizations of every link sharing a channel.
///
/// Realizations can only be added, never replaced, and each ordered pair of nodes has at most one.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PropagationLossModel {
    realizations: IndexMap<(NodeID, NodeID), ChannelRealization>,
}

impl PropagationLossModel {
    /// Add the realization for a new link
    pub fn add_realization(&mut self, realization: ChannelRealization) -> Result<()> {
        let key = (realization.transmitter, realization.receiver);
        ensure!(
            !self.realizations.contains_key(&key),
            "Channel realization from node {} to node {} already exists",
            key.0,
            key.1
        );
        self.realizations.insert(key, realization);

        Ok(())
    }

    /// The realization for the link from `transmitter` to `receiver`, if any
    pub fn get(&self, transmitter: NodeID, receiver: NodeID) -> Option<&ChannelRealization> {
        self.realizations.get(&(transmitter, receiver))
    }

    /// Iterate over realizations in the order they were added
    pub fn iter(&self) -> impl Iterator<Item = &ChannelRealization> {
        self.realizations.values()
    }

    /// The number of realizations
    pub fn len(&self) -> usize {
        self.realizations.len()
    }

    /// Whether there are no realizations
    pub fn is_empty(&self) -> bool {
        self.realizations.is_empty()
    }
}

/// One direction of the radio channel belonging to a cell
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Identifier, shared by the uplink and downlink channel of a cell
    pub id: ChannelID,
    /// Direction of the channel
    pub direction: Direction,
    /// Realizations of the links using this channel
    pub propagation_loss: PropagationLossModel,
    /// Devices attached to the channel
    devices: IndexSet<NodeID>,
}
define_id_getter! {Channel, ChannelID}

impl Channel {
    /// Create a channel with no devices or realizations
    pub fn new(id: ChannelID, direction: Direction) -> Self {
        Self {
            id,
            direction,
            propagation_loss: PropagationLossModel::default(),
            devices: IndexSet::new(),
        }
    }

    /// Attach a device to the channel
    pub fn add_device(&mut self, node_id: NodeID) {
        self.devices.insert(node_id);
    }

    /// Iterate over the attached devices
    pub fn iter_devices(&self) -> impl Iterator<Item = NodeID> + '_ {
        self.devices.iter().copied()
    }
}

/// Create one downlink and one uplink channel for each of `count` cell slots.
///
/// Channel IDs run from zero, matching the IDs of the cells they belong to.
pub fn create_channels(count: u32) -> (ChannelMap, ChannelMap) {
    let create = |direction: Direction| -> ChannelMap {
        (0..count)
            .map(|id| (ChannelID(id), Channel::new(ChannelID(id), direction)))
            .collect()
    };

    (create(Direction::Downlink), create(Direction::Uplink))
}
