//! Radio base stations: macro stations and home (femto) stations.
use crate::channel::{ChannelID, ChannelMap};
use crate::geometry::Position;
use crate::id::{define_id_getter, insert_unique};
use crate::network::NodeID;
use crate::random::draw_unit;
use crate::scheduler::SchedulerType;
use crate::spectrum::{SpectrumAllocation, SpectrumBlockID};
use crate::topology::{CellID, CellMap, FemtoCellMap};
use anyhow::{Context, Result, bail, ensure};
use indexmap::{IndexMap, IndexSet};
use log::{debug, info};
use rand::Rng;
use strum::Display;

/// A map of [`RadioNode`]s, keyed by node ID
pub type StationMap = IndexMap<NodeID, RadioNode>;

/// Who may attach to a home station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AccessPolicy {
    /// Only terminals in the station's subscriber list
    #[default]
    Closed,
    /// Any terminal
    Open,
}

impl AccessPolicy {
    /// Convert the numeric selector used in scenario files
    pub fn from_selector(selector: i64) -> Result<Self> {
        match selector {
            0 => Ok(Self::Closed),
            1 => Ok(Self::Open),
            other => bail!("Invalid access policy {other}: must be 0 (closed) or 1 (open)"),
        }
    }
}

/// Access control state of a home station
#[derive(Debug, Clone, PartialEq)]
pub struct HomeAccess {
    /// The configured policy
    pub policy: AccessPolicy,
    /// Whether the MAC layer restricts access to subscribers
    restricted_access: bool,
    /// The closed subscriber group
    subscribers: IndexSet<NodeID>,
}

impl HomeAccess {
    /// Access state for a newly created home station
    pub fn new(policy: AccessPolicy) -> Self {
        Self {
            policy,
            // Restricted by default; open stations explicitly clear the flag
            restricted_access: policy == AccessPolicy::Closed,
            subscribers: IndexSet::new(),
        }
    }

    /// Whether the MAC layer restricts access to subscribers
    pub fn is_restricted(&self) -> bool {
        self.restricted_access
    }

    /// Add a terminal to the closed subscriber group
    pub fn add_subscriber(&mut self, terminal_id: NodeID) -> Result<()> {
        ensure!(
            self.restricted_access,
            "Cannot add subscriber {terminal_id} to an open-access station"
        );
        self.subscribers.insert(terminal_id);

        Ok(())
    }

    /// Iterate over the subscribed terminals
    pub fn iter_subscribers(&self) -> impl Iterator<Item = NodeID> + '_ {
        self.subscribers.iter().copied()
    }

    /// Whether the given terminal may attach to the station
    pub fn admits(&self, terminal_id: NodeID) -> bool {
        !self.restricted_access || self.subscribers.contains(&terminal_id)
    }
}

/// The variants of radio station
#[derive(Debug, Clone, PartialEq)]
pub enum StationKind {
    /// Outdoor station serving a macro cell
    Macro,
    /// Indoor station serving a femto cell
    Home(HomeAccess),
}

/// A radio base station
#[derive(Debug, Clone, PartialEq)]
pub struct RadioNode {
    /// Unique identifier, equal to the ID of the served cell
    pub id: NodeID,
    /// The cell served by the station
    pub cell_id: CellID,
    /// Macro or home station
    pub kind: StationKind,
    /// Position of the station
    pub position: Position,
    /// The downlink scheduler
    pub scheduler: SchedulerType,
    /// Downlink channel
    pub dl_channel: ChannelID,
    /// Uplink channel
    pub ul_channel: ChannelID,
    /// Spectrum assignment, fixed at creation
    spectrum: SpectrumBlockID,
    /// Terminals registered with the station
    registered_terminals: IndexSet<NodeID>,
}
define_id_getter! {RadioNode, NodeID}

impl RadioNode {
    /// Create a station for the given cell, bound to the channel pair with the same ID
    fn new(
        cell_id: CellID,
        kind: StationKind,
        position: Position,
        scheduler: SchedulerType,
        spectrum: SpectrumBlockID,
    ) -> Self {
        Self {
            id: NodeID(cell_id.0),
            cell_id,
            kind,
            position,
            scheduler,
            dl_channel: ChannelID(cell_id.0),
            ul_channel: ChannelID(cell_id.0),
            spectrum,
            registered_terminals: IndexSet::new(),
        }
    }

    /// The spectrum block assigned to the station
    pub fn spectrum(&self) -> SpectrumBlockID {
        self.spectrum
    }

    /// Whether this is a home station
    pub fn is_home(&self) -> bool {
        matches!(self.kind, StationKind::Home(_))
    }

    /// Access control state, for home stations
    pub fn home_access(&self) -> Option<&HomeAccess> {
        match &self.kind {
            StationKind::Home(access) => Some(access),
            StationKind::Macro => None,
        }
    }

    /// Mutable access control state, for home stations
    pub fn home_access_mut(&mut self) -> Option<&mut HomeAccess> {
        match &mut self.kind {
            StationKind::Home(access) => Some(access),
            StationKind::Macro => None,
        }
    }

    /// Register a terminal with the station
    pub fn register_terminal(&mut self, terminal_id: NodeID) {
        self.registered_terminals.insert(terminal_id);
    }

    /// Iterate over registered terminals in registration order
    pub fn iter_registered_terminals(&self) -> impl Iterator<Item = NodeID> + '_ {
        self.registered_terminals.iter().copied()
    }

    fn log_creation(&self, label: &str) {
        info!(
            "Created {label}, id {}, cell id {}, position: {}, channels id {} {}",
            self.id, self.cell_id, self.position, self.dl_channel, self.ul_channel
        );
    }
}

/// Record a new station as a transmitting device on its uplink channel
fn attach_to_uplink(station: &RadioNode, ul_channels: &mut ChannelMap) -> Result<()> {
    ul_channels
        .get_mut(&station.ul_channel)
        .with_context(|| format!("No uplink channel {} for station", station.ul_channel))?
        .add_device(station.id);

    Ok(())
}

/// Creates the stations of a scenario, all sharing one scheduler and access policy
#[derive(Debug, Clone, Copy)]
pub struct StationFactory<'a> {
    /// Downlink scheduler given to every station
    pub scheduler: SchedulerType,
    /// Access policy given to every home station
    pub access_policy: AccessPolicy,
    /// Spectrum assignment for the scenario
    pub spectrum: &'a SpectrumAllocation,
}

impl StationFactory<'_> {
    /// Create one macro station per macro cell
    pub fn create_macro_stations(
        &self,
        cells: &CellMap,
        ul_channels: &mut ChannelMap,
    ) -> Result<StationMap> {
        let mut stations = StationMap::new();
        for cell in cells.values() {
            let station = RadioNode::new(
                cell.id,
                StationKind::Macro,
                cell.centre,
                self.scheduler,
                self.spectrum.macro_block(cell.id)?,
            );
            station.log_creation("enb");
            attach_to_uplink(&station, ul_channels)?;
            insert_unique(&mut stations, station)?;
        }

        Ok(stations)
    }

    /// Create home stations for the femto cells which turn out to be active.
    ///
    /// One uniform draw is taken per femto cell, in cell order, and the station is created when
    /// the draw is no greater than `activity_ratio`. Inactive femto cells get no station.
    pub fn create_home_stations<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        femto_cells: &FemtoCellMap,
        activity_ratio: f64,
        ul_channels: &mut ChannelMap,
        stations: &mut StationMap,
    ) -> Result<()> {
        for femto_cell in femto_cells.values() {
            let draw = draw_unit(rng);
            if draw > activity_ratio {
                debug!("Femto cell {} is inactive (draw {draw})", femto_cell.id);
                continue;
            }

            let station = RadioNode::new(
                femto_cell.id,
                StationKind::Home(HomeAccess::new(self.access_policy)),
                femto_cell.centre,
                self.scheduler,
                self.spectrum.femto_block(),
            );
            station.log_creation("Home enb");
            attach_to_uplink(&station, ul_channels)?;
            insert_unique(stations, station)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::create_channels;
    use crate::fixture::assert_error;
    use crate::spectrum::{ClusterReuse, REUSE_CLUSTER_SIZE, TOTAL_BANDWIDTH, allocate_spectrum};
    use crate::topology::{BuildingID, FemtoCell, create_macro_cells};
    use crate::units::{Kilometres, Metres};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rstest::{fixture, rstest};

    #[fixture]
    fn femto_cells() -> FemtoCellMap {
        (1..=20)
            .map(|id| {
                let femto_cell = FemtoCell {
                    id: CellID(id),
                    building_id: BuildingID(0),
                    side: Metres(10.0),
                    centre: Position::new(f64::from(id) * 10.0, 0.0),
                };
                (femto_cell.id, femto_cell)
            })
            .collect()
    }

    #[fixture]
    fn spectrum() -> SpectrumAllocation {
        allocate_spectrum(&ClusterReuse, 1, REUSE_CLUSTER_SIZE, TOTAL_BANDWIDTH).unwrap()
    }

    #[rstest]
    #[case(0, AccessPolicy::Closed)]
    #[case(1, AccessPolicy::Open)]
    fn test_access_policy_from_selector(#[case] selector: i64, #[case] expected: AccessPolicy) {
        assert_eq!(AccessPolicy::from_selector(selector).unwrap(), expected);
    }

    #[test]
    fn test_access_policy_invalid() {
        assert_error!(
            AccessPolicy::from_selector(3),
            "Invalid access policy 3: must be 0 (closed) or 1 (open)"
        );
    }

    #[test]
    fn test_home_access_closed() {
        let mut access = HomeAccess::new(AccessPolicy::Closed);
        assert!(access.is_restricted());
        assert!(!access.admits(NodeID(30)));
        access.add_subscriber(NodeID(30)).unwrap();
        assert!(access.admits(NodeID(30)));
        assert_eq!(access.iter_subscribers().collect::<Vec<_>>(), [NodeID(30)]);
    }

    #[test]
    fn test_home_access_open() {
        let mut access = HomeAccess::new(AccessPolicy::Open);
        assert!(!access.is_restricted());
        assert!(access.admits(NodeID(30)));
        assert_error!(
            access.add_subscriber(NodeID(30)),
            "Cannot add subscriber 30 to an open-access station"
        );
    }

    #[rstest]
    fn test_create_macro_stations(spectrum: SpectrumAllocation) {
        let cells = create_macro_cells(1, Kilometres(1.0)).unwrap();
        let (_, mut ul_channels) = create_channels(1);
        let factory = StationFactory {
            scheduler: SchedulerType::Fls,
            access_policy: AccessPolicy::Closed,
            spectrum: &spectrum,
        };
        let stations = factory
            .create_macro_stations(&cells, &mut ul_channels)
            .unwrap();

        let station = &stations[&NodeID(0)];
        assert_eq!(station.cell_id, CellID(0));
        assert_eq!(station.scheduler, SchedulerType::Fls);
        assert_eq!(station.spectrum(), SpectrumBlockID(0));
        assert!(!station.is_home());
        assert_eq!(
            ul_channels[&ChannelID(0)].iter_devices().collect::<Vec<_>>(),
            [NodeID(0)]
        );
    }

    #[rstest]
    #[case(0.0, 0)]
    #[case(1.0, 20)]
    fn test_create_home_stations_extremes(
        femto_cells: FemtoCellMap,
        spectrum: SpectrumAllocation,
        #[case] activity_ratio: f64,
        #[case] expected: usize,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let (_, mut ul_channels) = create_channels(21);
        let mut stations = StationMap::new();
        let factory = StationFactory {
            scheduler: SchedulerType::ProportionalFair,
            access_policy: AccessPolicy::Closed,
            spectrum: &spectrum,
        };
        factory
            .create_home_stations(
                &mut rng,
                &femto_cells,
                activity_ratio,
                &mut ul_channels,
                &mut stations,
            )
            .unwrap();

        assert_eq!(stations.len(), expected);
        for station in stations.values() {
            assert_eq!(station.id, NodeID(station.cell_id.0));
            assert_eq!(station.spectrum(), spectrum.femto_block());
            assert!(station.home_access().unwrap().is_restricted());
            assert_eq!(
                ul_channels[&station.ul_channel].iter_devices().collect::<Vec<_>>(),
                [station.id]
            );
        }
    }

    #[rstest]
    fn test_create_home_stations_open_clears_restriction(
        femto_cells: FemtoCellMap,
        spectrum: SpectrumAllocation,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let (_, mut ul_channels) = create_channels(21);
        let mut stations = StationMap::new();
        let factory = StationFactory {
            scheduler: SchedulerType::ProportionalFair,
            access_policy: AccessPolicy::Open,
            spectrum: &spectrum,
        };
        factory
            .create_home_stations(
                &mut rng,
                &femto_cells,
                1.0,
                &mut ul_channels,
                &mut stations,
            )
            .unwrap();

        assert!(
            stations
                .values()
                .all(|s| !s.home_access().unwrap().is_restricted())
        );
    }
}
