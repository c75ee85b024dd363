//! Macro cells, buildings and the femto cells inside them.
use crate::distribution::SpatialDistribution;
use crate::geometry::{Position, macro_cell_centre};
use crate::id::{IDCounter, define_id_getter, define_id_type, insert_unique};
use crate::units::{Kilometres, Metres};
use anyhow::{Result, bail};
use indexmap::IndexMap;
use itertools::iproduct;
use log::info;
use rand::Rng;
use strum::Display;

define_id_type! {CellID}
define_id_type! {BuildingID}

/// The minimum distance between a macro station and its terminals
pub const MACRO_MIN_DISTANCE: Kilometres = Kilometres::new(0.035);

/// The side of one apartment, which is also the side of its femto cell
pub const APARTMENT_SIDE: Metres = Metres::new(10.0);

/// The number of floors in every building
pub const FLOORS_PER_BUILDING: u32 = 1;

/// A map of macro [`Cell`]s, keyed by cell ID
pub type CellMap = IndexMap<CellID, Cell>;

/// A map of [`Building`]s, keyed by building ID
pub type BuildingMap = IndexMap<BuildingID, Building>;

/// A map of [`FemtoCell`]s, keyed by cell ID
pub type FemtoCellMap = IndexMap<CellID, FemtoCell>;

/// An outdoor coverage area served by one macro station
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Unique identifier, shared with the station serving the cell
    pub id: CellID,
    /// Cell radius
    pub radius: Kilometres,
    /// Terminals are never placed closer than this to the cell centre
    pub min_distance: Kilometres,
    /// Position of the cell centre
    pub centre: Position,
}
define_id_getter! {Cell, CellID}

/// The layout of apartments inside a building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BuildingType {
    /// A square block of 5×5 apartments
    #[strum(to_string = "5x5 grid")]
    Grid5x5,
    /// Two stripes of 2×10 apartments separated by a street
    #[strum(to_string = "dual stripe")]
    DualStripe,
}

impl BuildingType {
    /// Convert the numeric selector used in scenario files
    pub fn from_selector(selector: i64) -> Result<Self> {
        match selector {
            0 => Ok(Self::Grid5x5),
            1 => Ok(Self::DualStripe),
            other => bail!("Invalid building type {other}: must be 0 or 1"),
        }
    }

    /// The number of femto cells (one per apartment) in a building of this type
    pub fn femto_cells_per_building(self) -> u32 {
        match self {
            Self::Grid5x5 => 25,
            Self::DualStripe => 40,
        }
    }

    /// Footprint of the building in apartments, as (columns, rows), streets included
    fn footprint_in_apartments(self) -> (u32, u32) {
        match self {
            Self::Grid5x5 => (5, 5),
            Self::DualStripe => (10, 5),
        }
    }

    /// Width and depth of a building of this type
    pub fn footprint(self, apartment_side: Metres) -> (Metres, Metres) {
        let (columns, rows) = self.footprint_in_apartments();
        (
            apartment_side * f64::from(columns),
            apartment_side * f64::from(rows),
        )
    }

    /// The smallest macro cell radius which holds a whole building clear of the macro station
    pub fn min_cell_radius(self) -> Kilometres {
        let (width, depth) = self.footprint(APARTMENT_SIDE);
        MACRO_MIN_DISTANCE + Kilometres(width.value().hypot(depth.value()) / 1000.0)
    }

    /// The rows of the footprint which hold apartments
    fn apartment_rows(self) -> Vec<u32> {
        match self {
            Self::Grid5x5 => (0..5).collect(),
            // Row 2 is the street between the two stripes
            Self::DualStripe => vec![0, 1, 3, 4],
        }
    }

    /// Offsets of each apartment centre from the building centre, in row-major order
    fn apartment_offsets(self, apartment_side: Metres) -> Vec<(f64, f64)> {
        let (columns, rows) = self.footprint_in_apartments();
        let side = apartment_side.value();
        let half_width = f64::from(columns) / 2.0;
        let half_depth = f64::from(rows) / 2.0;

        iproduct!(self.apartment_rows(), 0..columns)
            .map(|(row, column)| {
                (
                    (f64::from(column) + 0.5 - half_width) * side,
                    (f64::from(row) + 0.5 - half_depth) * side,
                )
            })
            .collect()
    }
}

/// A building holding one femto cell per apartment
#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    /// Unique identifier for the building
    pub id: BuildingID,
    /// Apartment layout
    pub building_type: BuildingType,
    /// Number of floors
    pub floors: u32,
    /// Side of one apartment
    pub apartment_side: Metres,
    /// Position of the building centre
    pub centre: Position,
    /// The ID of the first femto cell in the building
    pub first_femto_cell: CellID,
    /// The number of femto cells in the building
    pub femto_cell_count: u32,
}
define_id_getter! {Building, BuildingID}

impl Building {
    /// Width and depth of the building
    pub fn footprint(&self) -> (Metres, Metres) {
        self.building_type.footprint(self.apartment_side)
    }

    /// Iterate over the IDs of the femto cells in this building
    pub fn iter_femto_cell_ids(&self) -> impl Iterator<Item = CellID> {
        let first = self.first_femto_cell.0;
        (first..first + self.femto_cell_count).map(CellID)
    }
}

/// An indoor coverage area served by a home station
#[derive(Debug, Clone, PartialEq)]
pub struct FemtoCell {
    /// Unique identifier; femto cell IDs continue after the macro cell IDs
    pub id: CellID,
    /// The building containing this femto cell
    pub building_id: BuildingID,
    /// Side of the (square) femto cell
    pub side: Metres,
    /// Position of the femto cell centre
    pub centre: Position,
}
define_id_getter! {FemtoCell, CellID}

/// The cells and buildings making up a scenario's topology
#[derive(Debug, Default, PartialEq)]
pub struct Topology {
    /// Macro cells
    pub cells: CellMap,
    /// Buildings
    pub buildings: BuildingMap,
    /// Femto cells, across all buildings
    pub femto_cells: FemtoCellMap,
}

/// Create `nb_cell` macro cells with sequential IDs starting at zero
pub fn create_macro_cells(nb_cell: u32, radius: Kilometres) -> Result<CellMap> {
    let mut cells = CellMap::new();
    for index in 0..nb_cell {
        let cell = Cell {
            id: CellID(index),
            radius,
            min_distance: MACRO_MIN_DISTANCE,
            centre: macro_cell_centre(index, radius.into()),
        };
        info!("Created Cell, id {}, position: {}", cell.id, cell.centre);
        insert_unique(&mut cells, cell)?;
    }

    Ok(cells)
}

/// Create buildings inside `cell`, along with the femto cells they contain.
///
/// Femto cell IDs are handed out from `femto_ids` building by building, so each building owns a
/// contiguous range of IDs.
pub fn create_buildings<R, D>(
    rng: &mut R,
    distribution: &D,
    cell: &Cell,
    nb_buildings: u32,
    building_type: BuildingType,
    femto_ids: &mut IDCounter<CellID>,
) -> Result<(BuildingMap, FemtoCellMap)>
where
    R: Rng + ?Sized,
    D: SpatialDistribution,
{
    let (width, depth) = building_type.footprint(APARTMENT_SIDE);
    let positions = distribution.building_positions(rng, cell, nb_buildings, width, depth);

    let femto_cells_per_building = building_type.femto_cells_per_building();
    let mut buildings = BuildingMap::new();
    let mut femto_cells = FemtoCellMap::new();
    for (index, centre) in (0..nb_buildings).zip(positions) {
        let building = Building {
            id: BuildingID(index),
            building_type,
            floors: FLOORS_PER_BUILDING,
            apartment_side: APARTMENT_SIDE,
            centre,
            first_femto_cell: CellID(femto_ids.peek()),
            femto_cell_count: femto_cells_per_building,
        };

        for (dx, dy) in building_type.apartment_offsets(building.apartment_side) {
            let femto_cell = FemtoCell {
                id: femto_ids.next_id(),
                building_id: building.id,
                side: building.apartment_side,
                centre: centre.offset(dx, dy),
            };
            insert_unique(&mut femto_cells, femto_cell)?;
        }

        info!(
            "Created Building, id {}, position: {} and {} floors and {} femtocells",
            building.id, building.centre, building.floors, building.femto_cell_count
        );
        insert_unique(&mut buildings, building)?;
    }

    Ok((buildings, femto_cells))
}

/// Create the macro cells of a scenario and the buildings inside each of them.
///
/// Femto cell IDs continue from the last macro cell ID.
pub fn create_topology<R, D>(
    rng: &mut R,
    distribution: &D,
    nb_cell: u32,
    radius: Kilometres,
    nb_buildings: u32,
    building_type: BuildingType,
) -> Result<Topology>
where
    R: Rng + ?Sized,
    D: SpatialDistribution,
{
    let mut topology = Topology {
        cells: create_macro_cells(nb_cell, radius)?,
        ..Topology::default()
    };

    let mut femto_ids = IDCounter::starting_at(nb_cell);
    for cell in topology.cells.values() {
        let (buildings, femto_cells) = create_buildings(
            rng,
            distribution,
            cell,
            nb_buildings,
            building_type,
            &mut femto_ids,
        )?;
        for building in buildings.into_values() {
            insert_unique(&mut topology.buildings, building)?;
        }
        for femto_cell in femto_cells.into_values() {
            insert_unique(&mut topology.femto_cells, femto_cell)?;
        }
    }

    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::UniformDistribution;
    use crate::fixture::assert_error;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(BuildingType::Grid5x5, 0.035 + 0.050 * std::f64::consts::SQRT_2)]
    #[case(BuildingType::DualStripe, 0.035 + 0.050 * 5.0_f64.sqrt())]
    fn test_min_cell_radius(#[case] building_type: BuildingType, #[case] expected: f64) {
        assert_approx_eq!(f64, building_type.min_cell_radius().value(), expected, epsilon = 1e-12);
    }

    #[rstest]
    #[case(0, BuildingType::Grid5x5, 25)]
    #[case(1, BuildingType::DualStripe, 40)]
    fn test_building_type_from_selector(
        #[case] selector: i64,
        #[case] expected: BuildingType,
        #[case] femto_count: u32,
    ) {
        let building_type = BuildingType::from_selector(selector).unwrap();
        assert_eq!(building_type, expected);
        assert_eq!(building_type.femto_cells_per_building(), femto_count);
        assert_eq!(
            building_type.apartment_offsets(APARTMENT_SIDE).len(),
            femto_count as usize
        );
    }

    #[test]
    fn test_building_type_invalid() {
        assert_error!(
            BuildingType::from_selector(2),
            "Invalid building type 2: must be 0 or 1"
        );
    }

    #[test]
    fn test_dual_stripe_leaves_street_empty() {
        let offsets = BuildingType::DualStripe.apartment_offsets(Metres(10.0));
        assert!(offsets.iter().all(|(_, dy)| dy.abs() > 5.0));
    }

    #[test]
    fn test_create_macro_cells() {
        let cells = create_macro_cells(1, Kilometres(1.0)).unwrap();
        assert_eq!(cells.len(), 1);
        let cell = &cells[&CellID(0)];
        assert_eq!(cell.centre, Position::default());
        assert_eq!(cell.min_distance, MACRO_MIN_DISTANCE);
    }

    #[rstest]
    #[case(BuildingType::Grid5x5)]
    #[case(BuildingType::DualStripe)]
    fn test_create_buildings_contiguous_ids(#[case] building_type: BuildingType) {
        let cells = create_macro_cells(1, Kilometres(1.0)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut femto_ids = IDCounter::starting_at(1);
        let (buildings, femto_cells) = create_buildings(
            &mut rng,
            &UniformDistribution,
            &cells[0],
            3,
            building_type,
            &mut femto_ids,
        )
        .unwrap();

        let per_building = building_type.femto_cells_per_building();
        assert_eq!(buildings.len(), 3);
        assert_eq!(femto_cells.len() as u32, 3 * per_building);
        for (index, building) in buildings.values().enumerate() {
            assert_eq!(building.first_femto_cell, CellID(1 + index as u32 * per_building));
            for id in building.iter_femto_cell_ids() {
                assert_eq!(femto_cells[&id].building_id, building.id);
            }
        }
        assert_eq!(femto_ids.peek(), 1 + 3 * per_building);
    }

    #[test]
    fn test_create_topology() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let topology = create_topology(
            &mut rng,
            &UniformDistribution,
            1,
            Kilometres(0.5),
            2,
            BuildingType::DualStripe,
        )
        .unwrap();

        assert_eq!(topology.cells.len(), 1);
        assert_eq!(topology.buildings.len(), 2);
        assert_eq!(topology.femto_cells.len(), 80);
        let ids: Vec<_> = topology.femto_cells.keys().map(|id| id.0).collect();
        assert_eq!(ids, (1..=80).collect::<Vec<_>>());
    }

    #[test]
    fn test_create_topology_no_buildings() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let topology = create_topology(
            &mut rng,
            &UniformDistribution,
            1,
            Kilometres(0.5),
            0,
            BuildingType::Grid5x5,
        )
        .unwrap();
        assert!(topology.buildings.is_empty());
        assert!(topology.femto_cells.is_empty());
    }
}
