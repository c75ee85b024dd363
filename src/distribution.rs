//! Spatial distributions used to place buildings and terminals.
use crate::geometry::Position;
use crate::topology::{Cell, FemtoCell};
use crate::units::{Metres, Radians};
use rand::Rng;
use std::f64::consts::TAU;

/// Generates positions for the entities of a scenario.
///
/// Implementations must draw from the supplied generator only, so that placement is fully
/// determined by the generator's state.
pub trait SpatialDistribution {
    /// Positions for the centres of `count` buildings of the given footprint inside `cell`
    fn building_positions<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        cell: &Cell,
        count: u32,
        width: Metres,
        depth: Metres,
    ) -> Vec<Position>;

    /// Positions for `count` terminals inside a macro cell
    fn positions_in_cell<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        cell: &Cell,
        count: u32,
    ) -> Vec<Position>;

    /// Positions for `count` terminals inside a femto cell
    fn positions_in_femto_cell<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        femto_cell: &FemtoCell,
        count: u32,
    ) -> Vec<Position>;
}

/// Places everything uniformly over the available area
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformDistribution;

/// Draw a point uniformly over the annulus between `inner` and `outer` around `centre`
fn draw_in_annulus<R: Rng + ?Sized>(
    rng: &mut R,
    centre: Position,
    inner: Metres,
    outer: Metres,
) -> Position {
    let (inner, outer) = (inner.value(), outer.value().max(inner.value()));
    let area_fraction: f64 = rng.r#gen();
    let radius = (area_fraction * (outer.powi(2) - inner.powi(2)) + inner.powi(2)).sqrt();
    let angle = Radians(rng.r#gen::<f64>() * TAU);

    centre.offset(radius * angle.value().cos(), radius * angle.value().sin())
}

impl SpatialDistribution for UniformDistribution {
    fn building_positions<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        cell: &Cell,
        count: u32,
        width: Metres,
        depth: Metres,
    ) -> Vec<Position> {
        // Keep whole buildings inside the cell and clear of the macro station
        let half_diagonal = Metres(width.value().hypot(depth.value()) / 2.0);
        let inner = Metres::from(cell.min_distance) + half_diagonal;
        let outer = Metres::from(cell.radius) - half_diagonal;

        (0..count)
            .map(|_| draw_in_annulus(rng, cell.centre, inner, outer))
            .collect()
    }

    fn positions_in_cell<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        cell: &Cell,
        count: u32,
    ) -> Vec<Position> {
        (0..count)
            .map(|_| {
                draw_in_annulus(
                    rng,
                    cell.centre,
                    cell.min_distance.into(),
                    cell.radius.into(),
                )
            })
            .collect()
    }

    fn positions_in_femto_cell<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        femto_cell: &FemtoCell,
        count: u32,
    ) -> Vec<Position> {
        let half_side = femto_cell.side.value() / 2.0;
        (0..count)
            .map(|_| {
                let dx = rng.gen_range(-half_side..half_side);
                let dy = rng.gen_range(-half_side..half_side);
                femto_cell.centre.offset(dx, dy)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{BuildingID, CellID, MACRO_MIN_DISTANCE};
    use crate::units::Kilometres;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rstest::{fixture, rstest};

    #[fixture]
    fn cell() -> Cell {
        Cell {
            id: CellID(0),
            radius: Kilometres(0.5),
            min_distance: MACRO_MIN_DISTANCE,
            centre: Position::default(),
        }
    }

    #[rstest]
    fn test_positions_in_cell_within_annulus(cell: Cell) {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let positions = UniformDistribution.positions_in_cell(&mut rng, &cell, 500);
        assert_eq!(positions.len(), 500);
        for position in positions {
            let distance = position.distance_to(&cell.centre).value();
            assert!((35.0 - 1e-9..=500.0 + 1e-9).contains(&distance));
        }
    }

    #[rstest]
    fn test_building_positions_keep_building_inside(cell: Cell) {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let positions = UniformDistribution.building_positions(
            &mut rng,
            &cell,
            100,
            Metres(50.0),
            Metres(50.0),
        );
        let half_diagonal = 50f64.hypot(50.0) / 2.0;
        for position in positions {
            let distance = position.distance_to(&cell.centre).value();
            assert!(distance + half_diagonal <= 500.0 + 1e-9);
        }
    }

    #[test]
    fn test_positions_in_femto_cell() {
        let femto_cell = FemtoCell {
            id: CellID(1),
            building_id: BuildingID(0),
            side: Metres(10.0),
            centre: Position::new(100.0, -40.0),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for position in UniformDistribution.positions_in_femto_cell(&mut rng, &femto_cell, 200) {
            assert!((position.x - 100.0).abs() <= 5.0);
            assert!((position.y + 40.0).abs() <= 5.0);
        }
    }

    #[rstest]
    fn test_same_seed_same_positions(cell: Cell) {
        let draw = || {
            let mut rng = ChaCha8Rng::seed_from_u64(21);
            UniformDistribution.positions_in_cell(&mut rng, &cell, 10)
        };
        assert_eq!(draw(), draw());
    }
}
