//! Planar positions and the hexagonal layout of macro cells.
use crate::units::Metres;
use serde::Serialize;
use std::f64::consts::PI;
use std::fmt;

/// A point in the scenario plane, in metres from the centre of the first macro cell
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Position {
    /// Create a new position
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &Position) -> Metres {
        Metres((self.x - other.x).hypot(self.y - other.y))
    }

    /// The position shifted by the given offsets
    pub fn offset(&self, dx: f64, dy: f64) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.x, self.y)
    }
}

/// Centre of the macro cell with the given index in a hexagonal layout.
///
/// Cell 0 sits at the origin. The following cells fill rings around it, ring `k` holding `6k`
/// cells at a distance of `k·√3·radius` along each side of the hexagon.
pub fn macro_cell_centre(index: u32, radius: Metres) -> Position {
    if index == 0 {
        return Position::default();
    }

    let mut ring = 1;
    let mut first_in_ring = 1;
    while index >= first_in_ring + 6 * ring {
        first_in_ring += 6 * ring;
        ring += 1;
    }

    let offset = index - first_in_ring;
    let side = offset / ring;
    let step = offset % ring;
    let distance = f64::from(ring) * 3f64.sqrt() * radius.value();
    let corner = |side: u32| {
        let angle = PI / 6.0 + f64::from(side) * PI / 3.0;
        Position::new(distance * angle.cos(), distance * angle.sin())
    };

    let start = corner(side);
    let end = corner(side + 1);
    let fraction = f64::from(step) / f64::from(ring);
    start.offset((end.x - start.x) * fraction, (end.y - start.y) * fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_first_cell_at_origin() {
        assert_eq!(macro_cell_centre(0, Metres(1000.0)), Position::default());
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(6)]
    fn test_first_ring_distance(#[case] index: u32) {
        let radius = Metres(1000.0);
        let distance = macro_cell_centre(index, radius).distance_to(&Position::default());
        assert_approx_eq!(f64, distance.value(), 3f64.sqrt() * 1000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_second_ring_starts_at_seven() {
        let radius = Metres(1000.0);
        let distance = macro_cell_centre(7, radius).distance_to(&Position::default());
        assert_approx_eq!(f64, distance.value(), 2.0 * 3f64.sqrt() * 1000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cells_distinct() {
        let radius = Metres(500.0);
        let centres: Vec<_> = (0..19).map(|i| macro_cell_centre(i, radius)).collect();
        for (i, a) in centres.iter().enumerate() {
            for b in &centres[i + 1..] {
                assert!(a.distance_to(b).value() > 1.0);
            }
        }
    }
}
