//! Uniform-grid spatial index over detector positions.
//!
//! Rebuilt from scratch once per time step after detector motion; the index
//! is cheap relative to the step count and correctness requires it to
//! reflect the current step's positions, not the previous step's. Candidate
//! filtering compares squared distances so no square root is taken in the
//! scan.

use std::collections::HashMap;

use nalgebra::Vector3;

use super::geometry::distance2;

/// Radius-query index over a fixed set of points.
///
/// Points are hashed into cubic cells sized to the expected query radius so
/// a query touches a bounded neighborhood of cells. Query results are exact
/// (cell candidates are re-filtered by squared distance) and returned sorted
/// by index so iteration order is deterministic.
pub struct SpatialIndex {
    cell_size: f64,
    cells: HashMap<(i64, i64, i64), Vec<usize>>,
    positions: Vec<Vector3<f64>>,
}

impl SpatialIndex {
    /// Build an index over `positions` with the given cell size.
    ///
    /// `cell_size` is typically the engine's query radius; it must be
    /// strictly positive (enforced by config validation upstream).
    pub fn build(positions: &[Vector3<f64>], cell_size: f64) -> Self {
        let mut cells: HashMap<(i64, i64, i64), Vec<usize>> = HashMap::new();
        for (index, position) in positions.iter().enumerate() {
            cells.entry(Self::cell_of(position, cell_size)).or_default().push(index);
        }
        Self {
            cell_size,
            cells,
            positions: positions.to_vec(),
        }
    }

    fn cell_of(position: &Vector3<f64>, cell_size: f64) -> (i64, i64, i64) {
        (
            (position.x / cell_size).floor() as i64,
            (position.y / cell_size).floor() as i64,
            (position.z / cell_size).floor() as i64,
        )
    }

    /// Indices of all points within `radius` of `point`, sorted ascending.
    pub fn query(&self, point: &Vector3<f64>, radius: f64) -> Vec<usize> {
        let radius2 = radius * radius;
        let min_cell = Self::cell_of(&point.map(|c| c - radius), self.cell_size);
        let max_cell = Self::cell_of(&point.map(|c| c + radius), self.cell_size);

        let mut hits = Vec::new();
        for cx in min_cell.0..=max_cell.0 {
            for cy in min_cell.1..=max_cell.1 {
                for cz in min_cell.2..=max_cell.2 {
                    if let Some(indices) = self.cells.get(&(cx, cy, cz)) {
                        for &index in indices {
                            if distance2(&self.positions[index], point) <= radius2 {
                                hits.push(index);
                            }
                        }
                    }
                }
            }
        }
        // HashMap iteration order is arbitrary; the engine needs a stable
        // candidate order for deterministic replay.
        hits.sort_unstable();
        hits
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_returns_only_points_within_radius() {
        let positions = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(5.0, 0.0, 0.0),
            Vector3::new(0.0, 1.9, 0.0),
        ];
        let index = SpatialIndex::build(&positions, 2.0);
        assert_eq!(index.len(), 4);
        let hits = index.query(&Vector3::zeros(), 2.0);
        assert_eq!(hits, vec![0, 1, 3]);
    }

    #[test]
    fn boundary_point_is_included() {
        let positions = vec![Vector3::new(2.0, 0.0, 0.0)];
        let index = SpatialIndex::build(&positions, 2.0);
        assert_eq!(index.query(&Vector3::zeros(), 2.0), vec![0]);
    }

    #[test]
    fn results_are_sorted_by_index() {
        let positions: Vec<Vector3<f64>> = (0..50).map(|i| Vector3::new((i % 7) as f64 * 0.1, (i / 7) as f64 * 0.1, 0.0)).collect();
        let index = SpatialIndex::build(&positions, 1.0);
        let hits = index.query(&Vector3::zeros(), 10.0);
        assert_eq!(hits.len(), 50);
        assert!(hits.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn negative_coordinates_hash_correctly() {
        let positions = vec![Vector3::new(-3.0, -3.0, -3.0), Vector3::new(3.0, 3.0, 3.0)];
        let index = SpatialIndex::build(&positions, 1.5);
        assert_eq!(index.query(&Vector3::new(-3.0, -3.0, -3.0), 0.5), vec![0]);
        assert_eq!(index.query(&Vector3::new(3.0, 3.0, 3.0), 0.5), vec![1]);
    }

    #[test]
    fn empty_index_returns_no_hits() {
        let index = SpatialIndex::build(&[], 1.0);
        assert!(index.is_empty());
        assert!(index.query(&Vector3::zeros(), 100.0).is_empty());
    }
}
