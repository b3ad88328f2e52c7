use petgraph::graphmap::UnGraphMap;

use crate::grid::HexGrid;

/// The pair of graphs bounding every structure the search may produce.
///
/// Both graphs are over compact cell indices and stay frozen for the lifetime of a run.
/// The upper bound holds every surviving cell and every side-sharing edge; a realized structure
/// is always a subgraph of it. The lower bound holds whatever must appear in every structure;
/// here it starts empty, since the mandatory minimum ("at least one cell") is expressed as a
/// count constraint rather than a pinned vertex.
pub(crate) struct BoundGraphs {
    pub(crate) lower: UnGraphMap<usize, ()>,
    pub(crate) upper: UnGraphMap<usize, ()>,
}

impl BoundGraphs {
    pub(crate) fn from_grid(grid: &HexGrid) -> Self {
        let mut upper = UnGraphMap::new();
        for compact in 0..grid.cell_count() {
            upper.add_node(compact);
        }
        for compact in 0..grid.cell_count() {
            for neighbor in grid.neighbors(compact).iter().flatten() {
                upper.add_edge(compact, *neighbor, ());
            }
        }

        Self { lower: UnGraphMap::new(), upper }
    }

    /// Whether the lower bound is still a subgraph of the upper bound.
    pub(crate) fn bounds_hold(&self) -> bool {
        self.lower.nodes().all(|node| self.upper.contains_node(node))
            && self.lower.all_edges().all(|(a, b, _)| self.upper.contains_edge(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_bound_covers_the_grid() {
        let grid = HexGrid::new(2).unwrap();
        let bounds = BoundGraphs::from_grid(&grid);
        assert_eq!(bounds.upper.node_count(), 7);
        // the center touches all six ring cells, the ring is a 6-cycle
        assert_eq!(bounds.upper.edge_count(), 12);
        assert!(bounds.lower.node_count() == 0);
        assert!(bounds.bounds_hold());
    }

    #[test]
    fn upper_bound_edges_match_adjacency() {
        let grid = HexGrid::new(3).unwrap();
        let bounds = BoundGraphs::from_grid(&grid);
        for a in 0..grid.cell_count() {
            for b in 0..grid.cell_count() {
                assert_eq!(bounds.upper.contains_edge(a, b), grid.adjacent(a, b));
            }
        }
    }
}
