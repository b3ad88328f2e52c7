use unordered_pair::UnorderedPair;

use crate::grid::HexGrid;

/// A pair of side-adjacent cells where the hexagon pair may be rewritten into a pentagon and a
/// heptagon. Activating a site removes both cells from the hexagon count and realizes one
/// pentagon (on the lower-indexed cell) and one heptagon (on the higher-indexed cell) instead.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) struct TransformationSite {
    pub(crate) cells: UnorderedPair<usize>,
}

impl TransformationSite {
    /// The lower compact index of the pair; the pentagon lands here.
    pub(crate) fn lower(&self) -> usize {
        self.cells.0.min(self.cells.1)
    }

    /// The higher compact index of the pair; the heptagon lands here.
    pub(crate) fn upper(&self) -> usize {
        self.cells.0.max(self.cells.1)
    }

    /// Whether this site's pair includes the given cell.
    pub(crate) fn touches(&self, cell: usize) -> bool {
        self.cells.0 == cell || self.cells.1 == cell
    }

    /// Whether two sites contend for a cell and therefore exclude each other.
    pub(crate) fn conflicts_with(&self, other: &Self) -> bool {
        self.touches(other.cells.0) || self.touches(other.cells.1)
    }
}

/// Every unordered pair of side-adjacent compact cells, in ascending `(lower, upper)` order.
/// Each site owns one activation variable in the encoding.
pub(crate) fn identify_sites(grid: &HexGrid) -> Vec<TransformationSite> {
    let mut sites = Vec::new();
    for a in 0..grid.cell_count() {
        for b in a + 1..grid.cell_count() {
            if grid.adjacent(a, b) {
                sites.push(TransformationSite { cells: UnorderedPair(a, b) });
            }
        }
    }
    sites
}
