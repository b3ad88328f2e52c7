use ndarray::Array2;
use strum::VariantArray;

use crate::error::Error;

/// The six directions between side-adjacent hexagonal cells, in dual-graph slot order.
///
/// The discriminant of each variant is its slot index; slot `k` of a cell's neighbor table and
/// slot `(k + 3) % 6` of the neighbor's table refer to the same shared side.
/// Deltas are expressed as `(column, line)` offsets on the slanted axial lattice,
/// so "up-right" decreases the line while keeping the column.
#[derive(Copy, Clone, VariantArray, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub enum HexDirection {
    /// Slot 0, delta `(0, -1)`.
    UpRight,
    /// Slot 1, delta `(1, 0)`.
    Right,
    /// Slot 2, delta `(1, 1)`.
    DownRight,
    /// Slot 3, delta `(0, 1)`.
    DownLeft,
    /// Slot 4, delta `(-1, 0)`.
    Left,
    /// Slot 5, delta `(-1, -1)`.
    UpLeft,
}

impl HexDirection {
    /// The `(column, line)` offset this direction applies to a cell position.
    pub fn delta(&self) -> (isize, isize) {
        match self {
            Self::UpRight => (0, -1),
            Self::Right => (1, 0),
            Self::DownRight => (1, 1),
            Self::DownLeft => (0, 1),
            Self::Left => (-1, 0),
            Self::UpLeft => (-1, -1),
        }
    }

    /// The slot index of this direction.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The direction at slot `k % 6`.
    pub fn from_index(k: usize) -> Self {
        Self::VARIANTS[k % 6]
    }

    /// Invert the direction specified by `self`; stepping there and back returns to the origin.
    pub fn invert(&self) -> Self {
        Self::from_index(self.index() + 3)
    }
}

/// Rotate an axial position counterclockwise by 60 degrees about the origin.
/// Maps the delta of slot `k` to the delta of slot `k + 1`.
pub(crate) fn rotate60(p: (isize, isize)) -> (isize, isize) {
    (p.0 - p.1, p.0)
}

/// Reflect an axial position across the diagonal axis by swapping coordinates.
/// Composed with [`rotate60`], this generates all twelve lattice symmetries.
pub(crate) fn reflect(p: (isize, isize)) -> (isize, isize) {
    (p.1, p.0)
}

/// Reflect an axial position across the horizontal axis.
/// Fixes [`Right`](HexDirection::Right) and [`Left`](HexDirection::Left), swaps the up and down slots.
pub(crate) fn mirror_horizontal(p: (isize, isize)) -> (isize, isize) {
    (p.0 - p.1, -p.1)
}

/// Reflect an axial position across the vertical axis.
/// Swaps [`Right`](HexDirection::Right) with [`Left`](HexDirection::Left).
pub(crate) fn mirror_vertical(p: (isize, isize)) -> (isize, isize) {
    (p.1 - p.0, p.1)
}

/// A coronenoid grid of hexagonal cells hosting the search.
///
/// A grid of `r` crowns is the hexagon-shaped patch of cells within distance `r - 1` of a center
/// cell, laid out on a slanted square lattice of side `2r - 1` (the *diameter*).
/// Rows shrink away from the middle row, so only part of the dense lattice is in the footprint.
///
/// Cells are addressed two ways:
/// * the *sparse* index `line * diameter + column`, stable across trimming, used for naming;
/// * the *compact* index, a contiguous `0..cell_count()` renumbering of surviving cells,
///   used for decision variables and graph nodes.
pub struct HexGrid {
    crowns: usize,
    diameter: usize,
    index: Array2<Option<usize>>,
    sparse_of_compact: Vec<usize>,
    coords_of_compact: Vec<(usize, usize)>,
    neighbors: Vec<[Option<usize>; 6]>,
}

impl HexGrid {
    /// Build the full coronenoid grid with the given number of crowns.
    pub fn new(crowns: usize) -> Result<Self, Error> {
        Self::trimmed(crowns, |_, _| true)
    }

    /// Build a coronenoid grid, assigning compact indices only to footprint cells the predicate
    /// retains. Trimmed cells keep their sparse position but take part in nothing else.
    pub fn trimmed(crowns: usize, keep: impl Fn(usize, usize) -> bool) -> Result<Self, Error> {
        if crowns == 0 {
            return Err(Error::InvalidCrowns(crowns));
        }

        let diameter = 2 * crowns - 1;
        let mut index = Array2::from_shape_simple_fn((diameter, diameter), || None);
        let mut sparse_of_compact = Vec::new();
        let mut coords_of_compact = Vec::new();

        for line in 0..diameter {
            for column in 0..diameter {
                if in_footprint(crowns, line, column) && keep(line, column) {
                    index[[line, column]] = Some(sparse_of_compact.len());
                    sparse_of_compact.push(line * diameter + column);
                    coords_of_compact.push((line, column));
                }
            }
        }

        let neighbors = coords_of_compact.iter()
            .map(|&(line, column)| {
                let mut slots = [None; 6];
                for direction in HexDirection::VARIANTS {
                    let (dx, dy) = direction.delta();
                    let (nl, nc) = (line as isize + dy, column as isize + dx);
                    if (0..diameter as isize).contains(&nl) && (0..diameter as isize).contains(&nc) {
                        slots[direction.index()] = index[[nl as usize, nc as usize]];
                    }
                }
                slots
            })
            .collect();

        Ok(Self { crowns, diameter, index, sparse_of_compact, coords_of_compact, neighbors })
    }

    /// The number of crowns this grid was built with.
    pub fn crowns(&self) -> usize {
        self.crowns
    }

    /// The side length of the dense lattice hosting the footprint, `2 * crowns - 1`.
    pub fn diameter(&self) -> usize {
        self.diameter
    }

    /// The number of cells holding a compact index.
    /// For an untrimmed grid of diameter `d` this is `1 + 3 * (d + 1) * (d - 1) / 4`.
    pub fn cell_count(&self) -> usize {
        self.sparse_of_compact.len()
    }

    /// Whether the cell at this position holds a compact index.
    pub fn is_cell(&self, line: usize, column: usize) -> bool {
        line < self.diameter && column < self.diameter && self.index[[line, column]].is_some()
    }

    /// The sparse index of a position, whether or not that position is in the footprint.
    pub fn sparse_index(&self, line: usize, column: usize) -> usize {
        line * self.diameter + column
    }

    /// The compact index of the cell at a sparse index, if that cell survived trimming.
    pub fn compact_of_sparse(&self, sparse: usize) -> Option<usize> {
        let (line, column) = (sparse / self.diameter, sparse % self.diameter);
        if line < self.diameter && column < self.diameter {
            self.index[[line, column]]
        } else {
            None
        }
    }

    /// The sparse index of a compact cell.
    pub fn sparse_of_compact(&self, compact: usize) -> usize {
        self.sparse_of_compact[compact]
    }

    /// The `(line, column)` position of a compact cell.
    pub fn coords_of_compact(&self, compact: usize) -> (usize, usize) {
        self.coords_of_compact[compact]
    }

    /// The compact neighbor of a cell through one side, if it exists.
    pub fn neighbor(&self, compact: usize, direction: HexDirection) -> Option<usize> {
        self.neighbors[compact][direction.index()]
    }

    /// All six neighbor slots of a compact cell.
    pub fn neighbors(&self, compact: usize) -> &[Option<usize>; 6] {
        &self.neighbors[compact]
    }

    /// Whether two compact cells share a side.
    pub fn adjacent(&self, a: usize, b: usize) -> bool {
        self.neighbors[a].iter().any(|slot| *slot == Some(b))
    }

    /// The direction stepping from `a` to `b`, if they share a side.
    pub fn direction_between(&self, a: usize, b: usize) -> Option<HexDirection> {
        HexDirection::VARIANTS.iter()
            .copied()
            .find(|direction| self.neighbor(a, *direction) == Some(b))
    }

    /// The compact cells on the top border (line 0).
    pub fn top_border(&self) -> Vec<usize> {
        (0..self.diameter)
            .filter_map(|column| self.index[[0, column]])
            .collect()
    }

    /// The compact cells on the left border (the first footprint column of each line).
    pub fn left_border(&self) -> Vec<usize> {
        (0..self.diameter)
            .filter_map(|line| self.index[[line, first_footprint_column(self.crowns, line)]])
            .collect()
    }

    /// The leftmost footprint column of a line, whether or not that cell survived trimming.
    pub fn first_column(&self, line: usize) -> usize {
        first_footprint_column(self.crowns, line)
    }

    /// The compact index of the center cell, if it survived trimming.
    pub fn center(&self) -> Option<usize> {
        self.index[[self.crowns - 1, self.crowns - 1]]
    }

    /// The axial position of a compact cell relative to the grid center.
    pub(crate) fn axial(&self, compact: usize) -> (isize, isize) {
        let (line, column) = self.coords_of_compact[compact];
        let m = (self.crowns - 1) as isize;
        (column as isize - m, line as isize - m)
    }

    /// The compact cell at an axial position relative to the grid center.
    pub(crate) fn cell_at_axial(&self, p: (isize, isize)) -> Option<usize> {
        let m = (self.crowns - 1) as isize;
        let (line, column) = (p.1 + m, p.0 + m);
        if (0..self.diameter as isize).contains(&line) && (0..self.diameter as isize).contains(&column) {
            self.index[[line as usize, column as usize]]
        } else {
            None
        }
    }

    /// The compact-index permutation induced by a lattice map, if every cell lands on a cell.
    /// Always succeeds on an untrimmed grid for the twelve lattice symmetries, since the
    /// coronenoid footprint is exactly the cells within hex distance `crowns - 1` of the center.
    fn permutation_under(&self, map: impl Fn((isize, isize)) -> (isize, isize)) -> Option<Vec<usize>> {
        (0..self.cell_count())
            .map(|compact| self.cell_at_axial(map(self.axial(compact))))
            .collect()
    }

    /// All grid automorphisms realized by the twelve lattice symmetries, as compact-index
    /// permutations. The identity comes first. Trimmed grids yield only the symmetries their
    /// footprint closes under.
    pub(crate) fn automorphisms(&self) -> Vec<Vec<usize>> {
        let mut permutations = Vec::with_capacity(12);
        for mirrored in [false, true] {
            for rotations in 0..6 {
                let permutation = self.permutation_under(|mut p| {
                    if mirrored {
                        p = reflect(p);
                    }
                    for _ in 0..rotations {
                        p = rotate60(p);
                    }
                    p
                });
                if let Some(permutation) = permutation {
                    permutations.push(permutation);
                }
            }
        }
        permutations
    }

    /// The compact-index permutation of the horizontal-axis mirror, if the footprint closes
    /// under it.
    pub(crate) fn horizontal_mirror_permutation(&self) -> Option<Vec<usize>> {
        self.permutation_under(mirror_horizontal)
    }

    /// The compact-index permutation of the vertical-axis mirror, if the footprint closes
    /// under it.
    pub(crate) fn vertical_mirror_permutation(&self) -> Option<Vec<usize>> {
        self.permutation_under(mirror_vertical)
    }
}

/// Whether a lattice position belongs to the coronenoid footprint of the given crown count.
/// The upper half (including the middle line `m = crowns - 1`) starts at column 0 and holds
/// `crowns + line` cells; the lower half starts at column `line - m` and runs to the last column.
fn in_footprint(crowns: usize, line: usize, column: usize) -> bool {
    let diameter = 2 * crowns - 1;
    if line >= diameter || column >= diameter {
        return false;
    }
    if line < crowns {
        column < crowns + line
    } else {
        column >= line - (crowns - 1)
    }
}

fn first_footprint_column(crowns: usize, line: usize) -> usize {
    line.saturating_sub(crowns - 1)
}
