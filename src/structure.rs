use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use itertools::Itertools;
use log::warn;
use strum::VariantArray;
use unordered_pair::UnorderedPair;

use crate::grid::{reflect, rotate60, HexDirection, HexGrid};

/// The ring size of one face of a structure, classified purely by its vertex count.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CycleType {
    /// A five-cycle (pentagon).
    C5,
    /// A six-cycle (hexagon).
    C6,
    /// A seven-cycle (heptagon).
    C7,
    /// Any other ring size; only produced by malformed geometry.
    Unknown,
}

impl CycleType {
    pub(crate) fn from_len(len: usize) -> Self {
        match len {
            5 => Self::C5,
            6 => Self::C6,
            7 => Self::C7,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for CycleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::C5 => "pentagon",
            Self::C6 => "hexagon",
            Self::C7 => "heptagon",
            Self::Unknown => "unknown cycle",
        })
    }
}

/// One ring of a realized structure.
///
/// `base` always holds the six corner vertices of the hosting grid cell in slot order; the dual
/// graph is read off these. `vertices` is the ring actually realized, which differs from the
/// base exactly when a transformation rewrote this face.
#[derive(Clone, Debug)]
pub struct Face {
    sparse: usize,
    base: [usize; 6],
    vertices: Vec<usize>,
    cycle: CycleType,
}

impl Face {
    /// The sparse grid index of the cell hosting this face.
    pub fn sparse(&self) -> usize {
        self.sparse
    }

    /// The realized ring, as interned vertex ids in cyclic order.
    pub fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    /// The ring size classification of this face.
    pub fn cycle(&self) -> CycleType {
        self.cycle
    }
}

/// A realized structure: the faces decoded from one accepted assignment, their dual graph,
/// lattice coordinates, and lazily computed canonical names.
///
/// Two structures compare equal when their canonical name sets intersect, i.e. when some
/// rotation, reflection or translation maps one footprint onto the other.
pub struct Structure {
    faces: Vec<Face>,
    dual: Vec<[Option<usize>; 6]>,
    coords: Vec<Option<(isize, isize)>>,
    members: Vec<usize>,
    active_sites: Vec<UnorderedPair<usize>>,
    vertex_count: usize,
    bond_count: usize,
    names: OnceLock<Vec<String>>,
}

impl Structure {
    /// Build the structure realized by an assignment: the present cells plus the cells of every
    /// active transformation site, with the site pairs rewritten into pentagon/heptagon faces.
    ///
    /// Geometry that cannot be resolved (a site pair that is not adjacent, a face that was
    /// already rewritten) is skipped with a warning rather than aborting the run.
    pub(crate) fn from_solution(grid: &HexGrid, present_cells: &[usize], active_sites: &[UnorderedPair<usize>]) -> Self {
        let members: Vec<usize> = present_cells.iter()
            .copied()
            .chain(active_sites.iter().flat_map(|pair| [pair.0, pair.1]))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let face_of_member: HashMap<usize, usize> = members.iter()
            .enumerate()
            .map(|(index, member)| (*member, index))
            .collect();

        // intern corners by their grid-canonical (sparse, slot) key so shared corners of
        // adjacent cells resolve to one vertex
        let mut interner: HashMap<(usize, usize), usize> = HashMap::new();
        let mut faces: Vec<Face> = members.iter()
            .map(|&member| {
                let mut base = [0usize; 6];
                for slot in 0..6 {
                    let key = canonical_corner(grid, member, slot);
                    let next = interner.len();
                    base[slot] = *interner.entry(key).or_insert(next);
                }
                Face {
                    sparse: grid.sparse_of_compact(member),
                    base,
                    vertices: base.to_vec(),
                    cycle: CycleType::C6,
                }
            })
            .collect();

        // dual adjacency from the base rings: the face sharing both endpoints of a side
        let mut faces_of_edge: HashMap<UnorderedPair<usize>, Vec<usize>> = HashMap::new();
        for (index, face) in faces.iter().enumerate() {
            for slot in 0..6 {
                faces_of_edge
                    .entry(UnorderedPair(face.base[slot], face.base[(slot + 1) % 6]))
                    .or_default()
                    .push(index);
            }
        }
        let dual: Vec<[Option<usize>; 6]> = faces.iter()
            .enumerate()
            .map(|(index, face)| {
                let mut slots = [None; 6];
                for slot in 0..6 {
                    let edge = UnorderedPair(face.base[slot], face.base[(slot + 1) % 6]);
                    match faces_of_edge.get(&edge).map(Vec::as_slice) {
                        Some([_]) => {}
                        Some([a, b]) => slots[slot] = Some(if *a == index { *b } else { *a }),
                        _ => warn!("side {slot} of face {index} is shared by more than two faces; skipping"),
                    }
                }
                slots
            })
            .collect();

        let coords = assign_coordinates(&dual, 0);

        // rewrite each active site pair: the lower cell loses the shared corner and becomes a
        // pentagon, the upper cell gains a fresh vertex on the shared side and becomes a heptagon
        let mut next_vertex = interner.len();
        for pair in active_sites {
            let (a, b) = (pair.0.min(pair.1), pair.0.max(pair.1));
            let Some(direction) = grid.direction_between(a, b) else {
                warn!("active site ({a}, {b}) is not an adjacent pair; skipping");
                continue;
            };
            let (Some(&fa), Some(&fb)) = (face_of_member.get(&a), face_of_member.get(&b)) else {
                warn!("active site ({a}, {b}) references a missing face; skipping");
                continue;
            };
            if faces[fa].vertices.len() != 6 || faces[fb].vertices.len() != 6 {
                warn!("active site ({a}, {b}) touches an already rewritten face; skipping");
                continue;
            }
            faces[fa].vertices.remove(direction.index());
            faces[fa].cycle = CycleType::from_len(faces[fa].vertices.len());
            faces[fb].vertices.insert((direction.index() + 4) % 6, next_vertex);
            faces[fb].cycle = CycleType::from_len(faces[fb].vertices.len());
            next_vertex += 1;
        }

        let mut vertices_in_use = HashSet::new();
        let mut bonds = HashSet::new();
        for face in &faces {
            for (index, vertex) in face.vertices.iter().enumerate() {
                vertices_in_use.insert(*vertex);
                bonds.insert(UnorderedPair(*vertex, face.vertices[(index + 1) % face.vertices.len()]));
            }
        }

        Self {
            faces,
            dual,
            coords,
            members,
            active_sites: active_sites.to_vec(),
            vertex_count: vertices_in_use.len(),
            bond_count: bonds.len(),
            names: OnceLock::new(),
        }
    }

    /// The faces of the structure, ordered by sparse grid index.
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// The number of faces.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// The number of faces with the given ring size.
    pub fn cycle_count(&self, cycle: CycleType) -> usize {
        self.faces.iter().filter(|face| face.cycle == cycle).count()
    }

    /// The compact indices of every cell taking part in the structure, present and rewritten
    /// alike, in ascending order.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// The active transformation sites, as compact cell pairs.
    pub fn active_sites(&self) -> &[UnorderedPair<usize>] {
        &self.active_sites
    }

    /// The face sharing side `slot` of face `index`, if it is part of the structure.
    pub fn dual_neighbor(&self, index: usize, slot: usize) -> Option<usize> {
        self.dual[index][slot % 6]
    }

    /// The lattice coordinates assigned to each face, relative to the first face.
    /// `None` marks a face the dual-graph traversal never reached.
    pub fn coordinates(&self) -> &[Option<(isize, isize)>] {
        &self.coords
    }

    /// Whether every face is reachable from the first through shared sides.
    pub fn is_connected(&self) -> bool {
        !self.faces.is_empty() && self.coords.iter().all(Option::is_some)
    }

    /// The number of distinct ring vertices in use (the atom count of the carbon skeleton).
    pub fn carbons(&self) -> usize {
        self.vertex_count
    }

    /// The number of distinct ring sides in use (the bond count of the carbon skeleton).
    pub fn bonds(&self) -> usize {
        self.bond_count
    }

    /// The canonical names of this structure, computed once and memoized.
    ///
    /// Each name records one way of laying the face footprint onto a reference coronenoid grid:
    /// for each of the twelve lattice symmetries and every translation that keeps all faces on
    /// grid cells while touching both the top and the left border, the sorted dash-joined sparse
    /// indices of the occupied reference cells. The result is sorted and duplicate-free.
    pub fn names(&self) -> &[String] {
        self.names.get_or_init(|| self.compute_names())
    }

    fn compute_names(&self) -> Vec<String> {
        let coords: Vec<(isize, isize)> = self.coords.iter().copied().flatten().collect();
        if coords.len() != self.faces.len() || coords.is_empty() {
            warn!("structure is not connected; no canonical names");
            return Vec::new();
        }

        let reference = match HexGrid::new(self.faces.len() / 2 + 1) {
            Ok(grid) => grid,
            Err(_) => return Vec::new(),
        };
        let diameter = reference.diameter();

        let mut names = BTreeSet::new();
        for mirrored in [false, true] {
            for rotations in 0..6 {
                let placed: Vec<(isize, isize)> = coords.iter()
                    .map(|&point| {
                        let mut point = point;
                        if mirrored {
                            point = reflect(point);
                        }
                        for _ in 0..rotations {
                            point = rotate60(point);
                        }
                        point
                    })
                    .collect();

                let (x0, y0) = placed[0];
                for anchor in 0..reference.cell_count() {
                    let (anchor_line, anchor_column) = reference.coords_of_compact(anchor);
                    let cells: Option<Vec<usize>> = placed.iter()
                        .map(|&(x, y)| {
                            let line = anchor_line as isize + (y - y0);
                            let column = anchor_column as isize + (x - x0);
                            (line >= 0 && column >= 0 && reference.is_cell(line as usize, column as usize))
                                .then(|| reference.sparse_index(line as usize, column as usize))
                        })
                        .collect();
                    if let Some(mut cells) = cells {
                        let touches_top = cells.iter().any(|sparse| sparse / diameter == 0);
                        let touches_left = cells.iter()
                            .any(|sparse| sparse % diameter == reference.first_column(sparse / diameter));
                        if touches_top && touches_left {
                            cells.sort_unstable();
                            names.insert(cells.iter().join("-"));
                        }
                    }
                }
            }
        }

        names.into_iter().collect()
    }
}

impl PartialEq for Structure {
    fn eq(&self, other: &Self) -> bool {
        let mine: HashSet<&String> = self.names().iter().collect();
        other.names().iter().any(|name| mine.contains(name))
    }
}

impl fmt::Debug for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Structure")
            .field("members", &self.members)
            .field("active_sites", &self.active_sites)
            .field("faces", &self.faces.len())
            .finish()
    }
}

/// The grid-canonical identity of corner `slot` of a compact cell: the least `(sparse, slot)`
/// incidence among the up-to-three cells meeting at that corner. Corner `k` lies between the
/// sides toward slots `k - 1` and `k`, so its other incidences are slot `(k + 4) % 6` of the
/// slot-`k` neighbor and slot `(k + 2) % 6` of the slot-`(k - 1)` neighbor.
fn canonical_corner(grid: &HexGrid, compact: usize, slot: usize) -> (usize, usize) {
    let mut best = (grid.sparse_of_compact(compact), slot);
    if let Some(neighbor) = grid.neighbor(compact, HexDirection::from_index(slot)) {
        best = best.min((grid.sparse_of_compact(neighbor), (slot + 4) % 6));
    }
    if let Some(neighbor) = grid.neighbor(compact, HexDirection::from_index(slot + 5)) {
        best = best.min((grid.sparse_of_compact(neighbor), (slot + 2) % 6));
    }
    best
}

/// Breadth-first assignment of lattice coordinates over a slot-indexed adjacency table,
/// starting from `start` at the origin. Unreached entries stay `None`.
pub(crate) fn assign_coordinates(
    adjacency: &[[Option<usize>; 6]],
    start: usize,
) -> Vec<Option<(isize, isize)>> {
    let mut coords = vec![None; adjacency.len()];
    if adjacency.is_empty() {
        return coords;
    }

    coords[start] = Some((0, 0));
    let mut queue = vec![start];
    let mut index = 0;
    while index < queue.len() {
        let current = queue[index];
        index += 1;
        let Some((x, y)) = coords[current] else { continue };
        for direction in HexDirection::VARIANTS {
            if let Some(next) = adjacency[current][direction.index()] {
                if coords[next].is_none() {
                    let (dx, dy) = direction.delta();
                    coords[next] = Some((x + dx, y + dy));
                    queue.push(next);
                }
            }
        }
    }

    coords
}
