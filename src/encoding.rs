use itertools::Itertools;
use unordered_pair::UnorderedPair;
use varisat::{Lit, Var};

use crate::bounds::BoundGraphs;
use crate::grid::HexGrid;
use crate::logic::{compare_count, lex_le, VarPool};
use crate::props::{ModelProperty, ModelPropertySet, PropertyKind, SymmetryKind};
use crate::transform::TransformationSite;

/// The CNF rendition of one run's constraints, plus the fixed decision-variable layout needed
/// to read assignments back out of a model.
///
/// Variables are allocated in a deterministic order: one per compact cell (presence), one per
/// upper-bound edge (channelled to its endpoints), one per transformation site (activation),
/// then the auxiliary pool for cardinality and ordering encodings.
pub(crate) struct Encoding {
    pub(crate) cell_vars: Vec<Var>,
    pub(crate) edge_vars: Vec<Var>,
    pub(crate) edges: Vec<UnorderedPair<usize>>,
    pub(crate) site_vars: Vec<Var>,
    pub(crate) clauses: Vec<Vec<Lit>>,
    pub(crate) pool: VarPool,
    pub(crate) lex_clause_count: usize,
}

/// The model value of a variable; varisat models are indexed by variable.
pub(crate) fn value(model: &[Lit], var: Var) -> bool {
    model.get(var.index()).map(|lit| lit.is_positive()).unwrap_or(false)
}

impl Encoding {
    pub(crate) fn build(
        grid: &HexGrid,
        bounds: &BoundGraphs,
        sites: &[TransformationSite],
        props: &ModelPropertySet,
        symmetry_breaking: bool,
    ) -> Self {
        let cell_count = grid.cell_count();
        let cell_vars: Vec<Var> = (0..cell_count).map(Var::from_index).collect();
        let edges: Vec<UnorderedPair<usize>> = bounds.upper.all_edges()
            .map(|(a, b, _)| UnorderedPair(a, b))
            .collect();
        let edge_vars: Vec<Var> = (0..edges.len())
            .map(|index| Var::from_index(cell_count + index))
            .collect();
        let site_vars: Vec<Var> = (0..sites.len())
            .map(|index| Var::from_index(cell_count + edges.len() + index))
            .collect();
        let mut pool = VarPool::starting_at(cell_count + edges.len() + sites.len());

        let mut clauses = Vec::new();

        // whatever the lower bound pins is present unconditionally
        for node in bounds.lower.nodes() {
            clauses.push(vec![cell_vars[node].positive()]);
        }
        for (a, b, _) in bounds.lower.all_edges() {
            let pair = UnorderedPair(a, b);
            if let Some(index) = edges.iter().position(|edge| *edge == pair) {
                clauses.push(vec![edge_vars[index].positive()]);
            }
        }

        // an edge is realized exactly when both endpoints are: e <=> u * v
        for (index, edge) in edges.iter().enumerate() {
            let e = edge_vars[index];
            let u = cell_vars[edge.0];
            let v = cell_vars[edge.1];
            clauses.push(vec![e.negative(), u.positive()]);
            clauses.push(vec![e.negative(), v.positive()]);
            clauses.push(vec![e.positive(), u.negative(), v.negative()]);
        }

        // the empty structure is never a solution; an activation realizes faces without
        // leaving its cells present, so it counts toward the floor
        clauses.push(
            cell_vars.iter()
                .chain(site_vars.iter())
                .map(|var| var.positive())
                .collect(),
        );

        // no holes of size one: an interior cell is present or has an absent neighbor
        for compact in 0..cell_count {
            let neighbors = grid.neighbors(compact);
            if neighbors.iter().all(Option::is_some) {
                let mut clause = vec![cell_vars[compact].positive()];
                clause.extend(neighbors.iter().flatten().map(|neighbor| cell_vars[*neighbor].negative()));
                clauses.push(clause);
            }
        }

        // anchor the structure against the top and left borders; a symmetry or pattern property
        // pins positions itself and makes this anchoring (and border no-goods) unsound
        let anchored = !props.has(PropertyKind::Symmetry) && !props.has(PropertyKind::Pattern);
        if anchored {
            for border in [grid.top_border(), grid.left_border()] {
                let mut clause: Vec<Lit> = border.iter().map(|compact| cell_vars[*compact].positive()).collect();
                // a face realized by an activation touches the border through either site cell
                clause.extend(sites.iter()
                    .enumerate()
                    .filter(|(_, site)| border.iter().any(|compact| site.touches(*compact)))
                    .map(|(index, _)| site_vars[index].positive()));
                clauses.push(clause);
            }
        }

        // activating a site removes both its hexagons and excludes contenders for either cell
        for (index, site) in sites.iter().enumerate() {
            let activation = site_vars[index];
            clauses.push(vec![activation.negative(), cell_vars[site.lower()].negative()]);
            clauses.push(vec![activation.negative(), cell_vars[site.upper()].negative()]);
            for (other_index, other) in sites.iter().enumerate().skip(index + 1) {
                if site.conflicts_with(other) {
                    clauses.push(vec![activation.negative(), site_vars[other_index].negative()]);
                }
            }
        }

        let cell_lits: Vec<Lit> = cell_vars.iter().map(|var| var.positive()).collect();
        let site_lits: Vec<Lit> = site_vars.iter().map(|var| var.positive()).collect();
        for property in props.iter() {
            match property {
                // each active site realizes exactly one pentagon and one heptagon, so both
                // counts are counts over activations; a positive demand with no sites at all
                // degenerates to the empty clause and the run enumerates nothing
                ModelProperty::Hexagons(expressions) => {
                    for expression in expressions {
                        clauses.extend(compare_count(&mut pool, &cell_lits, expression.op, expression.value));
                    }
                }
                ModelProperty::Pentagons(expressions) | ModelProperty::Heptagons(expressions) => {
                    for expression in expressions {
                        clauses.extend(compare_count(&mut pool, &site_lits, expression.op, expression.value));
                    }
                }
                ModelProperty::Symmetry(kind) => {
                    let permutation = match kind {
                        SymmetryKind::MirrorHorizontal => grid.horizontal_mirror_permutation(),
                        SymmetryKind::MirrorVertical => grid.vertical_mirror_permutation(),
                    };
                    match permutation {
                        Some(permutation) => {
                            for compact in 0..cell_count {
                                let image = permutation[compact];
                                if image > compact {
                                    clauses.push(vec![cell_vars[compact].negative(), cell_vars[image].positive()]);
                                    clauses.push(vec![cell_vars[compact].positive(), cell_vars[image].negative()]);
                                }
                            }
                            for (index, site) in sites.iter().enumerate() {
                                let image_pair =
                                    UnorderedPair(permutation[site.cells.0], permutation[site.cells.1]);
                                if let Some(image) = sites.iter().position(|other| other.cells == image_pair) {
                                    if image > index {
                                        clauses.push(vec![site_vars[index].negative(), site_vars[image].positive()]);
                                        clauses.push(vec![site_vars[index].positive(), site_vars[image].negative()]);
                                    }
                                }
                            }
                        }
                        // the trimmed footprint does not close under this mirror
                        None => clauses.push(Vec::new()),
                    }
                }
                ModelProperty::Pattern(positions) => {
                    for &(line, column) in positions {
                        let compact = grid.is_cell(line, column)
                            .then(|| grid.compact_of_sparse(grid.sparse_index(line, column)))
                            .flatten();
                        match compact {
                            Some(compact) => clauses.push(vec![cell_vars[compact].positive()]),
                            // a pattern position outside the grid cannot be satisfied
                            None => clauses.push(Vec::new()),
                        }
                    }
                }
            }
        }

        // canonical-form ordering: the assignment dominates its images under the grid
        // automorphisms. The maximal representative fills low compact indices first, which is
        // the same top-left placement the border anchoring selects.
        let mut lex_clause_count = 0;
        if symmetry_breaking && props.symmetry_breaking_allowed() {
            for permutation in grid.automorphisms().iter().skip(1) {
                let permuted: Vec<Lit> = permutation.iter().map(|image| cell_vars[*image].positive()).collect();
                let ordering = lex_le(&mut pool, &permuted, &cell_lits);
                lex_clause_count += ordering.len();
                clauses.extend(ordering);
            }
        }

        Self { cell_vars, edge_vars, edges, site_vars, clauses, pool, lex_clause_count }
    }

    /// One past the highest variable index in use, auxiliaries included.
    pub(crate) fn var_count(&self) -> usize {
        self.pool.allocated()
    }

    /// Read the present compact cells and the active site indices out of a model.
    pub(crate) fn decode(&self, model: &[Lit]) -> (Vec<usize>, Vec<usize>) {
        let present = self.cell_vars.iter()
            .enumerate()
            .filter(|(_, var)| value(model, **var))
            .map(|(compact, _)| compact)
            .collect_vec();
        let active = self.site_vars.iter()
            .enumerate()
            .filter(|(_, var)| value(model, **var))
            .map(|(index, _)| index)
            .collect_vec();
        (present, active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::{ComparisonOp, PropertyExpression};
    use crate::transform::identify_sites;

    fn encoding_for(crowns: usize, props: &ModelPropertySet) -> (HexGrid, Encoding) {
        let grid = HexGrid::new(crowns).unwrap();
        let bounds = BoundGraphs::from_grid(&grid);
        let sites = identify_sites(&grid);
        let encoding = Encoding::build(&grid, &bounds, &sites, props, false);
        (grid, encoding)
    }

    #[test]
    fn variable_layout_is_contiguous() {
        let (grid, encoding) = encoding_for(2, &ModelPropertySet::new());
        assert_eq!(encoding.cell_vars.len(), grid.cell_count());
        assert_eq!(encoding.edge_vars.len(), encoding.edges.len());
        assert_eq!(encoding.edges.len(), 12);
        assert_eq!(encoding.site_vars.len(), 12);
        let decision = grid.cell_count() + encoding.edges.len() + encoding.site_vars.len();
        assert!(encoding.var_count() >= decision);
        assert_eq!(encoding.site_vars.last().map(|var| var.index()), Some(decision - 1));
    }

    #[test]
    fn channeling_produces_three_clauses_per_edge() {
        let (_, encoding) = encoding_for(2, &ModelPropertySet::new());
        for (index, edge) in encoding.edges.iter().enumerate() {
            let e = encoding.edge_vars[index];
            let u = encoding.cell_vars[edge.0];
            let v = encoding.cell_vars[edge.1];
            assert!(encoding.clauses.contains(&vec![e.negative(), u.positive()]));
            assert!(encoding.clauses.contains(&vec![e.negative(), v.positive()]));
            assert!(encoding.clauses.contains(&vec![e.positive(), u.negative(), v.negative()]));
        }
    }

    #[test]
    fn pentagon_demand_without_sites_is_the_empty_clause() {
        let mut props = ModelPropertySet::new();
        props.add(ModelProperty::Pentagons(vec![PropertyExpression::new(ComparisonOp::Eq, 1)]));
        // a one-crown grid has a single cell and no adjacent pairs
        let (_, encoding) = encoding_for(1, &props);
        assert!(encoding.site_vars.is_empty());
        assert!(encoding.clauses.iter().any(Vec::is_empty));
    }

    #[test]
    fn borders_are_dropped_under_a_pattern_property() {
        let (grid, plain) = encoding_for(2, &ModelPropertySet::new());
        let sites = identify_sites(&grid);
        let border = grid.top_border();
        let mut top: Vec<Lit> = border.iter().map(|compact| plain.cell_vars[*compact].positive()).collect();
        top.extend(sites.iter()
            .enumerate()
            .filter(|(_, site)| border.iter().any(|compact| site.touches(*compact)))
            .map(|(index, _)| plain.site_vars[index].positive()));
        assert!(plain.clauses.contains(&top));

        let mut props = ModelPropertySet::new();
        props.add(ModelProperty::Pattern(vec![(1, 1)]));
        let (_, patterned) = encoding_for(2, &props);
        assert!(!patterned.clauses.contains(&top));
        // the pattern cell itself is pinned
        let pinned = grid.compact_of_sparse(grid.sparse_index(1, 1)).unwrap();
        assert!(patterned.clauses.contains(&vec![patterned.cell_vars[pinned].positive()]));
    }

    #[test]
    fn symmetry_breaking_adds_counted_clauses() {
        let grid = HexGrid::new(2).unwrap();
        let bounds = BoundGraphs::from_grid(&grid);
        let sites = identify_sites(&grid);
        let props = ModelPropertySet::new();
        let without = Encoding::build(&grid, &bounds, &sites, &props, false);
        let with = Encoding::build(&grid, &bounds, &sites, &props, true);
        assert_eq!(without.lex_clause_count, 0);
        assert!(with.lex_clause_count > 0);
        assert_eq!(with.clauses.len(), without.clauses.len() + with.lex_clause_count);
    }

    #[test]
    fn decode_reads_back_decision_variables() {
        let (grid, encoding) = encoding_for(2, &ModelPropertySet::new());
        // a synthetic model: cells 0 and 3 present, site 0 active, everything else false
        let mut model: Vec<Lit> = (0..encoding.var_count()).map(|index| Var::from_index(index).negative()).collect();
        model[encoding.cell_vars[0].index()] = encoding.cell_vars[0].positive();
        model[encoding.cell_vars[3].index()] = encoding.cell_vars[3].positive();
        model[encoding.site_vars[0].index()] = encoding.site_vars[0].positive();
        let (present, active) = encoding.decode(&model);
        assert_eq!(present, vec![0, 3]);
        assert_eq!(active, vec![0]);
        assert_eq!(grid.cell_count(), 7);
    }
}
