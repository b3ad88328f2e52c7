//! Clauses that keep the enumeration moving: every decoded assignment is ruled out before the
//! engine is asked again, and the active strategy widens each cut as far as the posted
//! constraints allow.

use std::collections::{HashMap, HashSet};

use unordered_pair::UnorderedPair;
use varisat::Lit;

use crate::encoding::{value, Encoding};
use crate::grid::HexGrid;
use crate::props::{ModelProperty, ModelPropertySet, PropertyKind, SymmetryKind};
use crate::transform::TransformationSite;

/// How an accepted assignment is generalized into blocking clauses.
///
/// The catch-all clause over the exact assignment is layered on in every mode by the caller;
/// the strategy only adds whatever wider cuts its precondition makes sound.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum NoGoodStrategy {
    /// Rule out every translation of the found footprint that fits the grid against the top and
    /// left borders. Sound exactly when the border anchoring clauses are posted.
    Border,
    /// Rule out the found assignment and its image under the horizontal-axis mirror.
    HorizontalAxis,
    /// Rule out the found assignment and its image under the vertical-axis mirror.
    VerticalAxis,
    /// Rule out the exact present-cell set, regardless of site decoration.
    Unique,
}

/// The strategy matching the active property set: a mirror property claims its axis, a pattern
/// property pins positions and leaves only exact uniqueness, and an unconstrained run gets the
/// border cut that pairs with border anchoring.
pub(crate) fn select(props: &ModelPropertySet) -> NoGoodStrategy {
    match props.get(PropertyKind::Symmetry) {
        Some(ModelProperty::Symmetry(SymmetryKind::MirrorHorizontal)) => NoGoodStrategy::HorizontalAxis,
        Some(ModelProperty::Symmetry(SymmetryKind::MirrorVertical)) => NoGoodStrategy::VerticalAxis,
        _ if props.has(PropertyKind::Pattern) => NoGoodStrategy::Unique,
        _ => NoGoodStrategy::Border,
    }
}

/// The clause forbidding this exact decision assignment (cells and sites), the minimal cut that
/// guarantees progress.
pub(crate) fn catch_all(encoding: &Encoding, model: &[Lit]) -> Vec<Lit> {
    encoding.cell_vars.iter()
        .chain(encoding.site_vars.iter())
        .map(|var| var.lit(!value(model, *var)))
        .collect()
}

/// The widening clauses of one strategy for a decoded assignment. May be empty when the
/// geometry gives the strategy nothing beyond the catch-all.
pub(crate) fn widening_clauses(
    strategy: NoGoodStrategy,
    grid: &HexGrid,
    encoding: &Encoding,
    sites: &[TransformationSite],
    model: &[Lit],
) -> Vec<Vec<Lit>> {
    match strategy {
        NoGoodStrategy::Border => border_clauses(grid, encoding, model),
        NoGoodStrategy::HorizontalAxis => {
            mirror_clause(grid.horizontal_mirror_permutation(), encoding, sites, model)
        }
        NoGoodStrategy::VerticalAxis => {
            mirror_clause(grid.vertical_mirror_permutation(), encoding, sites, model)
        }
        NoGoodStrategy::Unique => {
            vec![encoding.cell_vars.iter().map(|var| var.lit(!value(model, *var))).collect()]
        }
    }
}

/// One clause per translation of the found footprint that keeps every cell on the grid while
/// touching the top and left borders: the translated cell assignment is forbidden, with the
/// current site assignment appended so the same placement under different site decoration stays
/// reachable.
fn border_clauses(grid: &HexGrid, encoding: &Encoding, model: &[Lit]) -> Vec<Vec<Lit>> {
    let present: Vec<usize> = (0..grid.cell_count())
        .filter(|compact| value(model, encoding.cell_vars[*compact]))
        .collect();
    if present.is_empty() {
        return Vec::new();
    }

    let site_tail: Vec<Lit> = encoding.site_vars.iter()
        .map(|var| var.lit(!value(model, *var)))
        .collect();
    let origin = grid.axial(present[0]);
    let offsets: Vec<(isize, isize)> = present.iter()
        .map(|compact| {
            let (x, y) = grid.axial(*compact);
            (x - origin.0, y - origin.1)
        })
        .collect();

    let mut clauses = Vec::new();
    for anchor in 0..grid.cell_count() {
        let (ax, ay) = grid.axial(anchor);
        let translated: Option<HashSet<usize>> = offsets.iter()
            .map(|&(dx, dy)| grid.cell_at_axial((ax + dx, ay + dy)))
            .collect();
        let Some(translated) = translated else { continue };

        let touches_top = translated.iter().any(|compact| grid.coords_of_compact(*compact).0 == 0);
        let touches_left = translated.iter().any(|compact| {
            let (line, column) = grid.coords_of_compact(*compact);
            column == grid.first_column(line)
        });
        if !(touches_top && touches_left) {
            continue;
        }

        let mut clause: Vec<Lit> = encoding.cell_vars.iter()
            .enumerate()
            .map(|(compact, var)| var.lit(!translated.contains(&compact)))
            .collect();
        clause.extend(site_tail.iter().copied());
        clauses.push(clause);
    }
    clauses
}

/// The clause forbidding the mirror image of the found assignment, cells and sites mapped
/// through the grid automorphism. Falls back to nothing when the footprint does not close under
/// the mirror; the caller's catch-all still guarantees progress.
fn mirror_clause(
    permutation: Option<Vec<usize>>,
    encoding: &Encoding,
    sites: &[TransformationSite],
    model: &[Lit],
) -> Vec<Vec<Lit>> {
    let Some(permutation) = permutation else {
        return Vec::new();
    };

    let site_index: HashMap<UnorderedPair<usize>, usize> = sites.iter()
        .enumerate()
        .map(|(index, site)| (site.cells, index))
        .collect();

    let mut clause: Vec<Lit> = encoding.cell_vars.iter()
        .enumerate()
        .map(|(compact, var)| var.lit(!value(model, encoding.cell_vars[permutation[compact]])))
        .collect();
    for (index, site) in sites.iter().enumerate() {
        let image_pair = UnorderedPair(permutation[site.cells.0], permutation[site.cells.1]);
        let Some(&image) = site_index.get(&image_pair) else {
            // the mirror does not preserve the site inventory; give up on this cut
            return Vec::new();
        };
        clause.push(encoding.site_vars[index].lit(!value(model, encoding.site_vars[image])));
    }
    vec![clause]
}

#[cfg(test)]
mod tests {
    use varisat::Var;

    use super::*;
    use crate::bounds::BoundGraphs;
    use crate::transform::identify_sites;

    fn setup() -> (HexGrid, Vec<TransformationSite>, Encoding) {
        let grid = HexGrid::new(2).unwrap();
        let bounds = BoundGraphs::from_grid(&grid);
        let sites = identify_sites(&grid);
        let encoding = Encoding::build(&grid, &bounds, &sites, &ModelPropertySet::new(), false);
        (grid, sites, encoding)
    }

    fn model_with(encoding: &Encoding, cells: &[usize], active_sites: &[usize]) -> Vec<Lit> {
        let mut model: Vec<Lit> = (0..encoding.var_count())
            .map(|index| Var::from_index(index).negative())
            .collect();
        for compact in cells {
            model[encoding.cell_vars[*compact].index()] = encoding.cell_vars[*compact].positive();
        }
        for index in active_sites {
            model[encoding.site_vars[*index].index()] = encoding.site_vars[*index].positive();
        }
        model
    }

    fn violates(clause: &[Lit], model: &[Lit]) -> bool {
        !clause.iter().any(|lit| value(model, lit.var()) == lit.is_positive())
    }

    #[test]
    fn strategy_selection_follows_the_properties() {
        let mut props = ModelPropertySet::new();
        assert_eq!(select(&props), NoGoodStrategy::Border);
        props.add(ModelProperty::Pattern(vec![(0, 0)]));
        assert_eq!(select(&props), NoGoodStrategy::Unique);
        props.add(ModelProperty::Symmetry(SymmetryKind::MirrorHorizontal));
        assert_eq!(select(&props), NoGoodStrategy::HorizontalAxis);
        let mut vertical = ModelPropertySet::new();
        vertical.add(ModelProperty::Symmetry(SymmetryKind::MirrorVertical));
        assert_eq!(select(&vertical), NoGoodStrategy::VerticalAxis);
    }

    #[test]
    fn catch_all_blocks_exactly_the_found_assignment() {
        let (_, _, encoding) = setup();
        let model = model_with(&encoding, &[0, 1], &[]);
        let clause = catch_all(&encoding, &model);
        assert!(violates(&clause, &model));
        let other = model_with(&encoding, &[0, 2], &[]);
        assert!(!violates(&clause, &other));
        let decorated = model_with(&encoding, &[0, 1], &[5]);
        assert!(!violates(&clause, &decorated));
    }

    #[test]
    fn border_clauses_cover_every_fitting_translation() {
        let (grid, sites, encoding) = setup();
        // the top-left pair of the two-crown grid
        let model = model_with(&encoding, &[0, 1], &[]);
        let clauses = widening_clauses(NoGoodStrategy::Border, &grid, &encoding, &sites, &model);
        assert!(!clauses.is_empty());
        // the found placement itself is among the cuts
        assert!(clauses.iter().any(|clause| violates(clause, &model)));
        // a translated copy of the same footprint is also cut when it touches both borders
        let translated = model_with(&encoding, &[2, 3], &[]);
        let cut = clauses.iter().any(|clause| violates(clause, &translated));
        let fits = grid.coords_of_compact(2).1 == grid.first_column(grid.coords_of_compact(2).0);
        assert_eq!(cut, fits && grid.coords_of_compact(2).0 == 0);
    }

    #[test]
    fn unique_ignores_site_decoration() {
        let (grid, sites, encoding) = setup();
        let model = model_with(&encoding, &[0, 1], &[]);
        let clauses = widening_clauses(NoGoodStrategy::Unique, &grid, &encoding, &sites, &model);
        assert_eq!(clauses.len(), 1);
        let decorated = model_with(&encoding, &[0, 1], &[5]);
        assert!(violates(&clauses[0], &decorated));
    }

    #[test]
    fn axis_clause_blocks_the_mirror_image() {
        let (grid, sites, encoding) = setup();
        let permutation = grid.horizontal_mirror_permutation().unwrap();
        let model = model_with(&encoding, &[0, 1], &[]);
        let clauses = widening_clauses(NoGoodStrategy::HorizontalAxis, &grid, &encoding, &sites, &model);
        assert_eq!(clauses.len(), 1);
        let mirrored_cells: Vec<usize> = [0usize, 1].iter().map(|compact| {
            permutation.iter().position(|image| image == compact).unwrap()
        }).collect();
        let mirrored = model_with(&encoding, &mirrored_cells, &[]);
        assert!(violates(&clauses[0], &mirrored));
    }
}
