use std::collections::HashSet;

use unordered_pair::UnorderedPair;

use crate::grid::HexGrid;
use crate::structure::{CycleType, Structure};

/// How a counted quantity compares against a target value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ComparisonOp {
    /// Equal to the target.
    Eq,
    /// At most the target.
    Le,
    /// At least the target.
    Ge,
    /// Strictly below the target.
    Lt,
    /// Strictly above the target.
    Gt,
}

impl ComparisonOp {
    /// Evaluate the comparison on a realized count.
    pub fn test(&self, count: usize, value: usize) -> bool {
        match self {
            Self::Eq => count == value,
            Self::Le => count <= value,
            Self::Ge => count >= value,
            Self::Lt => count < value,
            Self::Gt => count > value,
        }
    }
}

/// One comparison a counted quantity must satisfy, such as "at most 9".
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct PropertyExpression {
    /// The comparison operator.
    pub op: ComparisonOp,
    /// The target value.
    pub value: usize,
}

impl PropertyExpression {
    /// Build an expression from an operator and target value.
    pub fn new(op: ComparisonOp, value: usize) -> Self {
        Self { op, value }
    }

    /// Evaluate the expression on a realized count.
    pub fn test(&self, count: usize) -> bool {
        self.op.test(count, self.value)
    }

    // the largest count still satisfying the expression, if one exists
    fn upper_bound(&self) -> Option<usize> {
        match self.op {
            ComparisonOp::Eq | ComparisonOp::Le => Some(self.value),
            ComparisonOp::Lt => self.value.checked_sub(1),
            ComparisonOp::Ge | ComparisonOp::Gt => None,
        }
    }
}

/// The mirror axis a symmetry property demands.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SymmetryKind {
    /// Invariance under reflection across the horizontal axis.
    MirrorHorizontal,
    /// Invariance under reflection across the vertical axis.
    MirrorVertical,
}

/// A kind of demand a run may place on every enumerated structure.
///
/// Exactly one property of each kind may be active at a time. Each variant carries both a
/// constraint-side reading (posted into the encoding before the search) and a filter-side
/// reading ([`check`](ModelProperty::check)) applied to every realized structure, so a property
/// holds even when its constraint encoding is an under-approximation.
#[derive(Clone, Debug)]
pub enum ModelProperty {
    /// Comparisons on the number of hexagonal faces.
    Hexagons(Vec<PropertyExpression>),
    /// Comparisons on the number of pentagonal faces.
    Pentagons(Vec<PropertyExpression>),
    /// Comparisons on the number of heptagonal faces.
    Heptagons(Vec<PropertyExpression>),
    /// Invariance of the structure under a grid mirror.
    Symmetry(SymmetryKind),
    /// A fixed set of `(line, column)` grid positions that must all be present.
    Pattern(Vec<(usize, usize)>),
}

/// Discriminant of [`ModelProperty`], used to replace a property of the same kind.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PropertyKind {
    /// A hexagon-count property.
    Hexagons,
    /// A pentagon-count property.
    Pentagons,
    /// A heptagon-count property.
    Heptagons,
    /// A symmetry property.
    Symmetry,
    /// A pattern property.
    Pattern,
}

impl ModelProperty {
    /// The kind of this property.
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Hexagons(_) => PropertyKind::Hexagons,
            Self::Pentagons(_) => PropertyKind::Pentagons,
            Self::Heptagons(_) => PropertyKind::Heptagons,
            Self::Symmetry(_) => PropertyKind::Symmetry,
            Self::Pattern(_) => PropertyKind::Pattern,
        }
    }

    /// Whether a realized structure satisfies this property.
    pub(crate) fn check(&self, structure: &Structure, grid: &HexGrid) -> bool {
        match self {
            Self::Hexagons(expressions) => {
                let count = structure.cycle_count(CycleType::C6);
                expressions.iter().all(|expression| expression.test(count))
            }
            Self::Pentagons(expressions) => {
                let count = structure.cycle_count(CycleType::C5);
                expressions.iter().all(|expression| expression.test(count))
            }
            Self::Heptagons(expressions) => {
                let count = structure.cycle_count(CycleType::C7);
                expressions.iter().all(|expression| expression.test(count))
            }
            Self::Symmetry(kind) => {
                let permutation = match kind {
                    SymmetryKind::MirrorHorizontal => grid.horizontal_mirror_permutation(),
                    SymmetryKind::MirrorVertical => grid.vertical_mirror_permutation(),
                };
                let Some(permutation) = permutation else {
                    return false;
                };
                let members: HashSet<usize> = structure.members().iter().copied().collect();
                let mirrored_members = members.iter().all(|member| members.contains(&permutation[*member]));
                let sites: HashSet<UnorderedPair<usize>> = structure.active_sites().iter().copied().collect();
                let mirrored_sites = sites.iter()
                    .all(|pair| sites.contains(&UnorderedPair(permutation[pair.0], permutation[pair.1])));
                mirrored_members && mirrored_sites
            }
            Self::Pattern(positions) => {
                let members: HashSet<usize> = structure.members().iter().copied().collect();
                positions.iter().all(|&(line, column)| {
                    grid.is_cell(line, column)
                        && grid.compact_of_sparse(grid.sparse_index(line, column))
                        .is_some_and(|compact| members.contains(&compact))
                })
            }
        }
    }
}

/// The set of properties steering one run, at most one per [`PropertyKind`].
#[derive(Clone, Debug, Default)]
pub struct ModelPropertySet {
    properties: Vec<ModelProperty>,
}

impl ModelPropertySet {
    /// An empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property, replacing any existing property of the same kind.
    pub fn add(&mut self, property: ModelProperty) -> &mut Self {
        self.properties.retain(|existing| existing.kind() != property.kind());
        self.properties.push(property);
        self
    }

    /// Whether a property of this kind is active.
    pub fn has(&self, kind: PropertyKind) -> bool {
        self.properties.iter().any(|property| property.kind() == kind)
    }

    /// The active property of this kind, if any.
    pub fn get(&self, kind: PropertyKind) -> Option<&ModelProperty> {
        self.properties.iter().find(|property| property.kind() == kind)
    }

    /// Iterate over the active properties.
    pub fn iter(&self) -> impl Iterator<Item=&ModelProperty> {
        self.properties.iter()
    }

    /// The tightest upper bound the hexagon-count property places, if it places one.
    pub fn hexagon_upper_bound(&self) -> Option<usize> {
        match self.get(PropertyKind::Hexagons) {
            Some(ModelProperty::Hexagons(expressions)) => {
                expressions.iter().filter_map(PropertyExpression::upper_bound).min()
            }
            _ => None,
        }
    }

    /// The crown count of the smallest coronenoid grid hosting every structure of at most
    /// `hexagon_upper_bound()` hexagons.
    pub fn derived_crowns(&self) -> Option<usize> {
        self.hexagon_upper_bound().map(|bound| (bound + 2) / 2)
    }

    /// Whether lexicographic symmetry breaking may be layered on.
    /// A symmetry property pins one specific mirror and a pattern property pins positions, so
    /// either one rules out reordering solutions across grid automorphisms.
    pub fn symmetry_breaking_allowed(&self) -> bool {
        !self.has(PropertyKind::Symmetry) && !self.has(PropertyKind::Pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_replaces_same_kind() {
        let mut properties = ModelPropertySet::new();
        properties.add(ModelProperty::Hexagons(vec![PropertyExpression::new(ComparisonOp::Eq, 5)]));
        properties.add(ModelProperty::Hexagons(vec![PropertyExpression::new(ComparisonOp::Le, 9)]));
        assert_eq!(properties.iter().count(), 1);
        assert_eq!(properties.hexagon_upper_bound(), Some(9));
    }

    #[test]
    fn upper_bound_takes_the_tightest_expression() {
        let mut properties = ModelPropertySet::new();
        properties.add(ModelProperty::Hexagons(vec![
            PropertyExpression::new(ComparisonOp::Ge, 3),
            PropertyExpression::new(ComparisonOp::Lt, 8),
            PropertyExpression::new(ComparisonOp::Le, 9),
        ]));
        assert_eq!(properties.hexagon_upper_bound(), Some(7));

        let mut unbounded = ModelPropertySet::new();
        unbounded.add(ModelProperty::Hexagons(vec![PropertyExpression::new(ComparisonOp::Ge, 3)]));
        assert_eq!(unbounded.hexagon_upper_bound(), None);
    }

    #[test]
    fn derived_crowns_match_known_sizes() {
        for (hexagons, crowns) in [(1, 1), (2, 2), (3, 2), (6, 4), (7, 4)] {
            let mut properties = ModelPropertySet::new();
            properties.add(ModelProperty::Hexagons(vec![PropertyExpression::new(ComparisonOp::Eq, hexagons)]));
            assert_eq!(properties.derived_crowns(), Some(crowns), "{hexagons} hexagons");
        }
    }

    #[test]
    fn symmetry_and_pattern_disable_symmetry_breaking() {
        let mut properties = ModelPropertySet::new();
        assert!(properties.symmetry_breaking_allowed());
        properties.add(ModelProperty::Symmetry(SymmetryKind::MirrorHorizontal));
        assert!(!properties.symmetry_breaking_allowed());

        let mut patterned = ModelPropertySet::new();
        patterned.add(ModelProperty::Pattern(vec![(0, 0)]));
        assert!(!patterned.symmetry_breaking_allowed());
    }

    #[test]
    fn comparison_operators_evaluate() {
        assert!(ComparisonOp::Eq.test(3, 3));
        assert!(!ComparisonOp::Lt.test(3, 3));
        assert!(ComparisonOp::Le.test(3, 3));
        assert!(ComparisonOp::Gt.test(4, 3));
        assert!(ComparisonOp::Ge.test(3, 3));
    }
}
