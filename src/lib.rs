#![warn(missing_docs)]

//! # `coronene`
//!
//! An exhaustive enumerator for benzenoid-like polycyclic structures on hexagonal grids.
//! Describe what you want with a [`ModelPropertySet`] (hexagon/pentagon/heptagon counts, mirror
//! symmetry, fixed patterns), hand it to a [`Generator`], and call
//! [`solve()`](Generator::solve); every structure satisfying the properties comes back as a
//! [`Structure`] with its faces, dual graph and canonical names.
//!
//! # Internals
//! This crate is driven by expressing the enumeration as a Boolean satisfiability problem,
//! repeatedly extracting models from that solver, and blocking each one before asking again.
//!
//! A high level overview is as follows:
//!
//! Candidate structures live on a coronenoid grid sized from the hexagon bound, with one
//! presence variable per cell and one variable per cell-pair edge channelled to its endpoints.
//! Side-adjacent cell pairs additionally carry an activation variable; activating a pair
//! rewrites its two hexagons into a fused pentagon/heptagon, which is how non-hexagonal rings
//! enter the search.
//!
//! We make the following assertions in SAT form:
//! 1. At least one cell is present, no absent cell is fully enclosed by present ones, and
//!    unless a symmetry or pattern property says otherwise, the structure touches the top and
//!    left grid borders.
//! 2. Every counted quantity (hexagons over cells, pentagons and heptagons over activations)
//!    satisfies its comparisons, via sequential-counter cardinality encodings.
//! 3. An activation excludes its two cells and any overlapping activation.
//!
//! Connectivity cannot be stated up front, so disconnected models are cut lazily and the solve
//! retried. Each accepted solution is generalized into no-good clauses (by border translation,
//! mirror image, or exact footprint, depending on the properties) so the enumeration never
//! revisits it, and the search runs until the formula is exhausted or a [`CancelToken`] stops
//! it.

pub use error::Error;
pub use generator::{CancelToken, GeneratedSolution, Generator, RunState, RunStats, SolverResults};
pub use grid::{HexDirection, HexGrid};
pub use props::{ComparisonOp, ModelProperty, ModelPropertySet, PropertyExpression, PropertyKind, SymmetryKind};
pub use structure::{CycleType, Face, Structure};

pub(crate) mod grid;
pub(crate) mod bounds;
pub(crate) mod logic;
pub(crate) mod error;
pub(crate) mod transform;
pub(crate) mod props;
pub(crate) mod encoding;
pub(crate) mod structure;
pub(crate) mod nogood;
pub(crate) mod generator;
