use thiserror::Error;

/// Reasons an operation on a [`Generator`](crate::Generator) or [`HexGrid`](crate::HexGrid) may fail.
///
/// An over-constrained model is *not* an error; it simply enumerates zero structures.
#[derive(Debug, Error)]
pub enum Error {
    /// A grid was requested with zero crowns.
    #[error("a coronenoid grid must have at least one crown, got {0}")]
    InvalidCrowns(usize),
    /// No hexagon-count property with an upper bound was supplied, so no grid size can be derived.
    /// Use [`Generator::with_crowns`](crate::Generator::with_crowns) to size the grid explicitly.
    #[error("cannot derive a grid size without an upper bound on the hexagon count")]
    MissingHexagonBound,
    /// The underlying SAT engine reported a failure.
    /// This is surfaced unmodified and the run is not retried.
    #[error("SAT engine failure: {0}")]
    Engine(String),
}
