use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use unordered_pair::UnorderedPair;
use varisat::{CnfFormula, Lit, Solver};

use crate::bounds::BoundGraphs;
use crate::encoding::{value, Encoding};
use crate::error::Error;
use crate::grid::HexGrid;
use crate::nogood;
use crate::props::ModelPropertySet;
use crate::structure::Structure;
use crate::transform::{identify_sites, TransformationSite};

/// Where a run currently stands.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RunState {
    /// Constraints are not yet posted; the next [`solve`](Generator::solve) call posts them.
    Ready,
    /// The search is underway or paused; [`solve`](Generator::solve) continues it.
    Searching,
    /// Every solution has been enumerated. Terminal.
    Exhausted,
    /// The run was cancelled through its [`CancelToken`]. Terminal.
    Stopped,
}

/// Shared stop/pause flags for steering a run from another thread.
///
/// Both flags are polled once per search iteration, before the engine is invoked. Pausing
/// leaves the run in [`RunState::Searching`] so a later [`solve`](Generator::solve) call
/// resumes it; stopping ends the run for good.
#[derive(Clone, Default)]
pub struct CancelToken {
    stopped: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh token with both flags clear.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request permanent termination.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    /// Request suspension at the next iteration boundary.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    /// Clear a previous pause request.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Relaxed);
    }

    /// Whether termination has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Whether suspension has been requested.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }
}

/// Counters describing one run, reported when it terminates.
///
/// `varisat` does not surface internal search diagnostics such as conflict or decision
/// counts, so the report accounts for the run in terms of engine invocations and the
/// clauses this crate posted instead.
#[derive(Clone, Debug, Default)]
pub struct RunStats {
    /// How often the SAT engine was invoked.
    pub solve_calls: usize,
    /// Accepted solutions.
    pub solutions: usize,
    /// Blocking clauses recorded for accepted and filtered assignments.
    pub nogood_clauses: usize,
    /// Lexicographic ordering clauses posted up front for symmetry breaking.
    pub lex_clauses: usize,
    /// Disconnected models cut and retried; these are not recorded no-goods.
    pub connectivity_cuts: usize,
    /// Models rejected by a post-filter.
    pub filtered: usize,
    /// Time spent inside [`Generator::solve`].
    pub elapsed: Duration,
}

/// One accepted solution: the realized structure and a textual rendition of the assignment.
pub struct GeneratedSolution {
    structure: Structure,
    description: String,
}

impl GeneratedSolution {
    /// The realized structure.
    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    /// A line-per-variable description of the assignment, headed by the solution index.
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Everything a run has accumulated so far: accepted solutions in discovery order plus the
/// running counters. Available at any point, including after a stop.
#[derive(Default)]
pub struct SolverResults {
    solutions: Vec<GeneratedSolution>,
    stats: RunStats,
}

impl SolverResults {
    /// The accepted solutions, in the order they were found.
    pub fn solutions(&self) -> &[GeneratedSolution] {
        &self.solutions
    }

    /// The counters of the run so far.
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }
}

/// A run-scoped enumeration of structures satisfying a property set.
///
/// Each generator owns its grid, its encoding and its engine instance, so concurrent runs never
/// share state. Constraints are posted on the first [`solve`](Generator::solve) call; the call
/// then drives the engine in a loop, decoding each model into a [`Structure`], cutting
/// disconnected ones, filtering, and recording blocking clauses until the formula is exhausted
/// or the token interferes.
pub struct Generator {
    grid: HexGrid,
    bounds: BoundGraphs,
    sites: Vec<TransformationSite>,
    props: ModelPropertySet,
    encoding: Option<Encoding>,
    solver: Solver<'static>,
    state: RunState,
    token: CancelToken,
    results: SolverResults,
    symmetry_breaking: bool,
    forbid_filtered: bool,
}

impl Generator {
    /// Build a generator on the smallest grid hosting the property set's hexagon bound.
    /// Fails when no property bounds the hexagon count from above.
    pub fn new(props: ModelPropertySet) -> Result<Self, Error> {
        let crowns = props.derived_crowns().ok_or(Error::MissingHexagonBound)?;
        Self::with_crowns(props, crowns)
    }

    /// Build a generator on an explicitly sized grid.
    pub fn with_crowns(props: ModelPropertySet, crowns: usize) -> Result<Self, Error> {
        let grid = HexGrid::new(crowns)?;
        let bounds = BoundGraphs::from_grid(&grid);
        let sites = identify_sites(&grid);

        Ok(Self {
            grid,
            bounds,
            sites,
            props,
            encoding: None,
            solver: Solver::new(),
            state: RunState::Ready,
            token: CancelToken::new(),
            results: SolverResults::default(),
            symmetry_breaking: false,
            forbid_filtered: true,
        })
    }

    /// Layer lexicographic symmetry breaking onto the encoding.
    /// Takes effect only while the run is still [`RunState::Ready`], and only when neither a
    /// symmetry nor a pattern property is active.
    pub fn set_symmetry_breaking(&mut self, enabled: bool) -> &mut Self {
        self.symmetry_breaking = enabled;
        self
    }

    /// Whether assignments rejected by a post-filter record the full strategy no-good (the
    /// default) or only the minimal progress clause. A progress clause is always recorded;
    /// without one the engine would return the same model forever.
    pub fn set_forbid_filtered(&mut self, enabled: bool) -> &mut Self {
        self.forbid_filtered = enabled;
        self
    }

    /// The grid hosting this run.
    pub fn grid(&self) -> &HexGrid {
        &self.grid
    }

    /// Where the run currently stands.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Everything accumulated so far.
    pub fn results(&self) -> &SolverResults {
        &self.results
    }

    /// A handle onto this run's cancellation flags, for use from other threads.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Request permanent termination at the next iteration boundary.
    pub fn stop(&self) {
        self.token.stop();
    }

    /// Request suspension at the next iteration boundary.
    pub fn pause(&self) {
        self.token.pause();
    }

    /// Clear a previous pause request.
    pub fn resume(&self) {
        self.token.resume();
    }

    /// Run the enumeration until the formula is exhausted, the token interferes, or the engine
    /// fails. Returns the state the run settled in; calling again on a paused run resumes it,
    /// calling on a terminal run is a no-op.
    pub fn solve(&mut self) -> Result<RunState, Error> {
        if matches!(self.state, RunState::Exhausted | RunState::Stopped) {
            return Ok(self.state);
        }

        if self.state == RunState::Ready {
            debug_assert!(self.bounds.bounds_hold());
            let encoding = Encoding::build(
                &self.grid,
                &self.bounds,
                &self.sites,
                &self.props,
                self.symmetry_breaking,
            );
            self.results.stats.lex_clauses = encoding.lex_clause_count;
            self.solver.add_formula(&CnfFormula::from(encoding.clauses.iter().cloned()));
            debug!(
                "posted {} clauses over {} variables ({} cells, {} edges, {} sites)",
                encoding.clauses.len(),
                encoding.var_count(),
                encoding.cell_vars.len(),
                encoding.edge_vars.len(),
                encoding.site_vars.len(),
            );
            self.encoding = Some(encoding);
            self.state = RunState::Searching;
        }

        let strategy = nogood::select(&self.props);
        let started = Instant::now();

        loop {
            if self.token.is_stopped() {
                self.state = RunState::Stopped;
                break;
            }
            if self.token.is_paused() {
                self.results.stats.elapsed += started.elapsed();
                return Ok(self.state);
            }

            self.results.stats.solve_calls += 1;
            let satisfiable = match self.solver.solve() {
                Ok(satisfiable) => satisfiable,
                Err(error) => {
                    self.results.stats.elapsed += started.elapsed();
                    return Err(Error::Engine(error.to_string()));
                }
            };
            if !satisfiable {
                self.state = RunState::Exhausted;
                break;
            }

            let Some(model) = self.solver.model() else {
                self.results.stats.elapsed += started.elapsed();
                return Err(Error::Engine("engine reported satisfiable without a model".into()));
            };
            let Some(encoding) = self.encoding.as_ref() else {
                self.results.stats.elapsed += started.elapsed();
                return Err(Error::Engine("no constraints were posted".into()));
            };

            let (present, active_indices) = encoding.decode(&model);
            let active_pairs: Vec<UnorderedPair<usize>> = active_indices.iter()
                .map(|index| self.sites[*index].cells)
                .collect();
            let structure = Structure::from_solution(&self.grid, &present, &active_pairs);

            // the engine knows nothing of connectivity; cut disconnected models and retry
            if !structure.is_connected() {
                let cut = nogood::catch_all(encoding, &model);
                self.solver.add_formula(&CnfFormula::from(vec![cut]));
                self.results.stats.connectivity_cuts += 1;
                continue;
            }

            let accepted = self.props.iter().all(|property| property.check(&structure, &self.grid));

            let mut cuts: Vec<Vec<Lit>> = Vec::new();
            if accepted || self.forbid_filtered {
                cuts.extend(nogood::widening_clauses(strategy, &self.grid, encoding, &self.sites, &model));
            }
            cuts.push(nogood::catch_all(encoding, &model));

            if accepted {
                let index = self.results.solutions.len() + 1;
                let mut description = format!("solution {index}");
                for (compact, var) in encoding.cell_vars.iter().enumerate() {
                    let _ = write!(
                        description,
                        "\ncell {} = {}",
                        self.grid.sparse_of_compact(compact),
                        u8::from(value(&model, *var)),
                    );
                }
                for (site, var) in self.sites.iter().zip(encoding.site_vars.iter()) {
                    let _ = write!(
                        description,
                        "\nsite {}-{} = {}",
                        self.grid.sparse_of_compact(site.lower()),
                        self.grid.sparse_of_compact(site.upper()),
                        u8::from(value(&model, *var)),
                    );
                }
                debug!("accepted solution {index} with {} faces", structure.face_count());
                self.results.solutions.push(GeneratedSolution { structure, description });
                self.results.stats.solutions += 1;
            } else {
                self.results.stats.filtered += 1;
            }

            self.results.stats.nogood_clauses += cuts.len();
            self.solver.add_formula(&CnfFormula::from(cuts));
        }

        self.results.stats.elapsed += started.elapsed();
        let stats = &self.results.stats;
        info!(
            "search ended {:?}: {} solutions, {} engine calls, {} no-good clauses, {} ordering clauses, {} connectivity cuts, {} filtered, {:?} elapsed",
            self.state,
            stats.solutions,
            stats.solve_calls,
            stats.nogood_clauses,
            stats.lex_clauses,
            stats.connectivity_cuts,
            stats.filtered,
            stats.elapsed,
        );
        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::{ComparisonOp, ModelProperty, PropertyExpression};

    fn hexagon_props(count: usize) -> ModelPropertySet {
        let mut props = ModelPropertySet::new();
        props.add(ModelProperty::Hexagons(vec![PropertyExpression::new(ComparisonOp::Eq, count)]));
        props
    }

    #[test]
    fn a_single_crown_yields_benzene_alone() {
        let mut generator = Generator::with_crowns(hexagon_props(1), 1).unwrap();
        assert_eq!(generator.state(), RunState::Ready);
        assert_eq!(generator.solve().unwrap(), RunState::Exhausted);

        let results = generator.results();
        assert_eq!(results.solutions().len(), 1);
        assert_eq!(results.solutions()[0].description(), "solution 1\ncell 0 = 1");
        assert_eq!(results.solutions()[0].structure().names(), ["0"]);
        assert!(results.stats().solve_calls >= 2);
    }

    #[test]
    fn missing_hexagon_bound_is_rejected() {
        assert!(matches!(Generator::new(ModelPropertySet::new()), Err(Error::MissingHexagonBound)));
    }

    #[test]
    fn a_bounded_property_set_sizes_its_own_grid() {
        let generator = Generator::new(hexagon_props(7)).unwrap();
        assert_eq!(generator.grid().crowns(), 4);
    }

    #[test]
    fn stopping_before_the_search_touches_nothing() {
        let mut generator = Generator::with_crowns(hexagon_props(1), 1).unwrap();
        generator.stop();
        assert_eq!(generator.solve().unwrap(), RunState::Stopped);
        assert_eq!(generator.results().stats().solve_calls, 0);
        assert!(generator.results().solutions().is_empty());
        // terminal states stay terminal
        assert_eq!(generator.solve().unwrap(), RunState::Stopped);
    }

    #[test]
    fn a_paused_run_resumes_where_it_left_off() {
        let mut generator = Generator::with_crowns(hexagon_props(1), 1).unwrap();
        generator.pause();
        assert_eq!(generator.solve().unwrap(), RunState::Searching);
        assert_eq!(generator.results().stats().solve_calls, 0);

        generator.resume();
        assert_eq!(generator.solve().unwrap(), RunState::Exhausted);
        assert_eq!(generator.results().solutions().len(), 1);
    }

    #[test]
    fn the_token_crosses_thread_boundaries() {
        let generator = Generator::with_crowns(hexagon_props(1), 1).unwrap();
        let token = generator.token();
        std::thread::spawn(move || token.stop()).join().unwrap();
        assert!(generator.token.is_stopped());
    }
}
