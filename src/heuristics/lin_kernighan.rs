//! Lin-Kernighan sequential edge exchange.
//!
//! From a base position `t1` the engine grows an alternating chain of
//! positions `t1, t2, t3, ...`: the pairs `(t1,t2), (t3,t4), ...` are tour
//! edges to remove and `(t2,t3), (t4,t5), ...` are edges to add. Closing the
//! chain at an even depth `i` with the edge `(t_i, t1)` gives a new tour; the
//! depth with the largest closed gain is committed once the chain can no
//! longer grow.

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::edge::{Edge, EdgeSet};
use crate::heuristics::candidates::{nearest_neighbour, predecessor, successor};
use crate::heuristics::Solver;
use crate::problem::Problem;
use crate::result::RunResult;
use crate::tour::Tour;

/// Smallest closed gain that counts as an improvement.
const MIN_GAIN: f64 = 1e-9;

/// Which tour neighbour of `t1` becomes `t2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Forward, Direction::Backward];
}

/// How one attempt from a base position ended.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// The tour was replaced; `gain` is the length removed.
    Committed { gain: f64, depth: usize },
    /// No improving closed chain was found, or it could not be rebuilt.
    Abandoned,
}

impl MoveOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, MoveOutcome::Committed { .. })
    }
}

/// Lin-Kernighan configuration
#[derive(Debug, Clone)]
pub struct LinKernighanConfig {
    /// Maximum number of sweeps
    pub evaluation_budget: usize,
    /// Largest depth index `i` a chain may reach; `None` allows `2n`
    pub max_depth: Option<usize>,
}

impl Default for LinKernighanConfig {
    fn default() -> Self {
        LinKernighanConfig {
            evaluation_budget: 10_000,
            max_depth: None,
        }
    }
}

/// Lin-Kernighan local search
pub struct LinKernighan {
    pub config: LinKernighanConfig,
}

impl LinKernighan {
    pub fn new() -> Self {
        LinKernighan {
            config: LinKernighanConfig::default(),
        }
    }

    pub fn with_config(config: LinKernighanConfig) -> Self {
        LinKernighan { config }
    }

    pub fn with_budget(evaluation_budget: usize) -> Self {
        LinKernighan {
            config: LinKernighanConfig {
                evaluation_budget,
                ..LinKernighanConfig::default()
            },
        }
    }

    /// Sweep from `tour` until a sweep commits nothing or the budget runs
    /// out. One sweep counts as one evaluation.
    pub fn run_from(&self, mut tour: Tour<'_>) -> RunResult {
        let start = Instant::now();
        let budget = self.config.evaluation_budget;

        let mut best = tour.clone();
        let mut evaluations = 0;
        let mut evaluations_until_best = 0;
        let mut best_history = Vec::new();

        while evaluations < budget {
            let commits = self.sweep(&mut tour);
            evaluations += 1;

            if tour.fitness() < best.fitness() {
                best = tour.clone();
                evaluations_until_best = evaluations;
            }
            best_history.push(best.fitness());

            log::debug!(
                "LK sweep {}: {} commits, length {}",
                evaluations,
                commits,
                tour.fitness()
            );

            if commits == 0 {
                break;
            }
        }

        log::info!(
            "LK on {}: best {} after {} of {} evaluations",
            tour.problem().name,
            best.fitness(),
            evaluations_until_best,
            evaluations
        );

        RunResult::from_tour(self.name(), &best, budget, evaluations_until_best)
            .with_history(best_history)
            .with_time(start.elapsed().as_secs_f64())
    }

    /// Try every position once as `t1`. Returns the number of commits.
    pub fn sweep(&self, tour: &mut Tour<'_>) -> usize {
        let mut commits = 0;
        for t1 in 0..tour.len() {
            if self.improve(tour, t1) {
                commits += 1;
            }
        }
        commits
    }

    /// Attempt a move from `t1`, forward first, then backward.
    pub fn improve(&self, tour: &mut Tour<'_>, t1: usize) -> bool {
        for direction in Direction::ALL {
            match self.attempt(tour, t1, direction) {
                MoveOutcome::Committed { gain, depth } => {
                    log::debug!(
                        "commit from t1={} ({:?}): gain {} at depth {}, length {}",
                        t1,
                        direction,
                        gain,
                        depth,
                        tour.fitness()
                    );
                    return true;
                }
                MoveOutcome::Abandoned => {}
            }
        }
        false
    }

    /// Build one chain from `t1` in `direction` and commit its best closure.
    pub fn attempt(&self, tour: &mut Tour<'_>, t1: usize, direction: Direction) -> MoveOutcome {
        let (chain, gain) = match self.best_chain(tour, t1, direction) {
            Some(best) => best,
            None => {
                log::trace!("no improving chain from t1={} ({:?})", t1, direction);
                return MoveOutcome::Abandoned;
            }
        };

        match close_chain(tour, &chain) {
            Some(nodes) => match tour.replace(nodes) {
                Ok(()) => MoveOutcome::Committed {
                    gain,
                    depth: chain.len(),
                },
                Err(e) => {
                    log::trace!("commit from t1={} rejected: {}", t1, e);
                    MoveOutcome::Abandoned
                }
            },
            None => {
                log::trace!("commit from t1={} failed to rebuild a tour", t1);
                MoveOutcome::Abandoned
            }
        }
    }

    /// Grow the chain from `t1` until it cannot be extended and return its
    /// prefix with the largest closed gain, if that gain is an improvement.
    ///
    /// The gain is measured on raw distances, so with a fractional matrix an
    /// improving chain may leave the rounded fitness unchanged.
    fn best_chain(&self, tour: &Tour<'_>, t1: usize, direction: Direction) -> Option<(Vec<usize>, f64)> {
        let n = tour.len();
        if n < 2 {
            return None;
        }

        let t2 = match direction {
            Direction::Forward => successor(tour, t1),
            Direction::Backward => predecessor(tour, t1),
        };
        let t3 = nearest_neighbour(tour, t2)?;

        if distance(tour, t1, t2) <= distance(tour, t2, t3) {
            return None;
        }

        let mut chain = vec![t1, t2, t3];
        let mut gain = distance(tour, t1, t2) - distance(tour, t2, t3);
        let mut best_gain = 0.0;
        let mut best_depth = None;
        let depth_limit = self.config.max_depth.unwrap_or(2 * n);

        let mut i = 4;
        while i <= depth_limit {
            let ti = match select_new_t(tour, &mut chain) {
                Some(ti) => ti,
                None => break,
            };
            chain.push(ti);

            let removed = gain + distance(tour, chain[i - 2], ti);
            let next = match next_possible_y(tour, &chain, removed) {
                Some(next) => next,
                None => break,
            };

            let closed = removed - distance(tour, ti, t1);
            if closed > best_gain {
                best_gain = closed;
                best_depth = Some(i);
            }
            gain = removed - distance(tour, ti, next);
            chain.push(next);
            i += 2;
        }

        match best_depth {
            Some(depth) if best_gain > MIN_GAIN => {
                chain.truncate(depth);
                Some((chain, best_gain))
            }
            _ => None,
        }
    }
}

impl Default for LinKernighan {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for LinKernighan {
    fn solve(&self, problem: &Problem, seed: u64) -> RunResult {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.run_from(Tour::random(problem, &mut rng))
    }

    fn name(&self) -> &str {
        "LinKernighan"
    }
}

#[inline]
fn distance(tour: &Tour<'_>, p: usize, q: usize) -> f64 {
    tour.problem().distance(tour.get(p), tour.get(q))
}

/// Rebuild the tour after closing `chain` (even length) with `(t_i, t1)`.
fn close_chain(tour: &Tour<'_>, chain: &[usize]) -> Option<Vec<usize>> {
    let mut edges = EdgeSet::from_tour(tour.nodes());

    for pair in chain.chunks(2) {
        if pair.len() < 2 {
            return None;
        }
        edges
            .remove(&Edge::new(tour.get(pair[0]), tour.get(pair[1])))
            .ok()?;
    }

    for k in (1..chain.len()).step_by(2) {
        let next = if k + 1 < chain.len() { chain[k + 1] } else { chain[0] };
        edges.add(Edge::new(tour.get(chain[k]), tour.get(next)));
    }

    edges.reconstruct(tour.len())
}

/// Choose `t_i` next to `t_{i-1}` so that closing there yields a tour.
fn select_new_t(tour: &Tour<'_>, chain: &mut Vec<usize>) -> Option<usize> {
    let last = *chain.last()?;

    for candidate in [predecessor(tour, last), successor(tour, last)] {
        chain.push(candidate);
        let feasible = close_chain(tour, chain).is_some();
        chain.pop();

        if feasible {
            return Some(candidate);
        }
    }

    None
}

/// Choose `t_{i+1}`: the nearest position passing the disjunctivity, gain
/// and next-removal checks. `gain` is the chain's removed minus added length
/// including the edge `(t_{i-1}, t_i)`.
fn next_possible_y(tour: &Tour<'_>, chain: &[usize], gain: f64) -> Option<usize> {
    let ti = *chain.last()?;

    let mut nearest = None;
    let mut min_distance = f64::INFINITY;

    for candidate in 0..tour.len() {
        if !is_disjunctive(chain, candidate, ti)
            || !is_positive_gain(tour, ti, candidate, gain)
            || !next_x_possible(tour, chain, candidate)
        {
            continue;
        }

        let d = distance(tour, ti, candidate);
        if d < min_distance || nearest.is_none() {
            min_distance = d;
            nearest = Some(candidate);
        }
    }

    nearest
}

/// True if `a != b` and `{a, b}` is not a consecutive pair of the chain.
fn is_disjunctive(chain: &[usize], a: usize, b: usize) -> bool {
    if a == b {
        return false;
    }

    !chain
        .windows(2)
        .any(|w| (w[0] == a && w[1] == b) || (w[0] == b && w[1] == a))
}

/// The running gain must stay positive after adding `(t_i, candidate)`.
#[inline]
fn is_positive_gain(tour: &Tour<'_>, ti: usize, candidate: usize, gain: f64) -> bool {
    gain - distance(tour, ti, candidate) > 0.0
}

/// At least one tour edge at `candidate` must still be free to remove.
fn next_x_possible(tour: &Tour<'_>, chain: &[usize], candidate: usize) -> bool {
    [predecessor(tour, candidate), successor(tour, candidate)]
        .into_iter()
        .any(|neighbour| is_disjunctive(chain, candidate, neighbour))
}
