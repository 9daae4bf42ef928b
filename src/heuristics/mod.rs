//! Heuristics for the symmetric TSP.
//!
//! The Lin-Kernighan local search is the core; nearest neighbour, simulated
//! annealing, the evolutionary algorithm and ant colony optimisation are the
//! baselines it is compared against.

pub mod candidates;
pub mod lin_kernighan;
pub mod nearest_neighbour;
pub mod simulated_annealing;
pub mod evolutionary;
pub mod ant_colony;

pub use lin_kernighan::{Direction, LinKernighan, LinKernighanConfig, MoveOutcome};
pub use nearest_neighbour::NearestNeighbour;
pub use simulated_annealing::{SimulatedAnnealing, SimulatedAnnealingConfig};
pub use evolutionary::{EvolutionaryAlgorithm, EvolutionaryConfig, MutationType, SelectionType};
pub use ant_colony::{AntColony, AntColonyConfig};

use crate::problem::Problem;
use crate::result::RunResult;

/// Common interface of every algorithm in the comparison
pub trait Solver {
    /// Run once on `problem`; all randomness is derived from `seed`.
    fn solve(&self, problem: &Problem, seed: u64) -> RunResult;
    fn name(&self) -> &str;
}
