//! Nearest neighbour construction.

use std::time::Instant;

use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::error::Result;
use crate::heuristics::Solver;
use crate::problem::Problem;
use crate::result::RunResult;
use crate::tour::{PartialTour, Tour};

/// Nearest Neighbour Heuristic
///
/// Starts from a random node and repeatedly appends the closest unvisited
/// node. Ties go to the lowest node index.
pub struct NearestNeighbour {
    /// Budget reported in the result; construction itself costs one evaluation
    pub evaluation_budget: usize,
}

impl NearestNeighbour {
    pub fn new() -> Self {
        NearestNeighbour {
            evaluation_budget: 1,
        }
    }

    pub fn with_budget(evaluation_budget: usize) -> Self {
        NearestNeighbour { evaluation_budget }
    }

    fn find_nearest(&self, problem: &Problem, partial: &PartialTour<'_>, current: usize) -> Option<usize> {
        (0..problem.dimension())
            .filter(|&node| !partial.contains(node))
            .min_by_key(|&node| OrderedFloat(problem.distance(current, node)))
    }

    /// Build a tour from `start`.
    pub fn construct_from<'a>(&self, problem: &'a Problem, start: usize) -> Result<Tour<'a>> {
        let mut partial = PartialTour::new(problem);
        partial.push(start);

        let mut current = start;
        while let Some(next) = self.find_nearest(problem, &partial, current) {
            partial.push(next);
            current = next;
        }

        partial.finish()
    }

    /// Build a tour from a random start node.
    pub fn construct<'a, R: Rng + ?Sized>(&self, problem: &'a Problem, rng: &mut R) -> Result<Tour<'a>> {
        if problem.dimension() == 0 {
            return Ok(Tour::identity(problem));
        }
        let start = rng.gen_range(0..problem.dimension());
        self.construct_from(problem, start)
    }
}

impl Default for NearestNeighbour {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for NearestNeighbour {
    fn solve(&self, problem: &Problem, seed: u64) -> RunResult {
        let start = Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let tour = match self.construct(problem, &mut rng) {
            Ok(tour) => tour,
            Err(e) => {
                log::error!("Nearest neighbour construction failed: {}", e);
                Tour::identity(problem)
            }
        };

        log::info!("NN on {}: length {}", problem.name, tour.fitness());

        RunResult::from_tour(self.name(), &tour, self.evaluation_budget, 1)
            .with_history(vec![tour.fitness()])
            .with_time(start.elapsed().as_secs_f64())
    }

    fn name(&self) -> &str {
        "NearestNeighbour"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour::is_permutation;

    fn create_test_problem() -> Problem {
        // points on a line at 0, 1, 3, 7, 15
        let xs = [0.0f64, 1.0, 3.0, 7.0, 15.0];
        Problem::from_matrix(
            "line",
            xs.iter()
                .map(|a| xs.iter().map(|b| (a - b).abs()).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_construct_from_follows_nearest() {
        let problem = create_test_problem();
        let nn = NearestNeighbour::new();
        let tour = nn.construct_from(&problem, 2).unwrap();
        // from x=3: 1 (2 away), then 0, then 7, then 15
        assert_eq!(tour.nodes(), &[2, 1, 0, 3, 4]);
        assert_eq!(tour.fitness(), 30.0);
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let problem = Problem::from_matrix(
            "square",
            vec![
                vec![0.0, 1.0, 10.0, 1.0],
                vec![1.0, 0.0, 1.0, 10.0],
                vec![10.0, 1.0, 0.0, 1.0],
                vec![1.0, 10.0, 1.0, 0.0],
            ],
        )
        .unwrap();
        let tour = NearestNeighbour::new().construct_from(&problem, 0).unwrap();
        assert_eq!(tour.nodes(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_solve() {
        let problem = create_test_problem();
        let result = NearestNeighbour::new().solve(&problem, 5);
        let nodes = result.best_nodes();
        assert!(is_permutation(&nodes, 5));
        assert_eq!(result.evaluations_until_best, 1);
        assert_eq!(result.best_fitness, problem.cycle_length(&nodes));
        assert_eq!(result.best_history, vec![result.best_fitness]);
    }
}
