//! Simulated annealing over whole tours.

use std::time::Instant;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::heuristics::Solver;
use crate::problem::Problem;
use crate::result::RunResult;
use crate::tour::Tour;

/// Simulated annealing configuration
#[derive(Debug, Clone)]
pub struct SimulatedAnnealingConfig {
    /// Number of candidate tours evaluated
    pub evaluation_budget: usize,
    /// Initial temperature
    pub initial_temperature: f64,
    /// Factor applied to the temperature after every evaluation
    pub cooling_rate: f64,
    /// Chance of an extra random swap after each swap of the reversal
    pub shuffle_rate: f64,
}

impl Default for SimulatedAnnealingConfig {
    fn default() -> Self {
        SimulatedAnnealingConfig {
            evaluation_budget: 10_000,
            initial_temperature: 2000.0,
            cooling_rate: 0.25,
            shuffle_rate: 0.01,
        }
    }
}

/// Simulated Annealing
///
/// Accepts worse tours with probability `exp(-delta / T)`.
pub struct SimulatedAnnealing {
    pub config: SimulatedAnnealingConfig,
}

impl SimulatedAnnealing {
    pub fn new() -> Self {
        SimulatedAnnealing {
            config: SimulatedAnnealingConfig::default(),
        }
    }

    pub fn with_config(config: SimulatedAnnealingConfig) -> Self {
        SimulatedAnnealing { config }
    }

    pub fn with_budget(evaluation_budget: usize) -> Self {
        SimulatedAnnealing {
            config: SimulatedAnnealingConfig {
                evaluation_budget,
                ..SimulatedAnnealingConfig::default()
            },
        }
    }

    /// Reverse a random segment swap by swap, occasionally swapping the
    /// moving element with a random position as well.
    fn hybrid_mutation<R: Rng + ?Sized>(&self, tour: &mut Tour<'_>, rng: &mut R) {
        let n = tour.len();
        if n < 2 {
            return;
        }

        let mut start = rng.gen_range(0..n - 1);
        let mut end = rng.gen_range(start..n);

        while start < end {
            tour.swap(start, end);
            if rng.gen::<f64>() < self.config.shuffle_rate {
                let pos = rng.gen_range(0..n);
                tour.swap(pos, start);
            }
            start += 1;
            end -= 1;
        }
    }
}

impl Default for SimulatedAnnealing {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for SimulatedAnnealing {
    fn solve(&self, problem: &Problem, seed: u64) -> RunResult {
        let start = Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let budget = self.config.evaluation_budget;

        let mut current = Tour::random(problem, &mut rng);
        let mut best = current.clone();
        let mut evaluations_until_best = 0;
        let mut temperature = self.config.initial_temperature;
        let mut best_history = Vec::with_capacity(budget);

        for evaluation in 0..budget {
            let mut candidate = current.clone();
            self.hybrid_mutation(&mut candidate, &mut rng);

            let delta = candidate.fitness() - current.fitness();
            let accept = delta <= 0.0 || rng.gen::<f64>() <= (-delta / temperature).exp();
            if accept {
                current = candidate;
            }

            if current.fitness() < best.fitness() {
                best = current.clone();
                evaluations_until_best = evaluation + 1;
            }
            best_history.push(best.fitness());

            temperature *= self.config.cooling_rate;
        }

        log::info!(
            "SA on {}: best {} after {} of {} evaluations",
            problem.name,
            best.fitness(),
            evaluations_until_best,
            budget
        );

        RunResult::from_tour(self.name(), &best, budget, evaluations_until_best)
            .with_history(best_history)
            .with_time(start.elapsed().as_secs_f64())
    }

    fn name(&self) -> &str {
        "SimulatedAnnealing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::DistanceMatrix;
    use crate::tour::is_permutation;

    fn create_test_problem() -> Problem {
        let matrix = DistanceMatrix::from_fn(12, |i, j| {
            let (a, b) = (i as f64, j as f64);
            ((a - b).abs() * 7.0) % 23.0 + 1.0
        })
        .unwrap();
        Problem::new("modular", matrix)
    }

    #[test]
    fn test_hybrid_mutation_keeps_permutation() {
        let problem = create_test_problem();
        let sa = SimulatedAnnealing::with_config(SimulatedAnnealingConfig {
            shuffle_rate: 0.5,
            ..SimulatedAnnealingConfig::default()
        });
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut tour = Tour::random(&problem, &mut rng);

        for _ in 0..200 {
            sa.hybrid_mutation(&mut tour, &mut rng);
            assert!(is_permutation(tour.nodes(), 12));
            assert_eq!(tour.fitness(), problem.round(problem.cycle_length(tour.nodes())));
        }
    }

    #[test]
    fn test_solve_reports_best() {
        let problem = create_test_problem();
        let sa = SimulatedAnnealing::with_budget(500);
        let result = sa.solve(&problem, 9);

        let best = Tour::from_nodes(&problem, result.best_nodes()).unwrap();
        assert_eq!(best.fitness(), result.best_fitness);
        assert!(result.evaluations_until_best <= 500);
        assert_eq!(result.evaluation_budget, 500);

        let start = Tour::random(&problem, &mut ChaCha8Rng::seed_from_u64(9));
        assert!(result.best_fitness <= start.fitness());

        assert_eq!(result.best_history.len(), 500);
        assert!(result.best_history.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(result.best_history.last(), Some(&result.best_fitness));
    }

    #[test]
    fn test_same_seed_same_result() {
        let problem = create_test_problem();
        let sa = SimulatedAnnealing::with_budget(200);
        let a = sa.solve(&problem, 4);
        let b = sa.solve(&problem, 4);
        assert_eq!(a.best_path, b.best_path);
        assert_eq!(a.evaluations_until_best, b.evaluations_until_best);
    }
}
