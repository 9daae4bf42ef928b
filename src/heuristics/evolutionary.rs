//! Steady-state evolutionary algorithm.
//!
//! Every evaluation breeds one child from two selected parents with ordered
//! crossover and a mutation, and the child replaces the worst member of the
//! population when it is strictly shorter.

use std::time::Instant;

use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::heuristics::Solver;
use crate::problem::Problem;
use crate::result::RunResult;
use crate::tour::{PartialTour, Tour};

/// Mutation operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationType {
    /// Swap two random nodes
    Swap,
    /// Reverse a random segment
    Inversion,
}

/// Selection method types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionType {
    /// Tournament selection
    Tournament,
    /// Rank-based selection
    Ranked,
}

/// Evolutionary algorithm configuration
#[derive(Debug, Clone)]
pub struct EvolutionaryConfig {
    /// Number of children evaluated
    pub evaluation_budget: usize,
    /// Population size
    pub population_size: usize,
    /// Tournament size for selection
    pub tournament_size: usize,
    /// Crossover probability
    pub crossover_rate: f64,
    /// Mutation probability
    pub mutation_rate: f64,
    /// Selection method
    pub selection: SelectionType,
    /// Mutation operator
    pub mutation: MutationType,
}

impl Default for EvolutionaryConfig {
    fn default() -> Self {
        EvolutionaryConfig {
            evaluation_budget: 10_000,
            population_size: 40,
            tournament_size: 3,
            crossover_rate: 1.0,
            mutation_rate: 0.9,
            selection: SelectionType::Ranked,
            mutation: MutationType::Inversion,
        }
    }
}

pub struct EvolutionaryAlgorithm {
    pub config: EvolutionaryConfig,
}

impl EvolutionaryAlgorithm {
    pub fn new() -> Self {
        EvolutionaryAlgorithm {
            config: EvolutionaryConfig::default(),
        }
    }

    pub fn with_config(config: EvolutionaryConfig) -> Self {
        EvolutionaryAlgorithm { config }
    }

    pub fn with_budget(evaluation_budget: usize) -> Self {
        EvolutionaryAlgorithm {
            config: EvolutionaryConfig {
                evaluation_budget,
                ..EvolutionaryConfig::default()
            },
        }
    }

    /// Tournament selection
    fn tournament_select<R: Rng + ?Sized>(&self, population: &[Tour<'_>], rng: &mut R) -> usize {
        let mut best_idx = rng.gen_range(0..population.len());

        for _ in 1..self.config.tournament_size {
            let idx = rng.gen_range(0..population.len());
            if population[idx].fitness() < population[best_idx].fitness() {
                best_idx = idx;
            }
        }

        best_idx
    }

    /// Rank-based selection; `population` must be sorted best first.
    fn rank_select<R: Rng + ?Sized>(&self, population: &[Tour<'_>], rng: &mut R) -> usize {
        let n = population.len();
        let total_rank: usize = (n * (n + 1)) / 2;
        let pick = rng.gen_range(0..total_rank);

        let mut cumulative = 0;
        for rank in 0..n {
            cumulative += n - rank;
            if cumulative > pick {
                return rank;
            }
        }

        n - 1
    }

    fn select_parent<R: Rng + ?Sized>(&self, population: &mut [Tour<'_>], rng: &mut R) -> usize {
        match self.config.selection {
            SelectionType::Tournament => self.tournament_select(population, rng),
            SelectionType::Ranked => {
                population.sort_by_key(|t| OrderedFloat(t.fitness()));
                self.rank_select(population, rng)
            }
        }
    }

    /// Order Crossover (OX)
    ///
    /// Copies `parent1[start..end]` to the same positions and fills the rest
    /// with the remaining nodes in `parent2` order.
    fn ordered_crossover<'a, R: Rng + ?Sized>(
        &self,
        parent1: &Tour<'a>,
        parent2: &Tour<'a>,
        rng: &mut R,
    ) -> Tour<'a> {
        let n = parent1.len();
        if n < 2 || rng.gen::<f64>() > self.config.crossover_rate {
            return parent1.clone();
        }

        let start = rng.gen_range(0..n - 1);
        let end = rng.gen_range(start..n);
        let segment = &parent1.nodes()[start..end];

        let mut in_segment = vec![false; n];
        for &node in segment {
            in_segment[node] = true;
        }

        let mut partial = PartialTour::new(parent1.problem());
        let mut donors = parent2.nodes().iter().filter(|&&node| !in_segment[node]);

        while partial.len() < start {
            match donors.next() {
                Some(&node) => partial.push(node),
                None => break,
            };
        }
        for &node in segment {
            partial.push(node);
        }
        for &node in donors {
            partial.push(node);
        }

        match partial.finish() {
            Ok(child) => child,
            Err(e) => {
                log::error!("Ordered crossover produced an invalid child: {}", e);
                parent1.clone()
            }
        }
    }

    /// Swap mutation
    fn mutate_swap<R: Rng + ?Sized>(&self, tour: &mut Tour<'_>, rng: &mut R) {
        let n = tour.len();
        let i = rng.gen_range(0..n);
        let j = rng.gen_range(0..n);
        tour.swap(i, j);
    }

    /// Inversion mutation
    fn mutate_inversion<R: Rng + ?Sized>(&self, tour: &mut Tour<'_>, rng: &mut R) {
        let n = tour.len();
        if n < 2 {
            return;
        }

        let start = rng.gen_range(0..n - 1);
        let end = rng.gen_range(start..n);
        tour.reverse(start, end);
    }

    fn mutate<R: Rng + ?Sized>(&self, tour: &mut Tour<'_>, rng: &mut R) {
        if tour.is_empty() || rng.gen::<f64>() > self.config.mutation_rate {
            return;
        }

        match self.config.mutation {
            MutationType::Swap => self.mutate_swap(tour, rng),
            MutationType::Inversion => self.mutate_inversion(tour, rng),
        }
    }
}

impl Default for EvolutionaryAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for EvolutionaryAlgorithm {
    fn solve(&self, problem: &Problem, seed: u64) -> RunResult {
        let start = Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let budget = self.config.evaluation_budget;

        let mut population: Vec<Tour<'_>> = (0..self.config.population_size.max(1))
            .map(|_| Tour::random(problem, &mut rng))
            .collect();

        let mut best = population
            .iter()
            .min_by_key(|t| OrderedFloat(t.fitness()))
            .cloned()
            .unwrap_or_else(|| Tour::identity(problem));
        let mut evaluations_until_best = 0;
        let mut best_history = Vec::with_capacity(budget);

        for evaluation in 0..budget {
            let p1 = self.select_parent(&mut population, &mut rng);
            let parent1 = population[p1].clone();
            let p2 = self.select_parent(&mut population, &mut rng);

            let mut child = self.ordered_crossover(&parent1, &population[p2], &mut rng);
            self.mutate(&mut child, &mut rng);

            let worst = population
                .iter()
                .enumerate()
                .max_by_key(|(_, t)| OrderedFloat(t.fitness()))
                .map(|(i, _)| i);
            if let Some(worst) = worst {
                if child.fitness() < population[worst].fitness() {
                    if child.fitness() < best.fitness() {
                        best = child.clone();
                        evaluations_until_best = evaluation + 1;
                    }
                    population[worst] = child;
                }
            }
            best_history.push(best.fitness());
        }

        log::info!(
            "EA on {}: best {} after {} of {} evaluations",
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
        "EvolutionaryAlgorithm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::DistanceMatrix;
    use crate::tour::is_permutation;

    fn create_test_problem() -> Problem {
        // nodes on a circle of 10 points, distance = shorter arc * 10
        let matrix = DistanceMatrix::from_fn(10, |i, j| {
            let k = (i as i64 - j as i64).unsigned_abs() as usize;
            (k.min(10 - k) * 10) as f64
        })
        .unwrap();
        Problem::new("circle", matrix)
    }

    #[test]
    fn test_ordered_crossover_keeps_segment_and_permutation() {
        let problem = create_test_problem();
        let ea = EvolutionaryAlgorithm::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for _ in 0..100 {
            let p1 = Tour::random(&problem, &mut rng);
            let p2 = Tour::random(&problem, &mut rng);
            let child = ea.ordered_crossover(&p1, &p2, &mut rng);
            assert!(is_permutation(child.nodes(), 10));
        }
    }

    #[test]
    fn test_rank_select_prefers_best() {
        let problem = create_test_problem();
        let ea = EvolutionaryAlgorithm::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut population: Vec<Tour<'_>> =
            (0..8).map(|_| Tour::random(&problem, &mut rng)).collect();
        population.sort_by_key(|t| OrderedFloat(t.fitness()));

        let mut counts = [0usize; 8];
        for _ in 0..3600 {
            counts[ea.rank_select(&population, &mut rng)] += 1;
        }
        // weights 8:1 between first and last rank
        assert!(counts[0] > counts[7] * 3);
    }

    #[test]
    fn test_solve_with_both_operators() {
        let problem = create_test_problem();
        for (selection, mutation) in [
            (SelectionType::Ranked, MutationType::Inversion),
            (SelectionType::Tournament, MutationType::Swap),
        ] {
            let ea = EvolutionaryAlgorithm::with_config(EvolutionaryConfig {
                evaluation_budget: 400,
                population_size: 10,
                selection,
                mutation,
                ..EvolutionaryConfig::default()
            });
            let result = ea.solve(&problem, 21);
            let nodes = result.best_nodes();
            assert!(is_permutation(&nodes, 10));
            assert_eq!(result.best_fitness, problem.cycle_length(&nodes));
            assert!(result.best_fitness >= 100.0);
            assert_eq!(result.best_history.len(), 400);
            assert!(result.best_history.windows(2).all(|w| w[1] <= w[0]));
            assert_eq!(result.best_history.last(), Some(&result.best_fitness));
        }
    }
}
