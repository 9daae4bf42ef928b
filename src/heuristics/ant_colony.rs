//! Ant colony optimisation.
//!
//! Every iteration each ant builds a tour from a random start, choosing the
//! next node by roulette over `tau^alpha * (1/d)^beta`. Trails then
//! evaporate and every ant deposits `q / length` on the edges it used.

use std::time::Instant;

use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::heuristics::Solver;
use crate::problem::Problem;
use crate::result::RunResult;
use crate::tour::{PartialTour, Tour};

/// ACO configuration parameters
#[derive(Debug, Clone)]
pub struct AntColonyConfig {
    /// Number of tours evaluated; one iteration costs `colony_size`
    pub evaluation_budget: usize,
    /// Number of ants
    pub colony_size: usize,
    /// Chance for an ant to move to a random unvisited node
    pub random_move_rate: f64,
    /// Factor applied to trails above the floor at each update
    pub evaporation: f64,
    /// Pheromone importance (alpha)
    pub alpha: f64,
    /// Heuristic importance (beta)
    pub beta: f64,
    /// Initial pheromone level
    pub initial_pheromone: f64,
    /// Trails at or below this level are reset to it instead of evaporating
    pub pheromone_floor: f64,
    /// Pheromone deposit factor
    pub q: f64,
}

impl Default for AntColonyConfig {
    fn default() -> Self {
        AntColonyConfig {
            evaluation_budget: 10_000,
            colony_size: 50,
            random_move_rate: 0.01,
            evaporation: 0.25,
            alpha: 1.0,
            beta: 6.0,
            initial_pheromone: 1.0,
            pheromone_floor: 0.1,
            q: 200.0,
        }
    }
}

/// Ant Colony Optimization solver
pub struct AntColony {
    pub config: AntColonyConfig,
}

/// Pheromone and visibility matrices of one run.
struct Trails {
    n: usize,
    pheromone: Vec<f64>,
    heuristic: Vec<f64>,
}

impl Trails {
    fn new(problem: &Problem, config: &AntColonyConfig) -> Self {
        let n = problem.dimension();
        let mut heuristic = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let dist = problem.distance(i, j);
                    heuristic[i * n + j] = if dist > 0.0 { 1.0 / dist } else { 1e6 };
                }
            }
        }

        Trails {
            n,
            pheromone: vec![config.initial_pheromone; n * n],
            heuristic,
        }
    }

    #[inline]
    fn attractiveness(&self, from: usize, to: usize, config: &AntColonyConfig) -> f64 {
        let tau = self.pheromone[from * self.n + to].powf(config.alpha);
        let eta = self.heuristic[from * self.n + to].powf(config.beta);
        tau * eta
    }

    fn evaporate(&mut self, config: &AntColonyConfig) {
        for tau in self.pheromone.iter_mut() {
            if *tau <= config.pheromone_floor {
                *tau = config.pheromone_floor;
            } else {
                *tau *= config.evaporation;
            }
        }
    }

    fn deposit(&mut self, tour: &Tour<'_>, config: &AntColonyConfig) {
        let length = tour.fitness();
        let contribution = if length > 0.0 { config.q / length } else { config.q };

        let nodes = tour.nodes();
        let m = nodes.len();
        for i in 0..m {
            let from = nodes[i];
            let to = nodes[(i + 1) % m];
            self.pheromone[from * self.n + to] += contribution;
            if from != to {
                self.pheromone[to * self.n + from] += contribution;
            }
        }
    }
}

impl AntColony {
    pub fn new() -> Self {
        AntColony {
            config: AntColonyConfig::default(),
        }
    }

    pub fn with_config(config: AntColonyConfig) -> Self {
        AntColony { config }
    }

    pub fn with_budget(evaluation_budget: usize) -> Self {
        AntColony {
            config: AntColonyConfig {
                evaluation_budget,
                ..AntColonyConfig::default()
            },
        }
    }

    /// Select next node by roulette; `None` once every node is visited.
    fn select_next_node<R: Rng + ?Sized>(
        &self,
        trails: &Trails,
        partial: &PartialTour<'_>,
        current: usize,
        rng: &mut R,
    ) -> Option<usize> {
        let unvisited: Vec<usize> = (0..trails.n).filter(|&j| !partial.contains(j)).collect();
        if unvisited.is_empty() {
            return None;
        }

        if rng.gen::<f64>() < self.config.random_move_rate {
            return unvisited.choose(rng).copied();
        }

        let candidates: Vec<(usize, f64)> = unvisited
            .iter()
            .map(|&j| (j, trails.attractiveness(current, j, &self.config)))
            .collect();

        let total: f64 = candidates.iter().map(|&(_, p)| p).sum();
        if !(total.is_finite() && total > 0.0) {
            return candidates
                .iter()
                .max_by_key(|&&(_, p)| OrderedFloat(p))
                .map(|&(j, _)| j);
        }

        let mut pick = rng.gen::<f64>() * total;
        for &(j, prob) in &candidates {
            pick -= prob;
            if pick <= 0.0 {
                return Some(j);
            }
        }

        candidates.last().map(|&(j, _)| j)
    }

    /// Walk one ant around the problem.
    fn construct_tour<'a, R: Rng + ?Sized>(
        &self,
        problem: &'a Problem,
        trails: &Trails,
        rng: &mut R,
    ) -> Tour<'a> {
        let n = problem.dimension();
        if n == 0 {
            return Tour::identity(problem);
        }

        let mut partial = PartialTour::new(problem);
        let mut current = rng.gen_range(0..n);
        partial.push(current);

        while let Some(next) = self.select_next_node(trails, &partial, current, rng) {
            partial.push(next);
            current = next;
        }

        match partial.finish() {
            Ok(tour) => tour,
            Err(e) => {
                log::error!("Ant built an invalid tour: {}", e);
                Tour::random(problem, rng)
            }
        }
    }
}

impl Default for AntColony {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for AntColony {
    fn solve(&self, problem: &Problem, seed: u64) -> RunResult {
        let start = Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let budget = self.config.evaluation_budget;
        let colony_size = self.config.colony_size.max(1);
        let iterations = (budget / colony_size).max(1);

        let mut trails = Trails::new(problem, &self.config);
        let mut best: Option<Tour<'_>> = None;
        let mut evaluations = 0;
        let mut evaluations_until_best = 0;
        let mut best_history = Vec::with_capacity(iterations);

        for _ in 0..iterations {
            let colony: Vec<Tour<'_>> = (0..colony_size)
                .map(|_| self.construct_tour(problem, &trails, &mut rng))
                .collect();
            evaluations += colony_size;

            if let Some(iteration_best) = colony.iter().min_by_key(|t| OrderedFloat(t.fitness())) {
                let improved = best
                    .as_ref()
                    .map_or(true, |b| iteration_best.fitness() < b.fitness());
                if improved {
                    best = Some(iteration_best.clone());
                    evaluations_until_best = evaluations;
                }
            }
            if let Some(best) = &best {
                best_history.push(best.fitness());
            }

            trails.evaporate(&self.config);
            for ant in &colony {
                trails.deposit(ant, &self.config);
            }
        }

        let best = best.unwrap_or_else(|| Tour::identity(problem));

        log::info!(
            "ACO on {}: best {} after {} of {} evaluations",
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
        "AntColony"
    }
}
