//! Outcome of a single algorithm run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tour::Tour;

/// Result of running one algorithm once on one problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Problem instance name
    pub problem_name: String,
    /// Algorithm name
    pub algorithm_name: String,
    /// Fitness (rounded tour length) of the best tour found
    pub best_fitness: f64,
    /// Node order of the best tour, comma separated
    pub best_path: String,
    /// Number of evaluations the run was allowed
    pub evaluation_budget: usize,
    /// Evaluations spent when the best tour was first reached
    pub evaluations_until_best: usize,
    /// Wall clock time in seconds
    #[serde(default)]
    pub computation_time: f64,
    /// Best fitness so far after each evaluation; ant colony records one
    /// entry per colony iteration and Lin-Kernighan one per sweep
    #[serde(skip)]
    pub best_history: Vec<f64>,
}

impl RunResult {
    pub fn from_tour(
        algorithm_name: &str,
        best: &Tour<'_>,
        evaluation_budget: usize,
        evaluations_until_best: usize,
    ) -> Self {
        RunResult {
            problem_name: best.problem().name.clone(),
            algorithm_name: algorithm_name.to_string(),
            best_fitness: best.fitness(),
            best_path: best.path(),
            evaluation_budget,
            evaluations_until_best,
            computation_time: 0.0,
            best_history: Vec::new(),
        }
    }

    pub fn with_time(mut self, seconds: f64) -> Self {
        self.computation_time = seconds;
        self
    }

    pub fn with_history(mut self, best_history: Vec<f64>) -> Self {
        self.best_history = best_history;
        self
    }

    /// Parse `best_path` back into node indices.
    pub fn best_nodes(&self) -> Vec<usize> {
        self.best_path
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},\"{}\",{},{}",
            self.problem_name,
            self.algorithm_name,
            self.best_fitness,
            self.best_path,
            self.evaluation_budget,
            self.evaluations_until_best
        )
    }
}
