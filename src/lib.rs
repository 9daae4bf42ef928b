//! TSP Heuristics Library
//!
//! Heuristics for the symmetric Travelling Salesman Problem, built around a
//! Lin-Kernighan local search.
//!
//! # Features
//!
//! - TSPLIB parser (coordinate and explicit matrix instances)
//! - Lin-Kernighan variable depth search
//! - Baselines: Nearest Neighbour, Simulated Annealing, Evolutionary
//!   Algorithm, Ant Colony Optimization
//! - Benchmarking with CSV export and a text report
//!
//! # Example
//!
//! ```no_run
//! use tsp_heuristics::heuristics::{LinKernighan, NearestNeighbour};
//! use tsp_heuristics::Problem;
//!
//! let problem = Problem::from_file("berlin52.tsp").unwrap();
//!
//! // Start from a nearest neighbour tour
//! let tour = NearestNeighbour::new().construct_from(&problem, 0).unwrap();
//!
//! // Improve with Lin-Kernighan
//! let result = LinKernighan::with_budget(100).run_from(tour);
//!
//! println!("Tour length: {}", result.best_fitness);
//! ```

pub mod error;
pub mod problem;
pub mod tsplib;
pub mod edge;
pub mod tour;
pub mod result;
pub mod heuristics;
pub mod benchmark;

pub use error::{Error, Result};
pub use heuristics::Solver;
pub use problem::Problem;
pub use result::RunResult;
pub use tour::{PartialTour, Tour};
