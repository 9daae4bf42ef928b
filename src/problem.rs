//! Symmetric TSP problem instances.
//!
//! A [`Problem`] owns an immutable `n × n` distance matrix. It is built once
//! (from a TSPLIB file or directly from a matrix) and then shared by
//! reference between every algorithm run on it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tsplib;

/// Dense, symmetric matrix of pairwise distances with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    dimension: usize,
    weights: Vec<f64>,
}

impl DistanceMatrix {
    /// Build a matrix from explicit rows, checking every TSP invariant.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let dimension = rows.len();
        let mut weights = Vec::with_capacity(dimension * dimension);

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != dimension {
                return Err(Error::invalid_matrix(format!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    dimension
                )));
            }
            weights.extend(row);
        }

        let matrix = DistanceMatrix { dimension, weights };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Build a matrix by evaluating `distance(i, j)` for every `i != j`.
    /// The diagonal is always zero, whatever the function returns there.
    pub fn from_fn<F>(dimension: usize, mut distance: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut weights = vec![0.0; dimension * dimension];
        for i in 0..dimension {
            for j in 0..dimension {
                if i != j {
                    weights[i * dimension + j] = distance(i, j);
                }
            }
        }

        let matrix = DistanceMatrix { dimension, weights };
        matrix.validate()?;
        Ok(matrix)
    }

    fn validate(&self) -> Result<()> {
        let n = self.dimension;
        for i in 0..n {
            if self.get(i, i) != 0.0 {
                return Err(Error::invalid_matrix(format!(
                    "distance[{}][{}] = {} but the diagonal must be zero",
                    i,
                    i,
                    self.get(i, i)
                )));
            }
            for j in i + 1..n {
                let a = self.get(i, j);
                let b = self.get(j, i);
                if !a.is_finite() || a < 0.0 {
                    return Err(Error::invalid_matrix(format!(
                        "distance[{}][{}] = {} is not a finite non-negative number",
                        i, j, a
                    )));
                }
                if (a - b).abs() > 1e-9 * a.abs().max(1.0) {
                    return Err(Error::invalid_matrix(format!(
                        "distance[{}][{}] = {} differs from distance[{}][{}] = {}",
                        i, j, a, j, i, b
                    )));
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.weights[i * self.dimension + j]
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Iterate over the strictly upper triangle, one value per node pair.
    pub fn pairs(&self) -> impl Iterator<Item = f64> + '_ {
        let n = self.dimension;
        (0..n).flat_map(move |i| (i + 1..n).map(move |j| self.get(i, j)))
    }
}

/// A symmetric TSP instance.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Name of the instance
    pub name: String,
    /// Comment/description
    pub comment: String,
    /// TSPLIB edge weight type the matrix was derived from
    pub edge_weight_type: String,
    /// Decimal places the tour fitness is rounded to
    pub precision: u32,
    distances: DistanceMatrix,
}

impl Problem {
    pub fn new(name: impl Into<String>, distances: DistanceMatrix) -> Self {
        Problem {
            name: name.into(),
            comment: String::new(),
            edge_weight_type: "EXPLICIT".to_string(),
            precision: 0,
            distances,
        }
    }

    /// Convenience constructor from explicit rows.
    pub fn from_matrix(name: impl Into<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        Ok(Self::new(name, DistanceMatrix::from_rows(rows)?))
    }

    /// Parse a TSPLIB `.tsp` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        tsplib::parse_file(path)
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_edge_weight_type(mut self, edge_weight_type: impl Into<String>) -> Self {
        self.edge_weight_type = edge_weight_type.into();
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Number of nodes
    #[inline]
    pub fn dimension(&self) -> usize {
        self.distances.dimension()
    }

    /// Get the distance between two nodes
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distances.get(i, j)
    }

    pub fn distances(&self) -> &DistanceMatrix {
        &self.distances
    }

    /// Round a length to the declared precision (half away from zero).
    pub fn round(&self, value: f64) -> f64 {
        if self.precision == 0 {
            value.round()
        } else {
            let factor = 10f64.powi(self.precision as i32);
            (value * factor).round() / factor
        }
    }

    /// Unrounded cyclic length of a node sequence.
    pub fn cycle_length(&self, nodes: &[usize]) -> f64 {
        if nodes.len() < 2 {
            return 0.0;
        }

        let mut length = 0.0;
        for i in 0..nodes.len() - 1 {
            length += self.distance(nodes[i], nodes[i + 1]);
        }

        length += self.distance(nodes[nodes.len() - 1], nodes[0]);

        length
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> ProblemStatistics {
        let distances: Vec<f64> = self.distances.pairs().collect();
        let (avg_distance, min_distance, max_distance) = if distances.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (
                distances.iter().sum::<f64>() / distances.len() as f64,
                distances.iter().cloned().fold(f64::INFINITY, f64::min),
                distances.iter().cloned().fold(0.0, f64::max),
            )
        };

        ProblemStatistics {
            name: self.name.clone(),
            comment: self.comment.clone(),
            dimension: self.dimension(),
            edge_weight_type: self.edge_weight_type.clone(),
            avg_distance,
            min_distance,
            max_distance,
        }
    }
}

/// Statistics about a TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemStatistics {
    pub name: String,
    pub comment: String,
    pub dimension: usize,
    pub edge_weight_type: String,
    pub avg_distance: f64,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for ProblemStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Problem: {}", self.name)?;
        if !self.comment.is_empty() {
            writeln!(f, "  Comment: {}", self.comment)?;
        }
        writeln!(f, "  Nodes: {}", self.dimension)?;
        writeln!(f, "  Edge weight type: {}", self.edge_weight_type)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Min distance: {:.2}", self.min_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}
