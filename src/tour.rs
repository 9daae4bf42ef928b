//! Tour representation and manipulation.
//!
//! A [`Tour`] is always a full permutation of the problem's nodes: it can
//! only be obtained from a validated node list, a random shuffle or a
//! completed [`PartialTour`], and every mutator keeps the permutation
//! intact. Its cyclic length is cached and dropped on every edit.

use std::cell::Cell;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Error, Result};
use crate::problem::Problem;

/// True when `nodes` holds every node of `0..dimension` exactly once.
pub fn is_permutation(nodes: &[usize], dimension: usize) -> bool {
    if nodes.len() != dimension {
        return false;
    }

    let mut seen = vec![false; dimension];
    for &node in nodes {
        if node >= dimension || seen[node] {
            return false;
        }
        seen[node] = true;
    }

    true
}

fn permutation_error(nodes: &[usize], dimension: usize) -> Error {
    if nodes.len() != dimension {
        return Error::not_permutation(
            dimension,
            format!("expected {} nodes, got {}", dimension, nodes.len()),
        );
    }

    let mut seen = vec![false; dimension];
    for &node in nodes {
        if node >= dimension {
            return Error::not_permutation(dimension, format!("node {} is out of range", node));
        }
        if seen[node] {
            return Error::not_permutation(dimension, format!("node {} appears twice", node));
        }
        seen[node] = true;
    }

    Error::not_permutation(dimension, "unknown")
}

/// A closed tour over every node of a problem.
#[derive(Debug, Clone)]
pub struct Tour<'a> {
    problem: &'a Problem,
    nodes: Vec<usize>,
    /// Inverse permutation: `position[nodes[i]] == i`
    position: Vec<usize>,
    fitness: Cell<Option<f64>>,
}

impl<'a> Tour<'a> {
    /// Build a tour from an explicit node order.
    pub fn from_nodes(problem: &'a Problem, nodes: Vec<usize>) -> Result<Self> {
        let dimension = problem.dimension();
        if !is_permutation(&nodes, dimension) {
            return Err(permutation_error(&nodes, dimension));
        }

        let position = inverse(&nodes);
        Ok(Tour {
            problem,
            nodes,
            position,
            fitness: Cell::new(None),
        })
    }

    /// Identity order `0, 1, ..., n-1`.
    pub fn identity(problem: &'a Problem) -> Self {
        let nodes: Vec<usize> = (0..problem.dimension()).collect();
        let position = nodes.clone();
        Tour {
            problem,
            nodes,
            position,
            fitness: Cell::new(None),
        }
    }

    /// Uniformly shuffled tour.
    pub fn random<R: Rng + ?Sized>(problem: &'a Problem, rng: &mut R) -> Self {
        let mut tour = Self::identity(problem);
        tour.nodes.shuffle(rng);
        tour.position = inverse(&tour.nodes);
        tour
    }

    pub fn problem(&self) -> &'a Problem {
        self.problem
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at position `i`.
    #[inline]
    pub fn get(&self, i: usize) -> usize {
        self.nodes[i]
    }

    /// Position of `node` in the tour.
    #[inline]
    pub fn position_of(&self, node: usize) -> usize {
        self.position[node]
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Place `value` at position `i`; the node that was there moves to
    /// `value`'s old position.
    pub fn set(&mut self, i: usize, value: usize) {
        let j = self.position[value];
        self.swap(i, j);
    }

    pub fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }

        self.nodes.swap(i, j);
        self.position[self.nodes[i]] = i;
        self.position[self.nodes[j]] = j;
        self.fitness.set(None);
    }

    /// Reverse the positions `start..end`.
    ///
    /// # Panics
    ///
    /// Panics if `start > end` or `end > len()`.
    pub fn reverse(&mut self, start: usize, end: usize) {
        self.nodes[start..end].reverse();
        for i in start..end {
            self.position[self.nodes[i]] = i;
        }
        self.fitness.set(None);
    }

    /// Replace the whole node order. The tour is left untouched on error.
    pub fn replace(&mut self, nodes: Vec<usize>) -> Result<()> {
        let dimension = self.problem.dimension();
        if !is_permutation(&nodes, dimension) {
            return Err(permutation_error(&nodes, dimension));
        }

        self.position = inverse(&nodes);
        self.nodes = nodes;
        self.fitness.set(None);
        Ok(())
    }

    /// Cyclic tour length rounded to the problem's precision.
    pub fn fitness(&self) -> f64 {
        if let Some(fitness) = self.fitness.get() {
            return fitness;
        }

        let fitness = self.problem.round(self.problem.cycle_length(&self.nodes));
        self.fitness.set(Some(fitness));
        fitness
    }

    /// Comma separated node list, e.g. `"0,2,1,3"`.
    pub fn path(&self) -> String {
        self.nodes
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Tour<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] (length {})", self.path(), self.fitness())
    }
}

fn inverse(nodes: &[usize]) -> Vec<usize> {
    let mut position = vec![0; nodes.len()];
    for (i, &node) in nodes.iter().enumerate() {
        position[node] = i;
    }
    position
}

/// Append-only tour under construction.
///
/// Construction heuristics push nodes one at a time and call
/// [`PartialTour::finish`] once every node is placed.
#[derive(Debug, Clone)]
pub struct PartialTour<'a> {
    problem: &'a Problem,
    nodes: Vec<usize>,
    visited: Vec<bool>,
}

impl<'a> PartialTour<'a> {
    pub fn new(problem: &'a Problem) -> Self {
        let n = problem.dimension();
        PartialTour {
            problem,
            nodes: Vec::with_capacity(n),
            visited: vec![false; n],
        }
    }

    /// Append `node`. Returns false (and does nothing) if the node is out of
    /// range or already placed.
    pub fn push(&mut self, node: usize) -> bool {
        if node >= self.visited.len() || self.visited[node] {
            return false;
        }

        self.visited[node] = true;
        self.nodes.push(node);
        true
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.nodes.len() == self.visited.len()
    }

    pub fn contains(&self, node: usize) -> bool {
        node < self.visited.len() && self.visited[node]
    }

    pub fn last(&self) -> Option<usize> {
        self.nodes.last().copied()
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Turn a complete partial tour into a [`Tour`].
    pub fn finish(self) -> Result<Tour<'a>> {
        Tour::from_nodes(self.problem, self.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn create_test_problem() -> Problem {
        Problem::from_matrix(
            "square",
            vec![
                vec![0.0, 1.0, 10.0, 1.0],
                vec![1.0, 0.0, 1.0, 10.0],
                vec![10.0, 1.0, 0.0, 1.0],
                vec![1.0, 10.0, 1.0, 0.0],
            ],
        )
        .unwrap()
    }

    fn create_line_problem(n: usize) -> Problem {
        let matrix = crate::problem::DistanceMatrix::from_fn(n, |i, j| {
            (i as f64 - j as f64).abs() * 1.5
        })
        .unwrap();
        Problem::new("line", matrix).with_precision(1)
    }

    #[test]
    fn test_from_nodes_validates() {
        let problem = create_test_problem();
        assert!(Tour::from_nodes(&problem, vec![0, 2, 1, 3]).is_ok());
        assert!(matches!(
            Tour::from_nodes(&problem, vec![0, 1, 1, 3]),
            Err(Error::NotPermutation { .. })
        ));
        assert!(Tour::from_nodes(&problem, vec![0, 1, 2]).is_err());
        assert!(Tour::from_nodes(&problem, vec![0, 1, 2, 4]).is_err());
    }

    #[test]
    fn test_fitness_and_path() {
        let problem = create_test_problem();
        let tour = Tour::from_nodes(&problem, vec![0, 2, 1, 3]).unwrap();
        assert_eq!(tour.fitness(), 22.0);
        assert_eq!(tour.path(), "0,2,1,3");
        assert_eq!(tour.position_of(1), 2);
    }

    #[test]
    fn test_set_is_permutation_preserving() {
        let problem = create_test_problem();
        let mut tour = Tour::from_nodes(&problem, vec![0, 2, 1, 3]).unwrap();
        assert_eq!(tour.fitness(), 22.0);

        tour.set(1, 1);
        assert_eq!(tour.nodes(), &[0, 1, 2, 3]);
        assert_eq!(tour.fitness(), 4.0);
        assert_eq!(tour.position_of(2), 2);
    }

    #[test]
    fn test_replace_keeps_tour_on_error() {
        let problem = create_test_problem();
        let mut tour = Tour::from_nodes(&problem, vec![0, 2, 1, 3]).unwrap();
        assert!(tour.replace(vec![3, 3, 1, 0]).is_err());
        assert_eq!(tour.nodes(), &[0, 2, 1, 3]);

        tour.replace(vec![3, 2, 1, 0]).unwrap();
        assert_eq!(tour.fitness(), 4.0);
        assert_eq!(tour.position_of(3), 0);
    }

    #[test]
    fn test_clone_is_independent() {
        let problem = create_test_problem();
        let tour = Tour::from_nodes(&problem, vec![0, 2, 1, 3]).unwrap();
        let best = tour.clone();
        let mut working = tour;
        working.swap(1, 2);
        assert_eq!(best.fitness(), 22.0);
        assert_eq!(working.fitness(), 4.0);
    }

    #[test]
    fn test_partial_tour() {
        let problem = create_test_problem();
        let mut partial = PartialTour::new(&problem);
        assert!(partial.push(2));
        assert!(!partial.push(2));
        assert!(!partial.push(7));
        assert!(partial.push(0));
        assert_eq!(partial.len(), 2);
        assert!(partial.contains(0));
        assert_eq!(partial.last(), Some(0));
        assert!(!partial.is_complete());

        assert!(partial.clone().finish().is_err());

        partial.push(1);
        partial.push(3);
        let tour = partial.finish().unwrap();
        assert_eq!(tour.path(), "2,0,1,3");
    }

    #[test]
    fn test_random_is_deterministic() {
        let problem = create_line_problem(20);
        let a = Tour::random(&problem, &mut ChaCha8Rng::seed_from_u64(7));
        let b = Tour::random(&problem, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a.nodes(), b.nodes());
        assert!(is_permutation(a.nodes(), 20));
    }

    proptest! {
        #[test]
        fn prop_mutations_keep_permutation_and_fitness(
            seed in 0u64..5000,
            ops in proptest::collection::vec((0u8..3, 0usize..12, 0usize..12), 0..40),
        ) {
            let problem = create_line_problem(12);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut tour = Tour::random(&problem, &mut rng);

            for (op, i, j) in ops {
                match op {
                    0 => tour.swap(i, j),
                    1 => tour.reverse(i.min(j), i.max(j)),
                    _ => tour.set(i, j),
                }

                prop_assert!(is_permutation(tour.nodes(), 12));
                for (pos, &node) in tour.nodes().iter().enumerate() {
                    prop_assert_eq!(tour.position_of(node), pos);
                }
                let expected = problem.round(problem.cycle_length(tour.nodes()));
                prop_assert_eq!(tour.fitness(), expected);
            }
        }
    }
}
