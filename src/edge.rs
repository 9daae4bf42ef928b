//! Undirected edges and the edge bag used to rebuild a tour after an
//! exchange.

use std::fmt;

use crate::error::{Error, Result};
use crate::tour::is_permutation;

/// Unordered pair of nodes, stored with the smaller index first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    a: usize,
    b: usize,
}

impl Edge {
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Edge { a, b }
        } else {
            Edge { a: b, b: a }
        }
    }

    pub fn a(&self) -> usize {
        self.a
    }

    pub fn b(&self) -> usize {
        self.b
    }

    pub fn touches(&self, node: usize) -> bool {
        self.a == node || self.b == node
    }

    /// The endpoint that is not `node`. Only meaningful when `touches(node)`.
    pub fn other(&self, node: usize) -> usize {
        if self.a == node {
            self.b
        } else {
            self.a
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.a, self.b)
    }
}

/// Bag of edges where each slot carries a presence flag.
///
/// Removing an edge clears the flag of the first present slot that matches
/// it; the slot itself stays so insertion order is stable for
/// [`EdgeSet::reconstruct`].
#[derive(Debug, Clone, Default)]
pub struct EdgeSet {
    edges: Vec<Edge>,
    present: Vec<bool>,
}

impl EdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `n` edges of the closed tour visiting `nodes` in order.
    pub fn from_tour(nodes: &[usize]) -> Self {
        let n = nodes.len();
        let mut set = EdgeSet {
            edges: Vec::with_capacity(n + 8),
            present: Vec::with_capacity(n + 8),
        };

        if n < 2 {
            return set;
        }

        for i in 0..n {
            set.add(Edge::new(nodes[i], nodes[(i + 1) % n]));
        }

        set
    }

    pub fn add(&mut self, edge: Edge) {
        self.edges.push(edge);
        self.present.push(true);
    }

    pub fn remove(&mut self, edge: &Edge) -> Result<()> {
        let slot = self
            .edges
            .iter()
            .zip(self.present.iter())
            .position(|(e, &present)| present && e == edge)
            .ok_or(Error::MissingEdge(*edge))?;

        self.present[slot] = false;
        Ok(())
    }

    pub fn contains(&self, edge: &Edge) -> bool {
        self.iter().any(|e| e == edge)
    }

    /// Number of edges still present.
    pub fn len(&self) -> usize {
        self.present.iter().filter(|&&p| p).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Present edges in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges
            .iter()
            .zip(self.present.iter())
            .filter_map(|(e, &present)| if present { Some(e) } else { None })
    }

    /// Walk the present edges into a node sequence over `dimension` nodes.
    ///
    /// Starts from the first present edge, then keeps consuming the first
    /// unconsumed edge incident to the last node placed. Returns `None` unless
    /// the walk places exactly `dimension` distinct nodes and an unconsumed
    /// edge joins the last node back to the first.
    pub fn reconstruct(&self, dimension: usize) -> Option<Vec<usize>> {
        let first = self.iter().next()?;
        if first.b() >= dimension {
            return None;
        }

        // Per node, the present slots touching it in insertion order.
        let mut incident: Vec<Vec<usize>> = vec![Vec::new(); dimension];
        for (slot, edge) in self.edges.iter().enumerate() {
            if !self.present[slot] {
                continue;
            }
            if edge.b() >= dimension {
                return None;
            }
            incident[edge.a()].push(slot);
            if edge.a() != edge.b() {
                incident[edge.b()].push(slot);
            }
        }

        let mut consumed = vec![false; self.edges.len()];
        let mut cursor = vec![0usize; dimension];
        let first_slot = incident[first.a()][0];
        consumed[first_slot] = true;

        let mut nodes = Vec::with_capacity(dimension);
        nodes.push(first.a());
        nodes.push(first.b());

        while nodes.len() < dimension {
            let frontier = nodes[nodes.len() - 1];
            let slots = &incident[frontier];

            while cursor[frontier] < slots.len() && consumed[slots[cursor[frontier]]] {
                cursor[frontier] += 1;
            }
            if cursor[frontier] == slots.len() {
                break;
            }

            let slot = slots[cursor[frontier]];
            consumed[slot] = true;
            nodes.push(self.edges[slot].other(frontier));
        }

        if !is_permutation(&nodes, dimension) {
            return None;
        }

        let last = nodes[nodes.len() - 1];
        let closes = incident[last]
            .iter()
            .any(|&slot| !consumed[slot] && self.edges[slot].other(last) == nodes[0]);

        if closes {
            Some(nodes)
        } else {
            None
        }
    }
}
