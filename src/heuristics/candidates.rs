//! Neighbour lookups on tour positions.

use crate::tour::Tour;

/// Position after `i`, wrapping at the end of the tour.
#[inline]
pub fn successor(tour: &Tour<'_>, i: usize) -> usize {
    (i + 1) % tour.len()
}

/// Position before `i`, wrapping at the start of the tour.
#[inline]
pub fn predecessor(tour: &Tour<'_>, i: usize) -> usize {
    (i + tour.len() - 1) % tour.len()
}

/// Position of the node closest to the node at `position`.
///
/// Nodes are scanned in ascending index with a strict comparison, so ties go
/// to the lowest node index. `None` when the tour has no other node.
pub fn nearest_neighbour(tour: &Tour<'_>, position: usize) -> Option<usize> {
    let problem = tour.problem();
    let node = tour.get(position);

    let mut nearest = None;
    let mut min_distance = f64::INFINITY;

    for other in 0..problem.dimension() {
        if other == node {
            continue;
        }
        let d = problem.distance(node, other);
        if d < min_distance || nearest.is_none() {
            min_distance = d;
            nearest = Some(other);
        }
    }

    nearest.map(|other| tour.position_of(other))
}
