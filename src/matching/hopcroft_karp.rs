//! Maximum-cardinality bipartite matching.

use std::collections::VecDeque;

const UNREACHED: usize = usize::MAX;

/// A bipartite graph given as the adjacency of its left vertices.
///
/// Search order follows vertex and adjacency order, so the matching found
/// is deterministic for a given graph.
pub struct HopcroftKarp<'a> {
    adjacency: &'a [Vec<usize>],
    left: Vec<Option<usize>>,
    right: Vec<Option<usize>>,
    layer: Vec<usize>,
}

impl<'a> HopcroftKarp<'a> {
    /// `adjacency[u]` lists the right vertices adjacent to left vertex `u`,
    /// every one below `right_size`.
    pub fn new(adjacency: &'a [Vec<usize>], right_size: usize) -> Self {
        HopcroftKarp {
            adjacency,
            left: vec![None; adjacency.len()],
            right: vec![None; right_size],
            layer: vec![UNREACHED; adjacency.len()],
        }
    }

    /// Computes a maximum matching, returning the partner of each left vertex.
    pub fn solve(mut self) -> Vec<Option<usize>> {
        while self.layered() {
            for u in 0..self.adjacency.len() {
                if self.left[u].is_none() {
                    self.augment(u);
                }
            }
        }

        self.left
    }

    /// Layers the left vertices by alternating distance from the free
    /// ones. True if some free right vertex is reachable.
    fn layered(&mut self) -> bool {
        let mut queue = VecDeque::new();
        for (u, partner) in self.left.iter().enumerate() {
            if partner.is_none() {
                self.layer[u] = 0;
                queue.push_back(u);
            } else {
                self.layer[u] = UNREACHED;
            }
        }

        let mut reachable = false;
        while let Some(u) = queue.pop_front() {
            for &v in &self.adjacency[u] {
                match self.right[v] {
                    None => reachable = true,
                    Some(next) if self.layer[next] == UNREACHED => {
                        self.layer[next] = self.layer[u] + 1;
                        queue.push_back(next);
                    }
                    Some(_) => {}
                }
            }
        }

        reachable
    }

    /// Searches for an augmenting path from `u` along the layering,
    /// flipping it if one is found.
    fn augment(&mut self, u: usize) -> bool {
        for index in 0..self.adjacency[u].len() {
            let v = self.adjacency[u][index];
            let extends = match self.right[v] {
                None => true,
                Some(next) => self.layer[next] == self.layer[u].wrapping_add(1) && self.augment(next),
            };

            if extends {
                self.left[u] = Some(v);
                self.right[v] = Some(u);
                return true;
            }
        }

        // Dead end for the rest of this phase.
        self.layer[u] = UNREACHED;
        false
    }
}
