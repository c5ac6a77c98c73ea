use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A 6-node quadratic triangle (Tri6)
///
/// Node numbering (counter-clockwise vertices):
/// Vertices: 0, 1, 2
/// Edge midpoints:
///   3: midpoint of edge 0-1
///   4: midpoint of edge 1-2
///   5: midpoint of edge 2-0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tri6Element {
    /// Global node indices for this element (6 nodes)
    pub nodes: [usize; 6],
}

impl Tri6Element {
    pub fn new(nodes: [usize; 6]) -> Self {
        Self { nodes }
    }

    /// Get the vertex node indices (first 3 nodes)
    pub fn vertices(&self) -> [usize; 3] {
        [self.nodes[0], self.nodes[1], self.nodes[2]]
    }

    /// Get the edge midpoint node indices (last 3 nodes)
    pub fn edge_nodes(&self) -> [usize; 3] {
        [self.nodes[3], self.nodes[4], self.nodes[5]]
    }

    /// Get edges as pairs of local vertex indices, in midpoint order
    pub fn edges() -> [(usize, usize); 3] {
        [
            (0, 1), // edge 0 -> node 3
            (1, 2), // edge 1 -> node 4
            (2, 0), // edge 2 -> node 5
        ]
    }
}

/// Connectivity information for the mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connectivity {
    pub elements: Vec<Tri6Element>,
}

impl Connectivity {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    pub fn add_element(&mut self, element: Tri6Element) {
        self.elements.push(element);
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Get all unique vertex (corner) nodes from all elements, sorted
    pub fn corner_nodes(&self) -> Vec<usize> {
        let mut corners = BTreeSet::new();
        for elem in &self.elements {
            for &node in &elem.nodes[0..3] {
                corners.insert(node);
            }
        }
        corners.into_iter().collect()
    }
}
