use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use super::topology::{Connectivity, Tri6Element};
use crate::error::{Result, SimError};

/// Geometric information for the mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Node coordinates (vertices and edge midpoints)
    pub nodes: Vec<Point2<f64>>,
}

impl Geometry {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn add_node(&mut self, x: f64, y: f64) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Point2::new(x, y));
        idx
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Axis-aligned bounding box as (min, max)
    pub fn bounding_box(&self) -> (Point2<f64>, Point2<f64>) {
        let mut lo = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut hi = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &self.nodes {
            lo.x = lo.x.min(p.x);
            lo.y = lo.y.min(p.y);
            hi.x = hi.x.max(p.x);
            hi.y = hi.y.max(p.y);
        }
        (lo, hi)
    }
}

/// Complete mesh with geometry and topology
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub geometry: Geometry,
    pub connectivity: Connectivity,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            geometry: Geometry::new(),
            connectivity: Connectivity::new(),
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.geometry.num_nodes()
    }

    pub fn num_elements(&self) -> usize {
        self.connectivity.num_elements()
    }

    pub fn elements(&self) -> &[Tri6Element] {
        &self.connectivity.elements
    }

    /// Coordinates of the three vertices of an element
    pub fn vertex_coords(&self, elem: &Tri6Element) -> [Point2<f64>; 3] {
        [
            self.geometry.nodes[elem.nodes[0]],
            self.geometry.nodes[elem.nodes[1]],
            self.geometry.nodes[elem.nodes[2]],
        ]
    }

    /// Centroid of an element
    pub fn centroid(&self, elem: &Tri6Element) -> Point2<f64> {
        let [a, b, c] = self.vertex_coords(elem);
        Point2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
    }

    /// Check that node indices are in range and every element is
    /// counter-clockwise with non-zero area
    pub fn validate(&self) -> Result<()> {
        let n = self.num_nodes();
        for (e, elem) in self.elements().iter().enumerate() {
            if let Some(&bad) = elem.nodes.iter().find(|&&id| id >= n) {
                return Err(SimError::Mesh(format!(
                    "element {} references node {} but mesh has {} nodes",
                    e, bad, n
                )));
            }
            let area = super::quality::signed_area(&self.vertex_coords(elem));
            if area <= 0.0 {
                return Err(SimError::Mesh(format!(
                    "element {} is inverted or degenerate (signed area {:.3e})",
                    e, area
                )));
            }
        }
        Ok(())
    }
}
