use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use crate::mesh::{Mesh, Tri6Element};

/// Diagonal pattern used to split each rectangular cell into triangles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagonal {
    /// Diagonal from bottom-right to top-left in every cell
    #[serde(rename = "left")]
    Left,
    /// Diagonal from bottom-left to top-right in every cell
    #[serde(rename = "right")]
    Right,
    /// Left diagonals on even rows, right diagonals on odd rows
    #[serde(rename = "left/right")]
    LeftRight,
    /// Four triangles per cell around a centroid vertex
    #[serde(rename = "crossed")]
    Crossed,
}

impl Default for Diagonal {
    fn default() -> Self {
        Diagonal::LeftRight
    }
}

/// Builds Tri6 meshes while sharing midpoint nodes between neighbours
pub struct Tri6Builder {
    mesh: Mesh,
    midpoints: HashMap<(usize, usize), usize>,
}

impl Tri6Builder {
    pub fn new() -> Self {
        Self {
            mesh: Mesh::new(),
            midpoints: HashMap::new(),
        }
    }

    /// Add a vertex node and return its index
    pub fn add_vertex(&mut self, x: f64, y: f64) -> usize {
        self.mesh.geometry.add_node(x, y)
    }

    /// Return the midpoint node of edge (a, b), creating it on first use
    fn midpoint(&mut self, a: usize, b: usize) -> usize {
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&id) = self.midpoints.get(&key) {
            return id;
        }
        let pa = self.mesh.geometry.nodes[a];
        let pb = self.mesh.geometry.nodes[b];
        let id = self
            .mesh
            .geometry
            .add_node(0.5 * (pa.x + pb.x), 0.5 * (pa.y + pb.y));
        self.midpoints.insert(key, id);
        id
    }

    /// Add a triangle given counter-clockwise vertex indices
    pub fn add_triangle(&mut self, v0: usize, v1: usize, v2: usize) {
        let m01 = self.midpoint(v0, v1);
        let m12 = self.midpoint(v1, v2);
        let m20 = self.midpoint(v2, v0);
        self.mesh
            .connectivity
            .add_element(Tri6Element::new([v0, v1, v2, m01, m12, m20]));
    }

    pub fn finish(self) -> Mesh {
        self.mesh
    }
}

impl Default for Tri6Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// Rectangle mesh generator
pub struct MeshGenerator;

impl MeshGenerator {
    /// Generate a triangulated rectangle [0, lx] x [0, ly] with Tri6 elements
    ///
    /// # Arguments
    /// * `lx`, `ly` - Domain dimensions
    /// * `nx`, `ny` - Number of cells in each direction
    /// * `diagonal` - How each cell is split into triangles
    pub fn rectangle(lx: f64, ly: f64, nx: usize, ny: usize, diagonal: Diagonal) -> Mesh {
        let mut builder = Tri6Builder::new();

        let dx = lx / nx as f64;
        let dy = ly / ny as f64;

        for iy in 0..=ny {
            for ix in 0..=nx {
                builder.add_vertex(ix as f64 * dx, iy as f64 * dy);
            }
        }

        for iy in 0..ny {
            for ix in 0..nx {
                let v0 = iy * (nx + 1) + ix;
                let v1 = v0 + 1;
                let v2 = v0 + (nx + 1);
                let v3 = v1 + (nx + 1);

                let local = match diagonal {
                    Diagonal::LeftRight if iy % 2 == 1 => Diagonal::Right,
                    Diagonal::LeftRight => Diagonal::Left,
                    other => other,
                };

                match local {
                    Diagonal::Left => {
                        builder.add_triangle(v0, v1, v2);
                        builder.add_triangle(v1, v3, v2);
                    }
                    Diagonal::Right => {
                        builder.add_triangle(v0, v1, v3);
                        builder.add_triangle(v0, v3, v2);
                    }
                    _ => {
                        let xc = (ix as f64 + 0.5) * dx;
                        let yc = (iy as f64 + 0.5) * dy;
                        let vc = builder.add_vertex(xc, yc);
                        builder.add_triangle(v0, v1, vc);
                        builder.add_triangle(v1, v3, vc);
                        builder.add_triangle(v3, v2, vc);
                        builder.add_triangle(v2, v0, vc);
                    }
                }
            }
        }

        builder.finish()
    }
}
