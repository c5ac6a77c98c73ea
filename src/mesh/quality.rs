/// Mesh quality assessment for triangular meshes
///
/// The driver checks the final mesh (generated, refined or restored) so no
/// inverted or degenerate element reaches the assembler.

use crate::mesh::Mesh;
use nalgebra::Point2;
use rayon::prelude::*;

/// Mesh quality statistics
#[derive(Debug, Clone)]
pub struct MeshQuality {
    /// Smallest element area
    pub min_area: f64,
    /// Largest element area
    pub max_area: f64,
    /// Smallest interior angle in degrees
    pub min_angle: f64,
    /// Number of inverted elements (signed area < 0)
    pub num_inverted: usize,
    /// Total elements
    pub total_elements: usize,
}

impl MeshQuality {
    /// Check if mesh is acceptable for simulation
    pub fn is_acceptable(&self) -> bool {
        self.num_inverted == 0 && self.min_area > 0.0
    }

    /// Human-readable quality report
    pub fn report(&self) -> String {
        format!(
            "Mesh Quality: {} elements, area in [{:.3e}, {:.3e}], min angle {:.1} deg, inverted={}",
            self.total_elements, self.min_area, self.max_area, self.min_angle, self.num_inverted
        )
    }
}

/// Signed area of a triangle (positive for counter-clockwise vertices)
pub fn signed_area(vertices: &[Point2<f64>; 3]) -> f64 {
    let [a, b, c] = vertices;
    0.5 * ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y))
}

/// Smallest interior angle of a triangle in degrees
pub fn min_angle(vertices: &[Point2<f64>; 3]) -> f64 {
    let mut smallest = f64::INFINITY;
    for i in 0..3 {
        let p = vertices[i];
        let e1 = vertices[(i + 1) % 3] - p;
        let e2 = vertices[(i + 2) % 3] - p;
        let cos = e1.dot(&e2) / (e1.norm() * e2.norm());
        smallest = smallest.min(cos.clamp(-1.0, 1.0).acos().to_degrees());
    }
    smallest
}

/// Assess mesh quality over all elements
pub fn assess_mesh_quality(mesh: &Mesh) -> MeshQuality {
    let per_element: Vec<(f64, f64)> = mesh
        .elements()
        .par_iter()
        .map(|elem| {
            let v = mesh.vertex_coords(elem);
            (signed_area(&v), min_angle(&v))
        })
        .collect();

    let mut quality = MeshQuality {
        min_area: f64::INFINITY,
        max_area: f64::NEG_INFINITY,
        min_angle: f64::INFINITY,
        num_inverted: 0,
        total_elements: per_element.len(),
    };

    for (area, angle) in per_element {
        if area < 0.0 {
            quality.num_inverted += 1;
        }
        quality.min_area = quality.min_area.min(area);
        quality.max_area = quality.max_area.max(area);
        quality.min_angle = quality.min_angle.min(angle);
    }

    quality
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_signed_area_orientation() {
        let ccw = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
        let cw = [ccw[0], ccw[2], ccw[1]];
        assert_relative_eq!(signed_area(&ccw), 0.5, epsilon = 1e-14);
        assert_relative_eq!(signed_area(&cw), -0.5, epsilon = 1e-14);
    }

    #[test]
    fn test_min_angle_right_isoceles() {
        let v = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
        assert_relative_eq!(min_angle(&v), 45.0, epsilon = 1e-10);
    }
}
