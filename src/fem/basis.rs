use nalgebra::{Matrix2, Point2, Vector2};
use crate::error::{Result, SimError};

/// Affine map of a straight-sided triangle
///
/// Barycentric gradients are constant over the element:
///   ∇L_i = (y_j - y_k, x_k - x_j) / (2A)   for (i, j, k) cyclic
#[derive(Debug, Clone)]
pub struct TriangleMap {
    pub vertices: [Point2<f64>; 3],
    /// Element area (positive for counter-clockwise vertices)
    pub area: f64,
    /// Gradients of the barycentric coordinates
    pub grad_l: [Vector2<f64>; 3],
}

impl TriangleMap {
    pub fn new(vertices: [Point2<f64>; 3]) -> Result<Self> {
        let [p0, p1, p2] = vertices;
        let two_a = (p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y);
        if two_a <= 0.0 {
            return Err(SimError::Mesh(format!(
                "triangle ({:.4}, {:.4}) ({:.4}, {:.4}) ({:.4}, {:.4}) has non-positive area",
                p0.x, p0.y, p1.x, p1.y, p2.x, p2.y
            )));
        }

        let grad_l = [
            Vector2::new(p1.y - p2.y, p2.x - p1.x) / two_a,
            Vector2::new(p2.y - p0.y, p0.x - p2.x) / two_a,
            Vector2::new(p0.y - p1.y, p1.x - p0.x) / two_a,
        ];

        Ok(Self {
            vertices,
            area: 0.5 * two_a,
            grad_l,
        })
    }

    /// Jacobian determinant of the reference-to-physical map
    pub fn det_j(&self) -> f64 {
        2.0 * self.area
    }

    /// Physical point at barycentric coordinates
    pub fn point(&self, l: &[f64; 3]) -> Point2<f64> {
        let [p0, p1, p2] = self.vertices;
        Point2::new(
            l[0] * p0.x + l[1] * p1.x + l[2] * p2.x,
            l[0] * p0.y + l[1] * p1.y + l[2] * p2.y,
        )
    }

    /// Barycentric coordinates of a physical point
    pub fn barycentric(&self, p: &Point2<f64>) -> [f64; 3] {
        let p0 = self.vertices[0];
        let d = *p - p0;
        let l1 = self.grad_l[1].dot(&d);
        let l2 = self.grad_l[2].dot(&d);
        [1.0 - l1 - l2, l1, l2]
    }
}

/// Tri6 (6-node quadratic triangle) basis functions
///
/// Node numbering:
///   Vertices: 0, 1, 2
///   Edge midpoints:
///     3: edge 0-1
///     4: edge 1-2
///     5: edge 2-0
///
/// Shape functions use barycentric (area) coordinates L0, L1, L2
/// where L0 + L1 + L2 = 1
pub struct Tri6Basis;

impl Tri6Basis {
    /// Evaluate all 6 shape functions at barycentric coordinates
    ///
    /// # Shape Functions
    /// Vertices:
    ///   N_i = L_i (2 L_i - 1)  for i = 0,1,2
    ///
    /// Edge midpoints:
    ///   N_3 = 4 L_0 L_1
    ///   N_4 = 4 L_1 L_2
    ///   N_5 = 4 L_2 L_0
    #[allow(non_snake_case)]
    pub fn shape_functions(L: &[f64; 3]) -> [f64; 6] {
        let [L0, L1, L2] = *L;

        [
            L0 * (2.0 * L0 - 1.0),
            L1 * (2.0 * L1 - 1.0),
            L2 * (2.0 * L2 - 1.0),
            4.0 * L0 * L1,
            4.0 * L1 * L2,
            4.0 * L2 * L0,
        ]
    }

    /// Physical gradients of the shape functions
    ///
    ///   ∇N_i = (4 L_i - 1) ∇L_i
    ///   ∇N_3 = 4 (L_1 ∇L_0 + L_0 ∇L_1), and cyclically
    #[allow(non_snake_case)]
    pub fn shape_gradients(L: &[f64; 3], grad_l: &[Vector2<f64>; 3]) -> [Vector2<f64>; 6] {
        let [L0, L1, L2] = *L;
        let [g0, g1, g2] = *grad_l;

        [
            g0 * (4.0 * L0 - 1.0),
            g1 * (4.0 * L1 - 1.0),
            g2 * (4.0 * L2 - 1.0),
            (g0 * L1 + g1 * L0) * 4.0,
            (g1 * L2 + g2 * L1) * 4.0,
            (g2 * L0 + g0 * L2) * 4.0,
        ]
    }

    /// Physical Hessians of the shape functions (constant on affine triangles)
    ///
    ///   H(N_i) = 4 ∇L_i ⊗ ∇L_i
    ///   H(N_3) = 4 (∇L_0 ⊗ ∇L_1 + ∇L_1 ⊗ ∇L_0), and cyclically
    pub fn shape_hessians(grad_l: &[Vector2<f64>; 3]) -> [Matrix2<f64>; 6] {
        let outer = |a: &Vector2<f64>, b: &Vector2<f64>| a * b.transpose();
        let [g0, g1, g2] = grad_l;

        [
            outer(g0, g0) * 4.0,
            outer(g1, g1) * 4.0,
            outer(g2, g2) * 4.0,
            (outer(g0, g1) + outer(g1, g0)) * 4.0,
            (outer(g1, g2) + outer(g2, g1)) * 4.0,
            (outer(g2, g0) + outer(g0, g2)) * 4.0,
        ]
    }
}

/// Linear (P1) triangle basis: N_i = L_i
pub struct P1Basis;

impl P1Basis {
    pub fn shape_functions(l: &[f64; 3]) -> [f64; 3] {
        *l
    }

    pub fn shape_gradients(grad_l: &[Vector2<f64>; 3]) -> [Vector2<f64>; 3] {
        *grad_l
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_map() -> TriangleMap {
        TriangleMap::new([
            Point2::new(0.1, 0.2),
            Point2::new(1.3, 0.4),
            Point2::new(0.5, 1.1),
        ])
        .unwrap()
    }

    #[test]
    fn test_partition_of_unity() {
        let l = [0.2, 0.3, 0.5];
        let n = Tri6Basis::shape_functions(&l);
        assert_relative_eq!(n.iter().sum::<f64>(), 1.0, epsilon = 1e-14);

        let map = sample_map();
        let dn = Tri6Basis::shape_gradients(&l, &map.grad_l);
        let sum = dn.iter().fold(Vector2::zeros(), |acc, g| acc + g);
        assert_relative_eq!(sum.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kronecker_property() {
        let nodes = [
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.5, 0.5, 0.0],
            [0.0, 0.5, 0.5],
            [0.5, 0.0, 0.5],
        ];
        for (i, l) in nodes.iter().enumerate() {
            let n = Tri6Basis::shape_functions(l);
            for (j, &v) in n.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(v, expected, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let map = sample_map();
        let l = [0.25, 0.35, 0.4];
        let x = map.point(&l);
        let dn = Tri6Basis::shape_gradients(&l, &map.grad_l);
        let h = 1e-6;

        for dir in 0..2 {
            let mut xp = x;
            let mut xm = x;
            xp[dir] += h;
            xm[dir] -= h;
            let np = Tri6Basis::shape_functions(&map.barycentric(&xp));
            let nm = Tri6Basis::shape_functions(&map.barycentric(&xm));
            for a in 0..6 {
                assert_relative_eq!((np[a] - nm[a]) / (2.0 * h), dn[a][dir], epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn test_hessians_match_gradient_differences() {
        let map = sample_map();
        let l = [0.3, 0.3, 0.4];
        let x = map.point(&l);
        let hess = Tri6Basis::shape_hessians(&map.grad_l);
        let h = 1e-5;

        for j in 0..2 {
            let mut xp = x;
            let mut xm = x;
            xp[j] += h;
            xm[j] -= h;
            let gp = Tri6Basis::shape_gradients(&map.barycentric(&xp), &map.grad_l);
            let gm = Tri6Basis::shape_gradients(&map.barycentric(&xm), &map.grad_l);
            for a in 0..6 {
                for i in 0..2 {
                    assert_relative_eq!((gp[a][i] - gm[a][i]) / (2.0 * h), hess[a][(i, j)], epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_barycentric_roundtrip() {
        let map = sample_map();
        let l = [0.1, 0.6, 0.3];
        let back = map.barycentric(&map.point(&l));
        for i in 0..3 {
            assert_relative_eq!(back[i], l[i], epsilon = 1e-13);
        }
        assert_relative_eq!(map.det_j(), 2.0 * map.area, epsilon = 1e-15);
    }

    #[test]
    fn test_clockwise_triangle_rejected() {
        let cw = TriangleMap::new([
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 0.0),
        ]);
        assert!(cw.is_err());
    }
}
