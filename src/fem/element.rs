use nalgebra::{Matrix2, Point2, Vector2};
use rayon::prelude::*;
use crate::error::{Result, SimError};
use crate::fem::{P1Basis, TriangleMap, TriangleQuadrature, Tri6Basis};
use crate::mesh::Tri6Element;
use crate::state::MixedSpace;

/// Local DOF layout of one mixed element
///
///   0..12   displacement, index 2a + k for node a, component k
///   12..15  concentration at vertices 0, 1, 2
///   15..18  multiplier at vertices 0, 1, 2
pub const LOCAL_DISP: usize = 12;
pub const LOCAL_MIXED: usize = 18;
pub const C_OFFSET: usize = 12;
pub const ETA_OFFSET: usize = 15;

/// Basis data at one quadrature point
#[derive(Debug, Clone)]
pub struct QuadPoint {
    /// Quadrature weight times |det J|
    pub weight: f64,
    /// Physical coordinate
    pub x: Point2<f64>,
    /// P2 shape functions and gradients
    pub n2: [f64; 6],
    pub dn2: [Vector2<f64>; 6],
    /// P1 shape functions and gradients
    pub n1: [f64; 3],
    pub dn1: [Vector2<f64>; 3],
}

/// Value, gradient (`grad[(i, j)] = ∂u_i/∂x_j`) and second derivatives of a
/// P2 vector field at a point. `hess[i]` is the Hessian of component i.
#[derive(Debug, Clone)]
pub struct VectorSample {
    pub value: Vector2<f64>,
    pub grad: Matrix2<f64>,
    pub hess: [Matrix2<f64>; 2],
}

/// Value and gradient of a P1 scalar field at a point
#[derive(Debug, Clone)]
pub struct ScalarSample {
    pub value: f64,
    pub grad: Vector2<f64>,
}

/// One local basis function of the mixed space at a quadrature point
///
/// Exactly one of the three fields is non-zero.
#[derive(Debug, Clone, Copy)]
pub struct MixedShape {
    pub u: Vector2<f64>,
    pub grad_u: Matrix2<f64>,
    pub c: f64,
    pub grad_c: Vector2<f64>,
    pub eta: f64,
    pub grad_eta: Vector2<f64>,
}

impl MixedShape {
    fn zero() -> Self {
        Self {
            u: Vector2::zeros(),
            grad_u: Matrix2::zeros(),
            c: 0.0,
            grad_c: Vector2::zeros(),
            eta: 0.0,
            grad_eta: Vector2::zeros(),
        }
    }
}

impl QuadPoint {
    /// All mixed basis functions, in local DOF order
    pub fn mixed_shapes(&self) -> [MixedShape; LOCAL_MIXED] {
        let mut out = [MixedShape::zero(); LOCAL_MIXED];
        for a in 0..6 {
            for k in 0..2 {
                // ∇(N_a e_k) has a single non-zero row k
                let s = &mut out[2 * a + k];
                s.u[k] = self.n2[a];
                s.grad_u[(k, 0)] = self.dn2[a][0];
                s.grad_u[(k, 1)] = self.dn2[a][1];
            }
        }
        for i in 0..3 {
            out[C_OFFSET + i].c = self.n1[i];
            out[C_OFFSET + i].grad_c = self.dn1[i];
            out[ETA_OFFSET + i].eta = self.n1[i];
            out[ETA_OFFSET + i].grad_eta = self.dn1[i];
        }
        out
    }
}

/// Precomputed geometry, basis data and DOF map of one element
#[derive(Debug, Clone)]
pub struct ElementData {
    pub element: Tri6Element,
    pub map: TriangleMap,
    /// Constant Hessians of the P2 shape functions
    pub hess: [Matrix2<f64>; 6],
    pub points: Vec<QuadPoint>,
    /// Global DOFs in local mixed order (displacement first)
    pub dofs: [usize; LOCAL_MIXED],
    /// Corner ranks of the three vertices
    pub corners: [usize; 3],
}

impl ElementData {
    pub fn new(space: &MixedSpace, element: &Tri6Element, quad: &TriangleQuadrature) -> Result<Self> {
        let mesh = space.mesh();
        let dof_mgr = space.dofs();
        let map = TriangleMap::new(mesh.vertex_coords(element))?;
        let hess = Tri6Basis::shape_hessians(&map.grad_l);

        let points = quad
            .points
            .iter()
            .zip(&quad.weights)
            .map(|(l, &w)| QuadPoint {
                weight: w * map.det_j(),
                x: map.point(l),
                n2: Tri6Basis::shape_functions(l),
                dn2: Tri6Basis::shape_gradients(l, &map.grad_l),
                n1: P1Basis::shape_functions(l),
                dn1: P1Basis::shape_gradients(&map.grad_l),
            })
            .collect();

        let mut dofs = [0usize; LOCAL_MIXED];
        for (a, &node) in element.nodes.iter().enumerate() {
            dofs[2 * a] = dof_mgr.displacement_dof(node, 0);
            dofs[2 * a + 1] = dof_mgr.displacement_dof(node, 1);
        }

        let mut corners = [0usize; 3];
        for (i, &node) in element.vertices().iter().enumerate() {
            let missing = || SimError::Mesh(format!("vertex node {} has no P1 DOF", node));
            corners[i] = dof_mgr.corner_index(node).ok_or_else(missing)?;
            dofs[C_OFFSET + i] = dof_mgr.concentration_dof(node).ok_or_else(missing)?;
            dofs[ETA_OFFSET + i] = dof_mgr.multiplier_dof(node).ok_or_else(missing)?;
        }

        Ok(Self {
            element: *element,
            map,
            hess,
            points,
            dofs,
            corners,
        })
    }

    /// Element data for every element of the space
    pub fn build_all(space: &MixedSpace, quad: &TriangleQuadrature) -> Result<Vec<Self>> {
        space
            .mesh()
            .elements()
            .par_iter()
            .map(|elem| Self::new(space, elem, quad))
            .collect()
    }

    /// Displacement DOFs only
    pub fn displacement_dofs(&self) -> &[usize] {
        &self.dofs[..LOCAL_DISP]
    }

    /// Sample a P2 vector field given its 12 local coefficients
    pub fn sample_vector(&self, q: usize, u: &[f64]) -> VectorSample {
        let qp = &self.points[q];
        let mut value = Vector2::zeros();
        let mut grad = Matrix2::zeros();
        let mut hess = [Matrix2::zeros(); 2];

        for a in 0..6 {
            for i in 0..2 {
                let coef = u[2 * a + i];
                value[i] += coef * qp.n2[a];
                grad[(i, 0)] += coef * qp.dn2[a][0];
                grad[(i, 1)] += coef * qp.dn2[a][1];
                hess[i] += self.hess[a] * coef;
            }
        }

        VectorSample { value, grad, hess }
    }

    /// Sample a P1 scalar field given its 3 local coefficients
    pub fn sample_scalar(&self, q: usize, v: &[f64]) -> ScalarSample {
        let qp = &self.points[q];
        let mut value = 0.0;
        let mut grad = Vector2::zeros();
        for i in 0..3 {
            value += v[i] * qp.n1[i];
            grad += qp.dn1[i] * v[i];
        }
        ScalarSample { value, grad }
    }
}
