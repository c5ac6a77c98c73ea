/// L2 projection of analytic fields onto the P1 corner space
///
/// Solves M c = b with the consistent P1 mass matrix
/// M_ij = ∫ φ_i φ_j and load b_i = ∫ f φ_i, using the run's quadrature.

use nalgebra::Point2;
use sprs::TriMat;
use crate::error::Result;
use crate::fem::Assembler;
use crate::simulation::SimulationContext;

/// Project `f` onto P1; returns one value per corner node in corner order
pub fn project_p1<F>(ctx: &SimulationContext, f: F) -> Result<Vec<f64>>
where
    F: Fn(&Point2<f64>) -> f64 + Sync + Send,
{
    let n = ctx.space.dofs().num_corner_dofs();

    let local = Assembler::map_elements(ctx.elements.len(), ctx.parallel, |e| {
        let el = &ctx.elements[e];
        let mut m = [[0.0; 3]; 3];
        let mut b = [0.0; 3];
        for qp in &el.points {
            let fx = f(&qp.x);
            for i in 0..3 {
                b[i] += qp.weight * fx * qp.n1[i];
                for j in 0..3 {
                    m[i][j] += qp.weight * qp.n1[i] * qp.n1[j];
                }
            }
        }
        Ok((m, b))
    })?;

    let mut triplets = TriMat::new((n, n));
    let mut rhs = vec![0.0; n];
    for (el, (m, b)) in ctx.elements.iter().zip(local) {
        for i in 0..3 {
            rhs[el.corners[i]] += b[i];
            for j in 0..3 {
                triplets.add_triplet(el.corners[i], el.corners[j], m[i][j]);
            }
        }
    }

    let mut solver = ctx.linear_solver();
    let (c, _) = solver.solve(&triplets.to_csr(), &rhs)?;
    Ok(c)
}

/// Centre of the initial Gaussian perturbation
pub const PERTURBATION_CENTER: [f64; 2] = [0.5, 0.5];

/// Initial concentration c0 + mag exp(-α ((x - 0.5)² + (y - 0.5)²))
pub fn initial_concentration(ctx: &SimulationContext, c0: f64, mag: f64, alpha: f64) -> Result<Vec<f64>> {
    let [xc, yc] = PERTURBATION_CENTER;
    project_p1(ctx, |p| {
        let r2 = (p.x - xc).powi(2) + (p.y - yc).powi(2);
        c0 + mag * (-alpha * r2).exp()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoundaryConfig;
    use crate::mesh::{Diagonal, MeshGenerator};
    use crate::physics::ModelParams;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn context() -> SimulationContext {
        let mesh = MeshGenerator::rectangle(1.0, 2.0, 2, 4, Diagonal::LeftRight);
        SimulationContext::new(Arc::new(mesh), ModelParams::default(), &BoundaryConfig::default(), 5).unwrap()
    }

    #[test]
    fn test_linear_functions_are_reproduced() {
        let ctx = context();
        let c = project_p1(&ctx, |p| 1.0 + 2.0 * p.x - 0.5 * p.y).unwrap();

        let mesh = ctx.space.mesh();
        for node in mesh.connectivity.corner_nodes() {
            let p = mesh.geometry.nodes[node];
            let idx = ctx.space.dofs().corner_index(node).unwrap();
            assert_relative_eq!(c[idx], 1.0 + 2.0 * p.x - 0.5 * p.y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_projection_preserves_mass() {
        let ctx = context();
        let c = initial_concentration(&ctx, 0.5, 0.2, 10.0).unwrap();

        // ∫ c_h = ∫ f because constants lie in P1
        let mut mass_h = 0.0;
        let mut mass_f = 0.0;
        for el in &ctx.elements {
            for qp in &el.points {
                let ch: f64 = (0..3).map(|i| qp.n1[i] * c[el.corners[i]]).sum();
                let r2 = (qp.x.x - 0.5).powi(2) + (qp.x.y - 0.5).powi(2);
                mass_h += qp.weight * ch;
                mass_f += qp.weight * (0.5 + 0.2 * (-10.0 * r2).exp());
            }
        }
        assert_relative_eq!(mass_h, mass_f, epsilon = 1e-12);
        assert!(c.iter().all(|&v| v > 0.4));
    }
}
