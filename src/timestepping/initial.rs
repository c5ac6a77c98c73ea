/// Equilibrium displacement for a given initial concentration
///
/// Minimises ∫ W(u, c_init) + |∇u|² over P2 displacements with the run's
/// displacement constraints. The residual is
///
///   R(u)[δu] = ∫ (P(∇u, c_init) + 2 ∇u) : ∇δu
///
/// which is the exact gradient of `initial_energy` with respect to the
/// displacement coefficients.

use nalgebra::Vector2;
use sprs::CsMat;
use tracing::info;
use crate::error::{Result, SimError};
use crate::fem::{Assembler, DofManager, ElementKernel, LOCAL_DISP};
use crate::linalg::{newton_solve, NewtonStats, NonlinearProblem};
use crate::physics::{energy_density, first_variation, second_variation, Deformation};
use crate::simulation::SimulationContext;

/// Displacement-only problem for the initial data
pub struct InitialProblem<'a> {
    ctx: &'a SimulationContext,
    /// Corner values of c_init, per element in local vertex order
    c_local: Vec<[f64; 3]>,
    dofs: DofManager,
}

impl<'a> InitialProblem<'a> {
    /// `c_init` holds one value per corner node, in corner order
    pub fn new(ctx: &'a SimulationContext, c_init: &[f64]) -> Result<Self> {
        let n_corners = ctx.space.dofs().num_corner_dofs();
        if c_init.len() != n_corners {
            return Err(SimError::Dimension {
                expected: n_corners,
                actual: c_init.len(),
            });
        }

        let c_local = ctx
            .elements
            .iter()
            .map(|el| [c_init[el.corners[0]], c_init[el.corners[1]], c_init[el.corners[2]]])
            .collect();

        Ok(Self {
            ctx,
            c_local,
            dofs: ctx.space.dofs().displacement_only(),
        })
    }

    /// Constraints of the displacement-only space
    pub fn dofs(&self) -> &DofManager {
        &self.dofs
    }

    /// ∫ W(u, c_init) + |∇u|²
    pub fn energy(&self, u: &[f64]) -> Result<f64> {
        let ctx = self.ctx;
        if u.len() != self.dofs.total_dofs() {
            return Err(SimError::Dimension {
                expected: self.dofs.total_dofs(),
                actual: u.len(),
            });
        }

        Assembler::integrate(ctx.elements.len(), ctx.parallel, |e| {
            let el = &ctx.elements[e];
            let local: Vec<f64> = el.displacement_dofs().iter().map(|&d| u[d]).collect();
            let mut sum = 0.0;
            for (q, qp) in el.points.iter().enumerate() {
                let s = el.sample_vector(q, &local);
                let c = el.sample_scalar(q, &self.c_local[e]);
                let def = Deformation::new(s.grad)?;
                let w = energy_density(&def, c.value, &c.grad, &qp.x, &ctx.params).total();
                sum += qp.weight * (w + s.grad.norm_squared());
            }
            Ok(sum)
        })
    }
}

impl ElementKernel for InitialProblem<'_> {
    fn num_elements(&self) -> usize {
        self.ctx.elements.len()
    }

    fn local_dofs(&self, elem: usize) -> &[usize] {
        self.ctx.elements[elem].displacement_dofs()
    }

    fn residual(&self, elem: usize, local: &[f64]) -> Result<Vec<f64>> {
        let el = &self.ctx.elements[elem];
        let mut r = vec![0.0; LOCAL_DISP];

        for (q, qp) in el.points.iter().enumerate() {
            let u = el.sample_vector(q, local);
            let c = el.sample_scalar(q, &self.c_local[elem]);
            let def = Deformation::new(u.grad)?;
            let var = first_variation(&def, c.value, &c.grad, &qp.x, &self.ctx.params);
            let stress = var.d_grad_u + u.grad * 2.0;

            for (i, t) in qp.mixed_shapes()[..LOCAL_DISP].iter().enumerate() {
                r[i] += qp.weight * stress.dot(&t.grad_u);
            }
        }

        Ok(r)
    }

    fn tangent(&self, elem: usize, local: &[f64]) -> Result<Vec<f64>> {
        let el = &self.ctx.elements[elem];
        let m = LOCAL_DISP;
        let mut k = vec![0.0; m * m];
        let no_dc = Vector2::zeros();

        for (q, qp) in el.points.iter().enumerate() {
            let u = el.sample_vector(q, local);
            let c = el.sample_scalar(q, &self.c_local[elem]);
            let def = Deformation::new(u.grad)?;
            let shapes = qp.mixed_shapes();

            for (j, d) in shapes[..m].iter().enumerate() {
                let dvar = second_variation(&def, c.value, &self.ctx.params, &d.grad_u, 0.0, &no_dc);
                let d_stress = dvar.d_grad_u + d.grad_u * 2.0;
                for (i, t) in shapes[..m].iter().enumerate() {
                    k[i * m + j] += qp.weight * d_stress.dot(&t.grad_u);
                }
            }
        }

        Ok(k)
    }
}

impl NonlinearProblem for InitialProblem<'_> {
    fn residual(&self, x: &[f64]) -> Result<Vec<f64>> {
        Assembler::assemble_residual(self, x, self.ctx.parallel)
    }

    fn jacobian(&self, x: &[f64]) -> Result<CsMat<f64>> {
        Assembler::assemble_jacobian(self, x, self.ctx.parallel)
    }
}

/// Solve for the initial displacement (displacement DOFs only)
///
/// Starts from u = 0 and uses the same Newton settings and linear backend
/// as the time steps.
pub fn solve_initial_data(ctx: &SimulationContext, c_init: &[f64]) -> Result<(Vec<f64>, NewtonStats)> {
    let problem = InitialProblem::new(ctx, c_init)?;
    let mut u = vec![0.0; problem.dofs().total_dofs()];
    let mut solver = ctx.linear_solver();

    let stats = newton_solve(&problem, &mut u, problem.dofs(), solver.as_mut(), &ctx.newton)?;

    info!(
        "Initial displacement: {} Newton iterations, |R| = {:.3e}",
        stats.iterations, stats.residual_norm
    );

    Ok((u, stats))
}

/// Energy minimised by the initial-data solve, ∫ W(u, c_init) + |∇u|²
pub fn initial_energy(ctx: &SimulationContext, c_init: &[f64], u: &[f64]) -> Result<f64> {
    InitialProblem::new(ctx, c_init)?.energy(u)
}
