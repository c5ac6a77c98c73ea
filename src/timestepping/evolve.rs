/// One implicit time step of the coupled system
///
/// For the unknown q = (u, c, η) with u̇ = (u - u_old)/τ, ċ = (c - c_old)/τ
/// the residual is
///
///   Res = b(δu, δc, η) - dH[δq] - s(u̇, δu) + b(u̇, ċ, δη) + a(η, δη)
///
/// with H = ∫ W(u, c) and all forms frozen at (F_old, c_old). Per test
/// function this reads
///
///   δu:  -c_old (F_oldᵀ ∇η)·δu - P:∇δu - s(u̇, δu)
///   δc:  η δc - (p + g0 y) δc - ε ∇c·∇δc
///   δη:  ċ δη - ∇δη·(c_old F_old u̇) + a(η, δη)

use nalgebra::{Matrix2, Vector2};
use sprs::CsMat;
use tracing::debug;
use crate::error::{Result, SimError};
use crate::fem::{Assembler, ElementKernel, C_OFFSET, ETA_OFFSET, LOCAL_DISP, LOCAL_MIXED};
use crate::linalg::{newton_solve, NewtonStats, NonlinearProblem};
use crate::physics::{
    coupling_form, first_variation, mobility_form, second_variation, viscous_form, Deformation, FrozenCoefficients,
};
use crate::simulation::SimulationContext;
use crate::state::State;

/// Previous-step data at one quadrature point
#[derive(Debug, Clone, Copy)]
struct OldPoint {
    frozen: FrozenCoefficients,
    u: Vector2<f64>,
    grad_u: Matrix2<f64>,
}

/// Residual of one time step, element by element
pub struct EvolveProblem<'a> {
    ctx: &'a SimulationContext,
    old: Vec<Vec<OldPoint>>,
    tau: f64,
}

impl<'a> EvolveProblem<'a> {
    /// Freeze the previous state at every quadrature point
    pub fn new(ctx: &'a SimulationContext, old_state: &State, tau: f64) -> Result<Self> {
        if old_state.len() != ctx.space.total_dofs() {
            return Err(SimError::Dimension {
                expected: ctx.space.total_dofs(),
                actual: old_state.len(),
            });
        }
        if !(tau > 0.0) || !tau.is_finite() {
            return Err(SimError::Config(format!("time step must be positive, got {}", tau)));
        }

        let old = Assembler::map_elements(ctx.elements.len(), ctx.parallel, |e| {
            let el = &ctx.elements[e];
            let local = old_state.gather(&el.dofs);
            (0..el.points.len())
                .map(|q| {
                    let u = el.sample_vector(q, &local[..LOCAL_DISP]);
                    let c = el.sample_scalar(q, &local[C_OFFSET..C_OFFSET + 3]);
                    Ok(OldPoint {
                        frozen: FrozenCoefficients::new(&u, c.value)?,
                        u: u.value,
                        grad_u: u.grad,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })?;

        Ok(Self { ctx, old, tau })
    }
}

impl ElementKernel for EvolveProblem<'_> {
    fn num_elements(&self) -> usize {
        self.ctx.elements.len()
    }

    fn local_dofs(&self, elem: usize) -> &[usize] {
        &self.ctx.elements[elem].dofs
    }

    fn residual(&self, elem: usize, local: &[f64]) -> Result<Vec<f64>> {
        let el = &self.ctx.elements[elem];
        let params = &self.ctx.params;
        let mut r = vec![0.0; LOCAL_MIXED];

        for (q, qp) in el.points.iter().enumerate() {
            let old = &self.old[elem][q];
            let fr = &old.frozen;

            let u = el.sample_vector(q, &local[..LOCAL_DISP]);
            let c = el.sample_scalar(q, &local[C_OFFSET..C_OFFSET + 3]);
            let eta = el.sample_scalar(q, &local[ETA_OFFSET..ETA_OFFSET + 3]);

            let def = Deformation::new(u.grad)?;
            let var = first_variation(&def, c.value, &c.grad, &qp.x, params);

            let dot_u = (u.value - old.u) / self.tau;
            let grad_dot_u = (u.grad - old.grad_u) / self.tau;
            let dot_c = (c.value - fr.c) / self.tau;
            let grad_fv = fr.push_forward_gradient(&dot_u, &grad_dot_u);

            for (i, t) in qp.mixed_shapes().iter().enumerate() {
                let grad_ft = fr.push_forward_gradient(&t.u, &t.grad_u);
                r[i] += qp.weight
                    * (coupling_form(fr, &t.u, t.c, eta.value, &eta.grad)
                        - var.d_grad_u.dot(&t.grad_u)
                        - var.d_c * t.c
                        - var.d_grad_c.dot(&t.grad_c)
                        - viscous_form(params, &grad_fv, &grad_ft)
                        + coupling_form(fr, &dot_u, dot_c, t.eta, &t.grad_eta)
                        + mobility_form(params, fr, &eta.grad, &t.grad_eta));
            }
        }

        Ok(r)
    }

    /// Exact linearisation of `residual`: the forms are linear in
    /// (u̇, ċ, η), so only the energy term needs a second variation
    fn tangent(&self, elem: usize, local: &[f64]) -> Result<Vec<f64>> {
        let el = &self.ctx.elements[elem];
        let params = &self.ctx.params;
        let m = LOCAL_MIXED;
        let mut k = vec![0.0; m * m];

        for (q, qp) in el.points.iter().enumerate() {
            let fr = &self.old[elem][q].frozen;

            let u = el.sample_vector(q, &local[..LOCAL_DISP]);
            let c = el.sample_scalar(q, &local[C_OFFSET..C_OFFSET + 3]);
            let def = Deformation::new(u.grad)?;

            let shapes = qp.mixed_shapes();
            let pushed: Vec<Matrix2<f64>> = shapes
                .iter()
                .map(|s| fr.push_forward_gradient(&s.u, &s.grad_u))
                .collect();

            for (j, d) in shapes.iter().enumerate() {
                let dvar = second_variation(&def, c.value, params, &d.grad_u, d.c, &d.grad_c);
                let d_dot_u = d.u / self.tau;
                let d_grad_fv = pushed[j] / self.tau;
                let d_dot_c = d.c / self.tau;

                for (i, t) in shapes.iter().enumerate() {
                    k[i * m + j] += qp.weight
                        * (coupling_form(fr, &t.u, t.c, d.eta, &d.grad_eta)
                            - dvar.d_grad_u.dot(&t.grad_u)
                            - dvar.d_c * t.c
                            - dvar.d_grad_c.dot(&t.grad_c)
                            - viscous_form(params, &d_grad_fv, &pushed[i])
                            + coupling_form(fr, &d_dot_u, d_dot_c, t.eta, &t.grad_eta)
                            + mobility_form(params, fr, &d.grad_eta, &t.grad_eta));
                }
            }
        }

        Ok(k)
    }
}

impl NonlinearProblem for EvolveProblem<'_> {
    fn residual(&self, x: &[f64]) -> Result<Vec<f64>> {
        Assembler::assemble_residual(self, x, self.ctx.parallel)
    }

    fn jacobian(&self, x: &[f64]) -> Result<CsMat<f64>> {
        Assembler::assemble_jacobian(self, x, self.ctx.parallel)
    }
}

/// Advance `old_state` by one step of size `tau`
///
/// The Newton iteration starts from `old_state`. Failure to converge is
/// returned as an error and is terminal for the run.
pub fn evolve(ctx: &SimulationContext, old_state: &State, tau: f64) -> Result<(State, NewtonStats)> {
    let problem = EvolveProblem::new(ctx, old_state, tau)?;
    let mut x = old_state.values().to_vec();
    let mut solver = ctx.linear_solver();

    let stats = newton_solve(&problem, &mut x, ctx.space.dofs(), solver.as_mut(), &ctx.newton)?;

    debug!(
        "evolve(tau = {:.3e}): {} Newton iterations, |R| = {:.3e} ({})",
        tau,
        stats.iterations,
        stats.residual_norm,
        solver.name()
    );

    Ok((State::from_values(&ctx.space, x)?, stats))
}
