/// Post-step dissipation diagnostics
///
/// viscous  = ∫ s(F_old, c_old; u̇, u̇)
/// mobility = ∫ a(F_old, c_old; η, η)
///
/// Both are non-negative for visc, mob ≥ 0. Nothing here mutates state.

use serde::Serialize;
use crate::error::{Result, SimError};
use crate::fem::{Assembler, C_OFFSET, ETA_OFFSET, LOCAL_DISP};
use crate::physics::{mobility_form, viscous_form, EnergyBreakdown, FrozenCoefficients};
use crate::simulation::SimulationContext;
use crate::state::State;

/// Dissipation integrals of one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Dissipation {
    pub viscous: f64,
    pub mobility: f64,
}

/// Everything recorded about a completed step
#[derive(Debug, Clone, Serialize)]
pub struct StepDiagnostics {
    pub step: usize,
    pub time: f64,
    pub dissipation: Dissipation,
    pub energy: EnergyBreakdown,
    pub newton_iterations: usize,
}

/// Compute the dissipation between `old_state` and `state` over a step `tau`
pub fn dissipation(
    ctx: &SimulationContext,
    state: &State,
    old_state: &State,
    tau: f64,
) -> Result<Dissipation> {
    let n = ctx.space.total_dofs();
    for s in [state, old_state] {
        if s.len() != n {
            return Err(SimError::Dimension {
                expected: n,
                actual: s.len(),
            });
        }
    }
    if !(tau > 0.0) {
        return Err(SimError::Config(format!("time step must be positive, got {}", tau)));
    }

    let per_element = Assembler::map_elements(ctx.elements.len(), ctx.parallel, |e| {
        let el = &ctx.elements[e];
        let new_local = state.gather(&el.dofs);
        let old_local = old_state.gather(&el.dofs);
        let mut sum = Dissipation::default();

        for (q, qp) in el.points.iter().enumerate() {
            let u = el.sample_vector(q, &new_local[..LOCAL_DISP]);
            let u_old = el.sample_vector(q, &old_local[..LOCAL_DISP]);
            let c_old = el.sample_scalar(q, &old_local[C_OFFSET..C_OFFSET + 3]);
            let eta = el.sample_scalar(q, &new_local[ETA_OFFSET..ETA_OFFSET + 3]);

            let frozen = FrozenCoefficients::new(&u_old, c_old.value)?;
            let dot_u = (u.value - u_old.value) / tau;
            let grad_dot_u = (u.grad - u_old.grad) / tau;
            let grad_fv = frozen.push_forward_gradient(&dot_u, &grad_dot_u);

            sum.viscous += qp.weight * viscous_form(&ctx.params, &grad_fv, &grad_fv);
            sum.mobility += qp.weight * mobility_form(&ctx.params, &frozen, &eta.grad, &eta.grad);
        }
        Ok(sum)
    })?;

    Ok(per_element.into_iter().fold(Dissipation::default(), |acc, d| Dissipation {
        viscous: acc.viscous + d.viscous,
        mobility: acc.mobility + d.mobility,
    }))
}
