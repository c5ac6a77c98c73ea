/// Damped Newton solver for the discrete nonlinear residual
///
/// **Algorithm:**
/// Newton iteration solves: K(x) δ = -R(x)
/// where:
///   - R(x) = assembled residual with constrained rows zeroed
///   - K = dR/dx (assembled Jacobian, constrained rows set to identity)
///   - x_{k+1} = x_k + α δ   (α = relaxation, optionally backtracked)
///
/// Constrained DOFs are set to their prescribed values before the first
/// iteration and never move afterwards.
///
/// **Convergence:** ||R|| ≤ abs_tol or ||R|| / ||R_0|| ≤ rel_tol, checked
/// before every iteration (including the first). Hitting the iteration cap
/// is an error; there is no automatic step reduction.

use serde::{Deserialize, Serialize};
use sprs::CsMat;
use tracing::{debug, warn};
use crate::error::{Result, SimError};
use crate::fem::{Assembler, DofManager};
use crate::linalg::{LinearSolver, SolverStats, SolverUtils};

/// Nonlinear system R(x) = 0 with an assembled Jacobian
pub trait NonlinearProblem {
    /// Residual at x (unconstrained)
    fn residual(&self, x: &[f64]) -> Result<Vec<f64>>;

    /// Jacobian dR/dx at x (unconstrained)
    fn jacobian(&self, x: &[f64]) -> Result<CsMat<f64>>;
}

/// Configuration for the Newton solver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonConfig {
    /// Maximum Newton iterations
    pub max_iterations: usize,

    /// Absolute residual tolerance
    pub abs_tolerance: f64,

    /// Relative residual tolerance ||R|| / ||R_0||
    pub rel_tolerance: f64,

    /// Step length multiplier (1.0 = full Newton step)
    pub relaxation: f64,

    /// Halve the step while the residual grows
    pub line_search: bool,
    pub max_line_search: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            abs_tolerance: 1e-6,
            rel_tolerance: 1e-9,
            relaxation: 1.0,
            line_search: false,
            max_line_search: 8,
        }
    }
}

/// Statistics from a Newton solve
#[derive(Debug, Clone)]
pub struct NewtonStats {
    /// Number of Newton iterations performed
    pub iterations: usize,

    /// Initial residual norm
    pub initial_residual: f64,

    /// Final residual norm
    pub residual_norm: f64,

    /// Linear solver stats from the last Newton iteration
    pub last_linear_stats: SolverStats,
}

/// Residual with the constrained rows removed
fn constrained_residual<P: NonlinearProblem + ?Sized>(
    problem: &P,
    x: &[f64],
    dof_mgr: &DofManager,
) -> Result<Vec<f64>> {
    let mut r = problem.residual(x)?;
    for dof in dof_mgr.dirichlet_dofs() {
        r[dof] = 0.0;
    }
    Ok(r)
}

/// Solve R(x) = 0 in place
///
/// # Arguments
/// * `problem` - Residual and Jacobian provider
/// * `x` - Initial guess on entry, solution on exit
/// * `dof_mgr` - Dirichlet constraints
/// * `linear_solver` - Backend for the correction systems
/// * `config` - Tolerances and damping
pub fn newton_solve<P>(
    problem: &P,
    x: &mut [f64],
    dof_mgr: &DofManager,
    linear_solver: &mut dyn LinearSolver,
    config: &NewtonConfig,
) -> Result<NewtonStats>
where
    P: NonlinearProblem + ?Sized,
{
    if x.len() != dof_mgr.total_dofs() {
        return Err(SimError::Dimension {
            expected: dof_mgr.total_dofs(),
            actual: x.len(),
        });
    }

    dof_mgr.impose_dirichlet(x);

    let mut r = constrained_residual(problem, x, dof_mgr)?;
    let r_norm_0 = SolverUtils::norm(&r);
    let mut r_norm = r_norm_0;
    let mut last_linear_stats = SolverStats::new();

    debug!("Newton: initial residual = {:.3e}", r_norm_0);

    for iter in 0..=config.max_iterations {
        if !r_norm.is_finite() {
            return Err(SimError::NonConvergence {
                iterations: iter,
                residual: r_norm,
            });
        }

        let relative = if r_norm_0 > 0.0 { r_norm / r_norm_0 } else { 0.0 };
        if r_norm <= config.abs_tolerance || relative <= config.rel_tolerance {
            debug!("Newton: converged in {} iterations (|R| = {:.3e})", iter, r_norm);
            return Ok(NewtonStats {
                iterations: iter,
                initial_residual: r_norm_0,
                residual_norm: r_norm,
                last_linear_stats,
            });
        }

        if iter == config.max_iterations {
            break;
        }

        let k = problem.jacobian(x)?;
        let rhs: Vec<f64> = r.iter().map(|v| -v).collect();
        let (k_bc, rhs_bc) = Assembler::apply_dirichlet_increments(&k, &rhs, dof_mgr);
        let (delta, stats) = linear_solver.solve(&k_bc, &rhs_bc)?;
        last_linear_stats = stats;

        let x_old = x.to_vec();
        let mut alpha = config.relaxation;
        let mut accepted = false;

        for attempt in 0..=config.max_line_search {
            for i in 0..x.len() {
                x[i] = x_old[i] + alpha * delta[i];
            }

            let trial = constrained_residual(problem, x, dof_mgr);
            match trial {
                Ok(r_trial) => {
                    let trial_norm = SolverUtils::norm(&r_trial);
                    let improved = trial_norm.is_finite() && trial_norm < r_norm;
                    if !config.line_search || improved || attempt == config.max_line_search {
                        r = r_trial;
                        r_norm = trial_norm;
                        accepted = true;
                        break;
                    }
                }
                Err(err) if !config.line_search || attempt == config.max_line_search => {
                    return Err(err);
                }
                Err(_) => {}
            }

            alpha *= 0.5;
            warn!("Newton: backtracking, step length reduced to {:.3e}", alpha);
        }

        if !accepted {
            return Err(SimError::NonConvergence {
                iterations: iter + 1,
                residual: r_norm,
            });
        }

        debug!(
            "Newton iter {}: |R| = {:.3e}, step = {:.3e}, linear rel. residual = {:.2e}",
            iter + 1,
            r_norm,
            alpha,
            last_linear_stats.relative_residual
        );
    }

    Err(SimError::NonConvergence {
        iterations: config.max_iterations,
        residual: r_norm,
    })
}
