/// Energy functional of the elastic-diffusive medium
///
/// Density:
///   W(u, c) = 0.5 μ tr(C - I) + c (0, g0)·x + 0.5 p² + 0.5 ε |∇c|²
/// with p = (c - c0) - (J - 1).
///
/// The first variation is derived with dF = F dG F and dJ = J Fᵀ:dG:
///   ∂W/∂G  = 0.5 μ (2 FᵀFFᵀ - |F|² Fᵀ) / J - p J Fᵀ
///   ∂W/∂c  = p + g0 y
///   ∂W/∂∇c = ε ∇c
///
/// `second_variation` differentiates these once more along a direction
/// (dG, dc, d∇c), using d(1/J) = -dJ / J² and dFᵀ = Fᵀ dGᵀ Fᵀ.

use std::ops::{Add, AddAssign};
use nalgebra::{Matrix2, Point2, Vector2};
use serde::{Deserialize, Serialize};
use crate::error::{Result, SimError};
use crate::fem::{Assembler, C_OFFSET, LOCAL_DISP};
use crate::physics::{Deformation, ModelParams};
use crate::simulation::SimulationContext;
use crate::state::State;

/// The four contributions to the energy
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyBreakdown {
    pub elastic: f64,
    pub gravity: f64,
    pub mixing: f64,
    pub gradient: f64,
}

impl EnergyBreakdown {
    pub fn total(&self) -> f64 {
        self.elastic + self.gravity + self.mixing + self.gradient
    }

    fn scaled(self, w: f64) -> Self {
        Self {
            elastic: w * self.elastic,
            gravity: w * self.gravity,
            mixing: w * self.mixing,
            gradient: w * self.gradient,
        }
    }
}

impl Add for EnergyBreakdown {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            elastic: self.elastic + rhs.elastic,
            gravity: self.gravity + rhs.gravity,
            mixing: self.mixing + rhs.mixing,
            gradient: self.gradient + rhs.gradient,
        }
    }
}

impl AddAssign for EnergyBreakdown {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Partial derivatives of the energy density
#[derive(Debug, Clone, Copy)]
pub struct EnergyVariation {
    /// ∂W/∂(∇u), same index convention as ∇u
    pub d_grad_u: Matrix2<f64>,
    /// ∂W/∂c
    pub d_c: f64,
    /// ∂W/∂(∇c)
    pub d_grad_c: Vector2<f64>,
}

/// Volumetric constraint p = (c - c0) - (J - 1)
pub fn pressure(def: &Deformation, c: f64, params: &ModelParams) -> f64 {
    (c - params.c0) - (def.j - 1.0)
}

/// Energy density at a point
pub fn energy_density(
    def: &Deformation,
    c: f64,
    grad_c: &Vector2<f64>,
    x: &Point2<f64>,
    params: &ModelParams,
) -> EnergyBreakdown {
    let p = pressure(def, c, params);
    EnergyBreakdown {
        elastic: 0.5 * params.mu * (def.isochoric_cauchy_green().trace() - 2.0),
        gravity: c * params.g0 * x.y,
        mixing: 0.5 * p * p,
        gradient: 0.5 * params.eps * grad_c.norm_squared(),
    }
}

/// First variation of the energy density
pub fn first_variation(
    def: &Deformation,
    c: f64,
    grad_c: &Vector2<f64>,
    x: &Point2<f64>,
    params: &ModelParams,
) -> EnergyVariation {
    let f = &def.f;
    let ft = f.transpose();
    let p = pressure(def, c, params);

    let elastic = (ft * f * ft * 2.0 - ft * f.norm_squared()) * (0.5 * params.mu / def.j);
    let mixing = ft * (-p * def.j);

    EnergyVariation {
        d_grad_u: elastic + mixing,
        d_c: p + params.g0 * x.y,
        d_grad_c: grad_c * params.eps,
    }
}

/// Directional derivative of `first_variation` along (dG, dc, d∇c)
pub fn second_variation(
    def: &Deformation,
    c: f64,
    params: &ModelParams,
    d_grad_u: &Matrix2<f64>,
    d_c: f64,
    d_grad_c: &Vector2<f64>,
) -> EnergyVariation {
    let f = &def.f;
    let ft = f.transpose();
    let j = def.j;
    let p = pressure(def, c, params);

    let df = f * d_grad_u * f;
    let dft = df.transpose();
    let dj = j * (f * d_grad_u).trace();
    let dp = d_c - dj;

    let norm2 = f.norm_squared();
    let d_norm2 = 2.0 * f.dot(&df);
    let scale = 0.5 * params.mu / j;
    let elastic = (ft * f * ft * 2.0 - ft * norm2) * scale;
    let d_ftfft = dft * f * ft + ft * df * ft + ft * f * dft;
    let d_elastic = (d_ftfft * 2.0 - ft * d_norm2 - dft * norm2) * scale - elastic * (dj / j);
    let d_mixing = -(ft * (dp * j + p * dj) + dft * (p * j));

    EnergyVariation {
        d_grad_u: d_elastic + d_mixing,
        d_c: dp,
        d_grad_c: d_grad_c * params.eps,
    }
}

/// Integrate the energy of a state over the domain
pub fn integrate_energy(ctx: &SimulationContext, state: &State) -> Result<EnergyBreakdown> {
    if state.len() != ctx.space.total_dofs() {
        return Err(SimError::Dimension {
            expected: ctx.space.total_dofs(),
            actual: state.len(),
        });
    }

    let per_element = Assembler::map_elements(ctx.elements.len(), ctx.parallel, |e| {
        let el = &ctx.elements[e];
        let local = state.gather(&el.dofs);
        let mut sum = EnergyBreakdown::default();

        for (q, qp) in el.points.iter().enumerate() {
            let u = el.sample_vector(q, &local[..LOCAL_DISP]);
            let c = el.sample_scalar(q, &local[C_OFFSET..C_OFFSET + 3]);
            let def = Deformation::new(u.grad)?;
            sum += energy_density(&def, c.value, &c.grad, &qp.x, &ctx.params).scaled(qp.weight);
        }
        Ok(sum)
    })?;

    Ok(per_element
        .into_iter()
        .fold(EnergyBreakdown::default(), |acc, e| acc + e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> ModelParams {
        ModelParams {
            mu: 1.3,
            g0: 0.7,
            mob: 1.0,
            visc: 1.0,
            eps: 0.2,
            c0: 0.5,
        }
    }

    #[test]
    fn test_reference_state_energy() {
        let p = params();
        let x = Point2::new(0.25, 1.5);
        let w = energy_density(&Deformation::identity(), p.c0, &Vector2::zeros(), &x, &p);

        assert_relative_eq!(w.elastic, 0.0, epsilon = 1e-15);
        assert_relative_eq!(w.mixing, 0.0, epsilon = 1e-15);
        assert_relative_eq!(w.gradient, 0.0, epsilon = 1e-15);
        assert_relative_eq!(w.gravity, p.c0 * p.g0 * 1.5, epsilon = 1e-15);
    }

    #[test]
    fn test_dilation_energy_closed_form() {
        // F = 2 I: J = 4, C = I, so the elastic term vanishes and p = (c - c0) - 3
        let p = params();
        let def = Deformation::new(Matrix2::identity() * 0.5).unwrap();
        let grad_c = Vector2::new(0.3, -0.4);
        let w = energy_density(&def, 0.8, &grad_c, &Point2::new(0.0, 1.0), &p);

        assert_relative_eq!(w.elastic, 0.0, epsilon = 1e-14);
        assert_relative_eq!(w.mixing, 0.5 * (0.3 - 3.0_f64).powi(2), epsilon = 1e-13);
        assert_relative_eq!(w.gradient, 0.5 * 0.2 * 0.25, epsilon = 1e-15);
        assert_relative_eq!(w.gravity, 0.8 * 0.7, epsilon = 1e-15);
    }

    #[test]
    fn test_first_variation_matches_finite_difference() {
        let p = params();
        let g = Matrix2::new(0.05, -0.12, 0.08, 0.03);
        let c = 0.62;
        let grad_c = Vector2::new(0.4, -0.1);
        let x = Point2::new(0.3, 0.9);

        let w = |g: Matrix2<f64>, c: f64, grad_c: Vector2<f64>| {
            energy_density(&Deformation::new(g).unwrap(), c, &grad_c, &x, &p).total()
        };
        let var = first_variation(&Deformation::new(g).unwrap(), c, &grad_c, &x, &p);
        let h = 1e-6;

        for i in 0..2 {
            for j in 0..2 {
                let mut gp = g;
                let mut gm = g;
                gp[(i, j)] += h;
                gm[(i, j)] -= h;
                let fd = (w(gp, c, grad_c) - w(gm, c, grad_c)) / (2.0 * h);
                assert_relative_eq!(var.d_grad_u[(i, j)], fd, epsilon = 1e-7);
            }
        }

        let fd_c = (w(g, c + h, grad_c) - w(g, c - h, grad_c)) / (2.0 * h);
        assert_relative_eq!(var.d_c, fd_c, epsilon = 1e-7);

        for k in 0..2 {
            let mut gp = grad_c;
            let mut gm = grad_c;
            gp[k] += h;
            gm[k] -= h;
            let fd = (w(g, c, gp) - w(g, c, gm)) / (2.0 * h);
            assert_relative_eq!(var.d_grad_c[k], fd, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_second_variation_matches_finite_difference() {
        let p = params();
        let g = Matrix2::new(0.07, 0.11, -0.04, -0.02);
        let c = 0.41;
        let grad_c = Vector2::new(-0.2, 0.3);
        let x = Point2::new(0.6, 1.2);

        let dg = Matrix2::new(0.3, -0.5, 0.2, 0.9);
        let dc = -0.7;
        let dgc = Vector2::new(0.4, 1.1);

        let var = |t: f64| {
            let def = Deformation::new(g + dg * t).unwrap();
            first_variation(&def, c + dc * t, &(grad_c + dgc * t), &x, &p)
        };
        let d = second_variation(&Deformation::new(g).unwrap(), c, &p, &dg, dc, &dgc);

        let h = 1e-6;
        let (plus, minus) = (var(h), var(-h));
        let fd_grad_u = (plus.d_grad_u - minus.d_grad_u) / (2.0 * h);
        assert_relative_eq!(d.d_grad_u, fd_grad_u, epsilon = 1e-7);
        assert_relative_eq!(d.d_c, (plus.d_c - minus.d_c) / (2.0 * h), epsilon = 1e-7);
        assert_relative_eq!(d.d_grad_c, (plus.d_grad_c - minus.d_grad_c) / (2.0 * h), epsilon = 1e-7);
    }

    #[test]
    fn test_breakdown_sum() {
        let a = EnergyBreakdown { elastic: 1.0, gravity: 2.0, mixing: 3.0, gradient: 4.0 };
        let mut b = a;
        b += a;
        assert_relative_eq!(b.total(), 20.0);
        assert_relative_eq!(a.scaled(0.5).total(), 5.0);
    }
}
