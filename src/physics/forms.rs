/// Bilinear forms of the semi-implicit scheme
///
/// All forms are evaluated at a quadrature point with coefficients frozen
/// at the previous step (F_old, c_old):
///
///   a(η, δη)    = 0.5 mob c_old² ∇η·∇δη
///   b(u̇, ċ, η)  = ċ η - ∇η·(c_old F_old u̇)
///   s(u̇, δu)    = 0.5 visc sym∇(F_old u̇) : sym∇(F_old δu)
///
/// The gradient of a pushed-forward field includes the variation of F_old:
///   ∇(F w)_ij = Σ_k (∂_j F)_ik w_k + (F ∇w)_ij

use nalgebra::{Matrix2, Vector2};
use crate::error::Result;
use crate::fem::VectorSample;
use crate::physics::{Deformation, ModelParams};

/// Previous-step coefficients at one quadrature point
#[derive(Debug, Clone, Copy)]
pub struct FrozenCoefficients {
    /// F_old
    pub f: Matrix2<f64>,
    /// ∂F_old/∂x_j
    pub grad_f: [Matrix2<f64>; 2],
    /// c_old
    pub c: f64,
}

impl FrozenCoefficients {
    /// Freeze the deformation of the old displacement and the old concentration
    pub fn new(old_u: &VectorSample, old_c: f64) -> Result<Self> {
        let def = Deformation::new(old_u.grad)?;
        Ok(Self {
            f: def.f,
            grad_f: def.grad_f(&old_u.hess),
            c: old_c,
        })
    }

    /// ∇(F w) for a field with value `w` and gradient `grad_w`
    pub fn push_forward_gradient(&self, w: &Vector2<f64>, grad_w: &Matrix2<f64>) -> Matrix2<f64> {
        let mut out = self.f * grad_w;
        for j in 0..2 {
            let col = self.grad_f[j] * w;
            out[(0, j)] += col[0];
            out[(1, j)] += col[1];
        }
        out
    }
}

/// Symmetric part of a matrix
pub fn sym(m: &Matrix2<f64>) -> Matrix2<f64> {
    (m + m.transpose()) * 0.5
}

/// Diffusion form a(η, δη)
pub fn mobility_form(
    params: &ModelParams,
    frozen: &FrozenCoefficients,
    grad_eta: &Vector2<f64>,
    grad_test: &Vector2<f64>,
) -> f64 {
    0.5 * params.mob * frozen.c * frozen.c * grad_eta.dot(grad_test)
}

/// Coupling form b(u̇, ċ, η)
pub fn coupling_form(
    frozen: &FrozenCoefficients,
    dot_u: &Vector2<f64>,
    dot_c: f64,
    eta: f64,
    grad_eta: &Vector2<f64>,
) -> f64 {
    dot_c * eta - grad_eta.dot(&(frozen.f * dot_u * frozen.c))
}

/// Viscous form s(u̇, δu), given the pushed-forward gradients ∇(F u̇) and ∇(F δu)
pub fn viscous_form(params: &ModelParams, grad_fv: &Matrix2<f64>, grad_fw: &Matrix2<f64>) -> f64 {
    0.5 * params.visc * sym(grad_fv).dot(&sym(grad_fw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frozen_identity(c: f64) -> FrozenCoefficients {
        FrozenCoefficients {
            f: Matrix2::identity(),
            grad_f: [Matrix2::zeros(); 2],
            c,
        }
    }

    #[test]
    fn test_forms_at_identity() {
        let params = ModelParams {
            mob: 2.0,
            visc: 3.0,
            ..ModelParams::default()
        };
        let fr = frozen_identity(0.5);
        let g = Vector2::new(1.0, 2.0);

        assert_relative_eq!(mobility_form(&params, &fr, &g, &g), 0.5 * 2.0 * 0.25 * 5.0);
        assert_relative_eq!(
            coupling_form(&fr, &Vector2::new(1.0, 0.0), 2.0, 3.0, &g),
            6.0 - 0.5
        );

        // Pure rotation gradient has zero symmetric part
        let rot = Matrix2::new(0.0, 1.0, -1.0, 0.0);
        assert_relative_eq!(viscous_form(&params, &rot, &rot), 0.0);
        let shear = Matrix2::new(0.0, 1.0, 0.0, 0.0);
        assert_relative_eq!(viscous_form(&params, &shear, &shear), 0.5 * 3.0 * 0.5);
    }

    #[test]
    fn test_push_forward_gradient_matches_product_rule() {
        // Old displacement u = (0.1 x y, 0.05 x^2), test field w = (x + y, x y)
        let grad_u = |x: f64, y: f64| Matrix2::new(0.1 * y, 0.1 * x, 0.1 * x, 0.0);
        let hess = [Matrix2::new(0.0, 0.1, 0.1, 0.0), Matrix2::new(0.1, 0.0, 0.0, 0.0)];
        let w = |x: f64, y: f64| Vector2::new(x + y, x * y);
        let fw = |x: f64, y: f64| Deformation::new(grad_u(x, y)).unwrap().f * w(x, y);

        let (x, y) = (0.4, 0.6);
        let sample = VectorSample {
            value: Vector2::zeros(),
            grad: grad_u(x, y),
            hess,
        };
        let fr = FrozenCoefficients::new(&sample, 1.0).unwrap();
        let grad_w = Matrix2::new(1.0, 1.0, y, x);
        let got = fr.push_forward_gradient(&w(x, y), &grad_w);

        let h = 1e-6;
        let dx = (fw(x + h, y) - fw(x - h, y)) / (2.0 * h);
        let dy = (fw(x, y + h) - fw(x, y - h)) / (2.0 * h);
        for i in 0..2 {
            assert_relative_eq!(got[(i, 0)], dx[i], epsilon = 1e-8);
            assert_relative_eq!(got[(i, 1)], dy[i], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_dissipation_forms_are_non_negative() {
        let params = ModelParams::default();
        let fr = frozen_identity(0.7);
        let g = Vector2::new(-0.3, 0.8);
        let m = Matrix2::new(0.2, -1.0, 0.4, 0.5);
        assert!(mobility_form(&params, &fr, &g, &g) >= 0.0);
        assert!(viscous_form(&params, &m, &m) >= 0.0);
    }
}
