/// Deformation descriptors of the Eulerian displacement field
///
/// With G = ∇u (G_ij = ∂u_i/∂x_j) the deformation gradient is
/// F = (I - G)^-1, J = det F and the isochoric right Cauchy-Green tensor
/// is C = FᵀF / J. Nothing here is stored between evaluations.

use nalgebra::Matrix2;
use crate::error::{Result, SimError};

/// Deformation at one point
#[derive(Debug, Clone, Copy)]
pub struct Deformation {
    pub grad_u: Matrix2<f64>,
    pub f: Matrix2<f64>,
    pub j: f64,
}

impl Deformation {
    pub fn new(grad_u: Matrix2<f64>) -> Result<Self> {
        let a = Matrix2::identity() - grad_u;
        let f = a.try_inverse().ok_or_else(|| {
            SimError::Deformation(format!("I - grad u is singular (det = {:.3e})", a.determinant()))
        })?;
        let j = f.determinant();
        if !j.is_finite() || f.iter().any(|v| !v.is_finite()) {
            return Err(SimError::Deformation(format!("non-finite deformation gradient (J = {})", j)));
        }
        Ok(Self { grad_u, f, j })
    }

    /// Undeformed state (u = 0)
    pub fn identity() -> Self {
        Self {
            grad_u: Matrix2::zeros(),
            f: Matrix2::identity(),
            j: 1.0,
        }
    }

    /// C = FᵀF / J
    pub fn isochoric_cauchy_green(&self) -> Matrix2<f64> {
        self.f.transpose() * self.f / self.j
    }

    /// Spatial derivatives of F: `out[j] = ∂F/∂x_j = F (∂G/∂x_j) F`
    ///
    /// `hess_u[i]` is the Hessian of u_i, so (∂G/∂x_j)_il = hess_u[i][(l, j)].
    pub fn grad_f(&self, hess_u: &[Matrix2<f64>; 2]) -> [Matrix2<f64>; 2] {
        let mut out = [Matrix2::zeros(); 2];
        for (j, dfj) in out.iter_mut().enumerate() {
            let mut dg = Matrix2::zeros();
            for i in 0..2 {
                for l in 0..2 {
                    dg[(i, l)] = hess_u[i][(l, j)];
                }
            }
            *dfj = self.f * dg * self.f;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_for_zero_displacement() {
        let def = Deformation::new(Matrix2::zeros()).unwrap();
        assert_relative_eq!(def.f, Matrix2::identity());
        assert_relative_eq!(def.j, 1.0);
        assert_relative_eq!(def.isochoric_cauchy_green(), Matrix2::identity());
    }

    #[test]
    fn test_uniform_dilation() {
        // u = 0.5 x  =>  F = 2 I, J = 4, C = I
        let def = Deformation::new(Matrix2::identity() * 0.5).unwrap();
        assert_relative_eq!(def.f, Matrix2::identity() * 2.0, epsilon = 1e-14);
        assert_relative_eq!(def.j, 4.0, epsilon = 1e-14);
        assert_relative_eq!(def.isochoric_cauchy_green(), Matrix2::identity(), epsilon = 1e-14);
    }

    #[test]
    fn test_singular_gradient_is_an_error() {
        assert!(matches!(
            Deformation::new(Matrix2::identity()),
            Err(SimError::Deformation(_))
        ));
    }

    #[test]
    fn test_grad_f_matches_finite_difference() {
        // u = (0.1 x y, 0.05 x^2 - 0.1 y^2): G varies linearly in x
        let grad_at = |x: f64, y: f64| Matrix2::new(0.1 * y, 0.1 * x, 0.1 * x, -0.2 * y);
        let hess = [
            Matrix2::new(0.0, 0.1, 0.1, 0.0),
            Matrix2::new(0.1, 0.0, 0.0, -0.2),
        ];
        let (x, y) = (0.3, 0.7);
        let def = Deformation::new(grad_at(x, y)).unwrap();
        let df = def.grad_f(&hess);

        let h = 1e-6;
        let fx = (Deformation::new(grad_at(x + h, y)).unwrap().f
            - Deformation::new(grad_at(x - h, y)).unwrap().f)
            / (2.0 * h);
        let fy = (Deformation::new(grad_at(x, y + h)).unwrap().f
            - Deformation::new(grad_at(x, y - h)).unwrap().f)
            / (2.0 * h);

        assert_relative_eq!(df[0], fx, epsilon = 1e-8);
        assert_relative_eq!(df[1], fy, epsilon = 1e-8);
    }
}
