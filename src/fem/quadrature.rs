use crate::error::{Result, SimError};

/// Gaussian quadrature rules for triangular elements
///
/// Weights are normalised to the reference triangle (area 1/2), so a
/// physical integral is `Σ w_q f(x_q) · |det J|` with `|det J| = 2·area`.
#[derive(Debug, Clone)]
pub struct TriangleQuadrature {
    /// Integration point coordinates in barycentric form [L0, L1, L2]
    pub points: Vec<[f64; 3]>,
    /// Integration weights
    pub weights: Vec<f64>,
    /// Polynomial degree integrated exactly
    pub degree: usize,
}

impl TriangleQuadrature {
    /// 1-point quadrature (degree 1 exactness) - centroid rule
    pub fn tri_1point() -> Self {
        let t = 1.0 / 3.0;
        Self {
            points: vec![[t, t, t]],
            weights: vec![0.5],
            degree: 1,
        }
    }

    /// 3-point quadrature (degree 2 exactness)
    pub fn tri_3point() -> Self {
        let a = 2.0 / 3.0;
        let b = 1.0 / 6.0;
        let w = 1.0 / 6.0;

        Self {
            points: vec![[a, b, b], [b, a, b], [b, b, a]],
            weights: vec![w, w, w],
            degree: 2,
        }
    }

    /// 7-point quadrature (degree 5 exactness)
    ///
    /// Exact for quintic polynomials. Default for the mixed P2/P1 forms.
    pub fn tri_7point() -> Self {
        let s15 = 15.0_f64.sqrt();

        let a1 = (9.0 - 2.0 * s15) / 21.0;
        let b1 = (6.0 + s15) / 21.0;
        let a2 = (9.0 + 2.0 * s15) / 21.0;
        let b2 = (6.0 - s15) / 21.0;

        let w0 = 9.0 / 80.0;
        let w1 = (155.0 + s15) / 2400.0;
        let w2 = (155.0 - s15) / 2400.0;

        let t = 1.0 / 3.0;
        Self {
            points: vec![
                [t, t, t],
                [a1, b1, b1],
                [b1, a1, b1],
                [b1, b1, a1],
                [a2, b2, b2],
                [b2, a2, b2],
                [b2, b2, a2],
            ],
            weights: vec![w0, w1, w1, w1, w2, w2, w2],
            degree: 5,
        }
    }

    /// Smallest available rule that integrates polynomials of `degree` exactly
    pub fn for_degree(degree: usize) -> Result<Self> {
        match degree {
            0 | 1 => Ok(Self::tri_1point()),
            2 => Ok(Self::tri_3point()),
            3..=5 => Ok(Self::tri_7point()),
            _ => Err(SimError::Config(format!(
                "no triangle quadrature rule of degree {} (maximum is 5)",
                degree
            ))),
        }
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }
}
