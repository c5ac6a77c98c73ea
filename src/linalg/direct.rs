use sprs::CsMat;
use std::time::Instant;
use super::solver::{LinearSolver, SolverStats, SolverUtils};
use crate::error::{Result, SimError};

/// Dense LU with partial pivoting (nalgebra)
///
/// The default backend. Memory grows as n², so fine meshes should
/// select the banded backend.
pub struct DirectSolver {
    /// Solver name
    name: String,
}

impl DirectSolver {
    pub fn new() -> Self {
        Self {
            name: "Direct (Dense LU)".to_string(),
        }
    }
}

impl Default for DirectSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearSolver for DirectSolver {
    #[allow(non_snake_case)]
    fn solve(&mut self, A: &CsMat<f64>, b: &[f64]) -> Result<(Vec<f64>, SolverStats)> {
        let start = Instant::now();

        let n = b.len();
        if A.rows() != n || A.cols() != n {
            return Err(SimError::Dimension {
                expected: n,
                actual: A.rows(),
            });
        }

        let mut a_dense = nalgebra::DMatrix::zeros(n, n);
        for (&val, (i, j)) in A.iter() {
            a_dense[(i, j)] += val;
        }

        let lu = a_dense.lu();
        let b_vec = nalgebra::DVector::from_column_slice(b);

        let x_vec = match lu.solve(&b_vec) {
            Some(x) => x,
            None => {
                let u = lu.u();
                let pivot = (0..n).find(|&i| u[(i, i)] == 0.0).unwrap_or(0);
                return Err(SimError::SingularMatrix { pivot });
            }
        };

        let x: Vec<f64> = x_vec.iter().copied().collect();
        if x.iter().any(|v| !v.is_finite()) {
            return Err(SimError::SingularMatrix { pivot: 0 });
        }

        let stats = SolverStats {
            residual_norm: SolverUtils::residual_norm(A, &x, b),
            relative_residual: SolverUtils::relative_residual(A, &x, b),
            bandwidth: 0,
            solve_time: start.elapsed().as_secs_f64(),
        };

        Ok((x, stats))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;
    use approx::assert_relative_eq;

    #[test]
    fn test_saddle_point_block() {
        // Non-symmetric 2x2 coupling, shaped like the concentration/multiplier block
        let mut tri = TriMat::new((2, 2));
        tri.add_triplet(0, 0, 2.0);
        tri.add_triplet(0, 1, -1.0);
        tri.add_triplet(1, 0, 1.0);
        tri.add_triplet(1, 1, 2.0);

        let (x, stats) = DirectSolver::new().solve(&tri.to_csr(), &[1.0, 1.0]).unwrap();
        assert_relative_eq!(x[0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(x[1], 0.2, epsilon = 1e-12);
        assert!(stats.relative_residual < 1e-12);
        assert_eq!(stats.bandwidth, 0);
    }

    #[test]
    fn test_duplicate_triplets_are_summed() {
        let mut tri = TriMat::new((2, 2));
        tri.add_triplet(0, 0, 1.0);
        tri.add_triplet(0, 0, 1.0);
        tri.add_triplet(1, 1, 1.0);

        let (x, _) = DirectSolver::new().solve(&tri.to_csr(), &[4.0, 3.0]).unwrap();
        assert_relative_eq!(x[0], 2.0);
        assert_relative_eq!(x[1], 3.0);
    }

    #[test]
    fn test_singular_and_mismatched_systems() {
        let mut tri = TriMat::new((2, 2));
        tri.add_triplet(0, 0, 1.0);
        tri.add_triplet(0, 1, 2.0);
        tri.add_triplet(1, 0, 2.0);
        tri.add_triplet(1, 1, 4.0);
        let a = tri.to_csr();

        let mut solver = DirectSolver::new();
        assert!(matches!(solver.solve(&a, &[1.0, 1.0]), Err(SimError::SingularMatrix { .. })));
        assert!(matches!(solver.solve(&a, &[1.0]), Err(SimError::Dimension { .. })));
    }
}
