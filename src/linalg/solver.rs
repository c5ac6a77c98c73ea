use serde::{Deserialize, Serialize};
use sprs::CsMat;
use crate::error::Result;

/// Statistics from solver execution
#[derive(Debug, Clone)]
pub struct SolverStats {
    /// Final residual norm ||r|| = ||b - Ax||
    pub residual_norm: f64,

    /// Relative residual ||r|| / ||b||
    pub relative_residual: f64,

    /// Bandwidth used by the factorisation (0 for dense)
    pub bandwidth: usize,

    /// Solve time in seconds
    pub solve_time: f64,
}

impl SolverStats {
    pub fn new() -> Self {
        Self {
            residual_norm: 0.0,
            relative_residual: 0.0,
            bandwidth: 0,
            solve_time: 0.0,
        }
    }
}

impl Default for SolverStats {
    fn default() -> Self {
        Self::new()
    }
}

/// y = A x for any matrix-like operator
pub trait LinearOperator {
    fn apply(&self, v: &[f64]) -> Vec<f64>;

    fn rows(&self) -> usize;

    fn cols(&self) -> usize;
}

impl LinearOperator for CsMat<f64> {
    /// Row-by-row product (CSR storage)
    fn apply(&self, v: &[f64]) -> Vec<f64> {
        self.outer_iterator()
            .map(|row| row.iter().map(|(j, &a)| a * v[j]).sum())
            .collect()
    }

    fn rows(&self) -> usize {
        self.rows()
    }

    fn cols(&self) -> usize {
        self.cols()
    }
}

/// Linear system solver trait
///
/// Solves Ax = b for x. Implementations are direct: a zero pivot is
/// reported as `SimError::SingularMatrix`.
pub trait LinearSolver: Send {
    /// Solve the linear system Ax = b
    ///
    /// # Arguments
    /// * `A` - System matrix (n x n, CSR)
    /// * `b` - Right-hand side vector (n)
    ///
    /// # Returns
    /// * Solution vector x (n)
    /// * Solver statistics
    #[allow(non_snake_case)]
    fn solve(&mut self, A: &CsMat<f64>, b: &[f64]) -> Result<(Vec<f64>, SolverStats)>;

    /// Get solver name
    fn name(&self) -> &str;
}

/// Available linear solver backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinearSolverKind {
    /// Dense LU from nalgebra
    Direct,
    /// Banded LU after reverse Cuthill-McKee reordering, for fine meshes
    Banded,
}

impl Default for LinearSolverKind {
    fn default() -> Self {
        LinearSolverKind::Direct
    }
}

impl LinearSolverKind {
    /// Instantiate the backend
    pub fn build(&self) -> Box<dyn LinearSolver> {
        match self {
            LinearSolverKind::Direct => Box::new(super::DirectSolver::new()),
            LinearSolverKind::Banded => Box::new(super::BandedSolver::new()),
        }
    }
}

/// Norms and residual checks shared by the solvers
pub struct SolverUtils;

impl SolverUtils {
    /// r = b - A x
    #[allow(non_snake_case)]
    pub fn compute_residual<O: LinearOperator>(A: &O, x: &[f64], b: &[f64]) -> Vec<f64> {
        A.apply(x).into_iter().zip(b).map(|(ax, &bi)| bi - ax).collect()
    }

    /// Euclidean norm
    pub fn norm(v: &[f64]) -> f64 {
        v.iter().fold(0.0, |acc, x| acc + x * x).sqrt()
    }

    #[allow(non_snake_case)]
    pub fn residual_norm<O: LinearOperator>(A: &O, x: &[f64], b: &[f64]) -> f64 {
        Self::norm(&Self::compute_residual(A, x, b))
    }

    /// ||b - A x|| / ||b||, or the absolute residual when b vanishes
    #[allow(non_snake_case)]
    pub fn relative_residual<O: LinearOperator>(A: &O, x: &[f64], b: &[f64]) -> f64 {
        let r_norm = Self::residual_norm(A, x, b);
        match Self::norm(b) {
            b_norm if b_norm < 1e-14 => r_norm,
            b_norm => r_norm / b_norm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;
    use approx::assert_relative_eq;

    #[test]
    fn test_operator_skips_missing_entries() {
        // Row 1 is an identity row as produced for a constrained DOF
        let mut tri = TriMat::new((3, 3));
        tri.add_triplet(0, 0, 4.0);
        tri.add_triplet(0, 2, -1.0);
        tri.add_triplet(1, 1, 1.0);
        tri.add_triplet(2, 0, -1.0);
        tri.add_triplet(2, 2, 4.0);
        let a: CsMat<f64> = tri.to_csr();

        assert_eq!(a.apply(&[1.0, 2.0, 3.0]), vec![1.0, 2.0, 11.0]);
        assert_eq!((LinearOperator::rows(&a), LinearOperator::cols(&a)), (3, 3));
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_residual_norms() {
        let mut tri = TriMat::new((2, 2));
        tri.add_triplet(0, 0, 1.0);
        tri.add_triplet(1, 1, 2.0);
        let A: CsMat<f64> = tri.to_csr();

        assert_relative_eq!(SolverUtils::norm(&[3.0, 4.0]), 5.0);
        // b - A x = (0, -1)
        assert_eq!(SolverUtils::compute_residual(&A, &[1.0, 1.0], &[1.0, 1.0]), vec![0.0, -1.0]);
        assert_relative_eq!(SolverUtils::relative_residual(&A, &[1.0, 1.0], &[1.0, 1.0]), 1.0 / 2f64.sqrt());
        // Zero right-hand side falls back to the absolute residual
        assert_relative_eq!(SolverUtils::relative_residual(&A, &[1.0, 0.0], &[0.0, 0.0]), 1.0);
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(LinearSolverKind::Direct.build().name(), "Direct (Dense LU)");
        assert_eq!(LinearSolverKind::Banded.build().name(), "Banded LU (RCM)");
        assert_eq!(LinearSolverKind::default(), LinearSolverKind::Direct);
    }
}
