use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use crate::error::Result;
use crate::fem::DofManager;

/// Local residual of one element as a function of its local coefficients
///
/// Implementors carry whatever frozen data they need (previous state,
/// time step, parameters). The assembler only sees local vectors.
pub trait ElementKernel: Sync {
    /// Number of elements
    fn num_elements(&self) -> usize;

    /// Global DOFs of an element, in local order
    fn local_dofs(&self, elem: usize) -> &[usize];

    /// Local residual vector for the given local coefficients
    fn residual(&self, elem: usize, local: &[f64]) -> Result<Vec<f64>>;

    /// Local tangent dR_e/dx_e, row-major
    ///
    /// Falls back to central differences of `residual`.
    fn tangent(&self, elem: usize, local: &[f64]) -> Result<Vec<f64>> {
        finite_difference_tangent(self, elem, local)
    }
}

/// Central-difference element tangent, row-major
///
/// Column j is (R_e(x + h e_j) - R_e(x - h e_j)) / 2h with h = 1e-6 (1 + |x_j|).
pub fn finite_difference_tangent<K: ElementKernel + ?Sized>(
    kernel: &K,
    elem: usize,
    local: &[f64],
) -> Result<Vec<f64>> {
    let m = local.len();
    let mut x = local.to_vec();
    let mut k = vec![0.0; m * m];

    for j in 0..m {
        let xj = x[j];
        let h = 1e-6 * (1.0 + xj.abs());

        x[j] = xj + h;
        let r_plus = kernel.residual(elem, &x)?;
        x[j] = xj - h;
        let r_minus = kernel.residual(elem, &x)?;
        x[j] = xj;

        for i in 0..m {
            k[i * m + j] = (r_plus[i] - r_minus[i]) / (2.0 * h);
        }
    }
    Ok(k)
}

/// Global assembler
///
/// All loops come in a serial and a parallel (Rayon) flavour. The parallel
/// one computes per-element contributions independently and merges them
/// serially, so results do not depend on the thread count.
pub struct Assembler;

impl Assembler {
    /// Map every element through `f`, in parallel or serially
    pub fn map_elements<T, F>(num_elements: usize, parallel: bool, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send,
    {
        if parallel {
            (0..num_elements).into_par_iter().map(f).collect()
        } else {
            (0..num_elements).map(f).collect()
        }
    }

    /// Assemble the global residual R = Σ_e R_e
    ///
    /// # Arguments
    /// * `kernel` - Element residual provider
    /// * `x` - Global coefficient vector
    /// * `parallel` - Use Rayon across elements
    pub fn assemble_residual<K: ElementKernel>(kernel: &K, x: &[f64], parallel: bool) -> Result<Vec<f64>> {
        let local = Self::map_elements(kernel.num_elements(), parallel, |e| {
            let dofs = kernel.local_dofs(e);
            let x_local: Vec<f64> = dofs.iter().map(|&d| x[d]).collect();
            kernel.residual(e, &x_local)
        })?;

        let mut r = vec![0.0; x.len()];
        for (e, r_elem) in local.into_iter().enumerate() {
            for (&dof, val) in kernel.local_dofs(e).iter().zip(r_elem) {
                r[dof] += val;
            }
        }
        Ok(r)
    }

    /// Assemble the global Jacobian dR/dx from the element tangents
    pub fn assemble_jacobian<K: ElementKernel>(kernel: &K, x: &[f64], parallel: bool) -> Result<CsMat<f64>> {
        let n = x.len();

        let local_triplets = Self::map_elements(kernel.num_elements(), parallel, |e| {
            let dofs = kernel.local_dofs(e);
            let x_local: Vec<f64> = dofs.iter().map(|&d| x[d]).collect();
            let m = dofs.len();
            let k_elem = kernel.tangent(e, &x_local)?;

            let mut elem_triplets = Vec::with_capacity(m * m);
            for (i, &row) in dofs.iter().enumerate() {
                for (j, &col) in dofs.iter().enumerate() {
                    let val = k_elem[i * m + j];
                    if val != 0.0 {
                        elem_triplets.push((row, col, val));
                    }
                }
            }
            Ok(elem_triplets)
        })?;

        let mut triplets = TriMat::new((n, n));
        for elem_triplets in local_triplets {
            for (i, j, val) in elem_triplets {
                triplets.add_triplet(i, j, val);
            }
        }

        Ok(triplets.to_csr())
    }

    /// Sum of per-element scalar contributions
    pub fn integrate<F>(num_elements: usize, parallel: bool, f: F) -> Result<f64>
    where
        F: Fn(usize) -> Result<f64> + Sync + Send,
    {
        Ok(Self::map_elements(num_elements, parallel, f)?.into_iter().sum())
    }

    /// Apply homogeneous Dirichlet conditions to a Newton correction system
    ///
    /// Constrained rows and columns are removed and replaced by identity
    /// rows with zero right-hand side, so the correction leaves the
    /// prescribed values untouched.
    #[allow(non_snake_case)]
    pub fn apply_dirichlet_increments(
        K: &CsMat<f64>,
        f: &[f64],
        dof_mgr: &DofManager,
    ) -> (CsMat<f64>, Vec<f64>) {
        let n = K.rows();
        let mut f_new = f.to_vec();
        let mut tri = TriMat::new((n, n));

        for (row_idx, row) in K.outer_iterator().enumerate() {
            if dof_mgr.is_dirichlet(row_idx) {
                tri.add_triplet(row_idx, row_idx, 1.0);
                f_new[row_idx] = 0.0;
            } else {
                for (col_idx, &val) in row.iter() {
                    if !dof_mgr.is_dirichlet(col_idx) {
                        tri.add_triplet(row_idx, col_idx, val);
                    }
                }
            }
        }

        (tri.to_csr(), f_new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two 1-D "elements" sharing DOF 1 with residual r_i = x_i^3 - x_j
    struct Chain {
        dofs: Vec<[usize; 2]>,
    }

    impl ElementKernel for Chain {
        fn num_elements(&self) -> usize {
            self.dofs.len()
        }

        fn local_dofs(&self, elem: usize) -> &[usize] {
            &self.dofs[elem]
        }

        fn residual(&self, _elem: usize, x: &[f64]) -> Result<Vec<f64>> {
            Ok(vec![x[0].powi(3) - x[1], x[1].powi(3) - x[0]])
        }
    }

    fn chain() -> Chain {
        Chain {
            dofs: vec![[0, 1], [1, 2]],
        }
    }

    #[test]
    fn test_residual_scatter() {
        let x = [1.0, 2.0, 3.0];
        for parallel in [false, true] {
            let r = Assembler::assemble_residual(&chain(), &x, parallel).unwrap();
            // elem 0: (1 - 2, 8 - 1), elem 1: (8 - 3, 27 - 2)
            assert_relative_eq!(r[0], -1.0, epsilon = 1e-14);
            assert_relative_eq!(r[1], 7.0 + 5.0, epsilon = 1e-14);
            assert_relative_eq!(r[2], 25.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_jacobian_matches_analytic() {
        let x = [1.0, 2.0, 3.0];
        let k = Assembler::assemble_jacobian(&chain(), &x, true).unwrap();
        let dense = k.to_dense();

        assert_relative_eq!(dense[[0, 0]], 3.0, epsilon = 1e-6);
        assert_relative_eq!(dense[[0, 1]], -1.0, epsilon = 1e-6);
        assert_relative_eq!(dense[[1, 0]], -1.0, epsilon = 1e-6);
        assert_relative_eq!(dense[[1, 1]], 12.0 + 12.0, epsilon = 1e-5);
        assert_relative_eq!(dense[[1, 2]], -1.0, epsilon = 1e-6);
        assert_relative_eq!(dense[[2, 2]], 27.0, epsilon = 1e-5);
        assert_relative_eq!(dense[[0, 2]], 0.0, epsilon = 1e-12);
    }

    /// Same chain with its exact tangent
    struct ExactChain(Chain);

    impl ElementKernel for ExactChain {
        fn num_elements(&self) -> usize {
            self.0.num_elements()
        }

        fn local_dofs(&self, elem: usize) -> &[usize] {
            self.0.local_dofs(elem)
        }

        fn residual(&self, elem: usize, x: &[f64]) -> Result<Vec<f64>> {
            self.0.residual(elem, x)
        }

        fn tangent(&self, _elem: usize, x: &[f64]) -> Result<Vec<f64>> {
            Ok(vec![3.0 * x[0] * x[0], -1.0, -1.0, 3.0 * x[1] * x[1]])
        }
    }

    #[test]
    fn test_exact_tangent_is_assembled() {
        let x = [1.0, 2.0, 3.0];
        let exact = Assembler::assemble_jacobian(&ExactChain(chain()), &x, false).unwrap().to_dense();
        let fd = Assembler::assemble_jacobian(&chain(), &x, false).unwrap().to_dense();

        assert_eq!(exact[[1, 1]], 24.0);
        assert_eq!(exact[[2, 2]], 27.0);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(exact[[i, j]], fd[[i, j]], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_dirichlet_increments() {
        let x = [1.0, 2.0, 3.0];
        let k = Assembler::assemble_jacobian(&chain(), &x, false).unwrap();
        let mut dofs = DofManager::new(3, 1);
        dofs.set_dirichlet(0, 5.0);

        let (k_bc, f_bc) = Assembler::apply_dirichlet_increments(&k, &[1.0, 1.0, 1.0], &dofs);
        let dense = k_bc.to_dense();

        assert_eq!(f_bc, vec![0.0, 1.0, 1.0]);
        assert_eq!(dense[[0, 0]], 1.0);
        assert_eq!(dense[[0, 1]], 0.0);
        assert_eq!(dense[[1, 0]], 0.0);
        assert_relative_eq!(dense[[1, 1]], 24.0, epsilon = 1e-5);
    }

    #[test]
    fn test_integrate() {
        let total = Assembler::integrate(4, true, |e| Ok(e as f64)).unwrap();
        assert_relative_eq!(total, 6.0, epsilon = 1e-14);
    }
}
