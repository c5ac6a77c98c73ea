//! Bandwidth reduction for the mixed systems
//!
//! The mixed DOF numbering is segregated (all displacements, then all
//! concentrations, then all multipliers), which gives a bandwidth close to
//! the matrix size. Reverse Cuthill-McKee on the symmetrised sparsity
//! pattern brings coupled DOFs next to each other.

use sprs::{CsMat, PermOwned};

/// Structurally symmetric pattern of `a` (all stored entries set to one)
pub fn symmetric_pattern(a: &CsMat<f64>) -> CsMat<f64> {
    let ones = a.map(|_| 1.0_f64);
    &ones + &ones.transpose_view()
}

/// Reverse Cuthill-McKee ordering of the pattern of `a`
///
/// `perm.vec()[new] = old` and `perm.inv_vec()[old] = new`.
pub fn reverse_cuthill_mckee(a: &CsMat<f64>) -> PermOwned {
    let pattern = symmetric_pattern(a);
    sprs::linalg::reverse_cuthill_mckee(pattern.view()).perm
}

/// Lower and upper bandwidth (kl, ku) of `a` under the ordering `inv[old] = new`
pub fn bandwidths(a: &CsMat<f64>, inv: &[usize]) -> (usize, usize) {
    let mut kl = 0;
    let mut ku = 0;
    for (i, row) in a.outer_iterator().enumerate() {
        let ni = inv[i];
        for (j, _) in row.iter() {
            let nj = inv[j];
            if ni > nj {
                kl = kl.max(ni - nj);
            } else {
                ku = ku.max(nj - ni);
            }
        }
    }
    (kl, ku)
}
