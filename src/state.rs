//! Composite field (displacement, concentration, multiplier) over a mesh
//!
//! A `MixedSpace` fixes the mesh and the DOF layout for a whole run. A
//! `State` is one coefficient vector in that space. States are replaced,
//! never mutated, by the time stepper.

use std::sync::Arc;
use nalgebra::Vector2;
use crate::error::{Result, SimError};
use crate::fem::DofManager;
use crate::mesh::Mesh;

/// Mixed P2 (vector) / P1 / P1 function space on a Tri6 mesh
#[derive(Debug, Clone)]
pub struct MixedSpace {
    mesh: Arc<Mesh>,
    dofs: DofManager,
}

impl MixedSpace {
    pub fn new(mesh: Arc<Mesh>) -> Result<Self> {
        mesh.validate()?;
        if mesh.num_elements() == 0 {
            return Err(SimError::Mesh("mesh has no elements".to_string()));
        }
        let corners = mesh.connectivity.corner_nodes();
        let dofs = DofManager::new_mixed(mesh.num_nodes(), &corners);
        Ok(Self { mesh, dofs })
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn dofs(&self) -> &DofManager {
        &self.dofs
    }

    pub fn dofs_mut(&mut self) -> &mut DofManager {
        &mut self.dofs
    }

    pub fn total_dofs(&self) -> usize {
        self.dofs.total_dofs()
    }

    /// Range of the displacement block in a state vector
    pub fn displacement_range(&self) -> std::ops::Range<usize> {
        0..self.dofs.total_disp_dofs()
    }

    /// Range of the concentration block in a state vector
    pub fn concentration_range(&self) -> std::ops::Range<usize> {
        let start = self.dofs.total_disp_dofs();
        start..start + self.dofs.num_corner_dofs()
    }

    /// Range of the multiplier block in a state vector
    pub fn multiplier_range(&self) -> std::ops::Range<usize> {
        let start = self.dofs.total_disp_dofs() + self.dofs.num_corner_dofs();
        start..start + self.dofs.num_corner_dofs()
    }
}

/// Coefficient vector of the composite field
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    values: Vec<f64>,
}

impl State {
    pub fn zeros(space: &MixedSpace) -> Self {
        Self {
            values: vec![0.0; space.total_dofs()],
        }
    }

    pub fn from_values(space: &MixedSpace, values: Vec<f64>) -> Result<Self> {
        if values.len() != space.total_dofs() {
            return Err(SimError::Dimension {
                expected: space.total_dofs(),
                actual: values.len(),
            });
        }
        Ok(Self { values })
    }

    /// Assemble a state from its three blocks (corner-ordered scalars)
    pub fn from_parts(
        space: &MixedSpace,
        displacement: &[f64],
        concentration: &[f64],
        multiplier: &[f64],
    ) -> Result<Self> {
        let mut state = Self::zeros(space);
        for (range, block) in [
            (space.displacement_range(), displacement),
            (space.concentration_range(), concentration),
            (space.multiplier_range(), multiplier),
        ] {
            if block.len() != range.len() {
                return Err(SimError::Dimension {
                    expected: range.len(),
                    actual: block.len(),
                });
            }
            state.values[range].copy_from_slice(block);
        }
        Ok(state)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn displacement_block<'a>(&'a self, space: &MixedSpace) -> &'a [f64] {
        &self.values[space.displacement_range()]
    }

    pub fn concentration_block<'a>(&'a self, space: &MixedSpace) -> &'a [f64] {
        &self.values[space.concentration_range()]
    }

    pub fn multiplier_block<'a>(&'a self, space: &MixedSpace) -> &'a [f64] {
        &self.values[space.multiplier_range()]
    }

    /// Nodal displacement vector
    pub fn displacement(&self, space: &MixedSpace, node_id: usize) -> Vector2<f64> {
        let dofs = space.dofs();
        Vector2::new(
            self.values[dofs.displacement_dof(node_id, 0)],
            self.values[dofs.displacement_dof(node_id, 1)],
        )
    }

    /// Nodal concentration (corner nodes only)
    pub fn concentration(&self, space: &MixedSpace, node_id: usize) -> Option<f64> {
        space.dofs().concentration_dof(node_id).map(|d| self.values[d])
    }

    /// Nodal multiplier (corner nodes only)
    pub fn multiplier(&self, space: &MixedSpace, node_id: usize) -> Option<f64> {
        space.dofs().multiplier_dof(node_id).map(|d| self.values[d])
    }

    /// Values at the given global DOFs
    pub fn gather(&self, dofs: &[usize]) -> Vec<f64> {
        dofs.iter().map(|&d| self.values[d]).collect()
    }

    /// Largest absolute entrywise difference to another state
    pub fn max_abs_difference(&self, other: &State) -> f64 {
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Diagonal, MeshGenerator};

    fn unit_space() -> MixedSpace {
        let mesh = MeshGenerator::rectangle(1.0, 1.0, 1, 1, Diagonal::Left);
        MixedSpace::new(Arc::new(mesh)).unwrap()
    }

    #[test]
    fn test_block_ranges() {
        let space = unit_space();
        // 9 nodes, 4 corners
        assert_eq!(space.displacement_range(), 0..18);
        assert_eq!(space.concentration_range(), 18..22);
        assert_eq!(space.multiplier_range(), 22..26);
        assert_eq!(space.total_dofs(), 26);
    }

    #[test]
    fn test_from_parts_and_accessors() {
        let space = unit_space();
        let u: Vec<f64> = (0..18).map(|i| i as f64).collect();
        let c = vec![0.5, 0.6, 0.7, 0.8];
        let eta = vec![-1.0; 4];
        let state = State::from_parts(&space, &u, &c, &eta).unwrap();

        assert_eq!(state.displacement(&space, 2), Vector2::new(4.0, 5.0));
        assert_eq!(state.concentration(&space, 3), Some(0.8));
        assert_eq!(state.multiplier(&space, 0), Some(-1.0));
        assert_eq!(state.concentration_block(&space), &c[..]);
        // Midpoint nodes carry no scalar DOFs
        assert_eq!(state.concentration(&space, 5), None);
    }

    #[test]
    fn test_dimension_checks() {
        let space = unit_space();
        assert!(State::from_values(&space, vec![0.0; 3]).is_err());
        assert!(State::from_parts(&space, &[0.0; 18], &[0.0; 3], &[0.0; 4]).is_err());
    }
}
