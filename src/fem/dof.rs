use std::collections::HashSet;

/// Degree of Freedom (DOF) manager
///
/// Handles DOF numbering and boundary condition tracking for FEM assembly.
/// Supports a pure vector space (P2 displacement only) and the mixed
/// P2-P1-P1 space (displacement, concentration, multiplier).
///
/// Segregated ordering: all displacement DOFs first (`2*node + comp`),
/// then one concentration DOF per corner node, then one multiplier DOF
/// per corner node. Corner DOFs follow the sorted corner node order.
#[derive(Debug, Clone)]
pub struct DofManager {
    /// Number of nodes in the mesh
    num_nodes: usize,

    /// Number of displacement DOFs per node (2 in 2-D)
    disp_dofs_per_node: usize,

    /// Total displacement DOFs (placed first in segregated ordering)
    total_disp_dofs: usize,

    /// Number of corner-node scalar fields (0 or 2)
    num_scalar_fields: usize,

    /// Number of corner nodes carrying scalar DOFs
    num_corner_dofs: usize,

    /// Mapping from node_id to corner rank (if any)
    corner_node_map: Vec<Option<usize>>,

    /// Total number of DOFs
    total_dofs: usize,

    /// Set of DOFs with Dirichlet boundary conditions
    dirichlet_dofs: HashSet<usize>,

    /// Values for Dirichlet DOFs
    dirichlet_values: Vec<f64>,
}

impl DofManager {
    /// Create a DOF manager for a vector field with a fixed number of DOFs per node
    pub fn new(num_nodes: usize, dofs_per_node: usize) -> Self {
        let total_dofs = num_nodes * dofs_per_node;

        Self {
            num_nodes,
            disp_dofs_per_node: dofs_per_node,
            total_disp_dofs: total_dofs,
            num_scalar_fields: 0,
            num_corner_dofs: 0,
            corner_node_map: vec![None; num_nodes],
            total_dofs,
            dirichlet_dofs: HashSet::new(),
            dirichlet_values: vec![0.0; total_dofs],
        }
    }

    /// Create a DOF manager for the mixed P2-P1-P1 formulation
    ///
    /// # Arguments
    /// * `num_nodes` - Total number of nodes (including mid-edges)
    /// * `corner_nodes` - Indices of nodes that carry the P1 fields (element vertices)
    pub fn new_mixed(num_nodes: usize, corner_nodes: &[usize]) -> Self {
        let disp_dofs_per_node = 2;
        let total_disp_dofs = num_nodes * disp_dofs_per_node;

        let unique: HashSet<usize> = corner_nodes.iter().cloned().collect();
        let mut sorted_corners: Vec<usize> = unique.into_iter().collect();
        sorted_corners.sort_unstable();

        let mut corner_node_map = vec![None; num_nodes];
        for (idx, &node_id) in sorted_corners.iter().enumerate() {
            corner_node_map[node_id] = Some(idx);
        }

        let num_corner_dofs = sorted_corners.len();
        let num_scalar_fields = 2;
        let total_dofs = total_disp_dofs + num_scalar_fields * num_corner_dofs;

        Self {
            num_nodes,
            disp_dofs_per_node,
            total_disp_dofs,
            num_scalar_fields,
            num_corner_dofs,
            corner_node_map,
            total_dofs,
            dirichlet_dofs: HashSet::new(),
            dirichlet_values: vec![0.0; total_dofs],
        }
    }

    /// Displacement-only manager sharing this manager's displacement
    /// numbering and displacement constraints
    pub fn displacement_only(&self) -> Self {
        let mut sub = Self::new(self.num_nodes, self.disp_dofs_per_node);
        for &dof in &self.dirichlet_dofs {
            if dof < self.total_disp_dofs {
                sub.set_dirichlet(dof, self.dirichlet_values[dof]);
            }
        }
        sub
    }

    /// Get the global displacement DOF index for a node and component
    pub fn displacement_dof(&self, node_id: usize, component: usize) -> usize {
        debug_assert!(node_id < self.num_nodes);
        debug_assert!(component < self.disp_dofs_per_node);
        node_id * self.disp_dofs_per_node + component
    }

    /// Rank of a corner node among all corner nodes
    pub fn corner_index(&self, node_id: usize) -> Option<usize> {
        self.corner_node_map.get(node_id).copied().flatten()
    }

    /// Get the global concentration DOF index for a corner node
    pub fn concentration_dof(&self, node_id: usize) -> Option<usize> {
        self.scalar_dof(0, node_id)
    }

    /// Get the global multiplier DOF index for a corner node
    pub fn multiplier_dof(&self, node_id: usize) -> Option<usize> {
        self.scalar_dof(1, node_id)
    }

    fn scalar_dof(&self, field: usize, node_id: usize) -> Option<usize> {
        if field >= self.num_scalar_fields {
            return None;
        }
        self.corner_index(node_id)
            .map(|idx| self.total_disp_dofs + field * self.num_corner_dofs + idx)
    }

    /// Apply Dirichlet boundary condition to a DOF
    ///
    /// # Arguments
    /// * `dof` - Global DOF index
    /// * `value` - Prescribed value
    pub fn set_dirichlet(&mut self, dof: usize, value: f64) {
        debug_assert!(dof < self.total_dofs, "DOF index out of bounds");

        self.dirichlet_dofs.insert(dof);
        self.dirichlet_values[dof] = value;
    }

    /// Check if a DOF has Dirichlet BC
    pub fn is_dirichlet(&self, dof: usize) -> bool {
        self.dirichlet_dofs.contains(&dof)
    }

    /// Constrained DOFs in ascending order
    pub fn dirichlet_dofs(&self) -> Vec<usize> {
        let mut dofs: Vec<usize> = self.dirichlet_dofs.iter().copied().collect();
        dofs.sort_unstable();
        dofs
    }

    /// Overwrite constrained entries of `x` with their prescribed values
    pub fn impose_dirichlet(&self, x: &mut [f64]) {
        for &dof in &self.dirichlet_dofs {
            x[dof] = self.dirichlet_values[dof];
        }
    }

    /// Get total number of DOFs
    pub fn total_dofs(&self) -> usize {
        self.total_dofs
    }

    /// Get number of free DOFs (not constrained by Dirichlet BC)
    pub fn num_free_dofs(&self) -> usize {
        self.total_dofs - self.dirichlet_dofs.len()
    }

    /// Get number of constrained DOFs
    pub fn num_constrained_dofs(&self) -> usize {
        self.dirichlet_dofs.len()
    }

    /// Get number of nodes
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Get total displacement DOFs
    pub fn total_disp_dofs(&self) -> usize {
        self.total_disp_dofs
    }

    /// Get number of corner DOFs per scalar field
    pub fn num_corner_dofs(&self) -> usize {
        self.num_corner_dofs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_dof_numbering() {
        let dof_mgr = DofManager::new(10, 2);

        assert_eq!(dof_mgr.total_dofs(), 20);

        // Node 0: DOFs 0, 1
        assert_eq!(dof_mgr.displacement_dof(0, 0), 0);
        assert_eq!(dof_mgr.displacement_dof(0, 1), 1);

        // Node 3: DOFs 6, 7
        assert_eq!(dof_mgr.displacement_dof(3, 0), 6);
        assert_eq!(dof_mgr.displacement_dof(3, 1), 7);
        assert_eq!(dof_mgr.concentration_dof(3), None);
    }

    #[test]
    fn test_mixed_numbering() {
        // 6 nodes, corners 0, 2, 5 (given unsorted with a duplicate)
        let dof_mgr = DofManager::new_mixed(6, &[5, 0, 2, 0]);

        assert_eq!(dof_mgr.total_disp_dofs(), 12);
        assert_eq!(dof_mgr.num_corner_dofs(), 3);
        assert_eq!(dof_mgr.total_dofs(), 12 + 3 + 3);

        assert_eq!(dof_mgr.concentration_dof(0), Some(12));
        assert_eq!(dof_mgr.concentration_dof(2), Some(13));
        assert_eq!(dof_mgr.concentration_dof(5), Some(14));
        assert_eq!(dof_mgr.multiplier_dof(0), Some(15));
        assert_eq!(dof_mgr.multiplier_dof(5), Some(17));
        assert_eq!(dof_mgr.concentration_dof(1), None);
        assert_eq!(dof_mgr.corner_index(2), Some(1));
    }

    #[test]
    fn test_dirichlet_bc() {
        let mut dof_mgr = DofManager::new_mixed(4, &[0, 1, 2, 3]);

        assert_eq!(dof_mgr.num_constrained_dofs(), 0);

        dof_mgr.set_dirichlet(dof_mgr.displacement_dof(1, 0), 0.0);
        dof_mgr.set_dirichlet(dof_mgr.displacement_dof(1, 1), 0.0);
        dof_mgr.set_dirichlet(dof_mgr.displacement_dof(3, 0), 0.25);

        assert_eq!(dof_mgr.num_constrained_dofs(), 3);
        assert_eq!(dof_mgr.num_free_dofs(), dof_mgr.total_dofs() - 3);
        assert!(dof_mgr.is_dirichlet(2));
        assert!(dof_mgr.is_dirichlet(3));
        assert!(!dof_mgr.is_dirichlet(7));
        assert_eq!(dof_mgr.dirichlet_dofs(), vec![2, 3, 6]);

        let mut x = vec![1.0; dof_mgr.total_dofs()];
        dof_mgr.impose_dirichlet(&mut x);
        assert_eq!(x[2], 0.0);
        assert_eq!(x[6], 0.25);
        assert_eq!(x[0], 1.0);
    }

    #[test]
    fn test_displacement_only_keeps_constraints() {
        let mut dof_mgr = DofManager::new_mixed(3, &[0, 1, 2]);
        dof_mgr.set_dirichlet(0, 0.0);
        dof_mgr.set_dirichlet(1, 0.0);
        // Scalar constraints are not carried over
        dof_mgr.set_dirichlet(dof_mgr.concentration_dof(2).unwrap(), 0.5);

        let sub = dof_mgr.displacement_only();
        assert_eq!(sub.total_dofs(), 6);
        assert_eq!(sub.dirichlet_dofs(), vec![0, 1]);
    }
}
