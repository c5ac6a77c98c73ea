//! Displacement boundary conditions on the rectangular domain
//!
//! - bottom and top walls: u = (0, 0)
//! - left and right walls: u_x = 0, u_y free
//!
//! Each wall can be switched off individually from the configuration.

use nalgebra::Point2;
use crate::config::BoundaryConfig;
use crate::fem::DofManager;
use crate::mesh::Mesh;

/// Boundary node sets for a rectangular domain
///
/// Walls are located from the mesh bounding box, so refined or restored
/// meshes are handled the same way as freshly generated ones.
#[derive(Debug, Clone)]
pub struct BoundaryNodes {
    pub left: Vec<usize>,   // x = x_min
    pub right: Vec<usize>,  // x = x_max
    pub bottom: Vec<usize>, // y = y_min
    pub top: Vec<usize>,    // y = y_max
}

impl BoundaryNodes {
    /// Identify all boundary nodes within `tol` of each wall
    pub fn identify(mesh: &Mesh, tol: f64) -> Self {
        let (lo, hi) = mesh.geometry.bounding_box();

        BoundaryNodes {
            left: find_boundary_nodes(mesh, |p| (p.x - lo.x).abs() < tol),
            right: find_boundary_nodes(mesh, |p| (p.x - hi.x).abs() < tol),
            bottom: find_boundary_nodes(mesh, |p| (p.y - lo.y).abs() < tol),
            top: find_boundary_nodes(mesh, |p| (p.y - hi.y).abs() < tol),
        }
    }
}

/// Register the displacement constraints selected in `config` with the DOF manager
pub fn apply_displacement_bcs(mesh: &Mesh, dof_mgr: &mut DofManager, config: &BoundaryConfig) {
    let nodes = BoundaryNodes::identify(mesh, config.tolerance);

    if config.bottom {
        fix_components(dof_mgr, &nodes.bottom, &[0, 1]);
    }
    if config.top {
        fix_components(dof_mgr, &nodes.top, &[0, 1]);
    }
    if config.left {
        fix_components(dof_mgr, &nodes.left, &[0]);
    }
    if config.right {
        fix_components(dof_mgr, &nodes.right, &[0]);
    }
}

fn fix_components(dof_mgr: &mut DofManager, nodes: &[usize], components: &[usize]) {
    for &node_id in nodes {
        for &comp in components {
            dof_mgr.set_dirichlet(dof_mgr.displacement_dof(node_id, comp), 0.0);
        }
    }
}

/// Find nodes matching a predicate
pub fn find_boundary_nodes<F>(mesh: &Mesh, predicate: F) -> Vec<usize>
where
    F: Fn(&Point2<f64>) -> bool,
{
    (0..mesh.geometry.nodes.len())
        .filter(|&i| predicate(&mesh.geometry.nodes[i]))
        .collect()
}
