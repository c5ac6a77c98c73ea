//! Local refinement by longest-edge bisection and transfer of fields onto
//! the refined mesh
//!
//! Refinement never mutates its input: it returns a new mesh plus, for
//! every new cell, the index of the input cell that contains it. Because
//! the refined mesh is nested in the input mesh, P2/P1 fields are carried
//! over exactly by evaluating them inside the ancestor cell.

use std::collections::{HashMap, HashSet};
use nalgebra::Point2;
use tracing::debug;
use super::generator::Tri6Builder;
use super::geometry::Mesh;
use crate::error::{Result, SimError};
use crate::fem::{P1Basis, Tri6Basis, TriangleMap};
use crate::state::{MixedSpace, State};

type Edge = (usize, usize);

fn edge_key(a: usize, b: usize) -> Edge {
    if a < b { (a, b) } else { (b, a) }
}

/// Refined mesh together with its cell ancestry
#[derive(Debug, Clone)]
pub struct RefinedMesh {
    pub mesh: Mesh,
    /// `ancestor[new_cell]` = cell of the input mesh containing `new_cell`
    pub ancestor: Vec<usize>,
}

/// Vertex-only working copy of a triangulation
struct Triangulation {
    points: Vec<Point2<f64>>,
    cells: Vec<[usize; 3]>,
}

impl Triangulation {
    fn from_mesh(mesh: &Mesh) -> Self {
        let mut index = HashMap::new();
        let mut points = Vec::new();
        let mut cells = Vec::with_capacity(mesh.num_elements());

        for elem in mesh.elements() {
            let mut cell = [0usize; 3];
            for (i, &node) in elem.vertices().iter().enumerate() {
                cell[i] = *index.entry(node).or_insert_with(|| {
                    points.push(mesh.geometry.nodes[node]);
                    points.len() - 1
                });
            }
            cells.push(cell);
        }

        Self { points, cells }
    }

    fn length2(&self, (a, b): Edge) -> f64 {
        (self.points[a] - self.points[b]).norm_squared()
    }

    /// Longest edge of a cell, first one in local order on ties
    fn longest_edge(&self, cell: &[usize; 3]) -> Edge {
        let mut best = edge_key(cell[0], cell[1]);
        let mut best_len = self.length2(best);
        for (i, j) in [(1, 2), (2, 0)] {
            let e = edge_key(cell[i], cell[j]);
            let len = self.length2(e);
            if len > best_len * (1.0 + 1e-12) {
                best = e;
                best_len = len;
            }
        }
        best
    }

    fn into_mesh(self) -> Mesh {
        let mut builder = Tri6Builder::new();
        for p in &self.points {
            builder.add_vertex(p.x, p.y);
        }
        for [a, b, c] in self.cells {
            builder.add_triangle(a, b, c);
        }
        builder.finish()
    }
}

/// Bisect `cell` recursively across every marked edge it contains
///
/// The longest marked edge is split first. Children of a counter-clockwise
/// cell stay counter-clockwise.
fn split_cell(
    tri: &Triangulation,
    cell: [usize; 3],
    midpoints: &HashMap<Edge, usize>,
    out: &mut Vec<[usize; 3]>,
) {
    let mut target: Option<(usize, f64)> = None;
    for i in 0..3 {
        let e = edge_key(cell[i], cell[(i + 1) % 3]);
        if midpoints.contains_key(&e) {
            let len = tri.length2(e);
            if target.map_or(true, |(_, best)| len > best * (1.0 + 1e-12)) {
                target = Some((i, len));
            }
        }
    }

    match target {
        None => out.push(cell),
        Some((i, _)) => {
            let p = cell[i];
            let q = cell[(i + 1) % 3];
            let r = cell[(i + 2) % 3];
            let s = midpoints[&edge_key(p, q)];
            split_cell(tri, [p, s, r], midpoints, out);
            split_cell(tri, [s, q, r], midpoints, out);
        }
    }
}

/// Refine the marked cells (and whatever the closure requires)
///
/// Each marked cell gets its longest edge marked. Any cell with a marked
/// edge then marks its own longest edge, until nothing changes. Every
/// marked edge is bisected, so the result is conforming.
pub fn refine_marked(mesh: &Mesh, marked: &[bool]) -> Result<RefinedMesh> {
    if marked.len() != mesh.num_elements() {
        return Err(SimError::Dimension {
            expected: mesh.num_elements(),
            actual: marked.len(),
        });
    }

    let mut tri = Triangulation::from_mesh(mesh);

    let mut marked_edges: HashSet<Edge> = tri
        .cells
        .iter()
        .zip(marked)
        .filter(|(_, m)| **m)
        .map(|(cell, _)| tri.longest_edge(cell))
        .collect();

    loop {
        let mut changed = false;
        for cell in &tri.cells {
            let has_marked = (0..3).any(|i| marked_edges.contains(&edge_key(cell[i], cell[(i + 1) % 3])));
            if has_marked && marked_edges.insert(tri.longest_edge(cell)) {
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut edges: Vec<Edge> = marked_edges.into_iter().collect();
    edges.sort_unstable();

    let mut midpoints = HashMap::with_capacity(edges.len());
    for (a, b) in edges {
        let pa = tri.points[a];
        let pb = tri.points[b];
        tri.points.push(Point2::new(0.5 * (pa.x + pb.x), 0.5 * (pa.y + pb.y)));
        midpoints.insert((a, b), tri.points.len() - 1);
    }

    let mut cells = Vec::with_capacity(tri.cells.len() + 2 * midpoints.len());
    let mut ancestor = Vec::with_capacity(cells.capacity());
    for (parent, &cell) in tri.cells.iter().enumerate() {
        let before = cells.len();
        split_cell(&tri, cell, &midpoints, &mut cells);
        ancestor.extend(std::iter::repeat(parent).take(cells.len() - before));
    }
    tri.cells = cells;

    let refined = tri.into_mesh();
    refined.validate()?;

    debug!(
        "Refined {} -> {} cells ({} edges bisected)",
        mesh.num_elements(),
        refined.num_elements(),
        midpoints.len()
    );

    Ok(RefinedMesh {
        mesh: refined,
        ancestor,
    })
}

/// Repeatedly refine the cells whose centroid lies inside a shrinking disc
///
/// Level `l` uses radius `radius * factor^l`. Ancestors refer to the input
/// mesh.
pub fn refine_disc(
    mesh: &Mesh,
    center: Point2<f64>,
    radius: f64,
    levels: usize,
    factor: f64,
) -> Result<RefinedMesh> {
    let mut current = RefinedMesh {
        mesh: mesh.clone(),
        ancestor: (0..mesh.num_elements()).collect(),
    };
    let mut r = radius;

    for _ in 0..levels {
        let marked: Vec<bool> = current
            .mesh
            .elements()
            .iter()
            .map(|e| (current.mesh.centroid(e) - center).norm() < r)
            .collect();

        if marked.iter().any(|&m| m) {
            let next = refine_marked(&current.mesh, &marked)?;
            let ancestor = next.ancestor.iter().map(|&p| current.ancestor[p]).collect();
            current = RefinedMesh {
                mesh: next.mesh,
                ancestor,
            };
        }
        r *= factor;
    }

    Ok(current)
}

/// Carry a state over to a refined mesh
///
/// The displacement is evaluated with the P2 basis of the ancestor cell,
/// the concentration and multiplier with its P1 basis.
pub fn transfer_state(
    old_space: &MixedSpace,
    old_state: &State,
    refined: &RefinedMesh,
    new_space: &MixedSpace,
) -> Result<State> {
    if old_state.len() != old_space.total_dofs() {
        return Err(SimError::Dimension {
            expected: old_space.total_dofs(),
            actual: old_state.len(),
        });
    }

    let old_mesh = old_space.mesh();
    let new_mesh = new_space.mesh();
    let new_dofs = new_space.dofs();
    let mut values = vec![0.0; new_space.total_dofs()];

    for (e, elem) in new_mesh.elements().iter().enumerate() {
        let parent_id = *refined.ancestor.get(e).ok_or_else(|| {
            SimError::Mesh(format!("refined cell {} has no ancestor", e))
        })?;
        let parent = old_mesh.elements().get(parent_id).ok_or_else(|| {
            SimError::Mesh(format!("ancestor {} is not a cell of the old mesh", parent_id))
        })?;
        let map = TriangleMap::new(old_mesh.vertex_coords(parent))?;

        let u_old: Vec<[f64; 2]> = parent
            .nodes
            .iter()
            .map(|&n| {
                let u = old_state.displacement(old_space, n);
                [u.x, u.y]
            })
            .collect();
        let mut c_old = [0.0; 3];
        let mut eta_old = [0.0; 3];
        for (i, &v) in parent.vertices().iter().enumerate() {
            c_old[i] = old_state.concentration(old_space, v).unwrap_or(0.0);
            eta_old[i] = old_state.multiplier(old_space, v).unwrap_or(0.0);
        }

        for (a, &node) in elem.nodes.iter().enumerate() {
            let l = map.barycentric(&new_mesh.geometry.nodes[node]);

            let n2 = Tri6Basis::shape_functions(&l);
            for k in 0..2 {
                values[new_dofs.displacement_dof(node, k)] =
                    (0..6).map(|b| n2[b] * u_old[b][k]).sum();
            }

            if a < 3 {
                let n1 = P1Basis::shape_functions(&l);
                let c: f64 = (0..3).map(|i| n1[i] * c_old[i]).sum();
                let eta: f64 = (0..3).map(|i| n1[i] * eta_old[i]).sum();
                if let (Some(dc), Some(de)) = (new_dofs.concentration_dof(node), new_dofs.multiplier_dof(node)) {
                    values[dc] = c;
                    values[de] = eta;
                }
            }
        }
    }

    debug!(
        "Transferred state: {} -> {} DOFs",
        old_space.total_dofs(),
        new_dofs.total_dofs()
    );

    State::from_values(new_space, values)
}
