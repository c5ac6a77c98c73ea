pub mod basis;
pub mod quadrature;
pub mod dof;
pub mod element;
pub mod assembly;
pub mod boundary;

pub use basis::{P1Basis, Tri6Basis, TriangleMap};
pub use quadrature::TriangleQuadrature;
pub use dof::DofManager;
pub use element::{ElementData, MixedShape, QuadPoint, ScalarSample, VectorSample, LOCAL_DISP, LOCAL_MIXED, C_OFFSET, ETA_OFFSET};
pub use assembly::{finite_difference_tangent, Assembler, ElementKernel};
pub use boundary::{apply_displacement_bcs, find_boundary_nodes, BoundaryNodes};
