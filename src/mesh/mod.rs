pub mod topology;
pub mod geometry;
pub mod generator;
pub mod quality;
pub mod refine;

pub use topology::{Connectivity, Tri6Element};
pub use geometry::{Geometry, Mesh};
pub use generator::{Diagonal, MeshGenerator, Tri6Builder};
pub use quality::{assess_mesh_quality, min_angle, signed_area, MeshQuality};
pub use refine::{refine_disc, refine_marked, transfer_state, RefinedMesh};
