//! Elastic-diffusive porosity waves in 2-D
//!
//! Mixed finite elements (P2 displacement, P1 concentration, P1 multiplier)
//! on quadratic triangles, advanced by an implicit gradient-flow scheme.

pub mod error;
pub mod config;
pub mod mesh;
pub mod fem;
pub mod state;
pub mod physics;
pub mod linalg;
pub mod timestepping;
pub mod io;
pub mod simulation;

pub use error::{Result, SimError};
pub use config::{BoundaryConfig, DomainConfig, RefineConfig, SimulationConfig, SolverConfig};
pub use mesh::{Diagonal, Mesh, MeshGenerator, RefinedMesh, refine_disc, refine_marked, transfer_state};
pub use fem::{Assembler, DofManager, ElementData, ElementKernel};
pub use state::{MixedSpace, State};
pub use physics::{dissipation, integrate_energy, Deformation, Dissipation, EnergyBreakdown, ModelParams, StepDiagnostics};
pub use linalg::{newton_solve, LinearSolver, LinearSolverKind, NewtonConfig, NewtonStats, NonlinearProblem};
pub use timestepping::{evolve, initial_concentration, initial_energy, project_p1, solve_initial_data};
pub use io::{checkpoint_base, read_state, write_state, DiagnosticsWriter, SimulationRecord};
pub use simulation::{RunSummary, Simulation, SimulationContext};
