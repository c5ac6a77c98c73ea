pub mod solver;
pub mod direct;
pub mod banded;
pub mod reorder;
pub mod newton;

pub use solver::{LinearSolver, LinearSolverKind, SolverStats, LinearOperator, SolverUtils};
pub use direct::DirectSolver;
pub use banded::{BandedLu, BandedSolver};
pub use reorder::{bandwidths, reverse_cuthill_mckee, symmetric_pattern};
pub use newton::{newton_solve, NewtonConfig, NewtonStats, NonlinearProblem};
