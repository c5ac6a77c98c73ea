//! Time stepping for the coupled elastic-diffusive system
//!
//! - `evolve`: one semi-implicit step of the full mixed system
//! - `initial`: equilibrium displacement for the initial concentration
//! - `projection`: P1 projection of the initial concentration profile

pub mod evolve;
pub mod initial;
pub mod projection;

pub use evolve::{evolve, EvolveProblem};
pub use initial::{initial_energy, solve_initial_data, InitialProblem};
pub use projection::{initial_concentration, project_p1, PERTURBATION_CENTER};
