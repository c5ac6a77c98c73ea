pub mod params;
pub mod kinematics;
pub mod energy;
pub mod forms;
pub mod diagnostics;

pub use params::ModelParams;
pub use kinematics::Deformation;
pub use energy::{energy_density, first_variation, integrate_energy, pressure, second_variation, EnergyBreakdown, EnergyVariation};
pub use forms::{coupling_form, mobility_form, sym, viscous_form, FrozenCoefficients};
pub use diagnostics::{dissipation, Dissipation, StepDiagnostics};
