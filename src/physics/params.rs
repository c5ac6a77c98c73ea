use serde::{Deserialize, Serialize};

/// Physical constants of the elastic-diffusive model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Shear modulus μ
    pub mu: f64,
    /// Gravity magnitude
    pub g0: f64,
    /// Mobility
    pub mob: f64,
    /// Viscosity
    pub visc: f64,
    /// Gradient penalty ε
    pub eps: f64,
    /// Reference concentration
    pub c0: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            mu: 1.0,
            g0: 0.0,
            mob: 1.0,
            visc: 1.0,
            eps: 0.0,
            c0: 0.5,
        }
    }
}
