#![allow(dead_code)]

use std::path::Path;
use porosity_wave::SimulationConfig;
use serde_json::json;

/// μ=1, g0=0, mob=0, visc=1, ε=0, c0=0.5, mag=0, α=1, k=4, n_steps=1, T=1e-3
pub fn steady_config(fout: &Path) -> SimulationConfig {
    let pars = json!({
        "μ": 1.0, "g0": 0.0, "mob": 0.0, "visc": 1.0, "ε": 0.0,
        "c0": 0.5, "mag": 0.0, "α": 1.0,
        "k": 4, "n_steps": 1, "T": 1e-3,
        "fout": fout, "STRUCTURED": true
    });
    SimulationConfig::from_json(&pars.to_string()).unwrap()
}

/// Small run with a Gaussian bump in the concentration
pub fn perturbed_config(fout: &Path, n_steps: usize, total_time: f64) -> SimulationConfig {
    let pars = json!({
        "mu": 1.0, "g0": 0.5, "mob": 1.0, "visc": 1.0, "eps": 0.01,
        "c0": 0.5, "mag": 0.05, "alpha": 10.0,
        "k": 2, "n_steps": n_steps, "T": total_time,
        "fout": fout, "STRUCTURED": true,
        "dt0": 1e-4
    });
    SimulationConfig::from_json(&pars.to_string()).unwrap()
}
