//! Configuration management for porosity-wave simulations
//!
//! Reads JSON (or TOML, by extension) parameter files. The physical keys
//! use the Greek names of the model (`μ`, `ε`, `α`); ASCII aliases
//! (`mu`, `eps`, `alpha`) are accepted on input.

use std::fs;
use std::path::{Path, PathBuf};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;
use crate::error::{Result, SimError};
use crate::linalg::{LinearSolverKind, NewtonConfig};
use crate::mesh::Diagonal;
use crate::physics::ModelParams;

/// Main simulation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Shear modulus
    #[serde(rename = "μ", alias = "mu")]
    pub mu: f64,
    /// Gravity magnitude
    pub g0: f64,
    /// Mobility
    pub mob: f64,
    /// Viscosity
    pub visc: f64,
    /// Gradient penalty
    #[serde(rename = "ε", alias = "eps")]
    pub eps: f64,
    /// Reference concentration
    pub c0: f64,
    /// Amplitude of the initial Gaussian perturbation
    pub mag: f64,
    /// Decay rate of the initial Gaussian perturbation
    #[serde(rename = "α", alias = "alpha")]
    pub alpha: f64,

    /// Mesh resolution: k x 2k cells
    #[serde(deserialize_with = "de_count")]
    pub k: usize,
    #[serde(deserialize_with = "de_count")]
    pub n_steps: usize,
    /// Total simulated time
    #[serde(rename = "T")]
    pub total_time: f64,
    /// Output directory
    pub fout: PathBuf,
    /// Structured (left/right diagonals) or crossed mesh
    #[serde(rename = "STRUCTURED")]
    pub structured: bool,

    #[serde(default = "default_basename")]
    pub basename: String,
    /// Checkpoint file prefix
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Size of the warm-up step taken before step 0 is written
    #[serde(default = "default_dt0")]
    pub dt0: f64,
    #[serde(default)]
    pub domain: DomainConfig,
    /// Diagonal pattern of structured meshes
    #[serde(default)]
    pub diagonal: Diagonal,
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default = "default_quadrature_degree")]
    pub quadrature_degree: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refine: Option<RefineConfig>,
    /// Checkpoint base name to restart from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<PathBuf>,
    /// Compute energy and dissipation after every step
    #[serde(default = "default_true")]
    pub diagnostics: bool,
}

fn default_basename() -> String { "porosity_wave".to_string() }
fn default_prefix() -> String { "stateP1".to_string() }
fn default_dt0() -> f64 { 5e-4 }
fn default_quadrature_degree() -> usize { 5 }
fn default_true() -> bool { true }

/// Counts may be written as integers or as integral floats (`8` or `8.0`)
fn de_count<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Int(u64),
        Float(f64),
    }

    match Count::deserialize(deserializer)? {
        Count::Int(n) => Ok(n as usize),
        Count::Float(x) if x >= 0.0 && x.fract() == 0.0 => Ok(x as usize),
        Count::Float(x) => Err(D::Error::custom(format!("expected a non-negative integer, got {}", x))),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Domain length in x
    pub lx: f64,
    /// Domain length in y
    pub ly: f64,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self { lx: 1.0, ly: 2.0 }
    }
}

/// Which walls carry displacement constraints
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// u = 0 on y = y_min
    pub bottom: bool,
    /// u = 0 on y = y_max
    pub top: bool,
    /// u_x = 0 on x = x_min
    pub left: bool,
    /// u_x = 0 on x = x_max
    pub right: bool,
    /// Distance within which a node counts as on a wall
    pub tolerance: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            bottom: true,
            top: true,
            left: true,
            right: true,
            tolerance: 1e-3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    pub linear: LinearSolverKind,
    pub abs_tolerance: f64,
    pub rel_tolerance: f64,
    pub max_iterations: usize,
    pub relaxation: f64,
    pub line_search: bool,
    /// Assemble element contributions on the Rayon pool
    pub parallel: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let newton = NewtonConfig::default();
        Self {
            linear: LinearSolverKind::default(),
            abs_tolerance: newton.abs_tolerance,
            rel_tolerance: newton.rel_tolerance,
            max_iterations: newton.max_iterations,
            relaxation: newton.relaxation,
            line_search: newton.line_search,
            parallel: true,
        }
    }
}

/// Local refinement around a point
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Centre of the refined disc; the peak of the concentration when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,
    /// Radius of the first refinement level
    pub radius: f64,
    pub levels: usize,
    /// Radius shrink factor per level
    pub factor: f64,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            center: None,
            radius: 0.5,
            levels: 4,
            factor: 0.8,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a JSON or TOML (`.toml`) file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| SimError::io(path, e))?;

        let is_toml = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"));
        let config = if is_toml {
            Self::from_toml(&contents)?
        } else {
            Self::from_json(&contents)?
        };

        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents)
            .map_err(|e| SimError::Config(format!("failed to parse parameters: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| SimError::Config(format!("failed to parse parameters: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty JSON with 4-space indentation
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::io::write_json(path.as_ref(), self)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(SimError::Config(msg));

        for (name, v) in [
            ("μ", self.mu),
            ("g0", self.g0),
            ("mob", self.mob),
            ("visc", self.visc),
            ("ε", self.eps),
            ("c0", self.c0),
            ("mag", self.mag),
            ("α", self.alpha),
        ] {
            if !v.is_finite() {
                return fail(format!("parameter '{}' must be finite, got {}", name, v));
            }
        }
        for (name, v) in [("mob", self.mob), ("visc", self.visc), ("ε", self.eps)] {
            if v < 0.0 {
                return fail(format!("parameter '{}' must be non-negative, got {}", name, v));
            }
        }
        if self.k == 0 {
            return fail("'k' must be at least 1".to_string());
        }
        if self.n_steps == 0 {
            return fail("'n_steps' must be at least 1".to_string());
        }
        if !(self.total_time > 0.0) || !self.total_time.is_finite() {
            return fail(format!("'T' must be positive, got {}", self.total_time));
        }
        if !(self.dt0 > 0.0) {
            return fail(format!("'dt0' must be positive, got {}", self.dt0));
        }
        if !(self.domain.lx > 0.0 && self.domain.ly > 0.0) {
            return fail(format!(
                "domain must have positive size, got {} x {}",
                self.domain.lx, self.domain.ly
            ));
        }
        if self.quadrature_degree > 5 {
            return fail(format!(
                "quadrature degree {} not supported (max 5)",
                self.quadrature_degree
            ));
        }

        let s = &self.solver;
        if !(s.abs_tolerance > 0.0) || !(s.rel_tolerance >= 0.0) {
            return fail("solver tolerances must be positive".to_string());
        }
        if s.max_iterations == 0 {
            return fail("solver.max_iterations must be at least 1".to_string());
        }
        if !(s.relaxation > 0.0 && s.relaxation <= 1.0) {
            return fail(format!("solver.relaxation must be in (0, 1], got {}", s.relaxation));
        }

        if let Some(r) = &self.refine {
            if !(r.radius > 0.0) || !(r.factor > 0.0 && r.factor <= 1.0) {
                return fail("refine.radius must be positive and refine.factor in (0, 1]".to_string());
            }
        }

        Ok(())
    }

    pub fn model_params(&self) -> ModelParams {
        ModelParams {
            mu: self.mu,
            g0: self.g0,
            mob: self.mob,
            visc: self.visc,
            eps: self.eps,
            c0: self.c0,
        }
    }

    pub fn newton_config(&self) -> NewtonConfig {
        NewtonConfig {
            max_iterations: self.solver.max_iterations,
            abs_tolerance: self.solver.abs_tolerance,
            rel_tolerance: self.solver.rel_tolerance,
            relaxation: self.solver.relaxation,
            line_search: self.solver.line_search,
            ..NewtonConfig::default()
        }
    }

    /// Main time step T / n_steps
    pub fn tau(&self) -> f64 {
        self.total_time / self.n_steps as f64
    }

    /// Cell counts (nx, ny) = (k, 2k)
    pub fn grid_dimensions(&self) -> (usize, usize) {
        (self.k, 2 * self.k)
    }

    /// Diagonal pattern actually used for the mesh
    pub fn mesh_diagonal(&self) -> Diagonal {
        if self.structured {
            self.diagonal
        } else {
            Diagonal::Crossed
        }
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        let (nx, ny) = self.grid_dimensions();
        info!("Simulation '{}'", self.basename);
        info!(
            "  Model: μ = {}, g0 = {}, mob = {}, visc = {}, ε = {}, c0 = {}",
            self.mu, self.g0, self.mob, self.visc, self.eps, self.c0
        );
        info!("  Initial perturbation: mag = {}, α = {}", self.mag, self.alpha);
        info!(
            "  Mesh: {} x {} cells on [0, {}] x [0, {}] ({:?})",
            nx, ny, self.domain.lx, self.domain.ly, self.mesh_diagonal()
        );
        info!(
            "  Time: T = {}, n_steps = {}, tau = {:.3e}, dt0 = {:.3e}",
            self.total_time, self.n_steps, self.tau(), self.dt0
        );
        info!(
            "  Solver: {:?}, abs tol = {:.1e}, rel tol = {:.1e}, max iter = {}",
            self.solver.linear, self.solver.abs_tolerance, self.solver.rel_tolerance, self.solver.max_iterations
        );
        info!("  Output: {}", self.fout.display());
        if let Some(restart) = &self.restart {
            info!("  Restart from: {}", restart.display());
        }
    }
}
