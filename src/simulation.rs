//! Simulation context and run driver
//!
//! `SimulationContext` holds everything an operator needs for one mesh:
//! the mixed space with its displacement constraints, precomputed element
//! data, model parameters and solver settings. It is built once per run
//! and passed by reference.
//!
//! `Simulation` owns the context and the configuration and drives the
//! time loop: initial data, warm-up step, then `n_steps` steps of size
//! T / n_steps, each followed by a checkpoint.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use nalgebra::Point2;
use serde::Serialize;
use tracing::info;
use crate::config::{BoundaryConfig, SimulationConfig};
use crate::error::{Result, SimError};
use crate::fem::{apply_displacement_bcs, ElementData, TriangleQuadrature};
use crate::io::{checkpoint_base, read_state, write_state, DiagnosticsWriter};
use crate::linalg::{LinearSolver, LinearSolverKind, NewtonConfig};
use crate::mesh::{assess_mesh_quality, refine_disc, transfer_state, Mesh, MeshGenerator};
use crate::physics::{dissipation, integrate_energy, ModelParams, StepDiagnostics};
use crate::state::{MixedSpace, State};
use crate::timestepping::{evolve, initial_concentration, solve_initial_data, PERTURBATION_CENTER};

/// Immutable per-run data shared by all operators
#[derive(Debug, Clone)]
pub struct SimulationContext {
    /// Mixed space with the displacement constraints registered
    pub space: MixedSpace,
    pub elements: Vec<ElementData>,
    pub params: ModelParams,
    pub newton: NewtonConfig,
    pub linear: LinearSolverKind,
    /// Assemble on the Rayon pool
    pub parallel: bool,
}

impl SimulationContext {
    pub fn new(
        mesh: Arc<Mesh>,
        params: ModelParams,
        boundary: &BoundaryConfig,
        quadrature_degree: usize,
    ) -> Result<Self> {
        let quad = TriangleQuadrature::for_degree(quadrature_degree)?;
        let mut space = MixedSpace::new(Arc::clone(&mesh))?;
        apply_displacement_bcs(&mesh, space.dofs_mut(), boundary);
        let elements = ElementData::build_all(&space, &quad)?;

        Ok(Self {
            space,
            elements,
            params,
            newton: NewtonConfig::default(),
            linear: LinearSolverKind::default(),
            parallel: true,
        })
    }

    /// Context with every setting taken from the configuration
    pub fn from_config(mesh: Arc<Mesh>, config: &SimulationConfig) -> Result<Self> {
        Ok(Self::new(mesh, config.model_params(), &config.boundary, config.quadrature_degree)?
            .with_newton(config.newton_config())
            .with_linear_solver(config.solver.linear)
            .with_parallel(config.solver.parallel))
    }

    pub fn with_newton(mut self, newton: NewtonConfig) -> Self {
        self.newton = newton;
        self
    }

    pub fn with_linear_solver(mut self, linear: LinearSolverKind) -> Self {
        self.linear = linear;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        self.space.mesh()
    }

    /// Fresh instance of the configured linear backend
    pub fn linear_solver(&self) -> Box<dyn LinearSolver> {
        self.linear.build()
    }
}

/// What a finished run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Time of every checkpoint written by this run, in order
    pub times: Vec<f64>,
    /// Per-step diagnostics (empty when disabled)
    pub diagnostics: Vec<StepDiagnostics>,
    pub output_dir: PathBuf,
}

/// Checkpoint to continue from
#[derive(Debug, Clone)]
struct Resume {
    state: State,
    step: usize,
    time: f64,
}

/// Run driver
pub struct Simulation {
    config: SimulationConfig,
    ctx: SimulationContext,
    resume: Option<Resume>,
}

impl Simulation {
    /// Build the mesh (generated or restored) and the simulation context
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        config.log_summary();

        let (ctx, resume) = match &config.restart {
            Some(base) => Self::restore(&config, base)?,
            None => (Self::fresh_context(&config)?, None),
        };

        let quality = assess_mesh_quality(ctx.mesh());
        info!("{}", quality.report());
        if !quality.is_acceptable() {
            return Err(SimError::Mesh(format!(
                "{} inverted or degenerate elements",
                quality.num_inverted
            )));
        }

        info!(
            "Mesh: {} nodes, {} elements, {} DOFs ({} free)",
            ctx.mesh().num_nodes(),
            ctx.mesh().num_elements(),
            ctx.space.total_dofs(),
            ctx.space.dofs().num_free_dofs()
        );

        Ok(Self { config, ctx, resume })
    }

    fn fresh_context(config: &SimulationConfig) -> Result<SimulationContext> {
        let (nx, ny) = config.grid_dimensions();
        let mut mesh = MeshGenerator::rectangle(
            config.domain.lx,
            config.domain.ly,
            nx,
            ny,
            config.mesh_diagonal(),
        );

        if let Some(refine) = &config.refine {
            let [xc, yc] = refine.center.unwrap_or(PERTURBATION_CENTER);
            mesh = refine_disc(&mesh, Point2::new(xc, yc), refine.radius, refine.levels, refine.factor)?.mesh;
            info!("Refined initial mesh around ({}, {}): {} elements", xc, yc, mesh.num_elements());
        }

        SimulationContext::from_config(Arc::new(mesh), config)
    }

    fn restore(config: &SimulationConfig, base: &std::path::Path) -> Result<(SimulationContext, Option<Resume>)> {
        let record = read_state(base)?;
        info!(
            "Restarting from {} (step {}, t = {:.6e})",
            base.display(),
            record.step,
            record.time
        );
        if record.step >= config.n_steps {
            return Err(SimError::Config(format!(
                "checkpoint step {} is already at or beyond n_steps = {}",
                record.step, config.n_steps
            )));
        }

        let (mesh, state) = match &config.refine {
            Some(refine) => {
                let center = match refine.center {
                    Some([x, y]) => Point2::new(x, y),
                    None => concentration_peak(&record.space, &record.state),
                };
                let refined = refine_disc(record.mesh(), center, refine.radius, refine.levels, refine.factor)?;
                let mesh = Arc::new(refined.mesh.clone());
                let new_space = MixedSpace::new(Arc::clone(&mesh))?;
                let state = transfer_state(&record.space, &record.state, &refined, &new_space)?;
                info!("Refined restored mesh: {} elements", mesh.num_elements());
                (mesh, state)
            }
            None => (Arc::clone(record.mesh()), record.state),
        };

        let ctx = SimulationContext::from_config(mesh, config)?;
        let resume = Resume {
            state,
            step: record.step,
            time: record.time,
        };
        Ok((ctx, Some(resume)))
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Number of steps this run will take
    pub fn remaining_steps(&self) -> usize {
        let start = self.resume.as_ref().map_or(0, |r| r.step);
        self.config.n_steps - start
    }

    fn checkpoint(&self, step: usize) -> PathBuf {
        checkpoint_base(
            &self.config.fout,
            &self.config.prefix,
            self.config.k,
            self.config.n_steps,
            step,
        )
    }

    /// Run to T, calling `on_step(step, time)` after every checkpoint
    pub fn run<F>(&mut self, mut on_step: F) -> Result<RunSummary>
    where
        F: FnMut(usize, f64),
    {
        let config = &self.config;
        let ctx = &self.ctx;
        let tau = config.tau();

        fs::create_dir_all(&config.fout).map_err(|e| SimError::io(&config.fout, e))?;
        let mut summary = RunSummary {
            output_dir: config.fout.clone(),
            ..RunSummary::default()
        };

        let csv_path = config.fout.join(format!("{}_diagnostics.csv", config.basename));
        let mut history = match (config.diagnostics, self.resume.is_some()) {
            (false, _) => None,
            (true, false) => Some(DiagnosticsWriter::create(&csv_path)?),
            (true, true) => Some(DiagnosticsWriter::append(&csv_path)?),
        };

        let (mut old_state, start, mut time) = match self.resume.take() {
            Some(r) => (r.state, r.step, r.time),
            None => {
                let c_init = initial_concentration(ctx, config.c0, config.mag, config.alpha)?;
                let (u_init, _) = solve_initial_data(ctx, &c_init)?;
                let eta = vec![0.0; c_init.len()];
                let initial = State::from_parts(&ctx.space, &u_init, &c_init, &eta)?;

                // Warm-up step; time stays at zero
                let (state, stats) = evolve(ctx, &initial, config.dt0)?;
                info!("Warm-up step (dt0 = {:.3e}): {} Newton iterations", config.dt0, stats.iterations);

                write_state(&self.checkpoint(0), ctx.mesh(), &state, 0, 0.0)?;
                summary.times.push(0.0);
                on_step(0, 0.0);
                (state, 0, 0.0)
            }
        };

        info!("Running steps {}..{} with tau = {:.6e}", start + 1, config.n_steps, tau);

        for i in start..config.n_steps {
            let (state, stats) = evolve(ctx, &old_state, tau)?;
            time += tau;
            let step = i + 1;
            write_state(&self.checkpoint(step), ctx.mesh(), &state, step, time)?;
            summary.times.push(time);

            if let Some(history) = history.as_mut() {
                let diag = StepDiagnostics {
                    step,
                    time,
                    dissipation: dissipation(ctx, &state, &old_state, tau)?,
                    energy: integrate_energy(ctx, &state)?,
                    newton_iterations: stats.iterations,
                };
                info!(
                    "Step {}/{}: t = {:.6e}, E = {:.6e}, D = {:.3e} + {:.3e}, {} Newton iterations",
                    step,
                    config.n_steps,
                    time,
                    diag.energy.total(),
                    diag.dissipation.viscous,
                    diag.dissipation.mobility,
                    stats.iterations
                );
                history.write(&diag)?;
                summary.diagnostics.push(diag);
            } else {
                info!(
                    "Step {}/{}: t = {:.6e}, {} Newton iterations",
                    step, config.n_steps, time, stats.iterations
                );
            }

            on_step(step, time);
            old_state = state;
        }

        info!("Run complete: {} checkpoints in {}", summary.times.len(), config.fout.display());
        Ok(summary)
    }
}

/// Corner node with the largest concentration
pub fn concentration_peak(space: &MixedSpace, state: &State) -> Point2<f64> {
    let mesh = space.mesh();
    mesh.connectivity
        .corner_nodes()
        .into_iter()
        .filter_map(|node| state.concentration(space, node).map(|c| (node, c)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(Point2::new(PERTURBATION_CENTER[0], PERTURBATION_CENTER[1]), |(node, _)| {
            mesh.geometry.nodes[node]
        })
}
