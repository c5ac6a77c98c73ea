mod common;

use porosity_wave::{checkpoint_base, read_state, LinearSolverKind, RefineConfig, Simulation};

/// k = 2 gives a 2 x 4 grid of two triangles per cell
const COARSE_ELEMENTS: usize = 16;

fn refine() -> RefineConfig {
    RefineConfig {
        center: None,
        radius: 0.4,
        levels: 2,
        factor: 0.8,
    }
}

#[test]
fn test_fresh_run_on_refined_mesh() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::perturbed_config(dir.path(), 2, 2e-3);
    config.refine = Some(refine());

    let mut sim = Simulation::new(config).unwrap();
    let n_elements = sim.context().mesh().num_elements();
    assert!(n_elements > COARSE_ELEMENTS);

    let summary = sim.run(|_, _| {}).unwrap();
    assert_eq!(summary.times.len(), 3);

    let last = read_state(&checkpoint_base(dir.path(), "stateP1", 2, 2, 2)).unwrap();
    assert_eq!(last.mesh().num_elements(), n_elements);
    assert!(last.state.values().iter().all(|v| v.is_finite()));
}

#[test]
fn test_restart_refines_the_restored_mesh() {
    let full_dir = tempfile::tempdir().unwrap();
    let mut full = Simulation::new(common::perturbed_config(full_dir.path(), 2, 2e-3)).unwrap();
    let full_summary = full.run(|_, _| {}).unwrap();

    let restart_dir = tempfile::tempdir().unwrap();
    let mut config = common::perturbed_config(restart_dir.path(), 2, 2e-3);
    config.restart = Some(checkpoint_base(full_dir.path(), "stateP1", 2, 2, 1));
    config.refine = Some(refine());
    config.solver.linear = LinearSolverKind::Banded;

    let mut resumed = Simulation::new(config).unwrap();
    assert!(resumed.context().mesh().num_elements() > COARSE_ELEMENTS);
    assert_eq!(resumed.remaining_steps(), 1);

    let summary = resumed.run(|_, _| {}).unwrap();
    assert_eq!(summary.times.len(), 1);
    assert_eq!(summary.times[0].to_bits(), full_summary.times[2].to_bits());

    let last = read_state(&checkpoint_base(restart_dir.path(), "stateP1", 2, 2, 2)).unwrap();
    assert_eq!(last.step, 2);
    assert!(last.mesh().num_elements() > COARSE_ELEMENTS);
    assert!(last.state.values().iter().all(|v| v.is_finite()));
}
