mod common;

use porosity_wave::{checkpoint_base, read_state, write_state, Simulation};

#[test]
fn test_write_then_read_is_identity() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = Simulation::new(common::perturbed_config(dir.path(), 1, 1e-3)).unwrap();
    sim.run(|_, _| {}).unwrap();

    let base = checkpoint_base(dir.path(), "stateP1", 2, 1, 1);
    let record = read_state(&base).unwrap();

    let copy = dir.path().join("copy");
    write_state(&copy, record.mesh(), &record.state, record.step, record.time).unwrap();
    let again = read_state(&copy).unwrap();

    assert_eq!(again.mesh().as_ref(), record.mesh().as_ref());
    assert_eq!(again.step, record.step);
    assert_eq!(again.time.to_bits(), record.time.to_bits());
    let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(again.state.values()), bits(record.state.values()));
}

#[test]
fn test_restart_continues_the_run() {
    let full_dir = tempfile::tempdir().unwrap();
    let mut full = Simulation::new(common::perturbed_config(full_dir.path(), 2, 2e-3)).unwrap();
    let full_summary = full.run(|_, _| {}).unwrap();

    let restart_dir = tempfile::tempdir().unwrap();
    let mut config = common::perturbed_config(restart_dir.path(), 2, 2e-3);
    config.restart = Some(checkpoint_base(full_dir.path(), "stateP1", 2, 2, 1));
    let mut resumed = Simulation::new(config).unwrap();
    assert_eq!(resumed.remaining_steps(), 1);

    let mut steps = Vec::new();
    let summary = resumed.run(|step, _| steps.push(step)).unwrap();
    assert_eq!(steps, vec![2]);
    assert_eq!(summary.times.len(), 1);
    assert_eq!(summary.times[0].to_bits(), full_summary.times[2].to_bits());

    let expected = read_state(&checkpoint_base(full_dir.path(), "stateP1", 2, 2, 2)).unwrap();
    let actual = read_state(&checkpoint_base(restart_dir.path(), "stateP1", 2, 2, 2)).unwrap();
    assert_eq!(actual.step, 2);
    assert!(actual.state.max_abs_difference(&expected.state) < 1e-12);
}

#[test]
fn test_restart_past_the_end_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = Simulation::new(common::perturbed_config(dir.path(), 1, 1e-3)).unwrap();
    sim.run(|_, _| {}).unwrap();

    let mut config = common::perturbed_config(dir.path(), 1, 1e-3);
    config.restart = Some(checkpoint_base(dir.path(), "stateP1", 2, 1, 1));
    assert!(Simulation::new(config).is_err());
}
