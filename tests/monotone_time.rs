mod common;

use porosity_wave::{checkpoint_base, read_state, Simulation};
use approx::assert_relative_eq;

#[test]
fn test_checkpoint_times_advance_by_tau() {
    let dir = tempfile::tempdir().unwrap();
    let n_steps = 3;
    let total_time = 3e-3;
    let mut sim = Simulation::new(common::perturbed_config(dir.path(), n_steps, total_time)).unwrap();
    let summary = sim.run(|_, _| {}).unwrap();

    let tau = total_time / n_steps as f64;
    assert_eq!(summary.times.len(), n_steps + 1);
    // The warm-up step does not advance time
    assert_eq!(summary.times[0], 0.0);
    for (i, &t) in summary.times.iter().enumerate() {
        assert_relative_eq!(t, i as f64 * tau, epsilon = 1e-15);
    }

    for i in 0..=n_steps {
        let record = read_state(&checkpoint_base(dir.path(), "stateP1", 2, n_steps, i)).unwrap();
        assert_eq!(record.step, i);
        assert_eq!(record.time.to_bits(), summary.times[i].to_bits());
    }

    let steps: Vec<usize> = summary.diagnostics.iter().map(|d| d.step).collect();
    assert_eq!(steps, vec![1, 2, 3]);
    assert!(summary
        .diagnostics
        .windows(2)
        .all(|w| w[1].time > w[0].time));
}
