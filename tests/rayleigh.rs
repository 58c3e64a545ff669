use dsmcsim::error::Result;
use dsmcsim::{run, Execution, SimulationConfig};

/// Single cell next to a wall sliding at uw = 1: every thermal re-emission
/// carries the wall drift, so the slab mean v_y climbs from ~0 toward uw.
#[test]
fn wall_drift_is_picked_up_monotonically() -> Result<()> {
    let cfg = SimulationConfig {
        n_cell: 1,
        n_particles: 1000,
        n_sim: 1,
        n_t: 5,
        uw: 1.0,
        tw: 1.0,
        ..SimulationConfig::default()
    };
    let res = run(&cfg)?;
    let row = res.row(0);
    assert_eq!(row.len(), 5);
    assert!(res.aborted().is_empty());

    assert!(
        row[0].abs() < 0.3,
        "first step should be near 0, got {}",
        row[0]
    );
    for w in row.windows(2) {
        assert!(w[1] > w[0], "slab mean v_y should increase: {row:?}");
    }
    assert!(row[4] - row[0] > 0.1, "expected a clear trend: {row:?}");
    assert!(
        row.iter().all(|&v| v < cfg.uw),
        "cannot overshoot uw: {row:?}"
    );
    Ok(())
}

/// Longer run on a few cells: the normalized wall velocity ends well above
/// its start and collisions happen every step.
#[test]
fn normalized_curve_rises_with_collisions() -> Result<()> {
    let cfg = SimulationConfig {
        n_particles: 4_000,
        n_cell: 10,
        n_sim: 2,
        n_t: 40,
        uw: 0.5,
        ..SimulationConfig::default()
    };
    let res = run(&cfg)?;
    let curve = res.normalized_mean(cfg.uw);
    assert_eq!(curve.len(), 40);
    let head: f64 = curve[..5].iter().sum::<f64>() / 5.0;
    let tail: f64 = curve[35..].iter().sum::<f64>() / 5.0;
    assert!(tail > head, "head {head}, tail {tail}");
    for r in 0..res.n_realizations() {
        assert!(res.collisions_per_step(r).iter().all(|&c| c > 0));
    }
    Ok(())
}

#[test]
fn parallel_cells_tracks_serial_statistics() -> Result<()> {
    let base = SimulationConfig {
        n_particles: 3_000,
        n_cell: 6,
        n_sim: 1,
        n_t: 20,
        uw: 1.0,
        ..SimulationConfig::default()
    };
    let serial = run(&base)?;
    let parallel = run(&SimulationConfig {
        execution: Execution::ParallelCells,
        ..base.clone()
    })?;
    let last_s = serial.get(0, 19);
    let last_p = parallel.get(0, 19);
    assert!(last_s.is_finite() && last_p.is_finite());
    // different streams, same physics
    assert!(
        (last_s - last_p).abs() < 0.3,
        "serial {last_s}, parallel {last_p}"
    );
    Ok(())
}
