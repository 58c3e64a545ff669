use crate::config::{Execution, Parameters};
use crate::core::boundary::{wrap_lateral, WallHits, Walls};
use crate::core::cells::CellIndex;
use crate::core::collision::CollisionEngine;
use crate::core::particle::{ParticleEnsemble, DIM, Y, Z};
use crate::error::{Error, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, trace};

/// Outcome of one timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Wall crossings handled this step.
    pub hits: WallHits,
    /// Accepted collisions summed over cells.
    pub collisions: usize,
    /// Mean `vy` of particles in the open bottom slab `(0, dz)`; NaN if empty.
    pub wall_mean_vy: f64,
}

/// Advances one realization by fixed timesteps.
///
/// Per step: drift, top wall, bottom wall, lateral wrap, per-cell NTC
/// collisions, lateral wrap, diagnostics. Collisions therefore always see
/// transported, wall-corrected heights.
#[derive(Debug, Clone)]
pub struct TimeStepper {
    dt: f64,
    dz: f64,
    walls: Walls,
    engine: CollisionEngine,
    cells: CellIndex,
    parallel_cells: bool,
    per_cell: Vec<usize>,
    scratch: Vec<[f64; DIM]>,
}

impl TimeStepper {
    pub fn new(params: &Parameters) -> Self {
        Self {
            dt: params.dt,
            dz: params.dz,
            walls: Walls::new(params.lz, params.uw, params.tw),
            engine: CollisionEngine::new(params),
            cells: CellIndex::new(params.n_cell, params.dz),
            parallel_cells: params.execution == Execution::ParallelCells,
            per_cell: vec![0; params.n_cell],
            scratch: Vec::new(),
        }
    }

    /// Advance `ensemble` by one timestep.
    ///
    /// Errors:
    /// - `Error::MathError` / `Error::OutOfBounds` from the wall pass, or a
    ///   non-finite velocity after collisions. The ensemble is not usable
    ///   afterwards.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        ensemble: &mut ParticleEnsemble,
        rng: &mut R,
    ) -> Result<StepReport> {
        ensemble.drift(self.dt);
        let hits = self.walls.apply(ensemble, rng)?;
        wrap_lateral(ensemble, self.dz);

        let collisions = self.collide(ensemble, rng);
        wrap_lateral(ensemble, self.dz);
        if let Some(i) = ensemble.first_non_finite() {
            return Err(Error::MathError(format!(
                "particle {i} has non-finite velocity after collisions: {:?}",
                ensemble.velocities[i]
            )));
        }

        let wall_mean_vy = wall_mean_vy(ensemble, self.dz);
        debug!(
            collisions,
            top = hits.top,
            bottom = hits.bottom,
            wall_mean_vy,
            energy = ensemble.kinetic_energy(),
            "timestep done"
        );
        Ok(StepReport {
            hits,
            collisions,
            wall_mean_vy,
        })
    }

    /// Accepted collisions of each cell in the last step.
    pub fn collisions_per_cell(&self) -> &[usize] {
        &self.per_cell
    }

    /// Mean `vy` of each cell as binned for the last collision pass; NaN
    /// for empty cells.
    pub fn velocity_profile(&self, ensemble: &ParticleEnsemble) -> Vec<f64> {
        (0..self.cells.n_cells())
            .map(|j| mean_vy(self.cells.members(j), &ensemble.velocities))
            .collect()
    }

    fn collide<R: Rng + ?Sized>(&mut self, ensemble: &mut ParticleEnsemble, rng: &mut R) -> usize {
        self.cells.rebuild(&ensemble.positions);
        if self.parallel_cells {
            self.collide_parallel(ensemble, rng.random());
        } else {
            for j in 0..self.cells.n_cells() {
                let members = self.cells.members(j);
                if members.is_empty() {
                    self.per_cell[j] = 0;
                    continue;
                }
                self.scratch.clear();
                self.scratch
                    .extend(members.iter().map(|&i| ensemble.velocities[i]));
                self.per_cell[j] = self.engine.collide_cell(&mut self.scratch, rng);
                for (&i, v) in members.iter().zip(&self.scratch) {
                    ensemble.velocities[i] = *v;
                }
            }
        }
        trace!(per_cell = ?self.per_cell, "cell collisions");
        self.per_cell.iter().sum()
    }

    /// Cells share no particles, so each runs on its own copy and its own
    /// stream derived from `step_seed`.
    fn collide_parallel(&mut self, ensemble: &mut ParticleEnsemble, step_seed: u64) {
        let cells = &self.cells;
        let engine = self.engine;
        let velocities = &ensemble.velocities;
        let mut work: Vec<Vec<[f64; DIM]>> = (0..cells.n_cells())
            .map(|j| cells.members(j).iter().map(|&i| velocities[i]).collect())
            .collect();

        work.par_iter_mut()
            .zip(self.per_cell.par_iter_mut())
            .enumerate()
            .for_each(|(j, (cell, count))| {
                let mut cell_rng = StdRng::seed_from_u64(derive_seed(step_seed, j as u64));
                *count = engine.collide_cell(cell, &mut cell_rng);
            });

        for (j, cell) in work.iter().enumerate() {
            for (&i, v) in cells.members(j).iter().zip(cell) {
                ensemble.velocities[i] = *v;
            }
        }
    }
}

/// Mean `vy` of particles strictly inside `(0, dz)`; NaN when none are.
pub fn wall_mean_vy(ensemble: &ParticleEnsemble, dz: f64) -> f64 {
    let (sum, n) = ensemble
        .positions
        .iter()
        .zip(&ensemble.velocities)
        .filter(|(r, _)| r[Z] > 0.0 && r[Z] < dz)
        .fold((0.0, 0usize), |(s, n), (_, v)| (s + v[Y], n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

fn mean_vy(members: &[usize], velocities: &[[f64; DIM]]) -> f64 {
    if members.is_empty() {
        return f64::NAN;
    }
    members.iter().map(|&i| velocities[i][Y]).sum::<f64>() / members.len() as f64
}

/// SplitMix64 mix of a base seed and a stream index.
pub(crate) fn derive_seed(base: u64, stream: u64) -> u64 {
    const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut z = base ^ stream.wrapping_mul(GOLDEN_GAMMA);
    z = z.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
