use crate::config::{Execution, Parameters, SimulationConfig};
use crate::core::observer::{CancelToken, StepObserver, StepView};
use crate::core::particle::ParticleEnsemble;
use crate::core::result::{AbortedRealization, EnsembleResult, RealizationRow};
use crate::core::sim::{derive_seed, TimeStepper};
use crate::error::{Error, Result};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use std::sync::{Mutex, PoisonError};
use tracing::{error, info, warn};

type SharedObserver<'o> = Mutex<&'o mut (dyn StepObserver + Send)>;

/// Run every realization of `config` and collect the wall-region time series.
///
/// Errors:
/// - `Error::InvalidParam` if the configuration does not validate; nothing
///   is simulated in that case.
pub fn run(config: &SimulationConfig) -> Result<EnsembleResult> {
    EnsembleRunner::new(Parameters::from_config(config)?).run()
}

/// Drives `n_sim` independent time evolutions of `n_t` steps each.
///
/// Random streams follow the execution strategy: `Serial` and
/// `ParallelCells` seed one generator once and continue it through every
/// realization, so a whole run is reproducible bit-for-bit but realizations
/// are not independent replicates in isolation. `ParallelRealizations` gives
/// each realization its own stream derived from the seed, so rows do not
/// depend on thread scheduling but differ from the serial run.
pub struct EnsembleRunner<'o> {
    params: Parameters,
    observer: Option<&'o mut (dyn StepObserver + Send)>,
    cancel: Option<CancelToken>,
    #[cfg(test)]
    fault: Option<(usize, usize)>,
}

impl<'o> EnsembleRunner<'o> {
    /// Runner over validated `params`; see [`Parameters::from_config`].
    pub fn new(params: Parameters) -> Self {
        Self {
            params,
            observer: None,
            cancel: None,
            #[cfg(test)]
            fault: None,
        }
    }

    /// Register a read-only per-step hook.
    pub fn with_observer(mut self, observer: &'o mut (dyn StepObserver + Send)) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Stop the run at the next timestep boundary once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Corrupt one particle of realization `r` right before `step` runs.
    #[cfg(test)]
    fn with_fault(mut self, r: usize, step: usize) -> Self {
        self.fault = Some((r, step));
        self
    }

    /// Errors:
    /// - `Error::Cancelled` when the cancel token fires. Step failures do not
    ///   surface here; they abort their realization and are listed in
    ///   [`EnsembleResult::aborted`].
    pub fn run(self) -> Result<EnsembleResult> {
        let params = &self.params;
        let observer: Option<SharedObserver<'o>> = self.observer.map(Mutex::new);
        let ctx = Context {
            params,
            observer: observer.as_ref(),
            cancel: self.cancel.as_ref(),
            #[cfg(test)]
            fault: self.fault,
        };

        let rows = match params.execution {
            Execution::Serial | Execution::ParallelCells => {
                let mut rng = StdRng::seed_from_u64(params.seed);
                (0..params.n_sim)
                    .map(|r| ctx.realization(r, &mut rng))
                    .collect::<Result<Vec<_>>>()?
            }
            Execution::ParallelRealizations => (0..params.n_sim)
                .into_par_iter()
                .map(|r| {
                    let mut rng = StdRng::seed_from_u64(derive_seed(params.seed, r as u64));
                    ctx.realization(r, &mut rng)
                })
                .collect::<Result<Vec<_>>>()?,
        };
        Ok(EnsembleResult::from_rows(params.n_t, rows))
    }
}

struct Context<'a, 'o> {
    params: &'a Parameters,
    observer: Option<&'a SharedObserver<'o>>,
    cancel: Option<&'a CancelToken>,
    #[cfg(test)]
    fault: Option<(usize, usize)>,
}

impl Context<'_, '_> {
    fn realization(&self, r: usize, rng: &mut StdRng) -> Result<RealizationRow> {
        let p = self.params;
        info!("simulation {} of {}", r + 1, p.n_sim);

        let mut row = RealizationRow::new(p.n_t);
        // Literal initial spread: raw Tw, not sqrt(Tw).
        let mut ensemble = ParticleEnsemble::initialize(p.n_particles, p.lz, p.dz, p.tw, rng)?;
        let mut stepper = TimeStepper::new(p);
        let mut empty_steps = 0usize;

        for step in 0..p.n_t {
            if self.cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(Error::Cancelled {
                    realization: r,
                    step,
                });
            }

            #[cfg(test)]
            if self.fault == Some((r, step)) {
                ensemble.velocities[0] = [f64::NAN; crate::core::particle::DIM];
            }

            let report = match stepper.step(&mut ensemble, rng) {
                Ok(report) => report,
                Err(e) => {
                    error!(realization = r, step, "realization aborted: {e}");
                    row.aborted = Some(AbortedRealization {
                        realization: r,
                        step,
                        reason: e.to_string(),
                    });
                    return Ok(row);
                }
            };
            row.values[step] = report.wall_mean_vy;
            row.collisions[step] = report.collisions as u64;
            if report.wall_mean_vy.is_nan() {
                empty_steps += 1;
            }

            if let Some(observer) = self.observer {
                let profile = stepper.velocity_profile(&ensemble);
                let view = StepView {
                    realization: r,
                    step,
                    positions: &ensemble.positions,
                    velocities: &ensemble.velocities,
                    profile: &profile,
                    cell_collisions: stepper.collisions_per_cell(),
                    collisions: report.collisions,
                    wall_mean_vy: report.wall_mean_vy,
                };
                observer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .on_step(&view);
            }
        }

        if empty_steps > 0 {
            warn!(
                realization = r,
                empty_steps, "bottom slab was empty; those steps are NaN"
            );
        }
        Ok(row)
    }
}
