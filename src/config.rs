//! Raw run configuration and the derived physical constants of the
//! Rayleigh problem (gas between two plates, lower plate moving at `uw`).
//!
//! Units are dimensionless with `m = sigma = k T0 = 1`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, SQRT_2};

/// How the time loop spreads work across threads.
///
/// Resolved once before the loop starts; the hot path never re-checks flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Execution {
    /// Single thread, one random stream continued across every realization.
    #[default]
    Serial,
    /// Collision sampling runs cell-parallel with per-cell derived streams.
    ParallelCells,
    /// Realizations run in parallel, each with its own derived stream.
    ParallelRealizations,
}

/// Flat raw configuration, as handed over by an external loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Lower wall velocity (along y).
    pub uw: f64,
    /// Wall temperature.
    pub tw: f64,
    /// Number density.
    pub n0: f64,
    /// Number of sampling particles.
    pub n_particles: usize,
    /// Number of independent realizations.
    pub n_sim: usize,
    /// Number of cells along z.
    pub n_cell: usize,
    /// Number of mean-free times to simulate.
    pub n_mft: usize,
    /// Number of timesteps.
    pub n_t: usize,
    /// Box height in mean free paths.
    pub n_z: usize,
    /// Upper bound on relative speed for acceptance-rejection.
    pub v_rel_max: f64,
    /// Seed of the random stream.
    pub seed: u64,
    /// Threading strategy of the time loop.
    pub execution: Execution,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            uw: 0.2,
            tw: 1.0,
            n0: 0.001,
            n_particles: 50_000,
            n_sim: 2,
            n_cell: 50,
            n_mft: 20,
            n_t: 200,
            n_z: 10,
            v_rel_max: 6.0,
            seed: 17,
            execution: Execution::Serial,
        }
    }
}

/// Validated run parameters with every derived constant precomputed.
///
/// Only [`Parameters::from_config`] builds one, so a value held by the
/// stepper or the runner has always passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub(crate) uw: f64,
    pub(crate) tw: f64,
    pub(crate) n0: f64,
    pub(crate) n_particles: usize,
    pub(crate) n_sim: usize,
    pub(crate) n_cell: usize,
    pub(crate) n_t: usize,
    pub(crate) v_rel_max: f64,
    pub(crate) seed: u64,
    pub(crate) execution: Execution,
    pub(crate) lambda_mfp: f64,
    pub(crate) lz: f64,
    pub(crate) kn: f64,
    pub(crate) v_mean: f64,
    pub(crate) tau: f64,
    pub(crate) dt: f64,
    pub(crate) dz: f64,
    pub(crate) vol: f64,
    pub(crate) ne: f64,
}

impl Parameters {
    /// Validate `config` and derive the geometric and physical constants.
    ///
    /// Errors:
    /// - `Error::InvalidParam` for non-positive density, temperature or
    ///   `v_rel_max`, zero counts, or derived constants that are not finite
    ///   and positive.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        if !config.n0.is_finite() || config.n0 <= 0.0 {
            return Err(Error::InvalidParam("n0 must be finite and > 0".into()));
        }
        if !config.tw.is_finite() || config.tw <= 0.0 {
            return Err(Error::InvalidParam("tw must be finite and > 0".into()));
        }
        if !config.uw.is_finite() {
            return Err(Error::InvalidParam("uw must be finite".into()));
        }
        if !config.v_rel_max.is_finite() || config.v_rel_max <= 0.0 {
            return Err(Error::InvalidParam("v_rel_max must be finite and > 0".into()));
        }
        let counts = [
            ("n_particles", config.n_particles),
            ("n_sim", config.n_sim),
            ("n_cell", config.n_cell),
            ("n_mft", config.n_mft),
            ("n_t", config.n_t),
            ("n_z", config.n_z),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(Error::InvalidParam(format!("{name} must be > 0")));
            }
        }

        let lambda_mfp = 1.0 / (SQRT_2 * PI * config.n0);
        let lz = config.n_z as f64 * lambda_mfp;
        let kn = lambda_mfp / lz;
        let v_mean = (2.0 / PI.sqrt()) * (2.0 * config.tw).sqrt();
        let tau = lambda_mfp / v_mean;
        let dt = config.n_mft as f64 * tau / config.n_t as f64;
        let dz = lz / config.n_cell as f64;
        let vol = lz * dz * dz / config.n_cell as f64;
        let ne = config.n0 * lz * dz * dz / config.n_particles as f64;

        let derived = [
            ("lambda_mfp", lambda_mfp),
            ("lz", lz),
            ("tau", tau),
            ("dt", dt),
            ("dz", dz),
            ("vol", vol),
            ("ne", ne),
        ];
        for (name, value) in derived {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidParam(format!(
                    "derived {name} = {value} is not finite and positive"
                )));
            }
        }

        Ok(Self {
            uw: config.uw,
            tw: config.tw,
            n0: config.n0,
            n_particles: config.n_particles,
            n_sim: config.n_sim,
            n_cell: config.n_cell,
            n_t: config.n_t,
            v_rel_max: config.v_rel_max,
            seed: config.seed,
            execution: config.execution,
            lambda_mfp,
            lz,
            kn,
            v_mean,
            tau,
            dt,
            dz,
            vol,
            ne,
        })
    }

    /// Lower wall velocity.
    pub fn uw(&self) -> f64 {
        self.uw
    }

    /// Wall temperature.
    pub fn tw(&self) -> f64 {
        self.tw
    }

    /// Number density.
    pub fn n0(&self) -> f64 {
        self.n0
    }

    /// Sampling particles per realization.
    pub fn n_particles(&self) -> usize {
        self.n_particles
    }

    /// Number of realizations.
    pub fn n_sim(&self) -> usize {
        self.n_sim
    }

    /// Number of cells along z.
    pub fn n_cell(&self) -> usize {
        self.n_cell
    }

    /// Timesteps per realization.
    pub fn n_t(&self) -> usize {
        self.n_t
    }

    /// Acceptance bound on relative speed.
    pub fn v_rel_max(&self) -> f64 {
        self.v_rel_max
    }

    /// Seed of the random stream.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Threading strategy of the time loop.
    pub fn execution(&self) -> Execution {
        self.execution
    }

    /// Mean free path.
    pub fn lambda_mfp(&self) -> f64 {
        self.lambda_mfp
    }

    /// Box height.
    pub fn lz(&self) -> f64 {
        self.lz
    }

    /// Knudsen number.
    pub fn kn(&self) -> f64 {
        self.kn
    }

    /// Mean thermal speed at the wall temperature.
    pub fn v_mean(&self) -> f64 {
        self.v_mean
    }

    /// Mean free time.
    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// Timestep.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Cell height, also the lateral period.
    pub fn dz(&self) -> f64 {
        self.dz
    }

    /// Cell volume.
    pub fn vol(&self) -> f64 {
        self.vol
    }

    /// Real particles represented by one sampling particle.
    pub fn ne(&self) -> f64 {
        self.ne
    }

    /// Per-step abscissa in mean-free times, `dt * (i + 1) / tau`.
    pub fn time_axis(&self) -> Vec<f64> {
        (1..=self.n_t)
            .map(|i| self.dt * i as f64 / self.tau)
            .collect()
    }
}
