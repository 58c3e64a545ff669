//! No-Time-Counter collision sampling for hard spheres.
//!
//! Each cell draws `M = ceil(Nc^2 pi v_rel_max Ne dt / (2 vol))` candidate
//! pairs and accepts a pair with probability `v_rel / v_rel_max`. Accepted
//! pairs scatter isotropically in their center-of-mass frame.

use crate::config::Parameters;
use crate::core::particle::{DIM, X, Y, Z};
use rand::Rng;
use std::f64::consts::PI;

/// NTC sampler for one timestep size and cell volume.
#[derive(Debug, Clone, Copy)]
pub struct CollisionEngine {
    v_rel_max: f64,
    /// `pi v_rel_max Ne dt / (2 vol)`, the per-`Nc^2` trial rate.
    rate: f64,
}

impl CollisionEngine {
    /// Sampler for the timestep and cell volume of `params`.
    pub fn new(params: &Parameters) -> Self {
        Self::with_constants(params.v_rel_max, params.ne, params.dt, params.vol)
    }

    /// Sampler from raw constants; `ne` is the number of real particles per
    /// sampling particle.
    pub fn with_constants(v_rel_max: f64, ne: f64, dt: f64, vol: f64) -> Self {
        Self {
            v_rel_max,
            rate: PI * v_rel_max * ne * dt / (2.0 * vol),
        }
    }

    /// Candidate trial count for a cell holding `nc` particles.
    #[inline]
    pub fn candidate_count(&self, nc: usize) -> usize {
        if nc == 0 {
            return 0;
        }
        let nc = nc as f64;
        (nc * nc * self.rate).ceil() as usize
    }

    /// Run the trials of one cell on its working copy of velocities and
    /// return the number of accepted collisions.
    ///
    /// Both partners are drawn independently, so a particle may be paired
    /// with itself; such a pair has zero relative speed and is always
    /// rejected. Later trials see the velocities left by earlier ones.
    pub fn collide_cell<R: Rng + ?Sized>(
        &self,
        velocities: &mut [[f64; DIM]],
        rng: &mut R,
    ) -> usize {
        let nc = velocities.len();
        let trials = self.candidate_count(nc);
        let mut accepted = 0;
        for _ in 0..trials {
            let u: f64 = rng.random();
            let i = rng.random_range(0..nc);
            let j = rng.random_range(0..nc);

            let v_rel = relative_speed(&velocities[i], &velocities[j]);
            if !accepts(v_rel, u, self.v_rel_max) {
                continue;
            }

            let cos_theta = 2.0 * rng.random::<f64>() - 1.0;
            let phi = 2.0 * PI * rng.random::<f64>();
            let (vi, vj) = scatter_pair(&velocities[i], &velocities[j], v_rel, cos_theta, phi);
            velocities[i] = vi;
            velocities[j] = vj;
            accepted += 1;
        }
        accepted
    }
}

/// Hard-sphere acceptance test: keep the pair iff `v_rel > u v_rel_max`.
#[inline]
pub fn accepts(v_rel: f64, u: f64, v_rel_max: f64) -> bool {
    v_rel > u * v_rel_max
}

/// Euclidean norm of `a - b`.
#[inline]
pub fn relative_speed(a: &[f64; DIM], b: &[f64; DIM]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(p, q)| (p - q) * (p - q))
        .sum::<f64>()
        .sqrt()
}

/// Post-collision velocities of a pair scattered into direction
/// `(cos_theta, phi)` at fixed center-of-mass velocity and relative speed.
#[inline]
pub fn scatter_pair(
    vi: &[f64; DIM],
    vj: &[f64; DIM],
    v_rel: f64,
    cos_theta: f64,
    phi: f64,
) -> ([f64; DIM], [f64; DIM]) {
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let mut g = [0.0_f64; DIM];
    g[X] = v_rel * sin_theta * phi.cos();
    g[Y] = v_rel * sin_theta * phi.sin();
    g[Z] = v_rel * cos_theta;

    let mut out_i = [0.0_f64; DIM];
    let mut out_j = [0.0_f64; DIM];
    for k in 0..DIM {
        let cm = 0.5 * (vi[k] + vj[k]);
        out_i[k] = cm + 0.5 * g[k];
        out_j[k] = cm - 0.5 * g[k];
    }
    (out_i, out_j)
}
