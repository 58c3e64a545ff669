use crate::error::{Error, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Fixed spatial dimension (3D).
pub const DIM: usize = 3;

/// Axis indices into position and velocity triples.
pub const X: usize = 0;
pub const Y: usize = 1;
pub const Z: usize = 2;

/// Sampling particles of one realization.
///
/// `positions[i]` and `velocities[i]` describe the same particle; the index
/// carries no identity beyond that pairing.
#[derive(Debug, Clone, Default)]
pub struct ParticleEnsemble {
    /// Positions (x, y, z).
    pub positions: Vec<[f64; DIM]>,
    /// Velocities (vx, vy, vz).
    pub velocities: Vec<[f64; DIM]>,
}

impl ParticleEnsemble {
    /// Draw `n` particles with `x, y` uniform on `[0, dz)`, `z` uniform on
    /// `[0, lz)` and each velocity component from `N(0, spread)`.
    ///
    /// Draw order is axis-major (all x, then all y, ...) so a given stream
    /// always yields the same ensemble.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `dz`, `lz` or `spread` is not finite and > 0.
    pub fn initialize<R: Rng + ?Sized>(
        n: usize,
        lz: f64,
        dz: f64,
        spread: f64,
        rng: &mut R,
    ) -> Result<Self> {
        if !lz.is_finite() || lz <= 0.0 || !dz.is_finite() || dz <= 0.0 {
            return Err(Error::InvalidParam("lz and dz must be finite and > 0".into()));
        }
        let normal = Normal::new(0.0, spread).map_err(|e| {
            Error::InvalidParam(format!("velocity spread {spread}: {e}"))
        })?;

        let mut positions = vec![[0.0_f64; DIM]; n];
        let mut velocities = vec![[0.0_f64; DIM]; n];
        for (k, extent) in [dz, dz, lz].into_iter().enumerate() {
            for r in positions.iter_mut() {
                r[k] = extent * rng.random::<f64>();
            }
        }
        for k in 0..DIM {
            for v in velocities.iter_mut() {
                v[k] = normal.sample(rng);
            }
        }
        Ok(Self {
            positions,
            velocities,
        })
    }

    /// Number of particles.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Ballistic transport over `dt`: `r += v * dt`.
    pub fn drift(&mut self, dt: f64) {
        for (r, v) in self.positions.iter_mut().zip(&self.velocities) {
            for k in 0..DIM {
                r[k] += v[k] * dt;
            }
        }
    }

    /// Total kinetic energy for unit mass, `1/2 sum |v|^2`.
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self
            .velocities
            .iter()
            .map(|v| v.iter().map(|c| c * c).sum::<f64>())
            .sum::<f64>()
    }

    /// Index of the first particle with a non-finite coordinate, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.positions
            .iter()
            .zip(&self.velocities)
            .position(|(r, v)| !r.iter().chain(v.iter()).all(|c| c.is_finite()))
    }
}
