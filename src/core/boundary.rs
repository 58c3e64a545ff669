//! Wall models for the two plates and the lateral periodic wrap.
//!
//! The top plate at `z = Lz` reflects specularly. The bottom plate at
//! `z = 0` is a diffuse thermal wall moving at `uw` along y: every particle
//! that crosses it is re-emitted with a fresh velocity drawn from the
//! flux-weighted half-Maxwellian of the wall.

use crate::core::particle::{ParticleEnsemble, DIM, X, Y, Z};
use crate::error::{Error, Result};
use rand::distr::Open01;
use rand::Rng;
use rand_distr::StandardNormal;

/// Passes over the ensemble before a particle still outside `[0, Lz]` is
/// reported. A particle needs more than one pass only when `|vz| dt > Lz`.
const MAX_WALL_PASSES: usize = 8;

/// Wall-crossing counts of one boundary pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WallHits {
    /// Specular reflections at `z = Lz`.
    pub top: usize,
    /// Thermal re-emissions at `z = 0`.
    pub bottom: usize,
}

/// Specular top wall, thermal bottom wall.
#[derive(Debug, Clone, Copy)]
pub struct Walls {
    lz: f64,
    uw: f64,
    tw: f64,
    sqrt_tw: f64,
}

impl Walls {
    /// Walls of a box of height `lz` whose bottom plate moves at `uw` and
    /// is held at temperature `tw`.
    pub fn new(lz: f64, uw: f64, tw: f64) -> Self {
        Self {
            lz,
            uw,
            tw,
            sqrt_tw: tw.sqrt(),
        }
    }

    /// Reflect a particle that overshot `z = Lz`. Returns whether it did.
    ///
    /// The overshoot time `(z - Lz) / vz` is replayed with the reversed
    /// normal velocity; tangential components are untouched.
    #[inline]
    pub fn reflect_specular(&self, r: &mut [f64; DIM], v: &mut [f64; DIM]) -> bool {
        if r[Z] <= self.lz {
            return false;
        }
        let dt_ac = (r[Z] - self.lz) / v[Z];
        v[Z] = -v[Z];
        r[Z] = self.lz + dt_ac * v[Z];
        true
    }

    /// Re-emit a particle that crossed `z = 0`. Returns whether it did.
    ///
    /// The lateral position is traced back to the crossing instant with the
    /// incoming velocity, a new velocity is drawn, and the particle is pushed
    /// forward for the same time with it.
    pub fn emit_thermal<R: Rng + ?Sized>(
        &self,
        r: &mut [f64; DIM],
        v: &mut [f64; DIM],
        rng: &mut R,
    ) -> bool {
        if r[Z] >= 0.0 {
            return false;
        }
        let dt_ac = r[Z] / v[Z];
        r[X] -= dt_ac * v[X];
        r[Y] -= dt_ac * v[Y];

        let gx: f64 = rng.sample(StandardNormal);
        let gy: f64 = rng.sample(StandardNormal);
        let u: f64 = rng.sample(Open01);
        v[X] = self.sqrt_tw * gx;
        v[Y] = self.sqrt_tw * gy + self.uw;
        // inverse CDF of vz * exp(-vz^2 / 2Tw)
        v[Z] = (-2.0 * self.tw * u.ln()).sqrt();

        r[X] += dt_ac * v[X];
        r[Y] += dt_ac * v[Y];
        r[Z] = dt_ac * v[Z];
        true
    }

    /// Apply the top wall to every particle, then the bottom wall, and repeat
    /// until all heights lie in `[0, Lz]`.
    ///
    /// Errors:
    /// - `Error::MathError` if a crossing leaves a non-finite coordinate.
    /// - `Error::OutOfBounds` if a particle is still outside after
    ///   `MAX_WALL_PASSES` passes.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        ensemble: &mut ParticleEnsemble,
        rng: &mut R,
    ) -> Result<WallHits> {
        let mut hits = WallHits::default();
        let mut outside = None;
        for _ in 0..MAX_WALL_PASSES {
            for (r, v) in ensemble.positions.iter_mut().zip(&mut ensemble.velocities) {
                if self.reflect_specular(r, v) {
                    hits.top += 1;
                }
            }
            for (r, v) in ensemble.positions.iter_mut().zip(&mut ensemble.velocities) {
                if self.emit_thermal(r, v, rng) {
                    hits.bottom += 1;
                }
            }

            if let Some(i) = ensemble.first_non_finite() {
                return Err(Error::MathError(format!(
                    "particle {i} has non-finite state after wall crossing: r={:?}, v={:?}",
                    ensemble.positions[i], ensemble.velocities[i]
                )));
            }
            outside = ensemble
                .positions
                .iter()
                .position(|r| !(0.0..=self.lz).contains(&r[Z]));
            if outside.is_none() {
                return Ok(hits);
            }
        }

        match outside {
            Some(i) => Err(Error::OutOfBounds(format!(
                "particle {i} at z={} still outside [0, {}] after {MAX_WALL_PASSES} wall passes",
                ensemble.positions[i][Z], self.lz
            ))),
            None => Ok(hits),
        }
    }
}

/// Periodic wrap of x and y onto `[0, period)`.
pub fn wrap_lateral(ensemble: &mut ParticleEnsemble, period: f64) {
    for r in ensemble.positions.iter_mut() {
        r[X] = wrap(r[X], period);
        r[Y] = wrap(r[Y], period);
    }
}

#[inline]
fn wrap(x: f64, period: f64) -> f64 {
    let w = x.rem_euclid(period);
    // rem_euclid rounds tiny negatives up to exactly `period`
    if w >= period {
        0.0
    } else {
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn specular_reflection_preserves_speed() {
        let walls = Walls::new(10.0, 0.0, 1.0);
        let mut r = [0.3, 0.4, 10.75];
        let mut v = [1.0, -2.0, 1.5];
        assert!(walls.reflect_specular(&mut r, &mut v));
        assert_eq!(v, [1.0, -2.0, -1.5]);
        assert!((r[Z] - 9.25).abs() < 1e-12);
        assert_eq!([r[X], r[Y]], [0.3, 0.4]);
    }

    #[test]
    fn specular_overshoots_land_back_in_box() -> Result<()> {
        let lz = 10.0;
        let walls = Walls::new(lz, 0.5, 1.0);
        let mut rng = StdRng::seed_from_u64(23);
        let n = 5_000;
        let mut ens = ParticleEnsemble::default();
        for _ in 0..n {
            let z = lz * (1.0 + 0.9 * rng.random::<f64>());
            let vz = 0.1 + 5.0 * rng.random::<f64>();
            ens.positions.push([rng.random(), rng.random(), z]);
            ens.velocities.push([rng.random(), rng.random(), vz]);
        }
        let before = ens.clone();
        let hits = walls.apply(&mut ens, &mut rng)?;
        assert_eq!(hits, WallHits { top: n, bottom: 0 });
        for i in 0..n {
            let (r0, v0) = (before.positions[i], before.velocities[i]);
            let (r, v) = (ens.positions[i], ens.velocities[i]);
            assert_eq!(v[Z], -v0[Z]);
            assert_eq!((v[X], v[Y]), (v0[X], v0[Y]));
            assert_eq!((r[X], r[Y]), (r0[X], r0[Y]));
            assert!((0.0..=lz).contains(&r[Z]), "z = {}", r[Z]);
            // mirror image of the overshoot
            assert!((r[Z] - (2.0 * lz - r0[Z])).abs() < 1e-9);
        }
        Ok(())
    }

    #[test]
    fn specular_ignores_particles_inside() {
        let walls = Walls::new(10.0, 0.0, 1.0);
        let mut r = [0.0, 0.0, 10.0];
        let mut v = [0.0, 0.0, 1.0];
        assert!(!walls.reflect_specular(&mut r, &mut v));
        assert_eq!(v[Z], 1.0);
    }

    #[test]
    fn thermal_emission_goes_upward_with_wall_drift() {
        let walls = Walls::new(100.0, 2.0, 1.0);
        let mut rng = StdRng::seed_from_u64(5);
        let n = 20_000;
        let mut sum_vy = 0.0;
        let mut sum_vz = 0.0;
        for _ in 0..n {
            let mut r = [0.5, 0.5, -0.1];
            let mut v = [0.2, 0.1, -1.0];
            assert!(walls.emit_thermal(&mut r, &mut v, &mut rng));
            assert!(v[Z] >= 0.0 && v[Z].is_finite());
            assert!(r[Z] >= 0.0);
            // re-emitted for the same 0.1 time units it spent past the wall
            assert!((r[Z] - 0.1 * v[Z]).abs() < 1e-12);
            sum_vy += v[Y];
            sum_vz += v[Z];
        }
        let mean_vy = sum_vy / n as f64;
        let mean_vz = sum_vz / n as f64;
        assert!((mean_vy - 2.0).abs() < 0.05, "mean vy {mean_vy}");
        // flux-weighted half-Maxwellian: E[vz] = sqrt(pi Tw / 2)
        let expected = (std::f64::consts::PI / 2.0).sqrt();
        assert!((mean_vz - expected).abs() < 0.03, "mean vz {mean_vz}");
    }

    #[test]
    fn apply_keeps_heights_in_box() -> Result<()> {
        let walls = Walls::new(10.0, 1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(9);
        let mut ens = ParticleEnsemble {
            positions: vec![
                [0.1, 0.1, 11.0],
                [0.1, 0.1, -0.5],
                [0.1, 0.1, 5.0],
            ],
            velocities: vec![
                [0.0, 0.0, 2.0],
                [0.0, 0.0, -1.0],
                [0.0, 0.0, 0.0],
            ],
        };
        let hits = walls.apply(&mut ens, &mut rng)?;
        assert_eq!(hits, WallHits { top: 1, bottom: 1 });
        for r in &ens.positions {
            assert!((0.0..=10.0).contains(&r[Z]));
        }
        assert_eq!(ens.positions[2], [0.1, 0.1, 5.0]);
        Ok(())
    }

    #[test]
    fn apply_handles_double_crossing() -> Result<()> {
        // overshoots the top far enough that the reflection lands below 0
        let walls = Walls::new(1.0, 0.0, 1.0);
        let mut rng = StdRng::seed_from_u64(11);
        let mut ens = ParticleEnsemble {
            positions: vec![[0.0, 0.0, 2.5]],
            velocities: vec![[0.0, 0.0, 5.0]],
        };
        let hits = walls.apply(&mut ens, &mut rng)?;
        assert_eq!(hits.top, 1);
        assert!(hits.bottom >= 1);
        assert!((0.0..=1.0).contains(&ens.positions[0][Z]));
        Ok(())
    }

    #[test]
    fn non_finite_velocity_is_reported() {
        let walls = Walls::new(1.0, 0.0, 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ens = ParticleEnsemble {
            positions: vec![[0.0, 0.0, 0.5]],
            velocities: vec![[f64::NAN, 0.0, 0.0]],
        };
        let err = walls.apply(&mut ens, &mut rng).unwrap_err();
        assert!(matches!(err, Error::MathError(_)));
    }

    #[test]
    fn wrap_lands_in_half_open_period() {
        let mut ens = ParticleEnsemble {
            positions: vec![
                [-0.25, 1.75, 0.0],
                [-1e-18, 1.0, 0.0],
                [0.0, 3.0, 0.0],
            ],
            velocities: vec![[0.0; DIM]; 3],
        };
        wrap_lateral(&mut ens, 1.0);
        for r in &ens.positions {
            assert!((0.0..1.0).contains(&r[X]), "x = {}", r[X]);
            assert!((0.0..1.0).contains(&r[Y]), "y = {}", r[Y]);
        }
        assert!((ens.positions[0][X] - 0.75).abs() < 1e-12);
        assert!((ens.positions[0][Y] - 0.75).abs() < 1e-12);
    }
}
