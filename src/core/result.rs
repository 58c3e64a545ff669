/// A realization that stopped early because a timestep failed.
#[derive(Debug, Clone, PartialEq)]
pub struct AbortedRealization {
    /// Index of the realization.
    pub realization: usize,
    /// Step that failed; this and every later entry of the row stay NaN.
    pub step: usize,
    /// Display text of the error that stopped it.
    pub reason: String,
}

/// Bottom-slab mean lateral velocity for every realization and step.
///
/// Stored row-major, `n_realizations x n_steps`. An entry is NaN when the
/// slab was empty at that step or the realization was aborted before it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleResult {
    n_sim: usize,
    n_t: usize,
    values: Vec<f64>,
    collisions: Vec<u64>,
    aborted: Vec<AbortedRealization>,
}

impl EnsembleResult {
    pub(crate) fn from_rows(n_t: usize, rows: Vec<RealizationRow>) -> Self {
        let n_sim = rows.len();
        let mut values = Vec::with_capacity(n_sim * n_t);
        let mut collisions = Vec::with_capacity(n_sim * n_t);
        let mut aborted = Vec::new();
        for row in rows {
            values.extend(row.values);
            collisions.extend(row.collisions);
            aborted.extend(row.aborted);
        }
        Self {
            n_sim,
            n_t,
            values,
            collisions,
            aborted,
        }
    }

    pub fn n_realizations(&self) -> usize {
        self.n_sim
    }

    pub fn n_steps(&self) -> usize {
        self.n_t
    }

    /// Row-major view of all values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn row(&self, realization: usize) -> &[f64] {
        &self.values[realization * self.n_t..(realization + 1) * self.n_t]
    }

    pub fn get(&self, realization: usize, step: usize) -> f64 {
        self.values[realization * self.n_t + step]
    }

    /// Accepted collisions summed over cells, per step of one realization.
    pub fn collisions_per_step(&self, realization: usize) -> &[u64] {
        &self.collisions[realization * self.n_t..(realization + 1) * self.n_t]
    }

    pub fn aborted(&self) -> &[AbortedRealization] {
        &self.aborted
    }

    /// Mean over realizations at each step, skipping NaN entries. A step
    /// with no finite entry stays NaN.
    pub fn mean_over_realizations(&self) -> Vec<f64> {
        (0..self.n_t)
            .map(|step| {
                let (sum, n) = (0..self.n_sim)
                    .map(|r| self.get(r, step))
                    .filter(|v| !v.is_nan())
                    .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                if n == 0 {
                    f64::NAN
                } else {
                    sum / n as f64
                }
            })
            .collect()
    }

    /// `u_y(z=0) / u_w` per step, the curve compared against BGK theory.
    pub fn normalized_mean(&self, uw: f64) -> Vec<f64> {
        self.mean_over_realizations()
            .into_iter()
            .map(|v| v / uw)
            .collect()
    }
}

/// Output of a single realization before it is folded into the result.
#[derive(Debug, Clone)]
pub(crate) struct RealizationRow {
    pub values: Vec<f64>,
    pub collisions: Vec<u64>,
    pub aborted: Option<AbortedRealization>,
}

impl RealizationRow {
    pub fn new(n_t: usize) -> Self {
        Self {
            values: vec![f64::NAN; n_t],
            collisions: vec![0; n_t],
            aborted: None,
        }
    }
}
