use crate::core::particle::{DIM, Z};

/// Slab partition of `[0, Lz)` into `n_cell` cells of height `dz`.
///
/// Built as a counting sort: `order` lists particle indices grouped by cell,
/// and `offsets[j]..offsets[j + 1]` is the range of cell `j`. Cell `j` owns
/// `[j dz, (j + 1) dz)`; a particle sitting exactly on `z = Lz` is kept in
/// the last cell. Heights outside `[0, Lz]` belong to no cell.
#[derive(Debug, Clone)]
pub struct CellIndex {
    dz: f64,
    n_cell: usize,
    offsets: Vec<usize>,
    order: Vec<usize>,
    slots: Vec<Option<usize>>,
}

impl CellIndex {
    /// Empty index of `n_cell` slabs of height `dz`, binned on the first
    /// [`rebuild`](Self::rebuild).
    pub fn new(n_cell: usize, dz: f64) -> Self {
        Self {
            dz,
            n_cell,
            offsets: vec![0; n_cell + 1],
            order: Vec::new(),
            slots: Vec::new(),
        }
    }

    /// Re-bin every particle from its current height.
    pub fn rebuild(&mut self, positions: &[[f64; DIM]]) {
        let (dz, n_cell) = (self.dz, self.n_cell);
        self.slots.clear();
        self.slots
            .extend(positions.iter().map(|r| slab(r[Z], dz, n_cell)));

        let mut counts = vec![0usize; self.n_cell];
        for j in self.slots.iter().flatten() {
            counts[*j] += 1;
        }
        self.offsets[0] = 0;
        for (j, c) in counts.iter().enumerate() {
            self.offsets[j + 1] = self.offsets[j] + c;
        }

        let mut cursor = self.offsets[..self.n_cell].to_vec();
        self.order.clear();
        self.order.resize(self.offsets[self.n_cell], 0);
        for (i, cell) in self.slots.iter().enumerate() {
            if let Some(j) = *cell {
                self.order[cursor[j]] = i;
                cursor[j] += 1;
            }
        }
    }

    #[inline]
    pub fn n_cells(&self) -> usize {
        self.n_cell
    }

    /// Particle indices resident in cell `j`, in ascending order.
    #[inline]
    pub fn members(&self, j: usize) -> &[usize] {
        &self.order[self.offsets[j]..self.offsets[j + 1]]
    }

    /// Resident count of cell `j`.
    #[inline]
    pub fn count(&self, j: usize) -> usize {
        self.offsets[j + 1] - self.offsets[j]
    }
}

#[inline]
fn slab(z: f64, dz: f64, n_cell: usize) -> Option<usize> {
    if n_cell == 0 || z.is_nan() || z < 0.0 {
        return None;
    }
    let j = (z / dz).floor() as usize;
    if j < n_cell {
        Some(j)
    } else if z <= dz * n_cell as f64 {
        Some(n_cell - 1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(z: &[f64]) -> Vec<[f64; DIM]> {
        z.iter().map(|&z| [0.0, 0.0, z]).collect()
    }

    fn binned(cells: &CellIndex) -> usize {
        (0..cells.n_cells()).map(|j| cells.count(j)).sum()
    }

    #[test]
    fn bins_by_half_open_slabs() {
        let mut cells = CellIndex::new(4, 1.0);
        cells.rebuild(&at(&[0.5, 1.0, 3.99, 2.2, 0.0, 1.7]));
        assert_eq!(cells.members(0), &[0, 4]);
        assert_eq!(cells.members(1), &[1, 5]);
        assert_eq!(cells.members(2), &[3]);
        assert_eq!(cells.members(3), &[2]);
        assert_eq!(binned(&cells), 6);
    }

    #[test]
    fn top_edge_kept_and_outside_dropped() {
        let mut cells = CellIndex::new(2, 1.5);
        cells.rebuild(&at(&[3.0, -0.1, 3.5, f64::NAN]));
        assert_eq!(cells.members(1), &[0]);
        assert_eq!(cells.count(0), 0);
        assert_eq!(binned(&cells), 1);
    }

    #[test]
    fn empty_cells_are_empty_slices() {
        let mut cells = CellIndex::new(3, 1.0);
        cells.rebuild(&at(&[2.5]));
        assert!(cells.members(0).is_empty());
        assert!(cells.members(1).is_empty());
        assert_eq!(cells.count(2), 1);
    }

    #[test]
    fn rebuild_forgets_previous_binning() {
        let mut cells = CellIndex::new(2, 1.0);
        cells.rebuild(&at(&[0.5, 0.5, 1.5]));
        cells.rebuild(&at(&[1.5]));
        assert_eq!(cells.count(0), 0);
        assert_eq!(cells.members(1), &[0]);
    }

    #[test]
    fn zero_cells_bin_nothing() {
        assert_eq!(slab(0.0, 1.0, 0), None);
        let mut cells = CellIndex::new(0, 1.0);
        cells.rebuild(&at(&[0.0, 0.5, 1.0]));
        assert_eq!(cells.n_cells(), 0);
        assert_eq!(binned(&cells), 0);
    }
}
