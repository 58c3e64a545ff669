use crate::core::particle::{DIM, Y, Z};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Read-only view of the ensemble after a completed timestep.
#[derive(Debug, Clone, Copy)]
pub struct StepView<'a> {
    /// Zero-based realization index.
    pub realization: usize,
    /// Zero-based step index within the realization.
    pub step: usize,
    /// Particle positions after the step.
    pub positions: &'a [[f64; DIM]],
    /// Particle velocities after the step.
    pub velocities: &'a [[f64; DIM]],
    /// Mean `vy` per cell; NaN for empty cells.
    pub profile: &'a [f64],
    /// Accepted collisions of each cell.
    pub cell_collisions: &'a [usize],
    /// Accepted collisions summed over cells.
    pub collisions: usize,
    /// Mean `vy` in the bottom slab; NaN when it is empty.
    pub wall_mean_vy: f64,
}

/// Per-step hook. Receives shared borrows only and cannot alter the run.
pub trait StepObserver {
    fn on_step(&mut self, view: &StepView<'_>);
}

impl<F> StepObserver for F
where
    F: FnMut(&StepView<'_>),
{
    fn on_step(&mut self, view: &StepView<'_>) {
        self(view)
    }
}

/// Owned, subsampled copy of a step for an out-of-loop consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct StepFrame {
    /// Zero-based realization index.
    pub realization: usize,
    /// Zero-based step index.
    pub step: usize,
    /// `(z, vy)` of every `stride`-th particle.
    pub phase_space: Vec<(f64, f64)>,
    /// Mean `vy` per cell.
    pub profile: Vec<f64>,
    /// Accepted collisions of the step.
    pub collisions: usize,
    /// Bottom-slab mean `vy`.
    pub wall_mean_vy: f64,
}

/// Forwards frames over a bounded channel without ever blocking the loop.
///
/// When the consumer lags and the channel is full the frame is dropped and
/// counted.
#[derive(Debug)]
pub struct ChannelObserver {
    tx: Sender<StepFrame>,
    stride: usize,
    dropped: usize,
}

impl ChannelObserver {
    /// Create the observer and the receiving end for the consumer.
    pub fn bounded(capacity: usize, stride: usize) -> (Self, Receiver<StepFrame>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        let observer = Self {
            tx,
            stride: stride.max(1),
            dropped: 0,
        };
        (observer, rx)
    }

    /// Frames discarded because the channel was full or closed.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl StepObserver for ChannelObserver {
    fn on_step(&mut self, view: &StepView<'_>) {
        let phase_space = view
            .positions
            .iter()
            .zip(view.velocities)
            .step_by(self.stride)
            .map(|(r, v)| (r[Z], v[Y]))
            .collect();
        let frame = StepFrame {
            realization: view.realization,
            step: view.step,
            phase_space,
            profile: view.profile.to_vec(),
            collisions: view.collisions,
            wall_mean_vy: view.wall_mean_vy,
        };
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
            }
        }
    }
}

/// Shared cancellation flag, polled once per timestep.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
