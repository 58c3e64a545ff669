//! Particle-based transport and collision engine for the Rayleigh problem.
//!
//! One timestep splits into ballistic drift, wall handling, and stochastic
//! binary collisions sampled per spatial cell (NTC scheme).

pub mod boundary;
pub mod cells;
pub mod collision;
pub mod ensemble;
pub mod observer;
pub mod particle;
pub mod result;
pub mod sim;

pub use boundary::{WallHits, Walls};
pub use cells::CellIndex;
pub use collision::CollisionEngine;
pub use ensemble::{run, EnsembleRunner};
pub use observer::{CancelToken, ChannelObserver, StepFrame, StepObserver, StepView};
pub use particle::ParticleEnsemble;
pub use result::{AbortedRealization, EnsembleResult};
pub use sim::{StepReport, TimeStepper};
