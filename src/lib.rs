//! Direct Simulation Monte Carlo of a dilute gas between two plates.
//!
//! The lower plate is a diffuse thermal wall sliding at `uw`, the upper one
//! reflects specularly. [`run`] evolves `n_sim` realizations for `n_t`
//! steps and returns the mean lateral velocity next to the moving wall.

pub mod config;
pub mod core;
pub mod error;

#[cfg(feature = "python")]
mod python;

pub use crate::config::{Execution, Parameters, SimulationConfig};
pub use crate::core::{run, EnsembleResult, EnsembleRunner};
pub use crate::error::{Error, Result};
