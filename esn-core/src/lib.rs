//! Simulation and training of Echo State Networks: a fixed, randomly wired
//! recurrent reservoir driven by an input signal, whose only trainable part
//! is a ridge-regularized linear readout.
//!
//! The building blocks are:
//! - [`ReservoirBuilder`]: sparse random weight matrices, normalized to a
//!   target spectral radius,
//! - [`EchoStateNetwork`]: the per-timestep recurrence over a [`Trial`],
//! - [`Trainer`]: trial bookkeeping, train/test partitioning and the ridge
//!   regression that fits the readout weights.

#[macro_use]
extern crate log;

mod activation;
mod error;
mod esn;
mod params;
mod reservoir;
mod trainer;
mod trial;

pub use activation::Activation;
pub use error::{Error, Result};
pub use esn::{EchoStateNetwork, SimulationType};
pub use params::{Params, ReservoirKind};
pub use reservoir::ReservoirBuilder;
pub use trainer::{TestRun, Trainer};
pub use trial::Trial;

/// The scalar type of all network weights and signals.
/// Regression and eigenvalue work runs in `f64` and is truncated back.
pub type Weight = f32;
