//! Thor Judge: progress tracking and reward shaping for a pick-and-place task
//! in an interactive 3D simulator.
//!
//! An [`episode::Episode`] forwards the agent's basic actions to a
//! [`env::Simulator`] and lets a [`task::Judge`] turn each observation into a
//! reward, a native success flag and a termination signal.

pub mod config;
pub mod dataset;
pub mod env;
pub mod episode;
pub mod error;
pub mod task;
pub mod trajectory;
