//! The stow task: what the agent is asked to do and how progress is judged.
//!
//! This module provides:
//! - [`actions`] -- the fixed basic action catalogue the policy indexes into.
//! - [`spec::TaskSpec`] -- the target pair and the ordered stage table.
//! - [`progress::ProgressState`] -- attempt counters, latches and world flags.
//! - [`judge::Judge`] -- turns an observation into reward, success and
//!   termination.

pub mod actions;
pub mod judge;
pub mod progress;
pub mod spec;

pub use judge::{Judge, Verdict};
pub use progress::{ProgressState, StageProgress, WorldFlags};
pub use spec::{StageFallback, StageSpec, TargetRole, TaskSpec, WorldFlag};
