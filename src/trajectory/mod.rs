//! Episode records and rollout collection.
//!
//! This module provides:
//! - [`types::Transition`], [`types::EpisodeRecord`] -- what the training
//!   loop stores for every step and every episode.
//! - [`collector::RolloutCollector`] -- drives an episode with an
//!   [`collector::ActionPolicy`] and records what happened.

pub mod collector;
pub mod types;

// Re-export the most commonly used items at the module level.
pub use collector::{ActionPolicy, RandomPolicy, RolloutCollector, ScriptedPolicy};
pub use types::{mean_reward, success_rate, EpisodeRecord, Transition};
