//! Records of what happened during an episode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::env::ActionKind;

// ---------------------------------------------------------------------------
// Single transition
// ---------------------------------------------------------------------------

/// One `step` call as the training loop saw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Zero-based index of this step within the episode.
    pub step_index: usize,
    pub action: ActionKind,
    pub reward: f64,
    pub terminal: bool,
    pub action_succeeded: bool,
}

// ---------------------------------------------------------------------------
// Full episode
// ---------------------------------------------------------------------------

/// A complete episode: transitions plus the final progress summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub scene: String,
    pub recorded_at: DateTime<Utc>,
    pub transitions: Vec<Transition>,
    pub total_reward: f64,
    /// Every stage latched.
    pub success: bool,
    /// Ended by the judge rather than truncated by the step limit.
    pub terminal: bool,
    /// Final attempt count per stage, in stage order.
    pub attempts: Vec<u32>,
}

impl EpisodeRecord {
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Fraction of steps whose primitive action the simulator accepted.
    pub fn action_success_rate(&self) -> f64 {
        if self.transitions.is_empty() {
            return 0.0;
        }
        let ok = self.transitions.iter().filter(|t| t.action_succeeded).count();
        ok as f64 / self.transitions.len() as f64
    }
}

/// Fraction of `records` that reached overall success.
pub fn success_rate(records: &[EpisodeRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let successes = records.iter().filter(|r| r.success).count();
    successes as f64 / records.len() as f64
}

/// Mean total reward over `records`.
pub fn mean_reward(records: &[EpisodeRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().map(|r| r.total_reward).sum::<f64>() / records.len() as f64
}
