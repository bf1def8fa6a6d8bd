//! Rollout collection: driving an [`Episode`] with an action policy.
//!
//! The [`RolloutCollector`] runs one episode per scene by repeatedly:
//!   1. handing the current frame to the policy,
//!   2. stepping the episode with the chosen action index,
//!   3. recording the resulting transition,
//!
//! until the judge declares the episode terminal or the step limit is hit.

use anyhow::Result;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::env::{Frame, Simulator};
use crate::episode::Episode;
use crate::task::actions;
use crate::trajectory::types::{EpisodeRecord, Transition};

// ---------------------------------------------------------------------------
// Policy trait (minimal interface the collector needs)
// ---------------------------------------------------------------------------

/// Chooses the next basic action index.
#[allow(async_fn_in_trait)]
pub trait ActionPolicy {
    /// Given the latest frame (if any), return an index below `num_actions`.
    async fn select_action(&mut self, frame: Option<&Frame>, num_actions: usize) -> Result<usize>;

    /// Called before every episode. The default does nothing.
    fn reset(&mut self) {}
}

/// Uniformly random actions from a seeded generator.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ActionPolicy for RandomPolicy {
    async fn select_action(&mut self, _frame: Option<&Frame>, num_actions: usize) -> Result<usize> {
        if num_actions == 0 {
            anyhow::bail!("no actions to choose from");
        }
        Ok(self.rng.gen_range(0..num_actions))
    }
}

/// Plays a fixed list of indices, restarting from the top every episode.
#[derive(Debug, Clone)]
pub struct ScriptedPolicy {
    script: Vec<usize>,
    cursor: usize,
}

impl ScriptedPolicy {
    pub fn new(script: Vec<usize>) -> Self {
        Self { script, cursor: 0 }
    }
}

impl ActionPolicy for ScriptedPolicy {
    async fn select_action(
        &mut self,
        _frame: Option<&Frame>,
        _num_actions: usize,
    ) -> Result<usize> {
        let Some(index) = self.script.get(self.cursor).copied() else {
            anyhow::bail!("script exhausted after {} actions", self.script.len());
        };
        self.cursor += 1;
        Ok(index)
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

// ---------------------------------------------------------------------------
// Rollout collector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RolloutCollector {
    /// Steps after which an episode is truncated.
    max_steps: usize,
}

impl RolloutCollector {
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }

    /// Run one episode per entry of `scenes`.
    pub async fn collect<S, P>(
        &self,
        episode: &mut Episode<S>,
        policy: &mut P,
        scenes: &[String],
    ) -> Result<Vec<EpisodeRecord>>
    where
        S: Simulator,
        P: ActionPolicy,
    {
        let mut records = Vec::with_capacity(scenes.len());

        for (ep, scene) in scenes.iter().enumerate() {
            let record = self.run_episode(episode, policy, scene).await?;
            tracing::info!(
                episode = ep,
                scene = %scene,
                steps = record.len(),
                reward = record.total_reward,
                success = record.success,
                terminal = record.terminal,
                "collected episode"
            );
            records.push(record);
        }

        Ok(records)
    }

    /// Run a single episode in `scene`.
    pub async fn run_episode<S, P>(
        &self,
        episode: &mut Episode<S>,
        policy: &mut P,
        scene: &str,
    ) -> Result<EpisodeRecord>
    where
        S: Simulator,
        P: ActionPolicy,
    {
        episode.new_episode(scene).await?;
        policy.reset();

        let num_actions = actions::catalogue_size();
        let mut transitions = Vec::new();
        let mut total_reward = 0.0;
        let mut terminal = false;

        for step_index in 0..self.max_steps {
            let index = policy
                .select_action(episode.state_for_agent(), num_actions)
                .await?;
            let action = actions::resolve(index)?;
            let verdict = episode.step(index).await?;

            total_reward += verdict.reward;
            terminal = verdict.terminal;
            transitions.push(Transition {
                step_index,
                action: action.action,
                reward: verdict.reward,
                terminal,
                action_succeeded: verdict.action_succeeded,
            });

            if terminal {
                break;
            }
        }

        Ok(EpisodeRecord {
            id: Uuid::new_v4().to_string(),
            scene: scene.to_string(),
            recorded_at: Utc::now(),
            transitions,
            total_reward,
            success: episode.is_success(),
            terminal,
            attempts: episode.progress().attempts(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
