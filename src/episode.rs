//! The episode controller.
//!
//! [`Episode`] owns one simulator connection and one [`ProgressState`]. The
//! training loop drives it with `new_episode` / `step` until `step` reports a
//! terminal transition. Calls are strictly sequential; a `step` may block on
//! two simulator round trips when a stage passes.

use std::time::Duration;

use crate::config::EpisodeConfig;
use crate::dataset;
use crate::env::{Action, Frame, Simulator};
use crate::error::{EpisodeError, EpisodeResult};
use crate::task::{actions, Judge, ProgressState, Verdict};

pub struct Episode<S> {
    sim: S,
    started: bool,
    gpu_id: usize,
    seed: u64,
    judge: Judge,
    objects: Vec<String>,
    progress: ProgressState,
    current_scene: Option<String>,
}

impl<S: Simulator> Episode<S> {
    /// Build a controller around an unstarted simulator.
    ///
    /// Loads the object type lists and validates the task table. The
    /// simulator itself is not contacted until [`Episode::new_episode`].
    pub fn new(config: &EpisodeConfig, sim: S) -> EpisodeResult<Self> {
        let objects = dataset::load_catalog(
            config.interactable_objects.as_deref(),
            config.receptacle_objects.as_deref(),
        )?;
        let judge = Judge::new(config.task.clone(), config.rewards.clone())?;
        let progress = ProgressState::new(judge.task());

        Ok(Self {
            sim,
            started: false,
            gpu_id: config.gpu_id,
            seed: config.effective_seed(),
            judge,
            objects,
            progress,
            current_scene: None,
        })
    }

    /// Start a fresh episode in `scene`.
    ///
    /// The first call launches the simulator; later calls reset it. The
    /// previous episode is discarded before the simulator is touched, so a
    /// failed call leaves the controller not started.
    pub async fn new_episode(&mut self, scene: &str) -> EpisodeResult<()> {
        self.progress = ProgressState::new(self.judge.task());
        self.current_scene = None;

        let launched = if self.started {
            self.sim.reset(scene, true).await
        } else {
            self.sim.start(scene, self.gpu_id).await
        };
        launched.map_err(|source| EpisodeError::EnvironmentStart {
            scene: scene.to_string(),
            source,
        })?;
        self.started = true;
        self.current_scene = Some(scene.to_string());

        tracing::info!(
            scene,
            pickup = %self.judge.task().pickup_target,
            container = %self.judge.task().container_target,
            "new episode"
        );
        Ok(())
    }

    /// Take the basic action at `action_index` and judge its outcome.
    pub async fn step(&mut self, action_index: usize) -> EpisodeResult<Verdict> {
        let action = actions::resolve(action_index)?;
        if self.current_scene.is_none() {
            return Err(EpisodeError::NotStarted);
        }
        if self.progress.is_terminal() {
            return Err(EpisodeError::EpisodeFinished);
        }

        self.progress.record_action(action.clone());
        let observation = self.sim.step(&action).await?;
        self.progress.record_issued(action.clone());
        let verdict = self
            .judge
            .judge(&mut self.sim, &action, &observation, &mut self.progress)
            .await?;

        if verdict.terminal {
            tracing::info!(
                steps = self.progress.actions_taken().len(),
                success = self.progress.is_success(),
                "episode terminal"
            );
        }
        Ok(verdict)
    }

    /// Re-drive the simulator from the starting scene through every action it
    /// executed, targeted interactions included, pausing `delay` after each.
    /// Progress is left untouched.
    pub async fn replay(&mut self, delay: Duration) -> EpisodeResult<()> {
        let scene = self.current_scene.clone().ok_or(EpisodeError::NotStarted)?;
        self.sim.reset(&scene, false).await?;

        tracing::info!(
            scene = %scene,
            actions = self.progress.actions_taken().len(),
            issued = self.progress.issued_actions().len(),
            "replaying episode"
        );
        for action in self.progress.issued_actions() {
            self.sim.step(action).await?;
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    /// The latest frame, for the policy to consume.
    pub fn state_for_agent(&self) -> Option<&Frame> {
        self.sim.current_frame()
    }

    pub fn environment(&self) -> &S {
        &self.sim
    }

    pub fn environment_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    /// `(pickup_target, container_target)`.
    pub fn target(&self) -> (&str, &str) {
        let task = self.judge.task();
        (&task.pickup_target, &task.container_target)
    }

    pub fn judge(&self) -> &Judge {
        &self.judge
    }

    /// Candidate object types loaded at construction.
    pub fn objects(&self) -> &[String] {
        &self.objects
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn current_scene(&self) -> Option<&str> {
        self.current_scene.as_deref()
    }

    pub fn actions_taken(&self) -> &[Action] {
        self.progress.actions_taken()
    }

    pub fn is_terminal(&self) -> bool {
        self.progress.is_terminal()
    }

    pub fn is_success(&self) -> bool {
        self.progress.is_success()
    }
}
