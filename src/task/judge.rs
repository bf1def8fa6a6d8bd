//! Reward, success and termination for one step.
//!
//! For every attempted action the [`Judge`]:
//!   1. charges the step penalty,
//!   2. if the action is bound to a stage, counts the attempt and checks the
//!      stage precondition against the observation and the world flags,
//!   3. on a pass, looks up a visible instance of the stage's target type,
//!      issues the object-qualified interaction against it, flips the stage's
//!      flags and latch, and grants the process bonus if this was the
//!      stage's first attempt,
//!   4. on a miss, applies the stage fallback (if any) and the failure
//!      penalty,
//!   5. latches overall success and reports termination.

use super::progress::ProgressState;
use super::spec::TaskSpec;
use crate::config::RewardConfig;
use crate::env::{Action, Observation, Simulator};
use crate::error::{EpisodeError, EpisodeResult};

/// What the training loop gets back for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub reward: f64,
    pub terminal: bool,
    /// The simulator's native success flag for the action the agent chose,
    /// not the judge's semantic outcome.
    pub action_succeeded: bool,
}

impl Verdict {
    pub fn into_tuple(self) -> (f64, bool, bool) {
        (self.reward, self.terminal, self.action_succeeded)
    }
}

#[derive(Debug, Clone)]
pub struct Judge {
    task: TaskSpec,
    rewards: RewardConfig,
}

impl Judge {
    pub fn new(task: TaskSpec, rewards: RewardConfig) -> EpisodeResult<Self> {
        task.validate()?;
        Ok(Self { task, rewards })
    }

    pub fn task(&self) -> &TaskSpec {
        &self.task
    }

    pub fn rewards(&self) -> &RewardConfig {
        &self.rewards
    }

    /// Judge `action`, whose outcome is `observation`.
    ///
    /// A passing stage issues one more action through `sim`.
    pub async fn judge<S: Simulator>(
        &self,
        sim: &mut S,
        action: &Action,
        observation: &Observation,
        progress: &mut ProgressState,
    ) -> EpisodeResult<Verdict> {
        let mut reward = self.rewards.step_penalty;
        let action_succeeded = observation.last_action_success;

        if let Some(index) = self.task.stage_for(action.action) {
            reward += self.judge_stage(sim, index, observation, progress).await?;
        }

        progress.refresh_success();

        Ok(Verdict {
            reward,
            terminal: progress.is_terminal(),
            action_succeeded,
        })
    }

    /// Returns the reward on top of the step penalty.
    async fn judge_stage<S: Simulator>(
        &self,
        sim: &mut S,
        index: usize,
        observation: &Observation,
        progress: &mut ProgressState,
    ) -> EpisodeResult<f64> {
        let stage = &self.task.stages[index];
        let target_type = self.task.target_type(stage.target);
        let visible = observation.is_visible(target_type);
        let flags = progress.flags();

        if !(visible && flags.all(&stage.requires)) {
            let attempts = progress.record_attempt(index);
            if let Some(fallback) = &stage.fallback {
                if visible && flags.all(&fallback.requires) {
                    progress.flags_mut().apply(&[], &fallback.clears);
                }
            }
            tracing::warn!(
                stage = %stage.name,
                attempts,
                visible,
                flags = ?progress.flags(),
                "stage precondition failed"
            );
            return Ok(self.rewards.failed_action_penalty);
        }

        // Resolve the target before counting the attempt so a failed lookup
        // leaves the progress state as it was.
        let object_id = sim
            .find_visible(target_type)
            .ok_or_else(|| EpisodeError::AmbiguousTarget {
                stage: stage.name.clone(),
                object_type: target_type.to_string(),
            })?;
        let attempts = progress.record_attempt(index);

        let interaction = Action::targeted(stage.action, object_id.as_str());
        let outcome = sim.step(&interaction).await?;
        progress.record_issued(interaction);

        progress.flags_mut().apply(&stage.sets, &stage.clears);
        progress.latch(index);

        tracing::debug!(
            stage = %stage.name,
            attempts,
            object_id = %object_id,
            interaction_success = outcome.last_action_success,
            "stage succeeded"
        );

        if attempts == 1 {
            Ok(self.rewards.process_reward)
        } else {
            Ok(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::mock::{MockObject, MockScene, MockSimulator};
    use crate::env::ActionKind;

    const P: f64 = -0.01;
    const F: f64 = -1.0;
    const B: f64 = 1.0;

    fn assert_reward(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "reward {actual} != {expected}"
        );
    }

    fn judge() -> Judge {
        Judge::new(TaskSpec::default(), RewardConfig::default()).unwrap()
    }

    /// A room where both targets are always in view.
    async fn open_room() -> MockSimulator {
        let scene = MockScene::new("Room")
            .with_object(MockObject::everywhere("Tomato", "Tomato|1"))
            .with_object(MockObject::everywhere("Microwave", "Microwave|1"));
        let mut sim = MockSimulator::with_scenes(vec![scene]);
        sim.start("Room", 0).await.unwrap();
        sim
    }

    /// A room with only the microwave in view.
    async fn container_only_room() -> MockSimulator {
        let scene = MockScene::new("Room")
            .with_object(MockObject::everywhere("Microwave", "Microwave|1"));
        let mut sim = MockSimulator::with_scenes(vec![scene]);
        sim.start("Room", 0).await.unwrap();
        sim
    }

    async fn act(
        judge: &Judge,
        sim: &mut MockSimulator,
        progress: &mut ProgressState,
        kind: ActionKind,
    ) -> Verdict {
        let action = Action::basic(kind);
        let observation = sim.step(&action).await.unwrap();
        judge
            .judge(sim, &action, &observation, progress)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn full_sequence_earns_every_bonus_and_terminates() {
        let judge = judge();
        let mut sim = open_room().await;
        let mut progress = ProgressState::new(judge.task());

        let mut rewards = Vec::new();
        let mut terminals = Vec::new();
        for kind in [
            ActionKind::PickupObject,
            ActionKind::OpenObject,
            ActionKind::PlaceHeldObject,
            ActionKind::CloseObject,
        ] {
            let verdict = act(&judge, &mut sim, &mut progress, kind).await;
            rewards.push(verdict.reward);
            terminals.push(verdict.terminal);
        }

        for reward in rewards {
            assert_reward(reward, P + B);
        }
        assert_eq!(terminals, vec![false, false, false, true]);
        assert!(progress.is_success());
        let flags = progress.flags();
        assert!(!flags.holding_target);
        assert!(!flags.container_open);
        assert!(flags.target_in_container);
    }

    #[tokio::test]
    async fn pickup_without_visible_target_is_penalized() {
        let judge = judge();
        let mut sim = container_only_room().await;
        let mut progress = ProgressState::new(judge.task());

        let verdict = act(&judge, &mut sim, &mut progress, ActionKind::PickupObject).await;

        assert_reward(verdict.reward, P + F);
        assert!(!verdict.terminal);
        assert!(!progress.flags().holding_target);
        assert_eq!(progress.stage("pickup").unwrap().attempts, 1);
        assert!(!progress.stage("pickup").unwrap().succeeded);
        // No targeted follow-up was issued.
        assert_eq!(sim.issued().len(), 1);
    }

    #[tokio::test]
    async fn movement_only_pays_step_penalty() {
        let judge = judge();
        let mut sim = open_room().await;
        let mut progress = ProgressState::new(judge.task());

        let verdict = act(&judge, &mut sim, &mut progress, ActionKind::RotateLeft).await;
        assert_reward(verdict.reward, P);
        assert!(verdict.action_succeeded);
        assert_eq!(progress.attempts(), vec![0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn place_without_holding_changes_nothing() {
        let judge = judge();
        let mut sim = container_only_room().await;
        let mut progress = ProgressState::new(judge.task());

        act(&judge, &mut sim, &mut progress, ActionKind::OpenObject).await;
        let before = progress.flags();
        let verdict = act(&judge, &mut sim, &mut progress, ActionKind::PlaceHeldObject).await;

        assert_reward(verdict.reward, P + F);
        assert_eq!(progress.flags(), before);
        assert!(progress.flags().container_open);
        assert!(!progress.stage("place").unwrap().succeeded);
    }

    #[tokio::test]
    async fn closing_empty_open_container_shuts_it_but_is_penalized() {
        let judge = judge();
        let mut sim = container_only_room().await;
        let mut progress = ProgressState::new(judge.task());

        act(&judge, &mut sim, &mut progress, ActionKind::OpenObject).await;
        assert!(progress.flags().container_open);

        let verdict = act(&judge, &mut sim, &mut progress, ActionKind::CloseObject).await;
        assert_reward(verdict.reward, P + F);
        assert!(!progress.flags().container_open);
        assert!(!progress.stage("close").unwrap().succeeded);
    }

    #[tokio::test]
    async fn closing_a_closed_container_is_a_plain_failure() {
        let judge = judge();
        let mut sim = container_only_room().await;
        let mut progress = ProgressState::new(judge.task());

        let verdict = act(&judge, &mut sim, &mut progress, ActionKind::CloseObject).await;
        assert_reward(verdict.reward, P + F);
        assert_eq!(progress.flags(), Default::default());
        assert_eq!(progress.stage("close").unwrap().attempts, 1);
    }

    #[tokio::test]
    async fn bonus_is_only_granted_on_first_attempt() {
        let judge = judge();
        let mut sim = open_room().await;
        let mut progress = ProgressState::new(judge.task());

        // Repeating a successful stage never pays again.
        let first = act(&judge, &mut sim, &mut progress, ActionKind::OpenObject).await;
        let second = act(&judge, &mut sim, &mut progress, ActionKind::OpenObject).await;
        assert_reward(first.reward, P + B);
        assert_reward(second.reward, P);

        // A stage that first fails then succeeds never pays the bonus.
        let miss = act(&judge, &mut sim, &mut progress, ActionKind::PlaceHeldObject).await;
        act(&judge, &mut sim, &mut progress, ActionKind::PickupObject).await;
        let hit = act(&judge, &mut sim, &mut progress, ActionKind::PlaceHeldObject).await;
        assert_reward(miss.reward, P + F);
        assert_reward(hit.reward, P);
        assert!(progress.stage("place").unwrap().succeeded);
        assert!(progress.flags().target_in_container);
    }

    #[tokio::test]
    async fn failing_every_stage_once_still_terminates() {
        let scene = MockScene::new("Empty");
        let mut sim = MockSimulator::with_scenes(vec![scene]);
        sim.start("Empty", 0).await.unwrap();
        let judge = judge();
        let mut progress = ProgressState::new(judge.task());

        let kinds = [
            ActionKind::CloseObject,
            ActionKind::PlaceHeldObject,
            ActionKind::OpenObject,
            ActionKind::PickupObject,
        ];
        for (i, kind) in kinds.into_iter().enumerate() {
            let verdict = act(&judge, &mut sim, &mut progress, kind).await;
            assert_reward(verdict.reward, P + F);
            assert_eq!(verdict.terminal, i == 3);
        }
        assert!(!progress.is_success());
    }

    #[tokio::test]
    async fn action_succeeded_mirrors_native_flag() {
        let judge = judge();
        let mut sim = open_room().await;
        sim.fail_action(ActionKind::PickupObject);
        let mut progress = ProgressState::new(judge.task());

        let verdict = act(&judge, &mut sim, &mut progress, ActionKind::PickupObject).await;
        assert!(!verdict.action_succeeded);
        // Semantic success is judged from visibility, not the native flag.
        assert_reward(verdict.reward, P + B);
        assert!(progress.flags().holding_target);
    }

    #[tokio::test]
    async fn targeted_interaction_uses_first_visible_instance() {
        let scene = MockScene::new("Twins")
            .with_object(MockObject::new("Tomato", "Tomato|hidden", &[]))
            .with_object(MockObject::everywhere("Tomato", "Tomato|a"))
            .with_object(MockObject::everywhere("Tomato", "Tomato|b"));
        let mut sim = MockSimulator::with_scenes(vec![scene]);
        sim.start("Twins", 0).await.unwrap();
        let judge = judge();
        let mut progress = ProgressState::new(judge.task());

        act(&judge, &mut sim, &mut progress, ActionKind::PickupObject).await;

        assert_eq!(
            sim.issued(),
            &[
                Action::basic(ActionKind::PickupObject),
                Action::targeted(ActionKind::PickupObject, "Tomato|a"),
            ]
        );
    }

    #[tokio::test]
    async fn stale_lookup_fails_loudly() {
        let judge = judge();
        let mut sim = open_room().await;
        sim.set_stale_lookup(true);
        let mut progress = ProgressState::new(judge.task());

        let action = Action::basic(ActionKind::OpenObject);
        let observation = sim.step(&action).await.unwrap();
        let err = judge
            .judge(&mut sim, &action, &observation, &mut progress)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EpisodeError::AmbiguousTarget { ref object_type, .. } if object_type == "Microwave"
        ));
        assert!(!progress.flags().container_open);
        assert!(!progress.stage("open").unwrap().succeeded);
        assert_eq!(progress.stage("open").unwrap().attempts, 0);
    }

    #[tokio::test]
    async fn lost_target_on_last_stage_leaves_episode_open() {
        let judge = judge();
        let mut sim = open_room().await;
        let mut progress = ProgressState::new(judge.task());
        for kind in [
            ActionKind::PickupObject,
            ActionKind::OpenObject,
            ActionKind::PlaceHeldObject,
        ] {
            act(&judge, &mut sim, &mut progress, kind).await;
        }

        sim.set_stale_lookup(true);
        let action = Action::basic(ActionKind::CloseObject);
        let observation = sim.step(&action).await.unwrap();
        let err = judge
            .judge(&mut sim, &action, &observation, &mut progress)
            .await
            .unwrap_err();
        assert!(matches!(err, EpisodeError::AmbiguousTarget { .. }));
        assert_eq!(progress.attempts(), vec![1, 1, 1, 0]);
        assert!(!progress.is_terminal());
        assert!(progress.flags().container_open);

        sim.set_stale_lookup(false);
        let verdict = act(&judge, &mut sim, &mut progress, ActionKind::CloseObject).await;
        assert_reward(verdict.reward, P + B);
        assert!(verdict.terminal);
        assert!(progress.is_success());
    }

    #[tokio::test]
    async fn closing_an_out_of_view_open_container_keeps_it_open() {
        let scene = MockScene::new("Corner")
            .with_object(MockObject::new("Microwave", "Microwave|1", &[0]));
        let mut sim = MockSimulator::with_scenes(vec![scene]);
        sim.start("Corner", 0).await.unwrap();
        let judge = judge();
        let mut progress = ProgressState::new(judge.task());

        act(&judge, &mut sim, &mut progress, ActionKind::OpenObject).await;
        act(&judge, &mut sim, &mut progress, ActionKind::RotateRight).await;
        assert!(!sim.last_observation().unwrap().is_visible("Microwave"));

        let verdict = act(&judge, &mut sim, &mut progress, ActionKind::CloseObject).await;
        assert_reward(verdict.reward, P + F);
        assert!(progress.flags().container_open);
        assert!(!progress.stage("close").unwrap().succeeded);
    }
}
