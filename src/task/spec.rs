//! Task and stage specifications.
//!
//! A task is an ordered list of stages. Each stage is bound to one
//! interaction action and describes, as data, what must be visible and true
//! for an attempt to count, and which world flags flip when it does. The
//! judge walks this table; it has no stage-specific branches of its own.

use serde::{Deserialize, Serialize};

use crate::env::ActionKind;
use crate::error::{EpisodeError, EpisodeResult};

/// Physical preconditions tracked across stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldFlag {
    HoldingTarget,
    ContainerOpen,
    TargetInContainer,
}

/// Which half of the target pair a stage acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRole {
    Pickup,
    Container,
}

/// Side effect applied when the target is visible and `requires` holds but
/// the stage's own precondition does not. The attempt is still penalized
/// and the stage latch stays untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFallback {
    pub requires: Vec<WorldFlag>,
    pub clears: Vec<WorldFlag>,
}

/// One row of the stage table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: String,
    pub action: ActionKind,
    pub target: TargetRole,
    /// Flags that must all be set, in addition to the target being visible.
    #[serde(default)]
    pub requires: Vec<WorldFlag>,
    #[serde(default)]
    pub sets: Vec<WorldFlag>,
    #[serde(default)]
    pub clears: Vec<WorldFlag>,
    #[serde(default)]
    pub fallback: Option<StageFallback>,
}

/// The target pair plus the ordered stage table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSpec {
    pub pickup_target: String,
    pub container_target: String,
    pub stages: Vec<StageSpec>,
}

impl TaskSpec {
    /// The default four-stage stow task for the given target pair.
    pub fn stow(pickup_target: &str, container_target: &str) -> Self {
        use WorldFlag::*;

        Self {
            pickup_target: pickup_target.into(),
            container_target: container_target.into(),
            stages: vec![
                StageSpec {
                    name: "pickup".into(),
                    action: ActionKind::PickupObject,
                    target: TargetRole::Pickup,
                    requires: vec![],
                    sets: vec![HoldingTarget],
                    clears: vec![],
                    fallback: None,
                },
                StageSpec {
                    name: "open".into(),
                    action: ActionKind::OpenObject,
                    target: TargetRole::Container,
                    requires: vec![],
                    sets: vec![ContainerOpen],
                    clears: vec![],
                    fallback: None,
                },
                StageSpec {
                    name: "place".into(),
                    action: ActionKind::PlaceHeldObject,
                    target: TargetRole::Container,
                    requires: vec![HoldingTarget, ContainerOpen],
                    sets: vec![TargetInContainer],
                    clears: vec![HoldingTarget],
                    fallback: None,
                },
                StageSpec {
                    name: "close".into(),
                    action: ActionKind::CloseObject,
                    target: TargetRole::Container,
                    requires: vec![ContainerOpen, TargetInContainer],
                    sets: vec![],
                    clears: vec![ContainerOpen],
                    // Closing an empty open container still shuts it.
                    fallback: Some(StageFallback {
                        requires: vec![ContainerOpen],
                        clears: vec![ContainerOpen],
                    }),
                },
            ],
        }
    }

    /// The object type a stage's visibility check and targeted interaction use.
    pub fn target_type(&self, role: TargetRole) -> &str {
        match role {
            TargetRole::Pickup => &self.pickup_target,
            TargetRole::Container => &self.container_target,
        }
    }

    /// Index of the stage bound to `action`, if any.
    pub fn stage_for(&self, action: ActionKind) -> Option<usize> {
        self.stages.iter().position(|s| s.action == action)
    }

    /// Reject tables the judge cannot run unambiguously.
    pub fn validate(&self) -> EpisodeResult<()> {
        if self.stages.is_empty() {
            return Err(EpisodeError::InvalidTask("task has no stages".into()));
        }
        if self.pickup_target.is_empty() || self.container_target.is_empty() {
            return Err(EpisodeError::InvalidTask("target types must be non-empty".into()));
        }
        for (i, stage) in self.stages.iter().enumerate() {
            if !stage.action.is_interaction() {
                return Err(EpisodeError::InvalidTask(format!(
                    "stage '{}' is bound to non-interaction action {}",
                    stage.name, stage.action
                )));
            }
            if self.stages[..i].iter().any(|s| s.action == stage.action) {
                return Err(EpisodeError::InvalidTask(format!(
                    "action {} is bound to more than one stage",
                    stage.action
                )));
            }
        }
        Ok(())
    }
}

impl Default for TaskSpec {
    fn default() -> Self {
        Self::stow("Tomato", "Microwave")
    }
}
