//! Per-episode progress memory.
//!
//! [`ProgressState`] is created at episode start and mutated only by the
//! judge (and by the controller's action log). Attempt counters only grow,
//! stage latches and the overall success flag only go from false to true.

use serde::{Deserialize, Serialize};

use super::spec::{TaskSpec, WorldFlag};
use crate::env::Action;

/// The physical preconditions the later stages depend on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldFlags {
    pub holding_target: bool,
    pub container_open: bool,
    pub target_in_container: bool,
}

impl WorldFlags {
    pub fn get(&self, flag: WorldFlag) -> bool {
        match flag {
            WorldFlag::HoldingTarget => self.holding_target,
            WorldFlag::ContainerOpen => self.container_open,
            WorldFlag::TargetInContainer => self.target_in_container,
        }
    }

    pub fn set(&mut self, flag: WorldFlag, value: bool) {
        match flag {
            WorldFlag::HoldingTarget => self.holding_target = value,
            WorldFlag::ContainerOpen => self.container_open = value,
            WorldFlag::TargetInContainer => self.target_in_container = value,
        }
    }

    /// Whether every flag in `flags` is set.
    pub fn all(&self, flags: &[WorldFlag]) -> bool {
        flags.iter().all(|f| self.get(*f))
    }

    /// Set every flag in `sets`, then clear every flag in `clears`.
    pub fn apply(&mut self, sets: &[WorldFlag], clears: &[WorldFlag]) {
        for flag in sets {
            self.set(*flag, true);
        }
        for flag in clears {
            self.set(*flag, false);
        }
    }
}

/// Attempt counter and success latch for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    pub name: String,
    pub attempts: u32,
    pub succeeded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    stages: Vec<StageProgress>,
    flags: WorldFlags,
    success: bool,
    actions_taken: Vec<Action>,
    /// Every action the simulator executed, targeted follow-ups included.
    issued: Vec<Action>,
}

impl ProgressState {
    /// All-zero progress for the stages of `task`.
    pub fn new(task: &TaskSpec) -> Self {
        Self {
            stages: task
                .stages
                .iter()
                .map(|s| StageProgress {
                    name: s.name.clone(),
                    attempts: 0,
                    succeeded: false,
                })
                .collect(),
            flags: WorldFlags::default(),
            success: false,
            actions_taken: Vec::new(),
            issued: Vec::new(),
        }
    }

    pub fn stages(&self) -> &[StageProgress] {
        &self.stages
    }

    /// Look up a stage by name.
    pub fn stage(&self, name: &str) -> Option<&StageProgress> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn flags(&self) -> WorldFlags {
        self.flags
    }

    /// Attempt counts in stage order.
    pub fn attempts(&self) -> Vec<u32> {
        self.stages.iter().map(|s| s.attempts).collect()
    }

    /// True once every stage has been attempted at least once.
    ///
    /// NOTE: this is attempt-gated, not success-gated. An episode that fails
    /// every stage once is terminal too.
    pub fn is_terminal(&self) -> bool {
        self.stages.iter().all(|s| s.attempts >= 1)
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Every action attempted so far, in order.
    pub fn actions_taken(&self) -> &[Action] {
        &self.actions_taken
    }

    /// Every action sent to the simulator so far, in order. Replaying this
    /// log from the starting scene reproduces the episode's world state.
    pub fn issued_actions(&self) -> &[Action] {
        &self.issued
    }

    pub(crate) fn record_action(&mut self, action: Action) {
        self.actions_taken.push(action);
    }

    pub(crate) fn record_issued(&mut self, action: Action) {
        self.issued.push(action);
    }

    /// Count one attempt at stage `index` and return the new count.
    pub(crate) fn record_attempt(&mut self, index: usize) -> u32 {
        let stage = &mut self.stages[index];
        stage.attempts += 1;
        stage.attempts
    }

    pub(crate) fn latch(&mut self, index: usize) {
        self.stages[index].succeeded = true;
    }

    pub(crate) fn flags_mut(&mut self) -> &mut WorldFlags {
        &mut self.flags
    }

    /// Latch overall success once every stage has succeeded.
    pub(crate) fn refresh_success(&mut self) {
        if self.stages.iter().all(|s| s.succeeded) {
            self.success = true;
        }
    }
}
