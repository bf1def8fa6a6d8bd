use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::task::TaskSpec;

/// Complete configuration for one episode controller (one training worker).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
    /// Base random seed shared by all workers (default: 0).
    pub seed: u64,
    /// Worker rank, added to `seed` so that workers diverge (default: 0).
    pub rank: u64,
    /// Device binding forwarded to the simulator on start (default: 0).
    pub gpu_id: usize,
    pub simulator: SimulatorConfig,
    pub rewards: RewardConfig,
    pub task: TaskSpec,
    /// Path to the interactable object type list. `None` skips loading.
    pub interactable_objects: Option<PathBuf>,
    /// Path to the receptacle object type list. `None` skips loading.
    pub receptacle_objects: Option<PathBuf>,
}

/// Simulator launch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Base URL of the simulator bridge server.
    pub server_url: String,
    /// Grid step size in metres (default: 0.25).
    pub grid_size: f64,
    /// Camera field of view in degrees (default: 90).
    pub fov: f64,
    /// Randomize object placement on reset (default: false).
    pub randomize_objects: bool,
    /// Host platform, selects the default executable.
    pub arch: Arch,
    /// Overrides the platform default executable path.
    pub executable_path: Option<PathBuf>,
}

/// Host platform of the local simulator build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Linux,
    Osx,
}

/// Reward shaping constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Applied on every step (default: -0.01).
    pub step_penalty: f64,
    /// Added when a stage precondition fails (default: -1.0).
    pub failed_action_penalty: f64,
    /// One-time bonus for a stage that succeeds on its first attempt (default: 1.0).
    pub process_reward: f64,
}

impl EpisodeConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// The seed this worker hands to the simulator and its own RNG.
    pub fn effective_seed(&self) -> u64 {
        self.seed.wrapping_add(self.rank)
    }
}

impl SimulatorConfig {
    /// The simulator executable to launch, honouring an explicit override.
    pub fn local_executable_path(&self) -> PathBuf {
        if let Some(path) = &self.executable_path {
            return path.clone();
        }
        match self.arch {
            Arch::Osx => PathBuf::from(
                "./datasets/builds/thor-local-OSXIntel64.app/Contents/MacOS/thor-local-OSXIntel64",
            ),
            Arch::Linux => PathBuf::from("./datasets/builds/thor-local-Linux64"),
        }
    }
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            rank: 0,
            gpu_id: 0,
            simulator: SimulatorConfig::default(),
            rewards: RewardConfig::default(),
            task: TaskSpec::default(),
            interactable_objects: None,
            receptacle_objects: None,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8200".into(),
            grid_size: 0.25,
            fov: 90.0,
            randomize_objects: false,
            arch: if cfg!(target_os = "macos") {
                Arch::Osx
            } else {
                Arch::Linux
            },
            executable_path: None,
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            step_penalty: -0.01,
            failed_action_penalty: -1.0,
            process_reward: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: EpisodeConfig =
            serde_json::from_str(r#"{"seed": 7, "rank": 3, "rewards": {"process_reward": 2.0}}"#)
                .unwrap();
        assert_eq!(config.effective_seed(), 10);
        assert_eq!(config.rewards.process_reward, 2.0);
        assert_eq!(config.rewards.step_penalty, -0.01);
        assert_eq!(config.task.pickup_target, "Tomato");
        assert_eq!(config.simulator.grid_size, 0.25);
    }

    #[test]
    fn executable_path_follows_arch_unless_overridden() {
        let mut sim = SimulatorConfig {
            arch: Arch::Osx,
            ..SimulatorConfig::default()
        };
        assert!(sim
            .local_executable_path()
            .ends_with("MacOS/thor-local-OSXIntel64"));

        sim.arch = Arch::Linux;
        assert_eq!(
            sim.local_executable_path(),
            PathBuf::from("./datasets/builds/thor-local-Linux64")
        );

        sim.executable_path = Some("/opt/thor/bin".into());
        assert_eq!(sim.local_executable_path(), PathBuf::from("/opt/thor/bin"));
    }
}
