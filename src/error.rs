//! Error taxonomy for the episode controller.
//!
//! A physical action that the simulator reports as failed is *not* an error:
//! it is a normal outcome that shows up in the reward and in
//! `action_succeeded`. Everything in [`EpisodeError`] stops the current call.

use std::path::PathBuf;

use thiserror::Error;

pub type EpisodeResult<T> = Result<T, EpisodeError>;

#[derive(Debug, Error)]
pub enum EpisodeError {
    /// The simulator could not be launched or attached for the first episode.
    #[error("failed to start simulator for scene '{scene}': {source}")]
    EnvironmentStart {
        scene: String,
        #[source]
        source: anyhow::Error,
    },

    /// The action index is outside the basic action catalogue. No state was
    /// mutated.
    #[error("action index {index} is out of range (catalogue has {size} actions)")]
    InvalidAction { index: usize, size: usize },

    /// A stage precondition saw the target type as visible, but the simulator
    /// could not name a visible instance when asked for one.
    #[error("no visible '{object_type}' instance for the targeted {stage} interaction")]
    AmbiguousTarget { stage: String, object_type: String },

    #[error("step called before new_episode")]
    NotStarted,

    #[error("cannot step in a terminated episode")]
    EpisodeFinished,

    #[error("invalid task specification: {0}")]
    InvalidTask(String),

    #[error("failed to read object list {path}: {source}")]
    Dataset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other failure reported by the simulator transport.
    #[error(transparent)]
    Adapter(#[from] anyhow::Error),
}
