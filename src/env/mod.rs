//! Simulator abstractions and concrete backends.
//!
//! Every backend implements the [`Simulator`] trait so that the episode
//! controller can interact with it uniformly.
//!
//! Included backends:
//! - **THOR bridge** ([`thor`]) -- a live simulator reached over HTTP.
//! - **Mock** ([`mock`]) -- a deterministic in-process room, making it
//!   possible to test the judge and the controller without a GPU.

pub mod mock;
pub mod thor;
pub mod traits;

// Re-export the core trait and observation types at the module level.
pub use traits::{Action, ActionKind, Frame, ObjectState, Observation, Simulator};

// ---------------------------------------------------------------------------
// AnySimulator: enum dispatch wrapper for runtime backend selection
// ---------------------------------------------------------------------------

/// An enum wrapper around all concrete simulator types, enabling runtime
/// backend selection without `dyn` (which is incompatible with async trait
/// methods).
#[derive(Debug)]
pub enum AnySimulator {
    Thor(thor::ThorSimulator),
    Mock(mock::MockSimulator),
}

impl Simulator for AnySimulator {
    async fn start(&mut self, scene: &str, gpu_id: usize) -> anyhow::Result<()> {
        match self {
            Self::Thor(s) => s.start(scene, gpu_id).await,
            Self::Mock(s) => s.start(scene, gpu_id).await,
        }
    }

    async fn reset(&mut self, scene: &str, change_seed: bool) -> anyhow::Result<()> {
        match self {
            Self::Thor(s) => s.reset(scene, change_seed).await,
            Self::Mock(s) => s.reset(scene, change_seed).await,
        }
    }

    async fn step(&mut self, action: &Action) -> anyhow::Result<Observation> {
        match self {
            Self::Thor(s) => s.step(action).await,
            Self::Mock(s) => s.step(action).await,
        }
    }

    fn last_observation(&self) -> Option<&Observation> {
        match self {
            Self::Thor(s) => s.last_observation(),
            Self::Mock(s) => s.last_observation(),
        }
    }

    fn current_frame(&self) -> Option<&Frame> {
        match self {
            Self::Thor(s) => s.current_frame(),
            Self::Mock(s) => s.current_frame(),
        }
    }

    fn find_visible(&self, object_type: &str) -> Option<String> {
        match self {
            Self::Thor(s) => s.find_visible(object_type),
            Self::Mock(s) => s.find_visible(object_type),
        }
    }
}
