//! Core simulator trait and the types exchanged with it.
//!
//! Every simulator backend (the HTTP bridge, the in-process mock) implements
//! the [`Simulator`] trait so that the episode controller can drive it
//! uniformly.

use serde::{Deserialize, Serialize};

/// The primitive actions understood by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    MoveAhead,
    RotateLeft,
    RotateRight,
    LookUp,
    LookDown,
    OpenObject,
    CloseObject,
    PickupObject,
    PlaceHeldObject,
}

impl ActionKind {
    /// The action name as the simulator spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MoveAhead => "MoveAhead",
            Self::RotateLeft => "RotateLeft",
            Self::RotateRight => "RotateRight",
            Self::LookUp => "LookUp",
            Self::LookDown => "LookDown",
            Self::OpenObject => "OpenObject",
            Self::CloseObject => "CloseObject",
            Self::PickupObject => "PickupObject",
            Self::PlaceHeldObject => "PlaceHeldObject",
        }
    }

    /// Whether the action manipulates an object (as opposed to moving or
    /// turning the agent).
    pub fn is_interaction(&self) -> bool {
        matches!(
            self,
            Self::OpenObject | Self::CloseObject | Self::PickupObject | Self::PlaceHeldObject
        )
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One primitive action, optionally qualified with the object it targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub action: ActionKind,
    #[serde(rename = "objectId", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

impl Action {
    /// An unqualified action.
    pub fn basic(action: ActionKind) -> Self {
        Self {
            action,
            object_id: None,
        }
    }

    /// An action aimed at a specific object instance.
    pub fn targeted(action: ActionKind, object_id: impl Into<String>) -> Self {
        Self {
            action,
            object_id: Some(object_id.into()),
        }
    }
}

/// The state of one object in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectState {
    pub object_type: String,
    pub object_id: String,
    pub visible: bool,
}

/// The feedback returned by the simulator after every primitive action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Whether the simulator executed the last action successfully.
    pub last_action_success: bool,
    #[serde(default)]
    pub objects: Vec<ObjectState>,
}

impl Observation {
    /// Whether any instance of `object_type` is currently visible.
    pub fn is_visible(&self, object_type: &str) -> bool {
        self.find_visible(object_type).is_some()
    }

    /// The first visible instance of `object_type`, in scene order.
    pub fn find_visible(&self, object_type: &str) -> Option<&ObjectState> {
        self.objects
            .iter()
            .find(|o| o.visible && o.object_type == object_type)
    }

    /// Types of all currently visible objects.
    pub fn visible_types(&self) -> Vec<&str> {
        self.objects
            .iter()
            .filter(|o| o.visible)
            .map(|o| o.object_type.as_str())
            .collect()
    }
}

/// The latest rendered frame, passed through to the agent untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB bytes.
    pub data: Vec<u8>,
}

/// The simulator interface consumed by the episode controller.
///
/// Calls are awaited one at a time; no implementation is expected to be
/// re-entrant.
#[allow(async_fn_in_trait)]
pub trait Simulator: Send {
    /// Launch or attach the simulator and load `scene`.
    async fn start(&mut self, scene: &str, gpu_id: usize) -> anyhow::Result<()>;

    /// Reset to `scene`, reseeding internal randomness when `change_seed` is set.
    async fn reset(&mut self, scene: &str, change_seed: bool) -> anyhow::Result<()>;

    /// Issue one primitive action and return the resulting observation.
    async fn step(&mut self, action: &Action) -> anyhow::Result<Observation>;

    /// The observation produced by the most recent `step`, if any.
    fn last_observation(&self) -> Option<&Observation>;

    /// The latest rendered frame, if any.
    fn current_frame(&self) -> Option<&Frame>;

    /// Identifier of a currently visible object of `object_type`.
    ///
    /// When several instances are visible the first one in the simulator's
    /// object order wins. Callers rely on that tie-break being stable.
    fn find_visible(&self, object_type: &str) -> Option<String> {
        self.last_observation()?
            .find_visible(object_type)
            .map(|o| o.object_id.clone())
    }
}
