//! The fixed catalogue of basic actions the agent chooses from.

use crate::env::{Action, ActionKind};
use crate::error::{EpisodeError, EpisodeResult};

/// Basic actions in policy-output order.
pub const BASIC_ACTIONS: [ActionKind; 9] = [
    ActionKind::MoveAhead,
    ActionKind::RotateLeft,
    ActionKind::RotateRight,
    ActionKind::LookUp,
    ActionKind::LookDown,
    ActionKind::OpenObject,
    ActionKind::CloseObject,
    ActionKind::PickupObject,
    ActionKind::PlaceHeldObject,
];

/// Number of actions a policy can choose from.
pub fn catalogue_size() -> usize {
    BASIC_ACTIONS.len()
}

/// Resolve a policy output index into an unqualified action.
pub fn resolve(index: usize) -> EpisodeResult<Action> {
    BASIC_ACTIONS
        .get(index)
        .map(|kind| Action::basic(*kind))
        .ok_or(EpisodeError::InvalidAction {
            index,
            size: BASIC_ACTIONS.len(),
        })
}

/// Index of `kind` in the catalogue.
pub fn index_of(kind: ActionKind) -> Option<usize> {
    BASIC_ACTIONS.iter().position(|k| *k == kind)
}
