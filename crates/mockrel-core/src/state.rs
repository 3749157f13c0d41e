//! Patcher chain lifecycle

use crate::error::PatchError;

/// Lifecycle state of a patcher chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainState {
    /// Built, never activated
    Planned,
    /// Every patch applied
    Active,
    /// Every patch reverted; may be activated again
    Inactive,
}

/// Validates a lifecycle transition.
pub fn validate_transition(from: ChainState, to: ChainState) -> Result<(), PatchError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(PatchError::IllegalTransition { from, to })
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: ChainState) -> &'static [ChainState] {
    use ChainState::{Active, Inactive, Planned};
    match from {
        Planned | Inactive => &[Active],
        Active => &[Inactive],
    }
}
