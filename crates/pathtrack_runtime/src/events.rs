use pathtrack_core::lifecycle::{LifecycleState, Transition};

/// Emitted on the node's broadcast stream after each applied transition.
///
/// Broadcast so a lagging observer drops old events instead of stalling
/// lifecycle handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEvent {
    pub transition: Transition,
    pub start_state: LifecycleState,
    pub goal_state: LifecycleState,
}
