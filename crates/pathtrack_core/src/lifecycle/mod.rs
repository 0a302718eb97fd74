//! Lifecycle semantics for the controller node.
//!
//! Models the managed-node lifecycle the controller runs under: stable
//! states, the intermediate state entered while a transition callback runs,
//! and the explicit `begin()` -> callback -> `finish()` pipeline. An Error
//! result routes through `ErrorProcessing`, where `on_error()` decides
//! whether the node recovers to Unconfigured or finalizes.
//!
//! This module is pure: the runtime layer owns tasks, publishers, and the
//! policy that hangs off the [`ActivationGate`].

mod engine;
mod gate;
mod graph;
mod state;
mod transition;

pub use engine::{
    available_transitions, begin, drive, finish, finish_with_error_handling,
    goal_state_for_transition, CallbackResult, LifecycleCallbacks,
};
pub use gate::ActivationGate;
pub use graph::{transition_graph, TransitionEdge, TransitionGraph};
pub use state::{LifecycleState, ALL_STATES};
pub use transition::Transition;
