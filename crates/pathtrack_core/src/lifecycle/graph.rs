use crate::error::Result;

use super::{available_transitions, goal_state_for_transition, LifecycleState, Transition, ALL_STATES};

/// Introspectable view of the lifecycle: every state plus every legal edge.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TransitionGraph {
    pub states: Vec<LifecycleState>,
    pub transitions: Vec<TransitionEdge>,
}

/// One directed edge: requesting `transition` in `start` lands in `goal`
/// when the callback succeeds.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TransitionEdge {
    pub start: LifecycleState,
    pub transition: Transition,
    pub goal: LifecycleState,
}

/// Derive the canonical graph from the engine's own tables.
pub fn transition_graph() -> Result<TransitionGraph> {
    let mut transitions = Vec::new();

    for state in ALL_STATES {
        for transition in available_transitions(state) {
            let goal = goal_state_for_transition(state, *transition)?;
            transitions.push(TransitionEdge {
                start: state,
                transition: *transition,
                goal,
            });
        }
    }

    Ok(TransitionGraph {
        states: ALL_STATES.to_vec(),
        transitions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_matches_the_engine_tables() {
        let graph = transition_graph().unwrap();

        assert_eq!(graph.states.len(), ALL_STATES.len());

        let expected = [
            (LifecycleState::Unconfigured, Transition::Configure, LifecycleState::Inactive),
            (LifecycleState::Unconfigured, Transition::Shutdown, LifecycleState::Finalized),
            (LifecycleState::Inactive, Transition::Activate, LifecycleState::Active),
            (LifecycleState::Inactive, Transition::Cleanup, LifecycleState::Unconfigured),
            (LifecycleState::Inactive, Transition::Shutdown, LifecycleState::Finalized),
            (LifecycleState::Active, Transition::Deactivate, LifecycleState::Inactive),
            (LifecycleState::Active, Transition::Shutdown, LifecycleState::Finalized),
        ];

        for (start, transition, goal) in expected {
            assert!(
                graph.transitions.iter().any(|edge| {
                    edge.start == start && edge.transition == transition && edge.goal == goal
                }),
                "missing edge {start} --{transition}--> {goal}"
            );
        }

        assert_eq!(graph.transitions.len(), expected.len());
    }
}
