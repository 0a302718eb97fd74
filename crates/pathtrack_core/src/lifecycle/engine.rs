use crate::error::{CoreError, Result};

use super::{LifecycleState, Transition};

/// What a transition callback reported.
///
/// - Success: proceed to the transition's goal state
/// - Failure: return to the stable state the transition started from
/// - Error: enter `ErrorProcessing`, then let `on_error()` decide
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CallbackResult {
    Success,
    Failure,
    Error,
}

/// Hooks invoked while a transition is in its intermediate state.
///
/// Implementors own the controller's resources and decide what each result
/// means. `on_shutdown` and `on_error` should release best-effort and avoid
/// reporting Error themselves.
pub trait LifecycleCallbacks {
    fn on_configure(&mut self) -> CallbackResult;
    fn on_activate(&mut self) -> CallbackResult;
    fn on_deactivate(&mut self) -> CallbackResult;
    fn on_cleanup(&mut self) -> CallbackResult;
    fn on_shutdown(&mut self) -> CallbackResult;

    /// Invoked after any callback reports `CallbackResult::Error`.
    /// Success recovers to Unconfigured; anything else finalizes the node.
    fn on_error(&mut self) -> CallbackResult;
}

/// Enter the intermediate state for `via`, or refuse the request.
///
/// Enforces which transitions are legal from which stable states and that a
/// new transition cannot start while one is already running.
pub fn begin(current: LifecycleState, via: Transition) -> Result<LifecycleState> {
    use LifecycleState::*;
    use Transition::*;

    let intermediate = match (current, via) {
        (Unconfigured, Configure) => Configuring,
        (Inactive, Activate) => Activating,
        (Active, Deactivate) => Deactivating,
        (Inactive, Cleanup) => CleaningUp,

        // Shutdown is reachable from every non-final stable state.
        (s, Shutdown) if s.is_primary() && s != Finalized => ShuttingDown,

        _ => {
            return Err(CoreError::invalid_lifecycle_transition(
                current.id(),
                via.id(),
            ));
        }
    };

    Ok(intermediate)
}

/// Leave the intermediate state according to the callback result.
pub fn finish(
    intermediate: LifecycleState,
    via: Transition,
    result: CallbackResult,
) -> Result<LifecycleState> {
    use CallbackResult::*;
    use LifecycleState::*;
    use Transition::*;

    let next = match (intermediate, via, result) {
        (Configuring, Configure, Success) => Inactive,
        (Configuring, Configure, Failure) => Unconfigured,
        (Configuring, Configure, Error) => ErrorProcessing,

        (Activating, Activate, Success) => Active,
        (Activating, Activate, Failure) => Inactive,
        (Activating, Activate, Error) => ErrorProcessing,

        (Deactivating, Deactivate, Success) => Inactive,
        (Deactivating, Deactivate, Failure) => Active,
        (Deactivating, Deactivate, Error) => ErrorProcessing,

        (CleaningUp, Cleanup, Success) => Unconfigured,
        (CleaningUp, Cleanup, Failure) => Inactive,
        (CleaningUp, Cleanup, Error) => ErrorProcessing,

        // Shutdown is terminal no matter what the callback reported.
        (ShuttingDown, Shutdown, _) => Finalized,

        _ => {
            return Err(CoreError::invalid_lifecycle_transition(
                intermediate.id(),
                via.id(),
            ));
        }
    };

    Ok(next)
}

/// `finish()` plus the ErrorProcessing recovery step, for callers that run
/// `on_error` themselves and need the resulting stable state.
pub fn finish_with_error_handling(
    intermediate: LifecycleState,
    via: Transition,
    result: CallbackResult,
    error_recovery: Option<CallbackResult>,
) -> Result<LifecycleState> {
    let state = finish(intermediate, via, result)?;
    if state != LifecycleState::ErrorProcessing {
        return Ok(state);
    }

    Ok(match error_recovery {
        Some(CallbackResult::Success) => LifecycleState::Unconfigured,
        _ => LifecycleState::Finalized,
    })
}

/// Run one full transition: begin, callback, finish, error recovery.
///
/// Returns `(intermediate_state, final_stable_state)`.
pub fn drive(
    current: LifecycleState,
    via: Transition,
    callbacks: &mut dyn LifecycleCallbacks,
) -> Result<(LifecycleState, LifecycleState)> {
    let intermediate = begin(current, via)?;

    let result = match via {
        Transition::Configure => callbacks.on_configure(),
        Transition::Activate => callbacks.on_activate(),
        Transition::Deactivate => callbacks.on_deactivate(),
        Transition::Cleanup => callbacks.on_cleanup(),
        Transition::Shutdown => callbacks.on_shutdown(),
    };

    let final_state = finish(intermediate, via, result)?;

    let final_state = if final_state == LifecycleState::ErrorProcessing {
        match callbacks.on_error() {
            CallbackResult::Success => LifecycleState::Unconfigured,
            CallbackResult::Failure | CallbackResult::Error => LifecycleState::Finalized,
        }
    } else {
        final_state
    };

    Ok((intermediate, final_state))
}

/// Stable state a successful `via` from `start` lands in.
pub fn goal_state_for_transition(start: LifecycleState, via: Transition) -> Result<LifecycleState> {
    let intermediate = begin(start, via)?;
    finish(intermediate, via, CallbackResult::Success)
}

/// Transitions a caller may request from `state`.
///
/// Empty while a transition is running: the node is busy and external
/// requests are refused until the callback returns.
pub fn available_transitions(state: LifecycleState) -> &'static [Transition] {
    use LifecycleState::*;
    use Transition::*;

    match state {
        Unconfigured => &[Configure, Shutdown],
        Inactive => &[Activate, Cleanup, Shutdown],
        Active => &[Deactivate, Shutdown],
        Finalized => &[],
        Configuring | CleaningUp | Activating | Deactivating | ShuttingDown | ErrorProcessing => {
            &[]
        }
    }
}
