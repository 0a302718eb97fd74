use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{CoreError, Domain, ErrorKind, Result};

/// Atomic flag tied to the Active state.
///
/// The runtime flips it when a transition enters or leaves Active, after the
/// transition callback has finished. It guards two things: the velocity
/// publisher drops commands while the gate is off (`is_active`), and the
/// goal executor refuses submissions (`ensure_accepting_goals`).
#[derive(Debug)]
pub struct ActivationGate {
    active: AtomicBool,
}

impl ActivationGate {
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
        }
    }

    pub fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Goal-acceptance side of the gate: a structured refusal while the
    /// node is not Active, `Ok` otherwise.
    pub fn ensure_accepting_goals(&self) -> Result<()> {
        if self.is_active() {
            return Ok(());
        }
        Err(CoreError::warn()
            .domain(Domain::Goal)
            .kind(ErrorKind::InvalidState)
            .msg("goal refused: controller is not active")
            .build())
    }
}

impl Default for ActivationGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_starts_off_and_toggles() {
        let gate = ActivationGate::new();
        assert!(!gate.is_active());

        gate.activate();
        assert!(gate.is_active());

        gate.deactivate();
        assert!(!gate.is_active());
    }

    #[test]
    fn goal_acceptance_follows_the_gate() {
        let gate = ActivationGate::new();

        let err = gate.ensure_accepting_goals().unwrap_err();
        assert_eq!(err.domain, Domain::Goal);
        assert_eq!(err.kind, ErrorKind::InvalidState);

        gate.activate();
        assert!(gate.ensure_accepting_goals().is_ok());

        gate.deactivate();
        assert!(gate.ensure_accepting_goals().is_err());
    }
}
