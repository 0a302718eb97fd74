use std::fmt;

/// Lifecycle states of the controller node.
///
/// Stable states (Unconfigured, Inactive, Active, Finalized) are the only
/// externally targetable ones. The remaining states are held while a
/// transition callback is running; external requests are refused there.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LifecycleState {
    Unconfigured,
    Inactive,
    Active,
    Finalized,

    Configuring,
    CleaningUp,
    Activating,
    Deactivating,
    ShuttingDown,
    ErrorProcessing,
}

impl LifecycleState {
    /// Compact id used in error payloads and logs. Not a wire format.
    pub const fn id(self) -> u8 {
        match self {
            LifecycleState::Unconfigured => 0,
            LifecycleState::Inactive => 1,
            LifecycleState::Active => 2,
            LifecycleState::Finalized => 3,

            LifecycleState::Configuring => 10,
            LifecycleState::CleaningUp => 11,
            LifecycleState::Activating => 12,
            LifecycleState::Deactivating => 13,
            LifecycleState::ShuttingDown => 14,
            LifecycleState::ErrorProcessing => 15,
        }
    }

    /// True for stable, externally targetable states.
    pub const fn is_primary(self) -> bool {
        matches!(
            self,
            LifecycleState::Unconfigured
                | LifecycleState::Inactive
                | LifecycleState::Active
                | LifecycleState::Finalized
        )
    }

    /// True while a transition callback is in flight.
    pub const fn is_transitioning(self) -> bool {
        !self.is_primary()
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleState::Unconfigured => "unconfigured",
            LifecycleState::Inactive => "inactive",
            LifecycleState::Active => "active",
            LifecycleState::Finalized => "finalized",
            LifecycleState::Configuring => "configuring",
            LifecycleState::CleaningUp => "cleaning_up",
            LifecycleState::Activating => "activating",
            LifecycleState::Deactivating => "deactivating",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::ErrorProcessing => "error_processing",
        };
        f.write_str(label)
    }
}

/// Every lifecycle state, stable and transitional.
pub const ALL_STATES: [LifecycleState; 10] = [
    LifecycleState::Unconfigured,
    LifecycleState::Inactive,
    LifecycleState::Active,
    LifecycleState::Finalized,
    LifecycleState::Configuring,
    LifecycleState::CleaningUp,
    LifecycleState::Activating,
    LifecycleState::Deactivating,
    LifecycleState::ShuttingDown,
    LifecycleState::ErrorProcessing,
];
