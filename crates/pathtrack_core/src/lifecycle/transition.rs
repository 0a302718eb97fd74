use std::fmt;

/// Externally requested lifecycle transitions.
///
/// The implicit "callback finished with X" edges are modeled by
/// `finish(intermediate, via, CallbackResult)`, not listed here.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transition {
    Configure,
    Activate,
    Deactivate,
    Cleanup,
    Shutdown,
}

impl Transition {
    /// Compact id used in error payloads and logs. Not a wire format.
    pub const fn id(self) -> u8 {
        match self {
            Transition::Configure => 1,
            Transition::Cleanup => 2,
            Transition::Activate => 3,
            Transition::Deactivate => 4,
            Transition::Shutdown => 5,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Transition::Configure => "configure",
            Transition::Cleanup => "cleanup",
            Transition::Activate => "activate",
            Transition::Deactivate => "deactivate",
            Transition::Shutdown => "shutdown",
        };
        f.write_str(label)
    }
}
