use std::borrow::Cow;
use thiserror::Error;

/// Convenient result alias for pathtrack_core.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Handling importance. Maps onto logging levels in the runtime layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// Which part of the controller an error came from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Domain {
    Lifecycle,
    Goal,
    Config,
    Other,
}

/// Stable error "kind" for matching/branching at call sites.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidState,
    InvalidTransition,
    Rejected,
    Timeout,
    Unavailable,
    Other,
}

/// Optional structured detail carried alongside the message.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Payload {
    None,

    /// Which lifecycle edge was refused.
    LifecycleTransition { from_state: u8, via_transition: u8 },
}

/// The one error type that crosses module boundaries in pathtrack_core.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error("{severity:?}: {message}")]
pub struct CoreError {
    pub domain: Domain,
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: Cow<'static, str>,
    pub payload: Payload,
}

impl CoreError {
    // ---------------- Fluent entry points ----------------

    #[inline]
    pub fn warn() -> ErrB {
        ErrB::new(Severity::Warn)
    }
    #[inline]
    pub fn error() -> ErrB {
        ErrB::new(Severity::Error)
    }

    /// A refused lifecycle edge, with the states involved.
    pub fn invalid_lifecycle_transition(from_state: u8, via_transition: u8) -> Self {
        CoreError::warn()
            .domain(Domain::Lifecycle)
            .kind(ErrorKind::InvalidTransition)
            .msg("lifecycle transition not allowed from current state")
            .payload(Payload::LifecycleTransition {
                from_state,
                via_transition,
            })
            .build()
    }

    /// A goal request turned away before execution.
    pub fn goal_rejected(message: impl Into<Cow<'static, str>>) -> Self {
        CoreError::warn()
            .domain(Domain::Goal)
            .kind(ErrorKind::Rejected)
            .msg(message)
            .build()
    }
}

/// Fluent builder that reads like an iterator chain (takes self, returns Self).
///
/// Defaults: domain = Other, kind = Other, message = "", payload = None.
#[derive(Debug, Clone)]
pub struct ErrB {
    domain: Domain,
    kind: ErrorKind,
    severity: Severity,
    message: Cow<'static, str>,
    payload: Payload,
}

impl ErrB {
    #[inline]
    fn new(severity: Severity) -> Self {
        Self {
            domain: Domain::Other,
            kind: ErrorKind::Other,
            severity,
            message: Cow::Borrowed(""),
            payload: Payload::None,
        }
    }

    #[inline]
    pub fn domain(mut self, d: Domain) -> Self {
        self.domain = d;
        self
    }

    #[inline]
    pub fn kind(mut self, k: ErrorKind) -> Self {
        self.kind = k;
        self
    }

    #[inline]
    pub fn msg(mut self, m: impl Into<Cow<'static, str>>) -> Self {
        self.message = m.into();
        self
    }

    /// Only one payload slot: this replaces any previous payload.
    #[inline]
    pub fn payload(mut self, p: Payload) -> Self {
        self.payload = p;
        self
    }

    #[inline]
    pub fn build(self) -> CoreError {
        CoreError {
            domain: self.domain,
            kind: self.kind,
            severity: self.severity,
            message: self.message,
            payload: self.payload,
        }
    }
}

impl From<ErrB> for CoreError {
    fn from(b: ErrB) -> Self {
        b.build()
    }
}
