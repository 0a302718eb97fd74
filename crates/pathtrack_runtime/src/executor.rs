use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{info, warn};

use pathtrack_core::error::{CoreError, Domain, ErrorKind, Result};
use pathtrack_core::geometry::{Path, Pose2D};
use pathtrack_core::goal::{CancelReason, GoalOutcome};
use pathtrack_core::lifecycle::ActivationGate;

use crate::config::ControllerConfig;
use crate::control_loop::{self, Command, LoopContext};

/// Per-tick progress feedback for goal observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub goal_id: u64,
    /// Meters along the path from the robot to its end.
    pub distance_remaining: f64,
}

/// Caller's view of one accepted goal.
pub struct GoalHandle {
    id: u64,
    outcome: oneshot::Receiver<GoalOutcome>,
    resolved: Option<GoalOutcome>,
    feedback: broadcast::Receiver<Progress>,
}

impl GoalHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the goal's single terminal outcome.
    ///
    /// Resumable and select-friendly: once resolved, every later call
    /// returns the same outcome. A force-aborted loop (deactivation that
    /// overran its bound) drops the sender; that reads as a
    /// lifecycle-driven cancellation.
    pub async fn outcome(&mut self) -> GoalOutcome {
        if let Some(outcome) = self.resolved {
            return outcome;
        }
        let outcome = (&mut self.outcome)
            .await
            .unwrap_or(GoalOutcome::Canceled(CancelReason::Deactivated));
        self.resolved = Some(outcome);
        outcome
    }

    /// Next feedback sample for this goal. None once the stream closes.
    ///
    /// Lagged slots are skipped: feedback is a live signal, not a log.
    pub async fn feedback(&mut self) -> Option<Progress> {
        loop {
            match self.feedback.recv().await {
                Ok(progress) if progress.goal_id == self.id => return Some(progress),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Owns the one-active-goal contract and the control-loop task.
///
/// Cheap to clone; all clones address the same loop. Submission and
/// cancellation are serialized against the loop by the command channel:
/// the loop drains it only at tick boundaries, so a directive never lands
/// mid-tick and the optimizer never sees a half-updated path.
#[derive(Clone)]
pub struct GoalExecutor {
    inner: Arc<Inner>,
}

struct Inner {
    config: ControllerConfig,
    gate: Arc<ActivationGate>,
    runtime: tokio::runtime::Handle,
    next_goal_id: AtomicU64,
    feedback: broadcast::Sender<Progress>,
    commands: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    abort: Mutex<Option<tokio::task::AbortHandle>>,
}

impl GoalExecutor {
    pub(crate) fn new(
        config: ControllerConfig,
        gate: Arc<ActivationGate>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let (feedback, _) = broadcast::channel(32);
        Self {
            inner: Arc::new(Inner {
                config,
                gate,
                runtime,
                next_goal_id: AtomicU64::new(1),
                feedback,
                commands: Mutex::new(None),
                abort: Mutex::new(None),
            }),
        }
    }

    pub(crate) fn feedback_sender(&self) -> broadcast::Sender<Progress> {
        self.inner.feedback.clone()
    }

    /// Subscribe to feedback for every goal, current and future.
    pub fn subscribe_feedback(&self) -> broadcast::Receiver<Progress> {
        self.inner.feedback.subscribe()
    }

    /// Spawn the control-loop task. Called from `on_activate`.
    pub(crate) fn start(&self, ctx: LoopContext) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = self.inner.runtime.spawn(control_loop::run(ctx, rx));
        *lock(&self.inner.commands) = Some(tx);
        *lock(&self.inner.abort) = Some(task.abort_handle());
    }

    /// Stop the loop: cancel any in-flight goal, wait bounded, then force.
    ///
    /// Called from `on_deactivate` while the gate is still on, so the
    /// loop's final zero command reaches the sink. Blocks the caller for at
    /// most `halt_wait`; run lifecycle transitions off the async workers.
    pub(crate) fn halt(&self) {
        let Some(tx) = lock(&self.inner.commands).take() else {
            return;
        };

        let (ack_tx, ack_rx) = std::sync::mpsc::channel();
        let acked = tx.send(Command::Halt(ack_tx)).is_ok()
            && ack_rx.recv_timeout(self.inner.config.halt_wait).is_ok();

        if !acked {
            warn!("control loop missed the halt bound; aborting its task");
            if let Some(handle) = lock(&self.inner.abort).take() {
                handle.abort();
            }
        }
        *lock(&self.inner.abort) = None;
    }

    /// Accept or refuse a new goal.
    ///
    /// Refused while the node is not Active or when the path is empty; a
    /// refused goal never reaches the loop. An accepted goal preempts any
    /// running one at the next tick boundary: the old goal's outcome
    /// (Canceled/preempted) is delivered before the new goal's first tick.
    pub fn submit(&self, poses: Vec<Pose2D>) -> Result<GoalHandle> {
        self.inner.gate.ensure_accepting_goals()?;
        let path = Path::new(poses)?;

        let id = self.inner.next_goal_id.fetch_add(1, Ordering::Relaxed);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        self.send(Command::Submit {
            id,
            path,
            outcome: outcome_tx,
        })?;

        info!(goal_id = id, "goal accepted");
        Ok(GoalHandle {
            id,
            outcome: outcome_rx,
            resolved: None,
            feedback: self.inner.feedback.subscribe(),
        })
    }

    /// Ask the running goal to stop. Observed at the next tick boundary,
    /// at most one control period later. No-op when no goal is running.
    pub fn cancel(&self) -> Result<()> {
        self.send(Command::Cancel)
    }

    /// Replace the running goal's path with a refined version of itself.
    ///
    /// Progress history and the failure counter carry over: this is the
    /// same goal, only its reference path moved.
    pub fn update_path(&self, poses: Vec<Pose2D>) -> Result<()> {
        let path = Path::new(poses)?;
        self.send(Command::UpdatePath(path))
    }

    fn send(&self, command: Command) -> Result<()> {
        let guard = lock(&self.inner.commands);
        let Some(tx) = guard.as_ref() else {
            return Err(not_running());
        };
        tx.send(command).map_err(|_| not_running())
    }
}

fn not_running() -> CoreError {
    CoreError::warn()
        .domain(Domain::Goal)
        .kind(ErrorKind::Unavailable)
        .msg("control loop is not running")
        .build()
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
