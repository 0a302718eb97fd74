//! The fixed-rate compute-and-publish cycle.
//!
//! One task per activation. Directives arrive on the command channel and
//! are drained only at tick boundaries; while a goal is installed, each
//! tick reads the robot state and costmap snapshot, runs the goal-reached
//! and progress checks, and asks the optimizer for a command under the
//! per-tick deadline.
//!
//! Every terminating path publishes exactly one final zero command before
//! the outcome is delivered.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use pathtrack_core::geometry::{Path, RobotState};
use pathtrack_core::goal::{goal_reached, AbortReason, CancelReason, GoalOutcome};
use pathtrack_core::progress::ProgressWindow;

use crate::config::ControllerConfig;
use crate::executor::Progress;
use crate::interfaces::{CostmapSnapshot, RobotStateSource, TrajectoryOptimizer};
use crate::publisher::CommandPublisher;

/// Directives applied at tick boundaries, never mid-tick.
pub(crate) enum Command {
    Submit {
        id: u64,
        path: Path,
        outcome: oneshot::Sender<GoalOutcome>,
    },
    Cancel,
    UpdatePath(Path),
    /// Stop the loop; the sender is acked once the goal (if any) is closed
    /// out and the final zero command has been published.
    Halt(std::sync::mpsc::Sender<()>),
}

/// Everything one activation of the loop needs, captured at start.
pub(crate) struct LoopContext {
    pub config: ControllerConfig,
    pub optimizer: Arc<Mutex<Box<dyn TrajectoryOptimizer>>>,
    pub robot_state: Arc<dyn RobotStateSource>,
    pub costmap: watch::Receiver<Option<CostmapSnapshot>>,
    pub publisher: CommandPublisher,
    pub feedback: broadcast::Sender<Progress>,
}

struct ActiveGoal {
    id: u64,
    path: Path,
    outcome: oneshot::Sender<GoalOutcome>,
    window: ProgressWindow,
    consecutive_failures: u32,
}

impl ActiveGoal {
    fn new(id: u64, path: Path, outcome: oneshot::Sender<GoalOutcome>, config: &ControllerConfig) -> Self {
        Self {
            id,
            path,
            outcome,
            window: ProgressWindow::new(config.progress_horizon, config.progress_min_displacement),
            consecutive_failures: 0,
        }
    }

    fn finish(self, outcome: GoalOutcome, publisher: &CommandPublisher) {
        publisher.publish_zero();
        info!(goal_id = self.id, outcome = outcome.label(), "goal finished");
        let _ = self.outcome.send(outcome);
    }
}

enum Flow {
    Continue,
    Halt(std::sync::mpsc::Sender<()>),
}

pub(crate) async fn run(mut ctx: LoopContext, mut commands: mpsc::UnboundedReceiver<Command>) {
    let mut interval = tokio::time::interval(ctx.config.control_period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut goal: Option<ActiveGoal> = None;

    loop {
        interval.tick().await;

        // Tick boundary: apply everything that arrived since the last one.
        loop {
            match commands.try_recv() {
                Ok(command) => match apply(command, &mut goal, &ctx) {
                    Flow::Continue => {}
                    Flow::Halt(ack) => {
                        let _ = ack.send(());
                        return;
                    }
                },
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    // Executor side is gone; treat like a halt.
                    if let Some(active) = goal.take() {
                        active.finish(
                            GoalOutcome::Canceled(CancelReason::Deactivated),
                            &ctx.publisher,
                        );
                    }
                    return;
                }
            }
        }

        if let Some(active) = goal.as_mut() {
            if let Some(outcome) = tick(active, &mut ctx).await {
                if let Some(active) = goal.take() {
                    active.finish(outcome, &ctx.publisher);
                }
            }
        }
    }
}

fn apply(command: Command, goal: &mut Option<ActiveGoal>, ctx: &LoopContext) -> Flow {
    match command {
        Command::Submit { id, path, outcome } => {
            if let Some(old) = goal.take() {
                debug!(old_goal = old.id, new_goal = id, "goal preempted");
                old.finish(GoalOutcome::Canceled(CancelReason::Preempted), &ctx.publisher);
            }
            *goal = Some(ActiveGoal::new(id, path, outcome, &ctx.config));
        }
        Command::Cancel => {
            if let Some(active) = goal.take() {
                active.finish(GoalOutcome::Canceled(CancelReason::Requested), &ctx.publisher);
            }
        }
        Command::UpdatePath(path) => {
            if let Some(active) = goal.as_mut() {
                // Same goal, refined path: keep progress and failure state.
                active.path = path;
            }
        }
        Command::Halt(ack) => {
            if let Some(active) = goal.take() {
                active.finish(
                    GoalOutcome::Canceled(CancelReason::Deactivated),
                    &ctx.publisher,
                );
            }
            return Flow::Halt(ack);
        }
    }
    Flow::Continue
}

/// One compute-and-publish cycle. Some(outcome) ends the goal; the caller
/// publishes the final zero command via `ActiveGoal::finish`.
async fn tick(goal: &mut ActiveGoal, ctx: &mut LoopContext) -> Option<GoalOutcome> {
    let Some(state) = wait_for_state(ctx.robot_state.as_ref(), ctx.config.pose_timeout).await
    else {
        warn!(goal_id = goal.id, "no robot pose within timeout");
        return Some(GoalOutcome::Aborted(AbortReason::NoPose));
    };

    let snapshot = ctx.costmap.borrow().clone();

    goal.window.record(state.pose, Instant::now());

    if goal_reached(&state.pose, &goal.path.last(), &ctx.config.goal_tolerance) {
        return Some(GoalOutcome::Succeeded);
    }

    if !goal.window.is_progressing() {
        return Some(GoalOutcome::Aborted(AbortReason::Stuck));
    }

    let command = match snapshot {
        Some(snapshot) => compute_velocity(goal, ctx, state, snapshot).await,
        None => {
            debug!(goal_id = goal.id, "no costmap snapshot yet");
            None
        }
    };

    let terminal = match command {
        Some(command) => {
            goal.consecutive_failures = 0;
            ctx.publisher.publish(command);
            None
        }
        None => {
            goal.consecutive_failures += 1;
            if goal.consecutive_failures >= ctx.config.max_consecutive_failures {
                return Some(GoalOutcome::Aborted(AbortReason::NoFeasibleTrajectory));
            }
            // Transient: fail safe this tick, keep the goal.
            ctx.publisher.publish_zero();
            None
        }
    };

    let _ = ctx.feedback.send(Progress {
        goal_id: goal.id,
        distance_remaining: goal.path.remaining_distance_from(&state.pose),
    });

    terminal
}

/// Run the optimizer off the loop task under the per-tick deadline.
///
/// A deadline miss or a panic inside the optimizer yields None and counts
/// as that tick's failure; the loop never waits out a stale computation.
async fn compute_velocity(
    goal: &ActiveGoal,
    ctx: &LoopContext,
    state: RobotState,
    snapshot: CostmapSnapshot,
) -> Option<pathtrack_core::geometry::Twist> {
    let optimizer = Arc::clone(&ctx.optimizer);
    let path = goal.path.clone();
    let task = tokio::task::spawn_blocking(move || {
        let mut guard = optimizer.lock().unwrap_or_else(PoisonError::into_inner);
        guard.compute_velocity(&path, &state, &snapshot)
    });

    match tokio::time::timeout(ctx.config.optimizer_deadline, task).await {
        Ok(Ok(Ok(command))) => Some(command),
        Ok(Ok(Err(err))) => {
            warn!(goal_id = goal.id, "optimizer failed: {err}");
            None
        }
        Ok(Err(join_err)) => {
            warn!(goal_id = goal.id, "optimizer task died: {join_err}");
            None
        }
        Err(_) => {
            warn!(goal_id = goal.id, "optimizer missed its deadline");
            None
        }
    }
}

async fn wait_for_state(source: &dyn RobotStateSource, timeout: Duration) -> Option<RobotState> {
    let deadline = Instant::now() + timeout;
    let poll = Duration::from_millis(2).min(timeout / 4).max(Duration::from_micros(500));
    loop {
        if let Some(state) = source.latest() {
            return Some(state);
        }
        if Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(poll).await;
    }
}
