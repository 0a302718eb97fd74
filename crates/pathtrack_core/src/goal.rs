use crate::geometry::Pose2D;

/// Why a goal ended without reaching the end of the path, through no fault
/// of the robot's surroundings.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CancelReason {
    /// The caller asked for the goal to stop.
    Requested,
    /// A newer goal replaced this one.
    Preempted,
    /// The lifecycle left Active while the goal was running.
    Deactivated,
}

impl CancelReason {
    pub const fn label(self) -> &'static str {
        match self {
            CancelReason::Requested => "canceled",
            CancelReason::Preempted => "preempted",
            CancelReason::Deactivated => "deactivated",
        }
    }
}

/// Why a goal failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AbortReason {
    /// No robot pose became available within the per-tick timeout.
    NoPose,
    /// The progress window showed no sufficient movement over its horizon.
    Stuck,
    /// The optimizer failed for the configured number of consecutive ticks.
    NoFeasibleTrajectory,
}

impl AbortReason {
    pub const fn label(self) -> &'static str {
        match self {
            AbortReason::NoPose => "no pose",
            AbortReason::Stuck => "stuck",
            AbortReason::NoFeasibleTrajectory => "no feasible trajectory",
        }
    }
}

/// Terminal result of one goal. Produced exactly once per goal.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GoalOutcome {
    Succeeded,
    Canceled(CancelReason),
    Aborted(AbortReason),
}

impl GoalOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            GoalOutcome::Succeeded => "succeeded",
            GoalOutcome::Canceled(r) => r.label(),
            GoalOutcome::Aborted(r) => r.label(),
        }
    }
}

/// Position and heading tolerances for declaring a goal reached.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GoalTolerance {
    /// Meters.
    pub xy: f64,
    /// Radians, compared against the shortest-arc heading difference.
    pub yaw: f64,
}

/// True when `current` is within tolerance of the path's final pose.
pub fn goal_reached(current: &Pose2D, goal: &Pose2D, tolerance: &GoalTolerance) -> bool {
    current.distance_to(goal) <= tolerance.xy
        && current.heading_error_to(goal).abs() <= tolerance.yaw
}
