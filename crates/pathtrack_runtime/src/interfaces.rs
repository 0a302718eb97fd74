//! Capability seams for the external collaborators.
//!
//! The control loop only ever talks to these traits. Production wires them
//! to a real optimizer, costmap layer, and transport; tests wire them to
//! deterministic fakes.

use std::sync::Arc;
use std::time::Instant;

use pathtrack_core::geometry::{Path, Pose2D, RobotState, Twist};

/// Why the optimizer produced no command this tick.
///
/// These are transient per-tick conditions; the loop aborts the goal only
/// after a configured number of consecutive ones.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OptimizerError {
    #[error("no feasible trajectory: {0}")]
    NoFeasibleTrajectory(String),
    #[error("optimizer rejected input: {0}")]
    InvalidInput(String),
}

/// The trajectory optimization engine.
///
/// Stateful by design: implementations may warm-start from the previous
/// solution. Called off the loop task under the per-tick deadline, so a
/// slow `compute_velocity` delays at most its own tick.
pub trait TrajectoryOptimizer: Send {
    fn compute_velocity(
        &mut self,
        path: &Path,
        state: &RobotState,
        costmap: &CostmapSnapshot,
    ) -> Result<Twist, OptimizerError>;
}

/// Produces point-in-time views of the obstacle grid.
pub trait CostmapSource: Send + Sync {
    fn snapshot(&self) -> Option<CostmapSnapshot>;
}

/// Supplies the most recent robot pose and velocity.
///
/// Contract: stamps are monotonic across samples. The loop polls this under
/// a bounded timeout and never substitutes stale data on its own.
pub trait RobotStateSource: Send + Sync {
    fn latest(&self) -> Option<RobotState>;
}

/// The actuator channel. One `send` per control tick.
pub trait VelocitySink: Send + Sync {
    fn send(&self, command: Twist);
}

/// Read-only snapshot of the obstacle grid, cheap to clone.
///
/// The grid's internal semantics belong to the costmap layer; the
/// controller only hands snapshots through to the optimizer.
#[derive(Debug, Clone)]
pub struct CostmapSnapshot {
    pub stamp: Instant,
    pub width: u32,
    pub height: u32,
    /// Meters per cell.
    pub resolution: f64,
    /// Pose of cell (0, 0) in the path frame.
    pub origin: Pose2D,
    pub cells: Arc<[u8]>,
}

impl CostmapSnapshot {
    /// Occupancy cost of one cell, or None outside the grid.
    pub fn cost_at(&self, col: u32, row: u32) -> Option<u8> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.cells.get((row * self.width + col) as usize).copied()
    }

    /// An all-free grid, for tests and degenerate environments.
    pub fn empty(stamp: Instant) -> Self {
        Self {
            stamp,
            width: 0,
            height: 0,
            resolution: 0.05,
            origin: Pose2D::default(),
            cells: Arc::from(Vec::new().into_boxed_slice()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_lookup_respects_bounds() {
        let snapshot = CostmapSnapshot {
            stamp: Instant::now(),
            width: 2,
            height: 2,
            resolution: 0.05,
            origin: Pose2D::default(),
            cells: Arc::from(vec![0u8, 10, 20, 30].into_boxed_slice()),
        };

        assert_eq!(snapshot.cost_at(1, 1), Some(30));
        assert_eq!(snapshot.cost_at(0, 1), Some(20));
        assert_eq!(snapshot.cost_at(2, 0), None);
        assert_eq!(snapshot.cost_at(0, 2), None);
    }

    #[test]
    fn empty_snapshot_has_no_cells() {
        let s = CostmapSnapshot::empty(Instant::now());
        assert_eq!(s.cost_at(0, 0), None);
    }
}
