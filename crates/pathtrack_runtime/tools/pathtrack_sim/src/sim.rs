//! The simulated world: a kinematic unicycle robot, an empty costmap, and a
//! carrot-chasing trajectory follower.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use pathtrack_core::geometry::{normalize_angle, Path, Pose2D, RobotState, Twist};
use pathtrack_runtime::{
    CostmapSnapshot, CostmapSource, OptimizerError, RobotStateSource, TrajectoryOptimizer,
    VelocitySink,
};

struct SimState {
    pose: Pose2D,
    commanded: Twist,
}

/// Kinematic fake robot.
///
/// One handle serves as both pose source and actuator: commands land in the
/// shared state, and a background stepper task integrates them into the
/// pose. Clones address the same robot.
#[derive(Clone)]
pub struct SimRobot {
    state: Arc<Mutex<SimState>>,
}

impl SimRobot {
    pub fn new(start: Pose2D) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                pose: start,
                commanded: Twist::ZERO,
            })),
        }
    }

    /// Integrate the commanded velocity at a fixed cadence until aborted.
    pub fn spawn_stepper(&self, dt: Duration) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(dt);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let step = dt.as_secs_f64();
            loop {
                ticker.tick().await;
                let mut s = lock(&state);
                let (sin_t, cos_t) = s.pose.theta.sin_cos();
                s.pose.x += (s.commanded.linear_x * cos_t - s.commanded.linear_y * sin_t) * step;
                s.pose.y += (s.commanded.linear_x * sin_t + s.commanded.linear_y * cos_t) * step;
                s.pose.theta = normalize_angle(s.pose.theta + s.commanded.angular_z * step);
            }
        })
    }

    pub fn pose(&self) -> Pose2D {
        lock(&self.state).pose
    }
}

impl RobotStateSource for SimRobot {
    fn latest(&self) -> Option<RobotState> {
        let s = lock(&self.state);
        Some(RobotState {
            pose: s.pose,
            twist: s.commanded,
            stamp: Instant::now(),
        })
    }
}

impl VelocitySink for SimRobot {
    fn send(&self, command: Twist) {
        lock(&self.state).commanded = command;
    }
}

/// Obstacle-free world: every snapshot is fresh and empty.
pub struct FlatGround;

impl CostmapSource for FlatGround {
    fn snapshot(&self) -> Option<CostmapSnapshot> {
        Some(CostmapSnapshot::empty(Instant::now()))
    }
}

/// Pure-pursuit style follower: steer toward a carrot point on the path.
///
/// Forward speed scales with heading alignment, so a badly misaligned robot
/// rotates in place before driving. Never reports infeasibility; in an
/// empty world there is always a trajectory.
pub struct CarrotOptimizer {
    lookahead: f64,
    max_speed: f64,
    max_yaw_rate: f64,
}

impl CarrotOptimizer {
    pub fn new(lookahead: f64, max_speed: f64, max_yaw_rate: f64) -> Self {
        Self {
            lookahead,
            max_speed,
            max_yaw_rate,
        }
    }

    fn carrot(&self, path: &Path, from: &Pose2D) -> Pose2D {
        for pose in path.poses() {
            if from.distance_to(pose) >= self.lookahead {
                return *pose;
            }
        }
        path.last()
    }
}

impl TrajectoryOptimizer for CarrotOptimizer {
    fn compute_velocity(
        &mut self,
        path: &Path,
        state: &RobotState,
        _costmap: &CostmapSnapshot,
    ) -> Result<Twist, OptimizerError> {
        let carrot = self.carrot(path, &state.pose);
        let heading_error = if state.pose.distance_to(&carrot) < 1e-6 {
            // On top of the carrot: align with its heading instead.
            normalize_angle(carrot.theta - state.pose.theta)
        } else {
            let bearing = (carrot.y - state.pose.y).atan2(carrot.x - state.pose.x);
            normalize_angle(bearing - state.pose.theta)
        };

        let angular_z = (2.0 * heading_error).clamp(-self.max_yaw_rate, self.max_yaw_rate);
        let linear_x = self.max_speed * heading_error.cos().max(0.0);

        Ok(Twist {
            linear_x,
            linear_y: 0.0,
            angular_z,
        })
    }
}

fn lock(state: &Arc<Mutex<SimState>>) -> std::sync::MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
