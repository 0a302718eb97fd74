//! Deterministic fakes for the controller's capability seams.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pathtrack_runtime::{
    ControllerConfig, ControllerDeps, CostmapSnapshot, CostmapSource, OptimizerError, Path,
    PathFollower, Pose2D, RobotState, RobotStateSource, TrajectoryOptimizer, Twist, VelocitySink,
};

/// Costmap that always has a fresh, empty grid.
pub struct OpenField;

impl CostmapSource for OpenField {
    fn snapshot(&self) -> Option<CostmapSnapshot> {
        Some(CostmapSnapshot::empty(Instant::now()))
    }
}

/// Pose source the test can move around.
#[derive(Clone, Default)]
pub struct PoseHandle {
    state: Arc<Mutex<Option<RobotState>>>,
}

impl PoseHandle {
    pub fn set(&self, pose: Pose2D) {
        *self.state.lock().unwrap() = Some(RobotState {
            pose,
            twist: Twist::ZERO,
            stamp: Instant::now(),
        });
    }

    pub fn clear(&self) {
        *self.state.lock().unwrap() = None;
    }
}

impl RobotStateSource for PoseHandle {
    fn latest(&self) -> Option<RobotState> {
        self.state.lock().unwrap().map(|mut s| {
            s.stamp = Instant::now();
            s
        })
    }
}

/// Sink that records everything the controller publishes.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Twist>>,
}

impl RecordingSink {
    pub fn commands(&self) -> Vec<Twist> {
        self.sent.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Twist> {
        self.sent.lock().unwrap().last().copied()
    }
}

impl VelocitySink for RecordingSink {
    fn send(&self, command: Twist) {
        self.sent.lock().unwrap().push(command);
    }
}

/// Optimizer driven by a script of per-tick results, then a fallback.
/// Records the final pose of every path it was handed.
pub struct ScriptedOptimizer {
    script: VecDeque<Result<Twist, OptimizerError>>,
    fallback: Result<Twist, OptimizerError>,
    seen_path_ends: Arc<Mutex<Vec<Pose2D>>>,
}

impl ScriptedOptimizer {
    pub fn always(result: Result<Twist, OptimizerError>) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: result,
            seen_path_ends: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn seen_path_ends(&self) -> Arc<Mutex<Vec<Pose2D>>> {
        Arc::clone(&self.seen_path_ends)
    }
}

impl TrajectoryOptimizer for ScriptedOptimizer {
    fn compute_velocity(
        &mut self,
        path: &Path,
        _state: &RobotState,
        _costmap: &CostmapSnapshot,
    ) -> Result<Twist, OptimizerError> {
        self.seen_path_ends.lock().unwrap().push(path.last());
        self.script.pop_front().unwrap_or_else(|| self.fallback.clone())
    }
}

/// Optimizer that overruns every per-tick deadline before answering.
pub struct StallingOptimizer {
    pub delay: Duration,
}

impl TrajectoryOptimizer for StallingOptimizer {
    fn compute_velocity(
        &mut self,
        _path: &Path,
        _state: &RobotState,
        _costmap: &CostmapSnapshot,
    ) -> Result<Twist, OptimizerError> {
        std::thread::sleep(self.delay);
        Ok(cruise())
    }
}

pub fn infeasible() -> OptimizerError {
    OptimizerError::NoFeasibleTrajectory("blocked".into())
}

pub fn cruise() -> Twist {
    Twist {
        linear_x: 0.5,
        linear_y: 0.0,
        angular_z: 0.1,
    }
}

/// Fast test cadence: 10 ms ticks, everything else scaled to match.
pub fn fast_config() -> ControllerConfig {
    ControllerConfig {
        control_period: Duration::from_millis(10),
        optimizer_deadline: Duration::from_millis(50),
        pose_timeout: Duration::from_millis(50),
        halt_wait: Duration::from_millis(300),
        costmap_refresh_period: Duration::from_millis(5),
        ..ControllerConfig::default()
    }
}

pub struct Rig {
    pub follower: PathFollower,
    pub pose: PoseHandle,
    pub sink: Arc<RecordingSink>,
}

pub fn rig(config: ControllerConfig, optimizer: impl TrajectoryOptimizer + 'static) -> Rig {
    let pose = PoseHandle::default();
    let sink = Arc::new(RecordingSink::default());
    let follower = PathFollower::new(
        "test_follower",
        config,
        ControllerDeps {
            optimizer: Box::new(optimizer),
            costmap: Arc::new(OpenField),
            robot_state: Arc::new(pose.clone()),
            velocity: sink.clone(),
        },
    )
    .expect("follower construction");

    Rig {
        follower,
        pose,
        sink,
    }
}

/// Configure + activate, then give the costmap service a beat to publish
/// its first snapshot so early ticks see one.
pub async fn activate(rig: &mut Rig) {
    rig.follower.configure().unwrap();
    rig.follower.activate().unwrap();
    tokio::time::sleep(Duration::from_millis(25)).await;
}
