use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use pathtrack_core::goal::GoalTolerance;
use pathtrack_runtime::ControllerConfig;

pub const DEFAULT_NODE_NAME: &str = "pathtrack_sim";
pub const DEFAULT_GOAL_X: f64 = 5.0;
pub const DEFAULT_GOAL_Y: f64 = 2.0;

/// Command-line / environment surface of the simulator.
pub struct Config {
    pub node_name: String,
    pub goal_x: f64,
    pub goal_y: f64,
    pub profile_path: Option<PathBuf>,
    pub cancel_after: Option<Duration>,
}

impl Config {
    pub fn from_args() -> Self {
        Self::from_args_iter(env::args())
    }

    pub fn from_args_iter<I, S>(iter: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut node_name =
            env::var("PATHTRACK_NODE_NAME").unwrap_or_else(|_| DEFAULT_NODE_NAME.to_string());
        let mut goal_x = env::var("PATHTRACK_GOAL_X")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_GOAL_X);
        let mut goal_y = env::var("PATHTRACK_GOAL_Y")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_GOAL_Y);
        let mut profile_path = env::var("PATHTRACK_PROFILE").ok().map(PathBuf::from);
        let mut cancel_after = None;

        let mut args = iter.into_iter();
        let _ = args.next();
        while let Some(arg) = args.next() {
            let arg = arg.as_ref();
            match arg {
                "-h" | "--help" => {
                    print_usage();
                    std::process::exit(0);
                }
                "--node-name" => {
                    if let Some(value) = args.next() {
                        node_name = value.as_ref().to_string();
                    }
                }
                "--goal-x" => {
                    if let Some(value) = args.next() {
                        if let Ok(v) = value.as_ref().parse() {
                            goal_x = v;
                        }
                    }
                }
                "--goal-y" => {
                    if let Some(value) = args.next() {
                        if let Ok(v) = value.as_ref().parse() {
                            goal_y = v;
                        }
                    }
                }
                "--profile" => {
                    if let Some(value) = args.next() {
                        profile_path = Some(PathBuf::from(value.as_ref()));
                    }
                }
                "--cancel-after-ms" => {
                    if let Some(value) = args.next() {
                        if let Ok(ms) = value.as_ref().parse() {
                            cancel_after = Some(Duration::from_millis(ms));
                        }
                    }
                }
                _ if arg.starts_with("--node-name=") => {
                    node_name = arg["--node-name=".len()..].to_string();
                }
                _ if arg.starts_with("--goal-x=") => {
                    if let Ok(v) = arg["--goal-x=".len()..].parse() {
                        goal_x = v;
                    }
                }
                _ if arg.starts_with("--goal-y=") => {
                    if let Ok(v) = arg["--goal-y=".len()..].parse() {
                        goal_y = v;
                    }
                }
                _ if arg.starts_with("--profile=") => {
                    profile_path = Some(PathBuf::from(&arg["--profile=".len()..]));
                }
                _ if arg.starts_with("--cancel-after-ms=") => {
                    if let Ok(ms) = arg["--cancel-after-ms=".len()..].parse() {
                        cancel_after = Some(Duration::from_millis(ms));
                    }
                }
                _ => {}
            }
        }

        Self {
            node_name,
            goal_x,
            goal_y,
            profile_path,
            cancel_after,
        }
    }
}

fn print_usage() {
    println!(
        "pathtrack_sim [--goal-x <m>] [--goal-y <m>] [--node-name <name>] \
         [--profile <file.yaml>] [--cancel-after-ms <ms>]"
    );
}

/// Tunable numbers for one simulator run, loadable from a YAML profile.
///
/// Durations are in milliseconds, angles in degrees; the conversion to the
/// controller's native units happens in [`SimProfile::controller_config`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimProfile {
    pub control_period_ms: u64,
    pub goal_tolerance_xy: f64,
    pub goal_tolerance_yaw_deg: f64,
    pub progress_horizon_ms: u64,
    pub progress_min_displacement: f64,
    pub max_consecutive_failures: u32,
    pub optimizer_deadline_ms: u64,
    pub pose_timeout_ms: u64,
    pub halt_wait_ms: u64,
    pub costmap_refresh_ms: u64,
    /// Forward speed ceiling of the carrot follower, m/s.
    pub max_speed: f64,
    /// Yaw rate ceiling of the carrot follower, rad/s.
    pub max_yaw_rate: f64,
    /// Carrot distance along the path, m.
    pub lookahead: f64,
}

impl Default for SimProfile {
    fn default() -> Self {
        let controller = ControllerConfig::default();
        Self {
            control_period_ms: controller.control_period.as_millis() as u64,
            goal_tolerance_xy: controller.goal_tolerance.xy,
            goal_tolerance_yaw_deg: controller.goal_tolerance.yaw.to_degrees(),
            progress_horizon_ms: controller.progress_horizon.as_millis() as u64,
            progress_min_displacement: controller.progress_min_displacement,
            max_consecutive_failures: controller.max_consecutive_failures,
            optimizer_deadline_ms: controller.optimizer_deadline.as_millis() as u64,
            pose_timeout_ms: controller.pose_timeout.as_millis() as u64,
            halt_wait_ms: controller.halt_wait.as_millis() as u64,
            costmap_refresh_ms: controller.costmap_refresh_period.as_millis() as u64,
            max_speed: 0.6,
            max_yaw_rate: 1.2,
            lookahead: 0.6,
        }
    }
}

impl SimProfile {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read profile {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parse profile {}", path.display()))
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            control_period: Duration::from_millis(self.control_period_ms),
            goal_tolerance: GoalTolerance {
                xy: self.goal_tolerance_xy,
                yaw: self.goal_tolerance_yaw_deg.to_radians(),
            },
            progress_horizon: Duration::from_millis(self.progress_horizon_ms),
            progress_min_displacement: self.progress_min_displacement,
            max_consecutive_failures: self.max_consecutive_failures,
            optimizer_deadline: Duration::from_millis(self.optimizer_deadline_ms),
            pose_timeout: Duration::from_millis(self.pose_timeout_ms),
            halt_wait: Duration::from_millis(self.halt_wait_ms),
            costmap_refresh_period: Duration::from_millis(self.costmap_refresh_ms),
        }
    }
}
