//! Run the full controller stack against a simulated robot.
//!
//! Builds a `PathFollower` over a kinematic fake, walks it through
//! configure/activate, submits one straight-line goal, streams feedback,
//! and tears the node down. Exits nonzero when the goal aborts.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use pathtrack_core::geometry::Pose2D;
use pathtrack_core::goal::GoalOutcome;
use pathtrack_runtime::{ControllerDeps, PathFollower};

use pathtrack_sim::config::{Config, SimProfile};
use pathtrack_sim::sim::{CarrotOptimizer, FlatGround, SimRobot};

const WAYPOINT_SPACING: f64 = 0.25;

/// Straight line from `start` to the goal position, one waypoint every
/// `WAYPOINT_SPACING` meters, all headed along the line.
fn line_path(start: Pose2D, goal_x: f64, goal_y: f64) -> Vec<Pose2D> {
    let dx = goal_x - start.x;
    let dy = goal_y - start.y;
    let length = (dx * dx + dy * dy).sqrt();
    let heading = dy.atan2(dx);

    let steps = (length / WAYPOINT_SPACING).ceil().max(1.0) as usize;
    let mut poses = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        poses.push(Pose2D::new(start.x + dx * t, start.y + dy * t, heading));
    }
    poses
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_args();
    let profile = match &config.profile_path {
        Some(path) => SimProfile::load(path)?,
        None => SimProfile::default(),
    };

    let robot = SimRobot::new(Pose2D::default());
    let stepper = robot.spawn_stepper(Duration::from_millis(10));

    let mut follower = PathFollower::new(
        &config.node_name,
        profile.controller_config(),
        ControllerDeps {
            optimizer: Box::new(CarrotOptimizer::new(
                profile.lookahead,
                profile.max_speed,
                profile.max_yaw_rate,
            )),
            costmap: Arc::new(FlatGround),
            robot_state: Arc::new(robot.clone()),
            velocity: Arc::new(robot.clone()),
        },
    )
    .context("build controller")?;

    let mut events = follower.subscribe_transition_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(
                transition = %event.transition,
                from = %event.start_state,
                to = %event.goal_state,
                "lifecycle"
            );
        }
    });

    follower.configure().context("configure")?;
    follower.activate().context("activate")?;

    let path = line_path(robot.pose(), config.goal_x, config.goal_y);
    info!(
        goal_x = config.goal_x,
        goal_y = config.goal_y,
        waypoints = path.len(),
        "submitting goal"
    );
    let mut handle = follower.follow_path(path).context("submit goal")?;
    let mut feedback = follower.subscribe_feedback();

    let cancel_deadline = async {
        match config.cancel_after {
            Some(after) => tokio::time::sleep(after).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(cancel_deadline);
    let mut cancel_pending = config.cancel_after.is_some();

    let outcome = loop {
        tokio::select! {
            outcome = handle.outcome() => break outcome,
            progress = feedback.recv() => {
                if let Ok(p) = progress {
                    info!(goal_id = p.goal_id, "remaining: {:.2} m", p.distance_remaining);
                }
            }
            _ = &mut cancel_deadline, if cancel_pending => {
                cancel_pending = false;
                info!("cancel timer fired");
                follower.cancel().context("cancel goal")?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt: canceling goal");
                follower.cancel().context("cancel goal")?;
            }
        }
    };

    info!(outcome = outcome.label(), pose = ?robot.pose(), "goal finished");

    // Deactivate and shutdown block on the halt handshake; keep them off
    // the async workers.
    let teardown = tokio::task::spawn_blocking(move || {
        follower.deactivate()?;
        follower.cleanup()?;
        follower.shutdown()
    })
    .await
    .context("teardown task")?;
    if let Err(err) = teardown {
        pathtrack_runtime::error::log_core_error(&err);
    }
    stepper.abort();

    if let GoalOutcome::Aborted(reason) = outcome {
        bail!("goal aborted: {}", reason.label());
    }
    Ok(())
}
