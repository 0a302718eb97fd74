//! pathtrack_runtime
//!
//! Async layer of the pathtrack controller, built on tokio. The external
//! collaborators (trajectory optimizer, costmap, pose source, actuator
//! channel) sit behind capability traits so the control loop runs the same
//! against production adapters and deterministic test fakes.
//!
//! Core semantics (lifecycle engine, progress window, goal model) live in
//! `pathtrack_core`; this crate owns tasks, channels, and policy.

pub mod config;
pub mod costmap;
pub mod error;
pub mod events;
pub mod executor;
pub mod interfaces;
pub mod node;
pub mod publisher;

mod control_loop;

pub use config::ControllerConfig;
pub use costmap::CostmapService;
pub use events::TransitionEvent;
pub use executor::{GoalExecutor, GoalHandle, Progress};
pub use interfaces::{
    CostmapSnapshot, CostmapSource, OptimizerError, RobotStateSource, TrajectoryOptimizer,
    VelocitySink,
};
pub use node::{ControllerDeps, LifecycleNode, PathFollower};
pub use publisher::CommandPublisher;

// Core types runtime users always need alongside this crate.
pub use pathtrack_core::error::{CoreError, Result};
pub use pathtrack_core::geometry::{Path, Pose2D, RobotState, Twist};
pub use pathtrack_core::goal::{AbortReason, CancelReason, GoalOutcome, GoalTolerance};
pub use pathtrack_core::lifecycle::{CallbackResult, LifecycleState, Transition};
