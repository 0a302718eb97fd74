//! pathtrack_core: transport-free semantics for the pathtrack controller.
//!
//! Design goals:
//! - Pure, testable logic (no async runtime, no I/O).
//! - Explicit types; no macro wizardry.
//! - Small, stable public API surface.

pub mod error;

/// Planar geometry value types: poses, velocity commands, paths, robot state.
pub mod geometry;

/// Goal outcome taxonomy and the goal-reached check.
pub mod goal;

/// Lifecycle state machine: states, transitions, engine, gate, graph.
pub mod lifecycle;

/// Time-bounded pose history used to detect a stalled robot.
pub mod progress;
