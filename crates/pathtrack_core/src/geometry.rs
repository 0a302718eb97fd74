use std::f64::consts::PI;
use std::time::Instant;

use nalgebra::Point2;

use crate::error::{CoreError, Result};

/// Planar robot pose: position plus heading, in the path frame.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl Pose2D {
    pub const fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Euclidean distance between the positions of two poses.
    pub fn distance_to(&self, other: &Pose2D) -> f64 {
        (self.position() - other.position()).norm()
    }

    /// Shortest-arc heading difference to `other`, in (-pi, pi].
    pub fn heading_error_to(&self, other: &Pose2D) -> f64 {
        normalize_angle(other.theta - self.theta)
    }
}

/// Wrap an angle to (-pi, pi].
pub fn normalize_angle(mut a: f64) -> f64 {
    while a > PI {
        a -= 2.0 * PI;
    }
    while a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Velocity command: the sole output artifact of the control loop.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Twist {
    pub linear_x: f64,
    pub linear_y: f64,
    pub angular_z: f64,
}

impl Twist {
    pub const ZERO: Twist = Twist {
        linear_x: 0.0,
        linear_y: 0.0,
        angular_z: 0.0,
    };

    pub fn is_zero(&self) -> bool {
        self.linear_x == 0.0 && self.linear_y == 0.0 && self.angular_z == 0.0
    }
}

/// An ordered, never-empty sequence of poses to follow.
///
/// Emptiness is checked once at construction so downstream code can rely on
/// `last()` without re-validating.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    poses: Vec<Pose2D>,
}

impl Path {
    pub fn new(poses: Vec<Pose2D>) -> Result<Self> {
        if poses.is_empty() {
            return Err(CoreError::goal_rejected("path has no poses"));
        }
        Ok(Self { poses })
    }

    pub fn poses(&self) -> &[Pose2D] {
        &self.poses
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Final pose of the path. Constructor guarantees at least one pose.
    pub fn last(&self) -> Pose2D {
        self.poses[self.poses.len() - 1]
    }

    /// Distance left to travel: from `pose` to its nearest path point, plus
    /// the arc length of the path from that point to the end.
    pub fn remaining_distance_from(&self, pose: &Pose2D) -> f64 {
        let mut nearest = 0;
        let mut best = f64::INFINITY;
        for (i, p) in self.poses.iter().enumerate() {
            let d = pose.distance_to(p);
            if d < best {
                best = d;
                nearest = i;
            }
        }

        let mut remaining = best;
        for pair in self.poses[nearest..].windows(2) {
            remaining += pair[0].distance_to(&pair[1]);
        }
        remaining
    }
}

/// Read-only snapshot of the robot, refreshed each tick and never mutated by
/// the control loop.
#[derive(Debug, Copy, Clone)]
pub struct RobotState {
    pub pose: Pose2D,
    pub twist: Twist,
    pub stamp: Instant,
}
