use std::time::Duration;

use pathtrack_core::error::{CoreError, Domain, ErrorKind, Result};
use pathtrack_core::goal::GoalTolerance;

/// Load-time settings for the controller.
///
/// Validated once at node construction; the loop reads them immutably.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Control loop period; one compute-and-publish cycle per period.
    pub control_period: Duration,
    /// Position/heading tolerances for declaring the goal reached.
    pub goal_tolerance: GoalTolerance,
    /// Time horizon of the progress window.
    pub progress_horizon: Duration,
    /// Minimum displacement over the horizon before the robot counts as stuck.
    pub progress_min_displacement: f64,
    /// Consecutive optimizer failures tolerated before aborting the goal.
    pub max_consecutive_failures: u32,
    /// Per-tick budget for the optimizer call; a miss counts as a failure.
    pub optimizer_deadline: Duration,
    /// How long one tick may wait for a robot pose before aborting.
    pub pose_timeout: Duration,
    /// Bound on deactivation's wait for the loop to stop before force-abort.
    pub halt_wait: Duration,
    /// Refresh cadence of the costmap service, independent of the loop.
    pub costmap_refresh_period: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            control_period: Duration::from_millis(100),
            goal_tolerance: GoalTolerance {
                xy: 0.1,
                yaw: 5.0_f64.to_radians(),
            },
            progress_horizon: Duration::from_secs(10),
            progress_min_displacement: 0.25,
            max_consecutive_failures: 3,
            optimizer_deadline: Duration::from_millis(80),
            pose_timeout: Duration::from_millis(100),
            halt_wait: Duration::from_millis(500),
            costmap_refresh_period: Duration::from_millis(50),
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<()> {
        fn bad(msg: &'static str) -> CoreError {
            CoreError::error()
                .domain(Domain::Config)
                .kind(ErrorKind::InvalidArgument)
                .msg(msg)
                .build()
        }

        if self.control_period.is_zero() {
            return Err(bad("control_period must be positive"));
        }
        if self.goal_tolerance.xy <= 0.0 || self.goal_tolerance.yaw <= 0.0 {
            return Err(bad("goal tolerances must be positive"));
        }
        if self.progress_horizon.is_zero() {
            return Err(bad("progress_horizon must be positive"));
        }
        if self.progress_min_displacement <= 0.0 {
            return Err(bad("progress_min_displacement must be positive"));
        }
        if self.max_consecutive_failures == 0 {
            return Err(bad("max_consecutive_failures must be at least 1"));
        }
        if self.optimizer_deadline.is_zero() {
            return Err(bad("optimizer_deadline must be positive"));
        }
        if self.pose_timeout.is_zero() {
            return Err(bad("pose_timeout must be positive"));
        }
        if self.costmap_refresh_period.is_zero() {
            return Err(bad("costmap_refresh_period must be positive"));
        }
        // The loop observes a halt request at a tick boundary and may be
        // mid-optimizer-call when it arrives.
        if self.halt_wait < self.control_period + self.optimizer_deadline {
            return Err(bad(
                "halt_wait must cover at least one control period plus the optimizer deadline",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        ControllerConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_period_is_refused() {
        let cfg = ControllerConfig {
            control_period: Duration::ZERO,
            ..ControllerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn short_halt_wait_is_refused() {
        let cfg = ControllerConfig {
            halt_wait: Duration::from_millis(10),
            ..ControllerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_failure_threshold_is_refused() {
        let cfg = ControllerConfig {
            max_consecutive_failures: 0,
            ..ControllerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
