use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::geometry::Pose2D;

/// Ring of recent (pose, stamp) samples used to detect a stalled robot.
///
/// Invariants:
/// - stamps are strictly increasing; non-monotonic samples are dropped
/// - at most one sample older than the horizon is retained, so the window
///   provably covers the full horizon once enough history exists
#[derive(Debug)]
pub struct ProgressWindow {
    horizon: Duration,
    min_displacement: f64,
    samples: VecDeque<(Pose2D, Instant)>,
}

impl ProgressWindow {
    pub fn new(horizon: Duration, min_displacement: f64) -> Self {
        Self {
            horizon,
            min_displacement,
            samples: VecDeque::new(),
        }
    }

    /// Record the pose observed at `now` and evict expired samples.
    pub fn record(&mut self, pose: Pose2D, now: Instant) {
        if let Some(&(_, last)) = self.samples.back() {
            if now <= last {
                return;
            }
        }
        self.samples.push_back((pose, now));

        // Keep the newest sample that is at least `horizon` old as the
        // baseline; evict anything older than that.
        while self.samples.len() > 1 {
            let second_age = now.duration_since(self.samples[1].1);
            if second_age >= self.horizon {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// False only when the retained window spans the full horizon and no
    /// sample moved `min_displacement` away from the oldest one.
    pub fn is_progressing(&self) -> bool {
        let (Some(&(oldest_pose, oldest_stamp)), Some(&(_, newest_stamp))) =
            (self.samples.front(), self.samples.back())
        else {
            return true;
        };

        if newest_stamp.duration_since(oldest_stamp) < self.horizon {
            return true;
        }

        self.samples
            .iter()
            .any(|(pose, _)| oldest_pose.distance_to(pose) >= self.min_displacement)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
