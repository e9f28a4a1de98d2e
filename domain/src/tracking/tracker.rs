//! Connected-time tracker
//!
//! One [`TimeTracker`] exists per connected member. Time is flushed in whole
//! seconds and `last_checkpoint` advances by exactly the flushed amount, so a
//! sub-second remainder is carried into the next window instead of being
//! dropped or counted twice.

use crate::core::ids::MemberId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeTracker {
    pub member: MemberId,
    /// When the member most recently connected
    pub session_start: DateTime<Utc>,
    /// End of the last flushed window
    pub last_checkpoint: DateTime<Utc>,
}

impl TimeTracker {
    pub fn start(member: MemberId, now: DateTime<Utc>) -> Self {
        Self {
            member,
            session_start: now,
            last_checkpoint: now,
        }
    }

    /// Whole seconds accrued since the last checkpoint
    pub fn unflushed_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_checkpoint).num_seconds().max(0)
    }

    /// Take the delta for a periodic flush.
    ///
    /// Returns `None` while less than `min_accrual` has accrued. Otherwise
    /// advances `last_checkpoint` and returns the whole seconds taken.
    pub fn take_delta(&mut self, now: DateTime<Utc>, min_accrual: Duration) -> Option<i64> {
        if now - self.last_checkpoint < min_accrual {
            return None;
        }
        let seconds = self.unflushed_seconds(now);
        if seconds == 0 {
            return None;
        }
        self.last_checkpoint += Duration::seconds(seconds);
        Some(seconds)
    }

    /// Take everything that has accrued, for the final flush on disconnect
    pub fn take_final(&mut self, now: DateTime<Utc>) -> i64 {
        let seconds = self.unflushed_seconds(now);
        self.last_checkpoint += Duration::seconds(seconds);
        seconds
    }

    /// Total connected time since `session_start`
    pub fn connected_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.session_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_threshold_is_not_flushed() {
        let t0 = Utc::now();
        let mut tracker = TimeTracker::start(MemberId::new("a"), t0);
        assert_eq!(
            tracker.take_delta(t0 + Duration::seconds(20), Duration::seconds(30)),
            None
        );
        assert_eq!(tracker.last_checkpoint, t0);
    }

    #[test]
    fn test_flushes_sum_to_connected_time() {
        let t0 = Utc::now();
        let min = Duration::seconds(30);
        let mut tracker = TimeTracker::start(MemberId::new("a"), t0);

        let mut total = 0;
        let mut now = t0;
        for step_ms in [61_250, 59_900, 60_400, 120_010, 45_700] {
            now += Duration::milliseconds(step_ms);
            total += tracker.take_delta(now, min).unwrap_or(0);
        }
        now += Duration::milliseconds(12_345);
        total += tracker.take_final(now);

        let connected = tracker.connected_for(now).num_seconds();
        assert!(connected - total >= 0 && connected - total < 1);
        assert_eq!(total, connected);
    }

    #[test]
    fn test_remainder_carries_into_next_window() {
        let t0 = Utc::now();
        let mut tracker = TimeTracker::start(MemberId::new("a"), t0);
        let delta = tracker
            .take_delta(t0 + Duration::milliseconds(60_700), Duration::seconds(30))
            .unwrap();
        assert_eq!(delta, 60);
        assert_eq!(tracker.last_checkpoint, t0 + Duration::seconds(60));
        assert_eq!(tracker.take_final(t0 + Duration::milliseconds(61_300)), 1);
    }

    #[test]
    fn test_clock_going_backwards_accrues_nothing() {
        let t0 = Utc::now();
        let mut tracker = TimeTracker::start(MemberId::new("a"), t0);
        assert_eq!(tracker.take_final(t0 - Duration::seconds(5)), 0);
        assert_eq!(tracker.last_checkpoint, t0);
    }
}
