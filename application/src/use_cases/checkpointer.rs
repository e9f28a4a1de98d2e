//! Time-accrual checkpointer
//!
//! Tracks how long each member has been connected and periodically adds the
//! accrued seconds to the checkpoint store. Each second is written exactly
//! once: trackers hand out non-overlapping windows, and a window whose write
//! fails is parked in a pending map and retried on the next flush.

use crate::config::CheckpointParams;
use crate::ports::checkpoint_store::{CheckpointStore, StoreError};
use crate::ports::clock::Clock;
use squad_domain::{MemberId, TimeTracker};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Counts from one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Members whose delta was written
    pub written: usize,
    /// Seconds written in total
    pub seconds: i64,
    /// Members whose write failed and was carried forward
    pub failed: usize,
}

pub struct TimeTrackerRegistry {
    store: Arc<dyn CheckpointStore>,
    clock: Arc<dyn Clock>,
    params: CheckpointParams,
    trackers: Mutex<HashMap<MemberId, TimeTracker>>,
    /// Deltas taken from trackers whose write has not succeeded yet
    pending: Mutex<HashMap<MemberId, i64>>,
}

impl TimeTrackerRegistry {
    pub fn new(store: Arc<dyn CheckpointStore>, clock: Arc<dyn Clock>, params: CheckpointParams) -> Self {
        Self {
            store,
            clock,
            params,
            trackers: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn params(&self) -> &CheckpointParams {
        &self.params
    }

    /// Start tracking a member. A member already tracked keeps their tracker.
    pub fn on_connect(&self, member: MemberId) -> bool {
        let now = self.clock.now();
        let mut trackers = self.trackers.lock().unwrap();
        if trackers.contains_key(&member) {
            debug!("{} already tracked, keeping existing tracker", member);
            return false;
        }
        trackers.insert(member.clone(), TimeTracker::start(member, now));
        true
    }

    /// Stop tracking a member and write their final delta.
    ///
    /// Returns the seconds written, or 0 when nothing was written.
    pub async fn on_disconnect(&self, member: &MemberId) -> i64 {
        let now = self.clock.now();
        let Some(mut tracker) = self.trackers.lock().unwrap().remove(member) else {
            debug!("Disconnect for untracked member {}", member);
            return 0;
        };

        let carried = self.pending.lock().unwrap().remove(member).unwrap_or(0);
        let seconds = tracker.take_final(now) + carried;
        if seconds == 0 {
            return 0;
        }
        match self.write(member, seconds).await {
            Ok(()) => seconds,
            Err(e) => {
                warn!("Final checkpoint for {} failed, carrying {}s: {}", member, seconds, e);
                self.carry(member, seconds);
                0
            }
        }
    }

    /// Start tracking everyone already connected (after a restart).
    ///
    /// Time accrued before the restart that was never flushed is not recovered.
    pub fn seed(&self, members: &[MemberId]) -> usize {
        let seeded = members
            .iter()
            .filter(|member| self.on_connect((*member).clone()))
            .count();
        info!("Seeded {} time trackers", seeded);
        seeded
    }

    /// Periodic flush: every tracker past the minimum accrual, plus pending deltas
    pub async fn flush_due(&self) -> FlushReport {
        let now = self.clock.now();
        let min_accrual = chrono::Duration::seconds(self.params.min_accrual.as_secs() as i64);
        let deltas: Vec<(MemberId, i64)> = {
            let mut trackers = self.trackers.lock().unwrap();
            trackers
                .values_mut()
                .filter_map(|t| t.take_delta(now, min_accrual).map(|s| (t.member.clone(), s)))
                .collect()
        };
        self.write_all(deltas).await
    }

    /// Flush everything that has accrued, regardless of the minimum (shutdown)
    pub async fn flush_all(&self) -> FlushReport {
        let now = self.clock.now();
        let deltas: Vec<(MemberId, i64)> = {
            let mut trackers = self.trackers.lock().unwrap();
            trackers
                .values_mut()
                .map(|t| (t.member.clone(), t.take_final(now)))
                .filter(|(_, s)| *s > 0)
                .collect()
        };
        self.write_all(deltas).await
    }

    pub fn tracked_count(&self) -> usize {
        self.trackers.lock().unwrap().len()
    }

    pub fn is_tracked(&self, member: &MemberId) -> bool {
        self.trackers.lock().unwrap().contains_key(member)
    }

    /// Seconds waiting to be retried for a member
    pub fn pending_seconds(&self, member: &MemberId) -> i64 {
        self.pending.lock().unwrap().get(member).copied().unwrap_or(0)
    }

    async fn write_all(&self, deltas: Vec<(MemberId, i64)>) -> FlushReport {
        let mut batch: HashMap<MemberId, i64> = std::mem::take(&mut *self.pending.lock().unwrap());
        for (member, seconds) in deltas {
            *batch.entry(member).or_insert(0) += seconds;
        }

        let mut report = FlushReport::default();
        for (member, seconds) in batch {
            match self.write(&member, seconds).await {
                Ok(()) => {
                    report.written += 1;
                    report.seconds += seconds;
                }
                Err(e) => {
                    warn!("Checkpoint for {} failed, carrying {}s: {}", member, seconds, e);
                    self.carry(&member, seconds);
                    report.failed += 1;
                }
            }
        }

        if report.written > 0 || report.failed > 0 {
            debug!(
                "Checkpoint flush: {} written ({}s), {} carried",
                report.written, report.seconds, report.failed
            );
        }
        report
    }

    async fn write(&self, member: &MemberId, seconds: i64) -> Result<(), StoreError> {
        self.store
            .increment_field(
                &self.params.key_for(member.as_str()),
                &self.params.field_path,
                seconds,
            )
            .await
    }

    fn carry(&self, member: &MemberId, seconds: i64) {
        *self
            .pending
            .lock()
            .unwrap()
            .entry(member.clone())
            .or_insert(0) += seconds;
    }
}
