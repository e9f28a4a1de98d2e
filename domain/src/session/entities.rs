//! Session entity
//!
//! A [`Session`] is one round of squad formation for a community scope. It
//! owns its squad channels, the replay vote ledger and the idle observation
//! used by the sweeper.

use crate::core::ids::{ChannelId, MemberId, ScopeId};
use crate::quorum::VoteLedger;
use crate::squad::SquadChannel;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One active round of squad formation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Scope key; at most one Session per scope
    pub scope: ScopeId,
    /// Monotonic id telling this Session apart from the one that replaces it
    pub generation: u64,
    /// Channel members return to on teardown
    pub origin_channel: ChannelId,
    /// Parent scope (category) squad channels are created under
    pub parent_scope: ChannelId,
    /// Squads in formation order
    pub squads: Vec<SquadChannel>,
    pub created_at: DateTime<Utc>,
    pub votes: VoteLedger,
    /// Start of the current streak of sweeps that found every channel empty
    pub last_empty_observed_at: Option<DateTime<Utc>>,
}

/// What the idle sweeper should do with a Session after an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleVerdict {
    /// At least one squad channel has members
    Occupied,
    /// Empty, but not yet for the whole grace period
    EmptySince(DateTime<Utc>),
    /// Empty for the whole grace period; tear it down
    Expired,
}

impl Session {
    pub fn new(
        scope: ScopeId,
        generation: u64,
        origin_channel: ChannelId,
        parent_scope: ChannelId,
        squads: Vec<SquadChannel>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scope,
            generation,
            origin_channel,
            parent_scope,
            squads,
            created_at,
            votes: VoteLedger::new(),
            last_empty_observed_at: None,
        }
    }

    pub fn squad(&self, name: &str) -> Option<&SquadChannel> {
        self.squads.iter().find(|s| s.name == name)
    }

    pub fn squad_by_channel(&self, channel: &ChannelId) -> Option<&SquadChannel> {
        self.squads.iter().find(|s| &s.external_id == channel)
    }

    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.squads.iter().map(|s| s.external_id.clone()).collect()
    }

    pub fn owns_channel(&self, channel: &ChannelId) -> bool {
        self.squads.iter().any(|s| &s.external_id == channel)
    }

    /// Squad names and members, used to provision the same composition again
    pub fn composition(&self) -> Vec<(String, Vec<MemberId>)> {
        self.squads
            .iter()
            .map(|s| (s.name.clone(), s.members.iter().cloned().collect()))
            .collect()
    }

    pub fn member_count(&self) -> usize {
        self.squads.iter().map(|s| s.members.len()).sum()
    }

    /// Record one sweep observation.
    ///
    /// The grace period counts from the first of a run of consecutive empty
    /// observations; any occupied observation resets the run. A run needs at
    /// least two observations to expire, even with a zero grace period, and a
    /// Session is never expired before it is `grace` old.
    pub fn observe_occupancy(
        &mut self,
        all_empty: bool,
        now: DateTime<Utc>,
        grace: Duration,
    ) -> IdleVerdict {
        if !all_empty {
            self.last_empty_observed_at = None;
            return IdleVerdict::Occupied;
        }

        let Some(since) = self.last_empty_observed_at else {
            self.last_empty_observed_at = Some(now);
            return IdleVerdict::EmptySince(now);
        };
        if now - since >= grace && now - self.created_at >= grace {
            IdleVerdict::Expired
        } else {
            IdleVerdict::EmptySince(since)
        }
    }
}
