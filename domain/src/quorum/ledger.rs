//! Replay vote ledger
//!
//! Keeps the set of voters per squad for one Session. Votes are monotonic:
//! a voter can be added once per squad and is never removed until the whole
//! ledger is cleared by a reset.

use super::rule::QuorumRule;
use crate::core::ids::MemberId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Result of casting a replay vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VoteOutcome {
    /// The voter had already voted in this squad; nothing changed
    AlreadyVoted { vote_count: usize },
    /// The vote was recorded
    Accepted {
        vote_count: usize,
        quorum_reached: bool,
    },
}

impl VoteOutcome {
    pub fn vote_count(&self) -> usize {
        match self {
            VoteOutcome::AlreadyVoted { vote_count } => *vote_count,
            VoteOutcome::Accepted { vote_count, .. } => *vote_count,
        }
    }

    pub fn quorum_reached(&self) -> bool {
        matches!(
            self,
            VoteOutcome::Accepted {
                quorum_reached: true,
                ..
            }
        )
    }
}

/// Per-squad voter sets for one Session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteLedger {
    votes: BTreeMap<String, BTreeSet<MemberId>>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `voter`'s replay vote in `squad`.
    ///
    /// `live_members` is the number of members currently present in the
    /// squad's channel, read at vote time.
    pub fn cast(
        &mut self,
        squad: &str,
        voter: MemberId,
        live_members: usize,
        rule: QuorumRule,
    ) -> VoteOutcome {
        let voters = self.votes.entry(squad.to_string()).or_default();
        if voters.contains(&voter) {
            return VoteOutcome::AlreadyVoted {
                vote_count: voters.len(),
            };
        }

        voters.insert(voter);
        let vote_count = voters.len();
        VoteOutcome::Accepted {
            vote_count,
            quorum_reached: rule.is_satisfied(vote_count, live_members),
        }
    }

    pub fn vote_count(&self, squad: &str) -> usize {
        self.votes.get(squad).map_or(0, BTreeSet::len)
    }

    pub fn has_voted(&self, squad: &str, voter: &MemberId) -> bool {
        self.votes.get(squad).is_some_and(|v| v.contains(voter))
    }

    /// Move a squad's votes to its new name
    pub fn rename(&mut self, squad: &str, new_name: &str) {
        if let Some(voters) = self.votes.remove(squad) {
            self.votes.entry(new_name.to_string()).or_default().extend(voters);
        }
    }

    pub fn clear(&mut self) {
        self.votes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.votes.values().all(BTreeSet::is_empty)
    }
}
