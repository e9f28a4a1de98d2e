//! Domain layer for squad-orchestrator
//!
//! This crate contains the core rules, entities, and value objects.
//! It has no dependencies on infrastructure or platform concerns.
//!
//! # Core Concepts
//!
//! ## Session
//!
//! A Session is one round of squad formation for a community scope: the
//! lobby is shuffled into squads, each squad gets its own channel, and the
//! Session lives until it is replayed, cancelled, or left empty.
//!
//! ## Replay Quorum
//!
//! Any squad can vote to replay the Session. Once a strict majority of the
//! members currently in that squad's channel vote, every squad is torn down
//! and provisioned again with the same composition.
//!
//! ## Time Tracking
//!
//! Connected members accrue time that is checkpointed in non-overlapping
//! whole-second windows.

pub mod core;
pub mod quorum;
pub mod session;
pub mod squad;
pub mod tracking;

// Re-export commonly used types
pub use core::{
    error::DomainError,
    ids::{ChannelId, MemberId, ScopeId},
    validation::{ConfigIssue, ConfigIssueCode, Severity},
};
pub use quorum::{QuorumRule, VoteLedger, VoteOutcome};
pub use session::{IdleVerdict, Session};
pub use squad::{ChannelNaming, SquadChannel, compose_squads};
pub use tracking::TimeTracker;
