//! Replay voting
//!
//! Any squad can propose replaying the whole Session. Each member votes at
//! most once per squad; once a squad's votes satisfy the [`QuorumRule`]
//! against the members currently in its channel, every squad of the Session
//! is torn down and provisioned again.

pub mod ledger;
pub mod rule;

pub use ledger::{VoteLedger, VoteOutcome};
pub use rule::QuorumRule;
