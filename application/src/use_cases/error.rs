//! Orchestrator errors

use crate::ports::chat_platform::PlatformError;
use squad_domain::{DomainError, ScopeId};
use thiserror::Error;

/// Errors surfaced to callers of the orchestrator entry points.
///
/// Per-member failures (moves, greetings, deletions) and checkpoint write
/// failures are logged and never show up here.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("At least 2 members are required to form squads (got {0})")]
    InsufficientMembers(usize),

    #[error("Squad size must be at least 1")]
    InvalidGroupSize,

    #[error("Provisioning for {scope} stopped after {created} of {requested} channels: {reason}")]
    ProvisionFailed {
        scope: ScopeId,
        created: usize,
        requested: usize,
        reason: PlatformError,
    },

    #[error("No active session for {0}")]
    SessionNotFound(ScopeId),

    #[error("Session for {scope} has no squad named {squad}")]
    SubgroupNotFound { scope: ScopeId, squad: String },

    #[error("Session for {scope} already has a squad named {squad}")]
    SquadNameTaken { scope: ScopeId, squad: String },

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl From<DomainError> for OrchestratorError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InsufficientMembers(n) => OrchestratorError::InsufficientMembers(n),
            DomainError::InvalidGroupSize => OrchestratorError::InvalidGroupSize,
        }
    }
}

impl OrchestratorError {
    /// Whether the failure left a (partial) Session registered
    pub fn session_registered(&self) -> bool {
        matches!(self, OrchestratorError::ProvisionFailed { created, .. } if *created > 0)
    }
}
