//! Squad naming port
//!
//! An optional text service that invents squad names from the display names
//! of each squad's members. The orchestrator falls back to `Squad-N` names
//! whenever it fails, times out, or returns the wrong number of names.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NamingError {
    #[error("Naming service unavailable: {0}")]
    Unavailable(String),

    #[error("Naming request failed: {0}")]
    RequestFailed(String),

    #[error("Unusable naming response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait SquadNamer: Send + Sync {
    /// Produce one name per squad, in order.
    async fn name_groups(&self, squads: &[Vec<String>]) -> Result<Vec<String>, NamingError>;
}

/// Namer used when no text service is configured; always falls back.
pub struct NoSquadNamer;

#[async_trait]
impl SquadNamer for NoSquadNamer {
    async fn name_groups(&self, _squads: &[Vec<String>]) -> Result<Vec<String>, NamingError> {
        Err(NamingError::Unavailable("no naming service configured".to_string()))
    }
}
