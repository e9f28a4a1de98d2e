//! Checkpoint store port
//!
//! Durable storage for accrued time. Only additive increments are used, so
//! concurrent writers and retried writes never overwrite each other.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Field {field} of {key} is not a number")]
    NotANumber { key: String, field: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Add `amount` to the numeric field at dotted `field_path` of document `key`.
    ///
    /// Missing documents and fields start at zero.
    async fn increment_field(&self, key: &str, field_path: &str, amount: i64) -> Result<(), StoreError>;
}
