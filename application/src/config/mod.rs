//! Application-level configuration.
//!
//! - [`SquadParams`]: squad size, channel naming, quorum rule
//! - [`ProvisionerParams`]: deletion grace and greetings
//! - [`SweeperParams`]: idle sweep cadence and grace period
//! - [`CheckpointParams`]: time-accrual flush cadence and store layout
//! - [`OrchestratorConfig`]: container for all of the above

pub mod orchestrator_config;
pub mod params;

pub use orchestrator_config::OrchestratorConfig;
pub use params::{CheckpointParams, ProvisionerParams, SquadParams, SweeperParams};
