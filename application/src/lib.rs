//! Application layer for squad-orchestrator
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{
    CheckpointParams, OrchestratorConfig, ProvisionerParams, SquadParams, SweeperParams,
};
pub use ports::{
    chat_platform::{ChannelInfo, ChatPlatform, PlatformError, PlatformEvent},
    checkpoint_store::{CheckpointStore, StoreError},
    clock::{Clock, SystemClock},
    session_logger::{NoSessionLogger, SessionEvent, SessionEventLogger},
    squad_namer::{NamingError, NoSquadNamer, SquadNamer},
};
pub use use_cases::checkpointer::{FlushReport, TimeTrackerRegistry};
pub use use_cases::error::OrchestratorError;
pub use use_cases::idle_sweeper::{IdleSweeper, SweepReport};
pub use use_cases::orchestrator::{Orchestrator, OrchestratorPorts};
pub use use_cases::provision::{ChannelProvisioner, ProvisionOutcome, ProvisionRequest, TeardownMode};
pub use use_cases::session_registry::{
    SessionRegistry, StartSessionInput, TeardownReason, VoteReceipt,
};
