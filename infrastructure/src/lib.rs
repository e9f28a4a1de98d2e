//! Infrastructure layer for squad-orchestrator
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod naming;
pub mod platform;
pub mod store;

// Re-export commonly used types
pub use config::{ConfigLoader, FileConfig};
pub use logging::JsonlSessionLogger;
pub use naming::HttpSquadNamer;
pub use platform::{InMemoryChatPlatform, PlatformOp, PostedMessage};
pub use store::JsonFileCheckpointStore;
