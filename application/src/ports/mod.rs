//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod chat_platform;
pub mod checkpoint_store;
pub mod clock;
pub mod session_logger;
pub mod squad_namer;
