//! Logging infrastructure: structured session audit logging.
//!
//! Provides [`JsonlSessionLogger`], a JSONL file writer that implements
//! the [`SessionEventLogger`](squad_application::SessionEventLogger) port.

mod jsonl_logger;

pub use jsonl_logger::JsonlSessionLogger;
