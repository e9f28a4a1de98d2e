//! Sessions: one active squad formation per community scope.

pub mod entities;

pub use entities::{IdleVerdict, Session};
