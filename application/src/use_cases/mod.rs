//! Use cases
//!
//! - [`provision`] creates, fills and deletes squad channels
//! - [`session_registry`] owns the active Sessions and handles votes
//! - [`idle_sweeper`] expires Sessions left empty
//! - [`checkpointer`] accrues connected time into the checkpoint store
//! - [`orchestrator`] wires them together behind one facade

pub mod checkpointer;
pub mod error;
pub mod idle_sweeper;
pub mod orchestrator;
pub mod provision;
pub mod session_registry;

#[cfg(test)]
pub(crate) mod test_support;
