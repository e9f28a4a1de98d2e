//! Core domain concepts shared across all subdomains.
//!
//! - [`ids`]: scope, member and channel identifiers
//! - [`error::DomainError`]: domain-level errors
//! - [`validation`]: structured configuration issues

pub mod error;
pub mod ids;
pub mod validation;
