//! Per-member connected-time accounting.

pub mod tracker;

pub use tracker::TimeTracker;
