//! Adapter implementations of the sync ports.
//!
//! - [`memory`]: in-process implementations for tests and local tooling
//! - [`file`]: JSON files in a capability-scoped directory

pub mod file;
pub mod memory;
