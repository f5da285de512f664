//! Tracksync: task tracker and VCS correlation engine.
//!
//! This crate correlates source-control activity (pushes and merge requests)
//! with tracked work items through an identifier token embedded in task
//! titles, and stamps newly created tracker tasks with sequential
//! identifiers.
//!
//! # Architecture
//!
//! Tracksync follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for the tracker, VCS, and stores
//! - **Adapters**: Concrete implementations of ports (in-memory, file-backed)
//!
//! # Modules
//!
//! - [`sync`]: Identifier codec, counter allocation, progress mapping, note
//!   composition, and webhook dispatch
//! - [`config`]: Process configuration loading and validation
//! - [`telemetry`]: Structured logging setup

pub mod config;
pub mod sync;
pub mod telemetry;
