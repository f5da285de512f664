//! Tracker and VCS synchronisation.
//!
//! Inbound VCS change events are correlated to tracker tasks through the
//! `[<prefix>-<n>]` token embedded in task titles and reflected back as
//! progress updates and comments. Inbound tracker task-creation events are
//! stamped with the next identifier from a running counter kept inside the
//! project notes. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
