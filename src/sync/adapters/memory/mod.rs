//! In-memory adapters.

mod tracker;
mod users;
mod vcs;
mod webhook_store;

pub use tracker::{InMemoryTracker, TrackerCall, TrackerOperation};
pub use users::StaticUserDirectory;
pub use vcs::InMemoryVcs;
pub use webhook_store::InMemoryWebhookStore;
