//! Port contracts for tracker and VCS synchronisation.
//!
//! Ports define infrastructure-agnostic interfaces used by sync services.
//! The two platform clients are opaque RPC collaborators; the webhook store
//! and the user directory are loaded once at startup.

pub mod tracker;
pub mod users;
pub mod vcs;
pub mod webhook_store;

pub use tracker::{
    CustomEnumField, EnumOption, TaskSummary, TrackerClient, TrackerError, TrackerResult,
    TrackerTask, WebhookFilter, WebhookInfo,
};
pub use users::UserDirectory;
pub use vcs::{CommitDetail, CommitSummary, VcsClient, VcsError, VcsResult};
pub use webhook_store::{StoredWebhook, WebhookStore, WebhookStoreError, WebhookStoreResult};
