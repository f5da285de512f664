//! Application services for tracker and VCS synchronisation.

mod counter;
mod dispatcher;
mod engine;
mod note;
mod outbound;
mod resolver;
mod signature;
mod webhook_admin;

pub use counter::{CounterBatchGuard, CounterError, CounterService};
pub use dispatcher::{
    DEFAULT_EXCLUDED_BRANCHES, DispatchError, EventDispatcher, InboundKind, TrackerDelivery,
    TrackerOutcome, TrackerReply, VcsDelivery, VcsDeliveryError, VcsOutcome, VcsReply,
};
pub use engine::{EngineError, SyncAdapters, SyncEngine};
pub use note::{DEFAULT_MENTION_URL_TEMPLATE, NoteComposer, NoteError};
pub use outbound::{
    OutboundError, OutboundExecutor, OutboundHandle, OutboundJob, OutboundQueue,
    OutboundSettings, OutboundStats, OutboundStatsSnapshot, TaskUpdate, TaskUpdater,
};
pub use resolver::TaskResolver;
pub use signature::{SignatureCheck, SignatureVerifier};
pub use webhook_admin::{TRACKER_WEBHOOK_PATH, WebhookAdminError, WebhookAdminService};
