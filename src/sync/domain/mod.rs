//! Domain model for tracker and VCS synchronisation.
//!
//! The domain covers identifier tokens, the running counter, the progress
//! state machine, webhook signatures, and the inbound event payloads, while
//! keeping every platform call outside of the domain boundary.

mod counter;
mod error;
mod events;
mod identifier;
mod identity;
mod ids;
mod progress;
mod signature;

pub use counter::{BatchAllocator, CounterBatch, RunningCounter, next_batch};
pub use error::{ParseProgressError, SignatureError, SyncDomainError};
pub use events::{
    CommitAuthor, EventUser, MergeRequestAttributes, MergeRequestChanges, MergeRequestEvent,
    ProjectInfo, PushCommit, PushEvent, ResourceRef, TrackerEvent, TrackerEventBatch,
};
pub use identifier::{ScanMode, TaskToken, embed, extract};
pub use identity::{MappedUser, UserRecord};
pub use ids::{TaskGid, WebhookId};
pub use progress::{
    MergeRequestAction, MergeRequestHeadline, MergeRequestSignal, MergeRequestState,
    MergeRequestTransition, Progress, merge_request_transition, push_transition,
};
pub use signature::{sign, verify};
