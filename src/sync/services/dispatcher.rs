//! Inbound webhook orchestration for both platforms.
//!
//! Each delivery is handled in one flow: authenticate, decode, select the
//! event branch, then queue the resulting tracker mutations. Tracker
//! deliveries always succeed at the boundary because the tracker disables
//! webhooks after repeated failures; VCS deliveries surface authentication
//! and processing failures.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{
    CounterError, CounterService, NoteComposer, NoteError, OutboundHandle, OutboundJob,
    SignatureCheck, SignatureVerifier, TaskUpdate,
};
use crate::sync::{
    domain::{
        MergeRequestAction, MergeRequestEvent, MergeRequestSignal, Progress, PushCommit, PushEvent,
        ScanMode, TaskToken, TrackerEventBatch, embed, extract, merge_request_transition,
        push_transition,
    },
    ports::{TrackerClient, UserDirectory, VcsClient, VcsError, WebhookStore},
};

/// Branches whose pushes never update tasks unless configured otherwise.
pub const DEFAULT_EXCLUDED_BRANCHES: [&str; 2] = ["production", "staging"];

/// Kind of an inbound delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    /// Tracker webhook handshake carrying a new secret.
    Handshake,
    /// Signed tracker event batch.
    SignedTaskEvents,
    /// VCS push hook.
    VcsPush,
    /// VCS merge request hook.
    VcsMergeRequest,
    /// Any other delivery.
    Unrecognized,
}

impl InboundKind {
    /// Classifies a VCS delivery by its event-type header.
    #[must_use]
    pub fn from_vcs_event(event_type: Option<&str>) -> Self {
        let normalised = event_type.map(|value| value.trim().to_ascii_lowercase());
        match normalised.as_deref() {
            Some("push hook" | "push") => Self::VcsPush,
            Some("merge request hook" | "merge request" | "merge_request") => {
                Self::VcsMergeRequest
            }
            _ => Self::Unrecognized,
        }
    }

    /// Returns a short name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Handshake => "handshake",
            Self::SignedTaskEvents => "signed_task_events",
            Self::VcsPush => "vcs_push",
            Self::VcsMergeRequest => "vcs_merge_request",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for InboundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw tracker webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerDelivery {
    /// Handshake secret header, present only on handshakes.
    pub hook_secret: Option<String>,
    /// Hex HMAC signature header.
    pub signature: Option<String>,
    /// Raw request body.
    pub body: Vec<u8>,
}

/// What happened to a tracker delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerOutcome {
    /// The handshake secret was stored.
    Handshake,
    /// The delivery had no body.
    Empty,
    /// The signature check failed.
    Rejected(SignatureCheck),
    /// The body could not be decoded.
    Malformed,
    /// Created tasks were stamped; `stamped` identifiers were claimed.
    Processed {
        /// Number of identifiers claimed.
        stamped: u64,
    },
    /// Processing failed and was logged.
    Failed,
}

/// Reply to a tracker delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerReply {
    /// Processing outcome.
    pub outcome: TrackerOutcome,
    /// Secret to echo back in the handshake response header.
    pub echo_secret: Option<String>,
}

impl TrackerReply {
    const fn new(outcome: TrackerOutcome) -> Self {
        Self {
            outcome,
            echo_secret: None,
        }
    }

    /// Returns the HTTP status; always success.
    #[must_use]
    pub const fn status(&self) -> u16 {
        200
    }
}

/// Raw VCS webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcsDelivery {
    /// Shared-secret token header.
    pub token: Option<String>,
    /// Event-type header.
    pub event_type: Option<String>,
    /// Raw request body.
    pub body: Vec<u8>,
}

/// What happened to an accepted VCS delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsOutcome {
    /// The delivery had no body.
    Empty,
    /// The event kind or branch is not handled.
    Ignored,
    /// The merge request action selects no transition.
    NoTransition,
    /// No commit carries an identifier token.
    NoTokens,
    /// Task updates were queued.
    Queued {
        /// Number of jobs accepted by the queue.
        jobs: usize,
    },
}

/// Reply to an accepted VCS delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcsReply {
    /// Delivery kind.
    pub kind: InboundKind,
    /// Processing outcome.
    pub outcome: VcsOutcome,
}

impl VcsReply {
    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> u16 {
        200
    }
}

/// Errors raised while processing a delivery.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The body does not decode as the announced payload.
    #[error("malformed {kind} payload: {source}")]
    Malformed {
        /// Announced delivery kind.
        kind: InboundKind,
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },
    /// A VCS call failed.
    #[error(transparent)]
    Vcs(#[from] VcsError),
    /// Note rendering failed.
    #[error(transparent)]
    Note(#[from] NoteError),
    /// Identifier allocation failed.
    #[error(transparent)]
    Counter(#[from] CounterError),
}

/// Rejected VCS delivery.
#[derive(Debug, Error)]
pub enum VcsDeliveryError {
    /// The shared-secret token is missing or wrong.
    #[error("vcs delivery rejected: invalid token")]
    Unauthorized,
    /// Processing failed.
    #[error(transparent)]
    Processing(#[from] DispatchError),
}

impl VcsDeliveryError {
    /// Returns the HTTP status for the rejection.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::Processing(_) => 500,
        }
    }
}

/// Routes inbound deliveries to the sync collaborators.
pub struct EventDispatcher<T, V, W, U>
where
    T: TrackerClient,
    V: VcsClient,
    W: WebhookStore,
    U: UserDirectory,
{
    tracker: Arc<T>,
    vcs: Arc<V>,
    verifier: SignatureVerifier<W>,
    counter: CounterService<T>,
    notes: NoteComposer<U>,
    outbound: OutboundHandle,
    excluded_refs: Vec<String>,
}

impl<T, V, W, U> EventDispatcher<T, V, W, U>
where
    T: TrackerClient,
    V: VcsClient,
    W: WebhookStore,
    U: UserDirectory,
{
    /// Creates a dispatcher ignoring pushes to the default excluded
    /// branches.
    #[must_use]
    pub fn new(
        tracker: Arc<T>,
        vcs: Arc<V>,
        verifier: SignatureVerifier<W>,
        counter: CounterService<T>,
        notes: NoteComposer<U>,
        outbound: OutboundHandle,
    ) -> Self {
        Self {
            tracker,
            vcs,
            verifier,
            counter,
            notes,
            outbound,
            excluded_refs: Vec::new(),
        }
        .with_excluded_branches(DEFAULT_EXCLUDED_BRANCHES)
    }

    /// Replaces the branches whose pushes are ignored.
    #[must_use]
    pub fn with_excluded_branches<I, S>(mut self, branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded_refs = branches
            .into_iter()
            .map(|branch| format!("refs/heads/{}", branch.as_ref()))
            .collect();
        self
    }

    /// Handles a tracker webhook delivery.
    ///
    /// Every failure is logged and reported in the outcome; the reply status
    /// is always success.
    pub async fn handle_tracker_delivery(&self, delivery: TrackerDelivery) -> TrackerReply {
        if let Some(secret) = delivery.hook_secret.filter(|value| !value.is_empty()) {
            return match self.verifier.handle_handshake(&secret).await {
                Ok(()) => {
                    info!(kind = %InboundKind::Handshake, "tracker webhook secret stored");
                    TrackerReply {
                        outcome: TrackerOutcome::Handshake,
                        echo_secret: Some(secret),
                    }
                }
                Err(err) => {
                    error!(kind = %InboundKind::Handshake, error = %err, "failed to store webhook secret");
                    TrackerReply::new(TrackerOutcome::Failed)
                }
            };
        }
        if delivery.body.is_empty() {
            debug!("tracker delivery without body");
            return TrackerReply::new(TrackerOutcome::Empty);
        }

        let kind = InboundKind::SignedTaskEvents;
        match self
            .verifier
            .verify_tracker(delivery.signature.as_deref(), &delivery.body)
            .await
        {
            Ok(check) if check.is_accepted() => {}
            Ok(check) => return TrackerReply::new(TrackerOutcome::Rejected(check)),
            Err(err) => {
                error!(%kind, error = %err, "failed to load webhook secret");
                return TrackerReply::new(TrackerOutcome::Failed);
            }
        }

        let batch: TrackerEventBatch = match serde_json::from_slice(&delivery.body) {
            Ok(batch) => batch,
            Err(err) => {
                warn!(%kind, error = %err, "dropping malformed tracker delivery");
                return TrackerReply::new(TrackerOutcome::Malformed);
            }
        };
        match self.stamp_created_tasks(&batch).await {
            Ok(stamped) => TrackerReply::new(TrackerOutcome::Processed { stamped }),
            Err(err) => {
                error!(%kind, error = %err, "failed to process tracker events");
                TrackerReply::new(TrackerOutcome::Failed)
            }
        }
    }

    /// Handles a VCS webhook delivery.
    ///
    /// # Errors
    ///
    /// Returns [`VcsDeliveryError::Unauthorized`] for a missing or wrong
    /// token and [`VcsDeliveryError::Processing`] when decoding or a VCS
    /// call fails.
    pub async fn handle_vcs_delivery(
        &self,
        delivery: VcsDelivery,
    ) -> Result<VcsReply, VcsDeliveryError> {
        if !self.verifier.verify_vcs(delivery.token.as_deref()) {
            warn!("vcs delivery rejected: invalid token");
            return Err(VcsDeliveryError::Unauthorized);
        }
        let kind = InboundKind::from_vcs_event(delivery.event_type.as_deref());
        if delivery.body.is_empty() {
            debug!(%kind, "vcs delivery without body");
            return Ok(VcsReply {
                kind,
                outcome: VcsOutcome::Empty,
            });
        }

        let outcome = match kind {
            InboundKind::VcsPush => {
                let push: PushEvent = decode(kind, &delivery.body)?;
                self.handle_push(&push)?
            }
            InboundKind::VcsMergeRequest => {
                let event: MergeRequestEvent = decode(kind, &delivery.body)?;
                self.handle_merge_request(&event).await?
            }
            _ => {
                info!(
                    event_type = delivery.event_type.as_deref().unwrap_or_default(),
                    "ignoring unrecognised vcs event"
                );
                VcsOutcome::Ignored
            }
        };
        Ok(VcsReply { kind, outcome })
    }

    /// Stamps every created task lacking a token with a fresh identifier.
    ///
    /// Returns the number of identifiers claimed.
    async fn stamp_created_tasks(&self, batch: &TrackerEventBatch) -> Result<u64, DispatchError> {
        let gids = batch.created_task_gids();
        if gids.is_empty() {
            debug!(events = batch.events.len(), "no task creations in batch");
            return Ok(0);
        }

        let mut counter = self.counter.begin_batch().await?;
        for gid in gids {
            let task = match self.tracker.get_task(&gid).await {
                Ok(task) => task,
                Err(err) => {
                    warn!(gid = %gid, error = %err, "skipping created task");
                    continue;
                }
            };
            if let Some(existing) = extract(&task.name, ScanMode::Anchored) {
                debug!(gid = %gid, token = %existing, "task already stamped");
                continue;
            }
            let token = match counter.claim() {
                Ok(token) => token,
                Err(err) => {
                    error!(gid = %gid, error = %err, "cannot claim identifier");
                    break;
                }
            };
            info!(gid = %gid, token = %token, "stamping created task");
            let job = OutboundJob::RenameTask {
                task: gid,
                title: embed(&task.name, &token),
            };
            if self.outbound.enqueue(job).is_err() {
                warn!(token = %token, "title update dropped");
            }
        }
        Ok(counter.commit().await?)
    }

    fn handle_push(&self, push: &PushEvent) -> Result<VcsOutcome, DispatchError> {
        if self.excluded_refs.contains(&push.ref_name) {
            info!(git_ref = %push.ref_name, "ignoring push to excluded branch");
            return Ok(VcsOutcome::Ignored);
        }

        let groups = group_by_token(&push.commits);
        let identified = groups.iter().map(|(_, commits)| commits.len()).sum();
        let Some(progress) = push_transition(identified) else {
            info!(git_ref = %push.ref_name, commits = push.commits.len(), "push carries no task tokens");
            return Ok(VcsOutcome::NoTokens);
        };

        let mut jobs = 0;
        for (token, commits) in groups {
            let note = self.notes.push_note(push, &commits)?;
            debug!(token = %token, commits = commits.len(), "queueing push update");
            if self.queue_update(token, note, progress) {
                jobs += 1;
            }
        }
        Ok(VcsOutcome::Queued { jobs })
    }

    async fn handle_merge_request(
        &self,
        event: &MergeRequestEvent,
    ) -> Result<VcsOutcome, DispatchError> {
        let attributes = &event.object_attributes;
        let signal = MergeRequestSignal::from_event(event);
        let Some(transition) = merge_request_transition(&signal) else {
            debug!(iid = attributes.iid, action = ?signal.action, "merge request selects no transition");
            return Ok(VcsOutcome::NoTransition);
        };

        let project_id = event.project.id;
        let commits = self
            .vcs
            .merge_request_commits(project_id, attributes.iid)
            .await?;
        let merge_commit = match (&signal.action, attributes.merge_commit_sha.as_deref()) {
            (MergeRequestAction::Merge, Some(sha)) if !sha.is_empty() => {
                Some(self.vcs.commit(project_id, sha).await?)
            }
            _ => None,
        };
        let note = self
            .notes
            .merge_request_note(event, transition.headline, merge_commit.as_ref())?;

        let mut tokens: Vec<TaskToken> = Vec::new();
        for token in commits
            .iter()
            .filter_map(|commit| extract(&commit.title, ScanMode::Anywhere))
        {
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        if tokens.is_empty() {
            info!(iid = attributes.iid, "merge request commits carry no task tokens");
            return Ok(VcsOutcome::NoTokens);
        }

        let mut jobs = 0;
        for token in tokens {
            debug!(token = %token, iid = attributes.iid, progress = %transition.progress, "queueing merge request update");
            if self.queue_update(token, note.clone(), transition.progress) {
                jobs += 1;
            }
        }
        Ok(VcsOutcome::Queued { jobs })
    }

    fn queue_update(&self, token: TaskToken, note: String, progress: Progress) -> bool {
        self.outbound
            .enqueue(OutboundJob::SyncTask(TaskUpdate {
                token,
                note,
                progress,
            }))
            .is_ok()
    }
}

fn decode<'a, P>(kind: InboundKind, body: &'a [u8]) -> Result<P, DispatchError>
where
    P: serde::Deserialize<'a>,
{
    serde_json::from_slice(body).map_err(|source| DispatchError::Malformed { kind, source })
}

/// Groups commits by their first token, in first-seen order.
fn group_by_token(commits: &[PushCommit]) -> Vec<(TaskToken, Vec<&PushCommit>)> {
    let mut groups: Vec<(TaskToken, Vec<&PushCommit>)> = Vec::new();
    for commit in commits {
        let Some(token) = commit.token() else {
            continue;
        };
        match groups.iter_mut().find(|(seen, _)| *seen == token) {
            Some((_, group)) => group.push(commit),
            None => groups.push((token, vec![commit])),
        }
    }
    groups
}
