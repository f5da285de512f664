//! Progress state machine mapping VCS events to tracker progress labels.

use super::{MergeRequestEvent, ParseProgressError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tracker progress value, matched by option name on the progress field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Progress {
    /// Work is being implemented.
    InProgress,
    /// A merge request is open and awaiting verification.
    Testing,
    /// Work has been merged and awaits deployment.
    Deploying,
}

impl Progress {
    /// Returns the tracker option label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InProgress => "In Progress",
            Self::Testing => "Testing",
            Self::Deploying => "Deploying",
        }
    }
}

impl TryFrom<&str> for Progress {
    type Error = ParseProgressError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "In Progress" => Ok(Self::InProgress),
            "Testing" => Ok(Self::Testing),
            "Deploying" => Ok(Self::Deploying),
            _ => Err(ParseProgressError(value.to_owned())),
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Merge request hook action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeRequestAction {
    /// The merge request was opened.
    Open,
    /// A closed merge request was reopened.
    Reopen,
    /// Title, description, assignees, or commits changed.
    Update,
    /// The merge request was closed without merging.
    Close,
    /// The merge request was merged.
    Merge,
    /// Any other action (approval, unapproval, ...).
    Other(String),
}

impl From<&str> for MergeRequestAction {
    fn from(value: &str) -> Self {
        match value {
            "open" => Self::Open,
            "reopen" => Self::Reopen,
            "update" => Self::Update,
            "close" => Self::Close,
            "merge" => Self::Merge,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Merge request state after the hook action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeRequestState {
    /// Open for review.
    Opened,
    /// Merged into the target branch.
    Merged,
    /// Closed without merging.
    Closed,
    /// Any other state (locked, ...).
    Other(String),
}

impl From<&str> for MergeRequestState {
    fn from(value: &str) -> Self {
        match value {
            "opened" => Self::Opened,
            "merged" => Self::Merged,
            "closed" => Self::Closed,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Inputs of the merge request transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequestSignal {
    /// Hook action.
    pub action: MergeRequestAction,
    /// State after the action.
    pub state: MergeRequestState,
    /// Whether the merge request is marked work-in-progress (draft).
    pub work_in_progress: bool,
    /// Whether this update changed the title.
    pub title_changed: bool,
}

impl MergeRequestSignal {
    /// Extracts the transition inputs from a merge request hook payload.
    #[must_use]
    pub fn from_event(event: &MergeRequestEvent) -> Self {
        let attributes = &event.object_attributes;
        Self {
            action: MergeRequestAction::from(attributes.action.as_deref().unwrap_or_default()),
            state: MergeRequestState::from(attributes.state.as_str()),
            work_in_progress: attributes.work_in_progress,
            title_changed: event.changes.title.is_some(),
        }
    }
}

/// Headline of the merge request note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRequestHeadline {
    /// Opened, reopened, or moved out of draft.
    Opened,
    /// Merged.
    Merged,
    /// Closed.
    Closed,
}

impl MergeRequestHeadline {
    /// Returns the glyph shown before the headline.
    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Opened => "⚔",
            Self::Merged => "🏆",
            Self::Closed => "⚰",
        }
    }

    /// Returns the headline text.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Opened => "Opened",
            Self::Merged => "Merged",
            Self::Closed => "Closed",
        }
    }
}

/// Outcome of a merge request transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRequestTransition {
    /// Target progress value.
    pub progress: Progress,
    /// Note headline.
    pub headline: MergeRequestHeadline,
}

/// Progress selected by a push.
///
/// A push moves tasks to [`Progress::InProgress`] when at least one commit
/// carries an identifier token.
#[must_use]
pub const fn push_transition(identified_commits: usize) -> Option<Progress> {
    if identified_commits > 0 {
        Some(Progress::InProgress)
    } else {
        None
    }
}

/// Maps a merge request hook to a progress transition.
///
/// Unmatched combinations yield `None`; draft merge requests never
/// transition except on merge.
#[must_use]
pub fn merge_request_transition(signal: &MergeRequestSignal) -> Option<MergeRequestTransition> {
    let wip = signal.work_in_progress;
    let (progress, headline) = match (&signal.action, &signal.state) {
        (MergeRequestAction::Open | MergeRequestAction::Reopen, _) if !wip => {
            (Progress::Testing, MergeRequestHeadline::Opened)
        }
        (MergeRequestAction::Update, MergeRequestState::Opened)
            if !wip && signal.title_changed =>
        {
            (Progress::Testing, MergeRequestHeadline::Opened)
        }
        (MergeRequestAction::Merge, MergeRequestState::Merged) => {
            (Progress::Deploying, MergeRequestHeadline::Merged)
        }
        (MergeRequestAction::Close, _) if !wip => {
            (Progress::InProgress, MergeRequestHeadline::Closed)
        }
        _ => return None,
    };
    Some(MergeRequestTransition { progress, headline })
}
