//! Inbound webhook payloads from the tracker and the VCS platform.
//!
//! Only the fields the synchronisation engine reads are modelled; unknown
//! fields are ignored during deserialisation.

use super::{ScanMode, TaskGid, TaskToken, extract};
use serde::{Deserialize, Serialize};

/// Resource reference inside a tracker event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Platform identifier of the resource.
    pub gid: String,
    /// Resource type (`task`, `project`, `story`, ...).
    pub resource_type: String,
}

/// One sub-event of a tracker webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerEvent {
    /// Event action (`added`, `changed`, `removed`, ...).
    pub action: String,
    /// The resource the action applies to.
    #[serde(default)]
    pub resource: Option<ResourceRef>,
    /// The parent the resource was attached to, if any.
    #[serde(default)]
    pub parent: Option<ResourceRef>,
}

impl TrackerEvent {
    /// Returns the task gid when this sub-event reports a task added to a
    /// project.
    #[must_use]
    pub fn created_task(&self) -> Option<TaskGid> {
        let resource = self.resource.as_ref()?;
        let parent = self.parent.as_ref()?;
        let is_creation = self.action == "added"
            && resource.resource_type == "task"
            && parent.resource_type == "project";
        is_creation.then(|| TaskGid::new(resource.gid.clone()))
    }
}

/// Ordered list of sub-events delivered in one tracker webhook call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerEventBatch {
    /// Sub-events in delivery order.
    #[serde(default)]
    pub events: Vec<TrackerEvent>,
}

impl TrackerEventBatch {
    /// Returns created task gids in delivery order, without duplicates.
    #[must_use]
    pub fn created_task_gids(&self) -> Vec<TaskGid> {
        let mut gids: Vec<TaskGid> = Vec::new();
        for gid in self.events.iter().filter_map(TrackerEvent::created_task) {
            if !gids.contains(&gid) {
                gids.push(gid);
            }
        }
        gids
    }
}

/// VCS project summary carried by push and merge request hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Numeric project identifier.
    pub id: u64,
    /// Project display name.
    pub name: String,
    /// Project web URL.
    pub web_url: String,
}

/// Author of a pushed commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    /// Author display name.
    pub name: String,
}

/// Commit entry of a push hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushCommit {
    /// Full commit SHA.
    pub id: String,
    /// Full commit message.
    #[serde(default)]
    pub message: String,
    /// Commit subject line.
    #[serde(default)]
    pub title: String,
    /// Commit web URL.
    pub url: String,
    /// Commit author.
    pub author: CommitAuthor,
}

impl PushCommit {
    /// Returns the subject line, falling back to the first message line.
    #[must_use]
    pub fn subject(&self) -> &str {
        if self.title.is_empty() {
            self.message.lines().next().unwrap_or_default()
        } else {
            &self.title
        }
    }

    /// Returns the first identifier token found in the commit message.
    #[must_use]
    pub fn token(&self) -> Option<TaskToken> {
        extract(&self.message, ScanMode::Anywhere)
            .or_else(|| extract(&self.title, ScanMode::Anywhere))
    }
}

/// Push hook payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Full ref name, for example `refs/heads/main`.
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// VCS id of the pushing user.
    pub user_id: u64,
    /// Display name of the pushing user.
    pub user_name: String,
    /// Target project.
    pub project: ProjectInfo,
    /// Pushed commits, oldest first.
    #[serde(default)]
    pub commits: Vec<PushCommit>,
    /// Total number of commits in the push.
    #[serde(default)]
    pub total_commits_count: u64,
}

impl PushEvent {
    /// Returns the last path segment of the pushed ref, so
    /// `refs/heads/feature/login` yields `login`.
    #[must_use]
    pub fn branch(&self) -> &str {
        self.ref_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.ref_name)
    }

    /// Returns the project URL listing the branch commits.
    #[must_use]
    pub fn branch_url(&self) -> String {
        format!("{}/-/commits/{}", self.project.web_url, self.branch())
    }
}

/// User summary carried by merge request hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUser {
    /// Display name.
    pub name: String,
    /// Login name.
    #[serde(default)]
    pub username: String,
}

/// Attributes of the merge request a hook reports on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequestAttributes {
    /// VCS id of the merge request author.
    pub author_id: u64,
    /// Project-scoped merge request number.
    pub iid: u64,
    /// SHA of the merge commit once merged.
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
    /// Source branch name.
    pub source_branch: String,
    /// Target branch name.
    pub target_branch: String,
    /// Merge request description.
    #[serde(default)]
    pub description: Option<String>,
    /// Merge request title.
    #[serde(default)]
    pub title: String,
    /// Merge request web URL.
    pub url: String,
    /// State after the action (`opened`, `merged`, `closed`, ...).
    pub state: String,
    /// Hook action (`open`, `update`, `merge`, ...).
    #[serde(default)]
    pub action: Option<String>,
    /// Whether the merge request is a draft.
    #[serde(default)]
    pub work_in_progress: bool,
    /// VCS ids of assignees; absent when unassigned.
    #[serde(default)]
    pub assignee_ids: Option<Vec<u64>>,
}

/// Fields changed by a merge request update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequestChanges {
    /// Previous and current title, present when the title changed.
    #[serde(default)]
    pub title: Option<serde_json::Value>,
}

/// Merge request hook payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequestEvent {
    /// User who triggered the hook.
    pub user: EventUser,
    /// Target project.
    pub project: ProjectInfo,
    /// Merge request attributes.
    pub object_attributes: MergeRequestAttributes,
    /// Assignee summaries, aligned with `assignee_ids`.
    #[serde(default)]
    pub assignees: Vec<EventUser>,
    /// Changes made by an update action.
    #[serde(default)]
    pub changes: MergeRequestChanges,
}

impl MergeRequestEvent {
    /// Returns the note message: the title, or the description when the
    /// title is empty.
    #[must_use]
    pub fn message(&self) -> &str {
        let attributes = &self.object_attributes;
        if attributes.title.is_empty() {
            attributes.description.as_deref().unwrap_or_default()
        } else {
            &attributes.title
        }
    }
}
