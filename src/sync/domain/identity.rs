//! Identity mapping between tracker users and VCS users.

use serde::{Deserialize, Serialize};

/// One row of the persisted user mapping table.
///
/// Field names follow the on-disk JSON layout shared with earlier tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Contact e-mail address.
    #[serde(default)]
    pub email: String,
    /// Display name used in notes and mentions.
    pub name: String,
    /// Tracker user identifier.
    #[serde(rename = "aId")]
    pub tracker_id: String,
    /// VCS user identifier.
    #[serde(rename = "gId")]
    pub vcs_id: u64,
    /// Tracker task-list identifier used to build mention links.
    #[serde(rename = "aUtl")]
    pub task_list_id: String,
}

/// A user known on both platforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedUser {
    /// Display name.
    pub name: String,
    /// Tracker user identifier.
    pub tracker_id: String,
    /// VCS user identifier.
    pub vcs_id: u64,
    /// Tracker task-list identifier.
    pub task_list_id: String,
}

impl From<UserRecord> for MappedUser {
    fn from(record: UserRecord) -> Self {
        Self {
            name: record.name,
            tracker_id: record.tracker_id,
            vcs_id: record.vcs_id,
            task_list_id: record.task_list_id,
        }
    }
}
