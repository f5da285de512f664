//! Static user directory built from mapping records.

use std::collections::HashMap;

use crate::sync::{
    domain::{MappedUser, UserRecord},
    ports::UserDirectory,
};

/// Immutable bidirectional user map.
#[derive(Debug, Clone, Default)]
pub struct StaticUserDirectory {
    by_vcs: HashMap<u64, MappedUser>,
    tracker_index: HashMap<String, u64>,
}

impl StaticUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the directory from mapping records.
    ///
    /// Later records win when two records share an identifier.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = UserRecord>) -> Self {
        let mut directory = Self::new();
        for record in records {
            let user = MappedUser::from(record);
            directory
                .tracker_index
                .insert(user.tracker_id.clone(), user.vcs_id);
            directory.by_vcs.insert(user.vcs_id, user);
        }
        directory
    }

    /// Returns the number of mapped users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_vcs.len()
    }

    /// Returns `true` when no user is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_vcs.is_empty()
    }
}

impl UserDirectory for StaticUserDirectory {
    fn by_vcs_id(&self, vcs_id: u64) -> Option<&MappedUser> {
        self.by_vcs.get(&vcs_id)
    }

    fn by_tracker_id(&self, tracker_id: &str) -> Option<&MappedUser> {
        self.tracker_index
            .get(tracker_id)
            .and_then(|vcs_id| self.by_vcs.get(vcs_id))
    }
}
