//! In-memory VCS client.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::sync::ports::{CommitDetail, CommitSummary, VcsClient, VcsError, VcsResult};

/// Thread-safe in-memory VCS client.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVcs {
    state: Arc<RwLock<InMemoryVcsState>>,
}

#[derive(Debug, Default)]
struct InMemoryVcsState {
    merge_request_commits: HashMap<(u64, u64), Vec<CommitSummary>>,
    commits: HashMap<(u64, String), CommitDetail>,
}

impl InMemoryVcs {
    /// Creates an empty client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the commits listed for a merge request.
    pub fn insert_merge_request(
        &self,
        project_id: u64,
        merge_request_iid: u64,
        commits: Vec<CommitSummary>,
    ) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .merge_request_commits
            .insert((project_id, merge_request_iid), commits);
    }

    /// Adds a commit that can be fetched by SHA.
    pub fn insert_commit(&self, project_id: u64, commit: CommitDetail) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .commits
            .insert((project_id, commit.id.clone()), commit);
    }
}

#[async_trait]
impl VcsClient for InMemoryVcs {
    async fn merge_request_commits(
        &self,
        project_id: u64,
        merge_request_iid: u64,
    ) -> VcsResult<Vec<CommitSummary>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .merge_request_commits
            .get(&(project_id, merge_request_iid))
            .cloned()
            .ok_or_else(|| {
                VcsError::NotFound(format!("merge request !{merge_request_iid} in {project_id}"))
            })
    }

    async fn commit(&self, project_id: u64, sha: &str) -> VcsResult<CommitDetail> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .commits
            .get(&(project_id, sha.to_owned()))
            .cloned()
            .ok_or_else(|| VcsError::NotFound(format!("commit {sha} in {project_id}")))
    }
}
