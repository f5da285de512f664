//! VCS platform client port.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for VCS client operations.
pub type VcsResult<T> = Result<T, VcsError>;

/// Commit entry returned when listing merge request commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    /// Full commit SHA.
    pub id: String,
    /// Commit subject line.
    pub title: String,
}

/// Commit details returned by a single-commit lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDetail {
    /// Full commit SHA.
    pub id: String,
    /// Commit subject line.
    pub title: String,
    /// Commit web URL.
    pub web_url: String,
}

/// VCS operations used by the dispatcher.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VcsClient: Send + Sync {
    /// Lists the commits of a merge request.
    async fn merge_request_commits(
        &self,
        project_id: u64,
        merge_request_iid: u64,
    ) -> VcsResult<Vec<CommitSummary>>;

    /// Fetches a single commit.
    async fn commit(&self, project_id: u64, sha: &str) -> VcsResult<CommitDetail>;
}

/// Errors returned by VCS client implementations.
#[derive(Debug, Clone, Error)]
pub enum VcsError {
    /// The project, merge request, or commit does not exist.
    #[error("vcs resource not found: {0}")]
    NotFound(String),

    /// The platform rejected the request.
    #[error("vcs api error: {0}")]
    Api(String),

    /// Transport-layer failure.
    #[error("vcs transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl VcsError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
