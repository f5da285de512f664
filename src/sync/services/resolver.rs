//! Token to tracker task resolution with a single-entry cache.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::sync::{
    domain::{ScanMode, TaskGid, TaskToken, extract},
    ports::{TrackerClient, TrackerResult},
};

/// The last uniquely resolved token.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LastResolvedTask {
    token: TaskToken,
    gid: TaskGid,
}

/// Finds the tracker tasks whose titles start with a given token.
///
/// Consecutive VCS events usually reference the same task, so the last
/// unique match is cached. Ambiguous and missing results are never cached.
pub struct TaskResolver<T>
where
    T: TrackerClient,
{
    tracker: Arc<T>,
    last: Mutex<Option<LastResolvedTask>>,
}

impl<T> TaskResolver<T>
where
    T: TrackerClient,
{
    /// Creates a resolver with an empty cache.
    #[must_use]
    pub const fn new(tracker: Arc<T>) -> Self {
        Self {
            tracker,
            last: Mutex::new(None),
        }
    }

    /// Resolves `token` to the matching task identifiers.
    ///
    /// # Errors
    ///
    /// Returns the tracker error when the search fails.
    pub async fn resolve(&self, token: &TaskToken) -> TrackerResult<Vec<TaskGid>> {
        {
            let mut last = self.cache();
            match last.as_ref() {
                Some(cached) if cached.token == *token => {
                    debug!(token = %token, gid = %cached.gid, "task resolved from cache");
                    return Ok(vec![cached.gid.clone()]);
                }
                Some(_) => *last = None,
                None => {}
            }
        }

        let results = self.tracker.search_tasks(token.as_str()).await?;
        let matches: Vec<TaskGid> = results
            .into_iter()
            .filter(|task| extract(&task.name, ScanMode::Anchored).as_ref() == Some(token))
            .map(|task| task.gid)
            .collect();

        match matches.as_slice() {
            [gid] => {
                *self.cache() = Some(LastResolvedTask {
                    token: token.clone(),
                    gid: gid.clone(),
                });
            }
            [] => warn!(token = %token, "no task matches token"),
            _ => warn!(token = %token, count = matches.len(), "several tasks match token"),
        }
        Ok(matches)
    }

    fn cache(&self) -> MutexGuard<'_, Option<LastResolvedTask>> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
