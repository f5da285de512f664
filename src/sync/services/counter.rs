//! Identifier allocation against the counter kept in the project notes.
//!
//! The read-modify-write of the notes field is serialised per process by an
//! async mutex held for the whole creation batch. The tracker offers no
//! compare-and-swap on the notes field, so two processes handling batches at
//! the same time can still read the same base value and hand out
//! overlapping identifiers.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error};

use crate::sync::{
    domain::{BatchAllocator, SyncDomainError, TaskToken},
    ports::{TrackerClient, TrackerError},
};

/// Errors returned by counter allocation.
#[derive(Debug, Error)]
pub enum CounterError {
    /// The counter could not advance.
    #[error(transparent)]
    Domain(#[from] SyncDomainError),
    /// Reading or writing the project notes failed.
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Allocates sequential identifiers for newly created tasks.
pub struct CounterService<T>
where
    T: TrackerClient,
{
    tracker: Arc<T>,
    prefix: String,
    lock: Mutex<()>,
}

impl<T> CounterService<T>
where
    T: TrackerClient,
{
    /// Creates a counter service minting `[<prefix>-<n>]` tokens.
    #[must_use]
    pub fn new(tracker: Arc<T>, prefix: impl Into<String>) -> Self {
        Self {
            tracker,
            prefix: prefix.into(),
            lock: Mutex::new(()),
        }
    }

    /// Starts a creation batch by reading the current counter.
    ///
    /// Other batches in this process wait until the returned batch is
    /// committed or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::Tracker`] when the project notes cannot be
    /// read.
    pub async fn begin_batch(&self) -> Result<CounterBatchGuard<'_, T>, CounterError> {
        let guard = self.lock.lock().await;
        let notes = self.tracker.get_project_notes().await?;
        let allocator = BatchAllocator::begin(self.prefix.clone(), &notes);
        debug!(counter = allocator.base_value(), "creation batch started");
        Ok(CounterBatchGuard {
            _guard: guard,
            tracker: &self.tracker,
            notes,
            allocator,
        })
    }
}

/// Creation batch holding the per-process counter lock.
pub struct CounterBatchGuard<'a, T>
where
    T: TrackerClient,
{
    _guard: MutexGuard<'a, ()>,
    tracker: &'a Arc<T>,
    notes: String,
    allocator: BatchAllocator,
}

impl<T> CounterBatchGuard<'_, T>
where
    T: TrackerClient,
{
    /// Claims the next identifier for an item lacking a token.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::Domain`] when the counter would overflow.
    pub fn claim(&mut self) -> Result<TaskToken, CounterError> {
        Ok(self.allocator.claim()?)
    }

    /// Returns how many identifiers were claimed so far.
    #[must_use]
    pub const fn claimed(&self) -> u64 {
        self.allocator.claimed()
    }

    /// Writes the advanced counter back once and releases the lock.
    ///
    /// Nothing is written when no identifier was claimed. A failed write is
    /// logged and returned; identifiers already embedded in titles are not
    /// rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::Tracker`] when the notes cannot be written.
    pub async fn commit(self) -> Result<u64, CounterError> {
        let claimed = self.allocator.claimed();
        let Some(updated) = self.allocator.finish(&self.notes) else {
            return Ok(0);
        };
        if let Err(err) = self.tracker.update_project_notes(&updated).await {
            error!(
                counter = self.allocator.current_value(),
                error = %err,
                "failed to write running counter"
            );
            return Err(err.into());
        }
        debug!(
            counter = self.allocator.current_value(),
            claimed, "running counter advanced"
        );
        Ok(claimed)
    }
}
