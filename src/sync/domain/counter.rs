//! Running identifier counter embedded in the project notes.
//!
//! The counter lives inside a free-text field owned by the tracker as a
//! `[currentTaskId: <n>]` marker. Exactly one marker is expected; when none
//! is present the counter starts at zero and a marker is appended on the
//! first write.

use super::{SyncDomainError, TaskToken};
use std::ops::Range;

const MARKER_OPEN: &str = "[currentTaskId:";

/// Counter value parsed from the project notes, with the marker location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningCounter {
    value: u64,
    span: Option<Range<usize>>,
}

impl RunningCounter {
    /// Parses the first well-formed marker in `notes`.
    ///
    /// Malformed markers are skipped. Without a marker the value is zero.
    #[must_use]
    pub fn parse(notes: &str) -> Self {
        notes
            .match_indices(MARKER_OPEN)
            .find_map(|(start, _)| parse_marker(notes, start))
            .unwrap_or(Self {
                value: 0,
                span: None,
            })
    }

    /// Returns the current counter value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// Returns `true` when the notes already carry a marker.
    #[must_use]
    pub const fn has_marker(&self) -> bool {
        self.span.is_some()
    }

    /// Renders the marker text for a counter value.
    #[must_use]
    pub fn marker(value: u64) -> String {
        format!("[currentTaskId: {value}]")
    }

    /// Rewrites `notes` so that the marker holds `new_value`.
    ///
    /// The existing marker text is replaced in place; without one, the new
    /// marker is appended after a single space.
    #[must_use]
    pub fn rewrite(&self, notes: &str, new_value: u64) -> String {
        let marker = Self::marker(new_value);
        let replaced = self.span.as_ref().and_then(|span| {
            let head = notes.get(..span.start)?;
            let tail = notes.get(span.end..)?;
            Some(format!("{head}{marker}{tail}"))
        });
        replaced.unwrap_or_else(|| {
            if notes.is_empty() {
                marker
            } else {
                format!("{notes} {marker}")
            }
        })
    }
}

fn parse_marker(notes: &str, start: usize) -> Option<RunningCounter> {
    let after_open = start + MARKER_OPEN.len();
    let rest = notes.get(after_open..)?;
    let trimmed = rest.trim_start();
    let digits_len = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    let digits = trimmed.get(..digits_len)?;
    let after_digits = trimmed.get(digits_len..)?;
    if digits.is_empty() || !after_digits.starts_with(']') {
        return None;
    }
    let value = digits.parse::<u64>().ok()?;
    let whitespace_len = rest.len() - trimmed.len();
    let end = after_open + whitespace_len + digits_len + 1;
    Some(RunningCounter {
        value,
        span: Some(start..end),
    })
}

/// Result of allocating a contiguous run of identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterBatch {
    /// Project notes with the advanced marker.
    pub notes: String,
    /// First identifier handed out by the batch.
    pub first_id: u64,
    /// Counter value after the batch.
    pub last_id: u64,
}

/// Allocates `count_needed` identifiers against the counter in `notes`.
///
/// # Errors
///
/// Returns [`SyncDomainError::CounterOverflow`] when the counter cannot
/// advance by `count_needed`.
pub fn next_batch(notes: &str, count_needed: u64) -> Result<CounterBatch, SyncDomainError> {
    let counter = RunningCounter::parse(notes);
    let last_id = counter
        .value
        .checked_add(count_needed)
        .ok_or(SyncDomainError::CounterOverflow {
            current: counter.value,
            requested: count_needed,
        })?;
    Ok(CounterBatch {
        notes: counter.rewrite(notes, last_id),
        first_id: counter.value.saturating_add(1),
        last_id,
    })
}

/// Hands out identifiers one at a time while a creation batch is processed.
///
/// Items that already carry a token never call [`BatchAllocator::claim`], so
/// they consume no number.
#[derive(Debug, Clone)]
pub struct BatchAllocator {
    prefix: String,
    base: RunningCounter,
    current: u64,
}

impl BatchAllocator {
    /// Starts a batch from the counter found in `notes`.
    #[must_use]
    pub fn begin(prefix: impl Into<String>, notes: &str) -> Self {
        let base = RunningCounter::parse(notes);
        let current = base.value;
        Self {
            prefix: prefix.into(),
            base,
            current,
        }
    }

    /// Claims the next identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SyncDomainError`] when the counter would overflow or the
    /// prefix is invalid.
    pub fn claim(&mut self) -> Result<TaskToken, SyncDomainError> {
        let next = self
            .current
            .checked_add(1)
            .ok_or(SyncDomainError::CounterOverflow {
                current: self.current,
                requested: 1,
            })?;
        let token = TaskToken::allocate(&self.prefix, next)?;
        self.current = next;
        Ok(token)
    }

    /// Returns how many identifiers were claimed so far.
    #[must_use]
    pub const fn claimed(&self) -> u64 {
        self.current - self.base.value
    }

    /// Returns the counter value the batch started from.
    #[must_use]
    pub const fn base_value(&self) -> u64 {
        self.base.value
    }

    /// Returns the counter value after the claims so far.
    #[must_use]
    pub const fn current_value(&self) -> u64 {
        self.current
    }

    /// Produces the notes to write back, or `None` when nothing was claimed.
    #[must_use]
    pub fn finish(&self, notes: &str) -> Option<String> {
        (self.claimed() > 0).then(|| self.base.rewrite(notes, self.current))
    }
}
