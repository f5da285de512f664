//! Error types for synchronisation domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing or advancing domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncDomainError {
    /// The identifier prefix is empty or contains unsupported characters.
    #[error("invalid identifier prefix '{0}', expected ASCII letters, digits, '_' or '-'")]
    InvalidPrefix(String),

    /// Allocating more identifiers would overflow the running counter.
    #[error("running counter overflow: {current} + {requested}")]
    CounterOverflow {
        /// Counter value before allocation.
        current: u64,
        /// Number of identifiers requested.
        requested: u64,
    },
}

/// Error returned while parsing progress labels from the tracker.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown progress label: {0}")]
pub struct ParseProgressError(pub String);

/// Errors returned while computing webhook signatures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The secret could not be used as an HMAC key.
    #[error("invalid HMAC key length")]
    InvalidKey,
}
