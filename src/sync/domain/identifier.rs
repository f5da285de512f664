//! Embedded task identifier tokens.
//!
//! A token has the form `[<prefix>-<n>]` and is the join key between tracker
//! tasks and VCS artefacts. Parsing uses a small hand-written grammar:
//!
//! ```text
//! token  = "[" prefix "-" digits "]"
//! prefix = 1*( ALPHA / DIGIT / "_" / "-" ), starting with ALPHA / DIGIT
//! digits = 1*DIGIT
//! ```
//!
//! The prefix/number split happens at the last `-` inside the brackets, so
//! `[WEB-APP-12]` has prefix `WEB-APP` and number `12`.

use super::SyncDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a token may occur in the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// The token must begin the text (task titles).
    Anchored,
    /// The first token found anywhere in the text (commit messages).
    Anywhere,
}

/// A parsed `[<prefix>-<n>]` identifier token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskToken {
    text: String,
    prefix: String,
    number: u64,
}

impl TaskToken {
    /// Builds the token for a freshly allocated identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SyncDomainError::InvalidPrefix`] when the prefix does not
    /// follow the token grammar.
    pub fn allocate(prefix: &str, number: u64) -> Result<Self, SyncDomainError> {
        if !is_valid_prefix(prefix) {
            return Err(SyncDomainError::InvalidPrefix(prefix.to_owned()));
        }
        Ok(Self {
            text: format!("[{prefix}-{number}]"),
            prefix: prefix.to_owned(),
            number,
        })
    }

    /// Returns the full bracketed token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the project prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the numeric suffix.
    #[must_use]
    pub const fn number(&self) -> u64 {
        self.number
    }
}

impl fmt::Display for TaskToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Extracts an identifier token from free text.
///
/// Absence of a token is a normal outcome and yields `None`.
///
/// # Examples
///
///     use tracksync::sync::domain::{ScanMode, extract};
///
///     let token = extract("fix: [PROJ-12] null deref", ScanMode::Anywhere).expect("token");
///     assert_eq!(token.as_str(), "[PROJ-12]");
///     assert_eq!(token.number(), 12);
///     assert!(extract("fix: [PROJ-12] null deref", ScanMode::Anchored).is_none());
#[must_use]
pub fn extract(text: &str, mode: ScanMode) -> Option<TaskToken> {
    match mode {
        ScanMode::Anchored => parse_at_start(text),
        ScanMode::Anywhere => text
            .match_indices('[')
            .find_map(|(index, _)| text.get(index..).and_then(parse_at_start)),
    }
}

/// Prepends a token to a title as `"<token> <text>"`.
///
/// Callers must check that `text` has no anchored token first; otherwise
/// tokens accumulate.
#[must_use]
pub fn embed(text: &str, token: &TaskToken) -> String {
    format!("{token} {text}")
}

fn parse_at_start(text: &str) -> Option<TaskToken> {
    let rest = text.strip_prefix('[')?;
    let close = rest.find(']')?;
    let inner = rest.get(..close)?;
    let (prefix, digits) = inner.rsplit_once('-')?;
    if !is_valid_prefix(prefix) || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let number = digits.parse::<u64>().ok()?;
    Some(TaskToken {
        text: format!("[{inner}]"),
        prefix: prefix.to_owned(),
        number,
    })
}

fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
