//! User mapping table loaded from a JSON file.

use camino::Utf8Path;
use thiserror::Error;

use super::open_parent_dir;
use crate::sync::{adapters::memory::StaticUserDirectory, domain::UserRecord};

/// Errors returned while loading the user mapping table.
#[derive(Debug, Error)]
pub enum UserMapError {
    /// The file could not be read.
    #[error("failed to read user map '{path}': {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a JSON array of user records.
    #[error("failed to parse user map '{path}': {source}")]
    Parse {
        /// File path.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Loads the user mapping table stored at `path`.
///
/// The file holds a JSON array of `{email, name, aId, gId, aUtl}` records.
///
/// # Errors
///
/// Returns [`UserMapError`] when the file cannot be read or parsed.
pub fn load_user_directory(path: &Utf8Path) -> Result<StaticUserDirectory, UserMapError> {
    let read_error = |source| UserMapError::Read {
        path: path.to_string(),
        source,
    };
    let (dir, file_name) = open_parent_dir(path).map_err(read_error)?;
    let contents = dir.read_to_string(&file_name).map_err(read_error)?;
    let records: Vec<UserRecord> =
        serde_json::from_str(&contents).map_err(|source| UserMapError::Parse {
            path: path.to_string(),
            source,
        })?;
    Ok(StaticUserDirectory::from_records(records))
}
