//! File-backed adapters.
//!
//! Files are opened through a capability-scoped handle on their parent
//! directory, so adapters never touch paths outside it.

mod users;
mod webhook_store;

pub use users::{UserMapError, load_user_directory};
pub use webhook_store::JsonFileWebhookStore;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};

/// Opens the parent directory of `path` and returns it with the file name.
fn open_parent_dir(path: &Utf8Path) -> std::io::Result<(Dir, String)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::other(format!("path '{path}' must include a file name")))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name.to_owned()))
}
