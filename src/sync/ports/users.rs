//! Read-only user identity lookup.

use crate::sync::domain::MappedUser;

/// Bidirectional lookup between tracker and VCS user identities.
///
/// The directory is loaded once at startup and never mutated afterwards,
/// so lookups are synchronous.
pub trait UserDirectory: Send + Sync {
    /// Finds the mapped user for a VCS user id.
    fn by_vcs_id(&self, vcs_id: u64) -> Option<&MappedUser>;

    /// Finds the mapped user for a tracker user id.
    fn by_tracker_id(&self, tracker_id: &str) -> Option<&MappedUser>;
}
