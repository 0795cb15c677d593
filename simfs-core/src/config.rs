//! Filesystem configuration.

use crate::fcb::Permission;

/// Number of users that may be logged in at once.
///
/// The whole filesystem shares one session. Supporting more would need a
/// session object passed to every operation instead of `current_user`.
pub const MAX_ACTIVE_SESSIONS: usize = 1;

/// Configuration for a [`Filesystem`](crate::Filesystem).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsConfig {
    /// Flags given to newly created files.
    pub default_permission: Permission,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            default_permission: Permission::ALL,
        }
    }
}

impl FsConfig {
    /// Set the flags given to newly created files.
    pub fn with_default_permission(mut self, permission: Permission) -> Self {
        self.default_permission = permission;
        self
    }
}
