//! Error types for the simulated filesystem.

use std::fmt;

use thiserror::Error;

/// Kind of object an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    User,
    File,
    Directory,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::User => f.write_str("user"),
            ObjectKind::File => f.write_str("file"),
            ObjectKind::Directory => f.write_str("directory"),
        }
    }
}

/// Errors that can occur during filesystem operations.
///
/// Every operation checks all of its preconditions before mutating anything,
/// so an `Err` always leaves the filesystem exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    #[error("'{name}' already exists in {scope}")]
    Duplicate { name: String, scope: String },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: ObjectKind, name: String },

    #[error("'{name}' is a {actual}, not a {expected}")]
    WrongType {
        name: String,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    #[error("directory '{0}' is not empty")]
    NotEmpty(String),

    #[error("no user is logged in")]
    NoSession,

    #[error("user '{0}' is already logged in")]
    AlreadyLoggedIn(String),

    #[error("'{0}' is already open, close it first")]
    AlreadyOpen(String),

    #[error("no file is open")]
    NotOpen,

    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("invalid permission string: {0:?}")]
    InvalidPermission(String),

    #[error("user '{user}' does not own '{file}'")]
    NotOwner { user: String, file: String },

    #[error("no {0} ids left")]
    IdsExhausted(ObjectKind),
}

impl FsError {
    pub(crate) fn not_found(kind: ObjectKind, name: &str) -> Self {
        FsError::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}

/// Result type for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FsError::not_found(ObjectKind::Directory, "docs").to_string(),
            "directory 'docs' not found"
        );
        assert_eq!(
            FsError::WrongType {
                name: "docs".into(),
                expected: ObjectKind::File,
                actual: ObjectKind::Directory,
            }
            .to_string(),
            "'docs' is a directory, not a file"
        );
        assert_eq!(FsError::NoSession.to_string(), "no user is logged in");
    }
}
