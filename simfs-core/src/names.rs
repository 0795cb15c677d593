//! Entry name validation.

use crate::error::{FsError, FsResult};

/// Name of the root directory. It is the only entry allowed to contain `/`.
pub const ROOT_NAME: &str = "/";

/// Check that `name` can be used as a file or directory name.
///
/// - Must not be empty or whitespace only
/// - Must not contain the path separator `/`
/// - Must not be `.` or `..`, which `change_directory` reserves
///
/// Names are stored exactly as given; no trimming or case folding happens.
///
/// # Examples
/// ```
/// use simfs_core::names::validate;
/// assert!(validate("notes.txt").is_ok());
/// assert!(validate("   ").is_err());
/// assert!(validate("a/b").is_err());
/// ```
pub fn validate(name: &str) -> FsResult<&str> {
    if name.trim().is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// Check a user name. Only blank names are rejected.
pub fn validate_user(name: &str) -> FsResult<&str> {
    if name.trim().is_empty() {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(name)
}
