//! File Control Block (FCB) implementation.
//!
//! An FCB is the metadata and content record of one file: its name, the user
//! that created it, the text it holds, two timestamps and the permission
//! flags that gate reads and writes.
//!
//! Access is owner-only. A request by anyone but the owner, or for an
//! operation whose flag is cleared, is refused with [`Access::Denied`]. A
//! refusal is an ordinary outcome, not an error: nothing changes and the
//! caller's session and open handle stay as they were.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};

use crate::error::FsError;

/// Owner permission flags, rendered in the fixed-width `rwx` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permission {
    pub read: bool,
    pub write: bool,
    /// Parsed and displayed, never checked.
    pub execute: bool,
}

impl Permission {
    /// All flags set (`rwx`).
    pub const ALL: Permission = Permission {
        read: true,
        write: true,
        execute: true,
    };

    /// No flags set (`---`).
    pub const NONE: Permission = Permission {
        read: false,
        write: false,
        execute: false,
    };

    /// Check whether the flag for `op` is set.
    pub fn allows(&self, op: Operation) -> bool {
        match op {
            Operation::Read => self.read,
            Operation::Write => self.write,
        }
    }
}

impl Default for Permission {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, ch: char| if set { ch } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(self.read, 'r'),
            flag(self.write, 'w'),
            flag(self.execute, 'x')
        )
    }
}

/// Parse a permission string.
///
/// Accepts any combination of `r`, `w`, `x` and `-` placeholders, so `rwx`,
/// `rw-`, `wr` and `---` are all valid. The empty string is rejected.
impl FromStr for Permission {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(FsError::InvalidPermission(s.to_string()));
        }
        let mut perm = Permission::NONE;
        for ch in s.chars() {
            match ch {
                'r' => perm.read = true,
                'w' => perm.write = true,
                'x' => perm.execute = true,
                '-' => {}
                _ => return Err(FsError::InvalidPermission(s.to_string())),
            }
        }
        Ok(perm)
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Operation gated by a permission flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read => f.write_str("read"),
            Operation::Write => f.write_str("write"),
        }
    }
}

/// A refused read or write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenied {
    pub user: String,
    pub file: String,
    pub operation: Operation,
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "access denied: user '{}' may not {} '{}'",
            self.user, self.operation, self.file
        )
    }
}

/// Outcome of an access-checked operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Access<T> {
    Granted(T),
    Denied(AccessDenied),
}

impl<T> Access<T> {
    pub fn is_granted(&self) -> bool {
        matches!(self, Access::Granted(_))
    }

    /// Convert to an `Option`, dropping the denial details.
    pub fn granted(self) -> Option<T> {
        match self {
            Access::Granted(value) => Some(value),
            Access::Denied(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Access<U> {
        match self {
            Access::Granted(value) => Access::Granted(f(value)),
            Access::Denied(denied) => Access::Denied(denied),
        }
    }
}

/// Serializable metadata snapshot of an FCB.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub owner: String,
    pub size: usize,
    pub permission: Permission,
    pub create_time: DateTime<Local>,
    pub modify_time: DateTime<Local>,
}

/// File Control Block - metadata and content of one file.
#[derive(Debug, Clone)]
pub struct FileControlBlock {
    name: String,
    owner: String,
    data: String,
    create_time: DateTime<Local>,
    modify_time: DateTime<Local>,
    permission: Permission,
}

impl FileControlBlock {
    /// Create an empty file owned by `owner` with all permission flags set.
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::with_permission(name, owner, Permission::ALL)
    }

    /// Create an empty file with explicit permission flags.
    pub fn with_permission(
        name: impl Into<String>,
        owner: impl Into<String>,
        permission: Permission,
    ) -> Self {
        let now = Local::now();
        Self {
            name: name.into(),
            owner: owner.into(),
            data: String::new(),
            create_time: now,
            modify_time: now,
            permission,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename is done by the containing directory; identity is unchanged.
    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Name of the creating user. Never changes.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Raw content, bypassing access checks.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Number of characters in the content.
    pub fn size(&self) -> usize {
        self.data.chars().count()
    }

    pub fn create_time(&self) -> DateTime<Local> {
        self.create_time
    }

    pub fn modify_time(&self) -> DateTime<Local> {
        self.modify_time
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub(crate) fn set_permission(&mut self, permission: Permission) {
        self.permission = permission;
    }

    /// Check `requester` against the owner and the flag for `op`.
    fn check(&self, requester: &str, op: Operation) -> Result<(), AccessDenied> {
        if requester == self.owner && self.permission.allows(op) {
            Ok(())
        } else {
            Err(AccessDenied {
                user: requester.to_string(),
                file: self.name.clone(),
                operation: op,
            })
        }
    }

    /// Read the full content on behalf of `requester`.
    pub fn read(&self, requester: &str) -> Access<&str> {
        match self.check(requester, Operation::Read) {
            Ok(()) => Access::Granted(self.data.as_str()),
            Err(denied) => Access::Denied(denied),
        }
    }

    /// Append `content` on behalf of `requester` and refresh the modify time.
    pub fn write(&mut self, content: &str, requester: &str) -> Access<()> {
        match self.check(requester, Operation::Write) {
            Ok(()) => {
                self.data.push_str(content);
                self.modify_time = Local::now();
                Access::Granted(())
            }
            Err(denied) => Access::Denied(denied),
        }
    }

    /// Metadata snapshot.
    pub fn info(&self) -> FileInfo {
        FileInfo {
            name: self.name.clone(),
            owner: self.owner.clone(),
            size: self.size(),
            permission: self.permission,
            create_time: self.create_time,
            modify_time: self.modify_time,
        }
    }
}
