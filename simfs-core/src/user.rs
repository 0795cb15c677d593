//! User accounts.

use crate::directory::FileId;

/// An account and the file it currently holds open.
///
/// The at-most-one-open-file rule is enforced by
/// [`Filesystem`](crate::Filesystem), not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    name: String,
    opened_file: Option<FileId>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            opened_file: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn opened_file(&self) -> Option<FileId> {
        self.opened_file
    }

    pub(crate) fn set_opened_file(&mut self, file: Option<FileId>) {
        self.opened_file = file;
    }
}
