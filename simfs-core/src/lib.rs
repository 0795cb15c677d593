//! In-memory hierarchical filesystem core.
//!
//! This crate provides the data model behind the simfs shell:
//! - A directory tree with a flat namespace per directory
//! - File control blocks holding text content, timestamps and permission flags
//! - A user registry with a single global login session
//! - Owner-only access checks on reads and writes
//!
//! # Architecture
//!
//! - `DirTree`: arena of directory nodes and FCBs, addressed by id
//! - `FileControlBlock`: per-file metadata, content and access checks
//! - `User`: account name plus at most one open file
//! - `Filesystem`: facade over all of the above; the only mutating surface
//!
//! Nothing in this crate prints. Refused reads and writes come back as
//! [`Access::Denied`], every other failure as an [`FsError`].

pub mod config;
pub mod directory;
pub mod error;
pub mod fcb;
pub mod filesystem;
pub mod names;
pub mod user;

pub use config::{FsConfig, MAX_ACTIVE_SESSIONS};
pub use directory::{DirId, DirTree, Directory, Entry, FileId};
pub use error::{FsError, FsResult, ObjectKind};
pub use fcb::{Access, AccessDenied, FileControlBlock, FileInfo, Operation, Permission};
pub use filesystem::{DirChange, Filesystem, Listing};
pub use user::User;
