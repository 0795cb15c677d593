//! The filesystem facade.
//!
//! `Filesystem` owns the user registry and the directory tree, and tracks the
//! single active session and the current working directory. Every operation
//! the shell exposes goes through it.
//!
//! Two state machines live here:
//! - Session: logged out -> logged in (`login`) -> logged out (`logout`).
//!   Only one user can be logged in at a time.
//! - Handle, per user: closed -> open (`open_file`) -> closed (`close_file`).
//!   A user holds at most one open file.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{FsConfig, MAX_ACTIVE_SESSIONS};
use crate::directory::{DirId, DirTree, Entry, FileId};
use crate::error::{FsError, FsResult, ObjectKind};
use crate::fcb::{Access, FileControlBlock, FileInfo, Permission};
use crate::names;
use crate::user::User;

/// Snapshot of the current directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub path: String,
    /// Subdirectory names, sorted.
    pub directories: Vec<String>,
    /// File names, sorted.
    pub files: Vec<String>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }
}

/// Result of a successful `change_directory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirChange {
    /// The current directory changed.
    Moved,
    /// `.` was given; nothing changed.
    Stayed,
    /// `..` was given at the root; nothing changed.
    AtRoot,
}

/// In-memory hierarchical filesystem with a single user session.
#[derive(Debug, Clone)]
pub struct Filesystem {
    config: FsConfig,
    users: BTreeMap<String, User>,
    current_user: Option<String>,
    tree: DirTree,
    current_dir: DirId,
}

impl Default for Filesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem {
    /// Create an empty filesystem with default configuration.
    pub fn new() -> Self {
        Self::with_config(FsConfig::default())
    }

    pub fn with_config(config: FsConfig) -> Self {
        let tree = DirTree::new();
        let current_dir = tree.root();
        Self {
            config,
            users: BTreeMap::new(),
            current_user: None,
            tree,
            current_dir,
        }
    }

    /// Name of the logged-in user, if any.
    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    /// Registered user names, sorted.
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.users.keys().map(|s| s.as_str())
    }

    /// The file the logged-in user holds open.
    pub fn opened_file(&self) -> Option<&FileControlBlock> {
        let user = self.session_user().ok()?;
        self.tree.file(user.opened_file()?)
    }

    fn session_user(&self) -> FsResult<&User> {
        self.current_user
            .as_deref()
            .and_then(|name| self.users.get(name))
            .ok_or(FsError::NoSession)
    }

    fn session_user_mut(&mut self) -> FsResult<&mut User> {
        match self.current_user.as_deref() {
            Some(name) => self.users.get_mut(name).ok_or(FsError::NoSession),
            None => Err(FsError::NoSession),
        }
    }

    fn active_sessions(&self) -> usize {
        usize::from(self.current_user.is_some())
    }

    // ------------------------------------------------------------------
    // Users and session
    // ------------------------------------------------------------------

    /// Register a new user.
    pub fn create_user(&mut self, name: &str) -> FsResult<()> {
        names::validate_user(name)?;
        if self.users.contains_key(name) {
            return Err(FsError::Duplicate {
                name: name.to_string(),
                scope: "users".to_string(),
            });
        }
        self.users.insert(name.to_string(), User::new(name));
        debug!(user = name, "created user");
        Ok(())
    }

    /// Start the session for `name`.
    pub fn login(&mut self, name: &str) -> FsResult<()> {
        if self.active_sessions() >= MAX_ACTIVE_SESSIONS {
            let active = self.current_user.clone().unwrap_or_default();
            return Err(FsError::AlreadyLoggedIn(active));
        }
        if !self.users.contains_key(name) {
            return Err(FsError::not_found(ObjectKind::User, name));
        }
        self.current_user = Some(name.to_string());
        info!(user = name, "logged in");
        Ok(())
    }

    /// End the current session. The user's open handle, if any, is kept.
    pub fn logout(&mut self) -> FsResult<()> {
        let name = self.current_user.take().ok_or(FsError::NoSession)?;
        info!(user = %name, "logged out");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Directories
    // ------------------------------------------------------------------

    pub fn current_path(&self) -> String {
        self.tree.path(self.current_dir)
    }

    pub fn list_directory(&self) -> FsResult<Listing> {
        let dir = self.tree.dir(self.current_dir)?;
        Ok(Listing {
            path: self.current_path(),
            directories: dir.subdir_names().map(str::to_string).collect(),
            files: dir.file_names().map(str::to_string).collect(),
        })
    }

    pub fn make_directory(&mut self, name: &str) -> FsResult<()> {
        names::validate(name)?;
        self.tree.add_subdir(self.current_dir, name)?;
        debug!(dir = name, parent = %self.current_path(), "created directory");
        Ok(())
    }

    pub fn remove_directory(&mut self, name: &str) -> FsResult<()> {
        self.tree.remove_dir(self.current_dir, name)?;
        debug!(dir = name, parent = %self.current_path(), "removed directory");
        Ok(())
    }

    /// Move by one segment: `..`, `.`, or the name of a subdirectory.
    ///
    /// Paths with more than one segment are not parsed; `a/b` is looked up
    /// as a single name and will not be found.
    pub fn change_directory(&mut self, token: &str) -> FsResult<DirChange> {
        match token {
            "." => Ok(DirChange::Stayed),
            ".." => match self.tree.dir(self.current_dir)?.parent() {
                Some(parent) => {
                    self.current_dir = parent;
                    Ok(DirChange::Moved)
                }
                None => {
                    warn!("already at the root directory");
                    Ok(DirChange::AtRoot)
                }
            },
            name => {
                let target = self
                    .tree
                    .dir(self.current_dir)?
                    .subdir(name)
                    .ok_or_else(|| FsError::not_found(ObjectKind::Directory, name))?;
                self.current_dir = target;
                Ok(DirChange::Moved)
            }
        }
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    /// Create an empty file owned by the logged-in user.
    pub fn create_file(&mut self, name: &str) -> FsResult<()> {
        let owner = self.session_user()?.name().to_string();
        names::validate(name)?;
        let fcb = FileControlBlock::with_permission(name, &owner, self.config.default_permission);
        self.tree.add_file(self.current_dir, fcb)?;
        debug!(file = name, owner = %owner, "created file");
        Ok(())
    }

    /// Delete a file. Handles that refer to it are closed.
    pub fn delete_file(&mut self, name: &str) -> FsResult<()> {
        self.session_user()?;
        let (id, _) = self.tree.remove_file(self.current_dir, name)?;
        for user in self.users.values_mut() {
            if user.opened_file() == Some(id) {
                debug!(user = user.name(), file = name, "closed handle of deleted file");
                user.set_opened_file(None);
            }
        }
        debug!(file = name, "deleted file");
        Ok(())
    }

    /// Rename a file in the current directory. Open handles stay valid.
    pub fn rename_file(&mut self, old: &str, new: &str) -> FsResult<()> {
        self.session_user()?;
        names::validate(new)?;
        self.tree.rename_file(self.current_dir, old, new)?;
        debug!(from = old, to = new, "renamed file");
        Ok(())
    }

    /// Resolve `name` to a file in the current directory.
    fn file_in_cwd(&self, name: &str) -> FsResult<FileId> {
        match self.tree.lookup(self.current_dir, name)? {
            Some(Entry::File(id)) => Ok(id),
            Some(Entry::Dir(_)) => Err(FsError::WrongType {
                name: name.to_string(),
                expected: ObjectKind::File,
                actual: ObjectKind::Directory,
            }),
            None => Err(FsError::not_found(ObjectKind::File, name)),
        }
    }

    /// Open a file in the current directory.
    ///
    /// There is no ownership check here: any user may open any file, and
    /// `read_file`/`write_file` then refuse users who do not own it.
    pub fn open_file(&mut self, name: &str) -> FsResult<()> {
        let user = self.session_user()?;
        if let Some(open) = user.opened_file() {
            let open_name = self
                .tree
                .file(open)
                .map(|fcb| fcb.name().to_string())
                .unwrap_or_else(|| open.to_string());
            return Err(FsError::AlreadyOpen(open_name));
        }
        let id = self
            .tree
            .dir(self.current_dir)?
            .file(name)
            .ok_or_else(|| FsError::not_found(ObjectKind::File, name))?;
        self.session_user_mut()?.set_opened_file(Some(id));
        debug!(file = name, "opened file");
        Ok(())
    }

    pub fn close_file(&mut self) -> FsResult<()> {
        let user = self.session_user_mut()?;
        if user.opened_file().is_none() {
            return Err(FsError::NotOpen);
        }
        user.set_opened_file(None);
        debug!("closed file");
        Ok(())
    }

    /// Read the open file as the logged-in user.
    pub fn read_file(&self) -> FsResult<Access<String>> {
        let user = self.session_user()?;
        let fcb = user
            .opened_file()
            .and_then(|id| self.tree.file(id))
            .ok_or(FsError::NotOpen)?;
        let access = fcb.read(user.name()).map(str::to_string);
        if let Access::Denied(denied) = &access {
            info!(%denied, "read refused");
        }
        Ok(access)
    }

    /// Append `content` to the open file as the logged-in user.
    pub fn write_file(&mut self, content: &str) -> FsResult<Access<()>> {
        let user = self.session_user()?;
        let requester = user.name().to_string();
        let id = user.opened_file().ok_or(FsError::NotOpen)?;
        let fcb = self.tree.file_mut(id).ok_or(FsError::NotOpen)?;
        let access = fcb.write(content, &requester);
        match &access {
            Access::Granted(()) => debug!(file = fcb.name(), size = fcb.size(), "wrote file"),
            Access::Denied(denied) => info!(%denied, "write refused"),
        }
        Ok(access)
    }

    /// Change the permission flags of a file. Only the owner may do this.
    pub fn set_permission(&mut self, name: &str, permission: Permission) -> FsResult<()> {
        let requester = self.session_user()?.name().to_string();
        let id = self.file_in_cwd(name)?;
        let fcb = self
            .tree
            .file_mut(id)
            .ok_or_else(|| FsError::not_found(ObjectKind::File, name))?;
        if fcb.owner() != requester {
            return Err(FsError::NotOwner {
                user: requester,
                file: name.to_string(),
            });
        }
        fcb.set_permission(permission);
        debug!(file = name, %permission, "changed permission");
        Ok(())
    }

    /// Metadata of a file in the current directory.
    pub fn file_info(&self, name: &str) -> FsResult<FileInfo> {
        let id = self.file_in_cwd(name)?;
        self.tree
            .file(id)
            .map(FileControlBlock::info)
            .ok_or_else(|| FsError::not_found(ObjectKind::File, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logged_in(name: &str) -> Filesystem {
        let mut fs = Filesystem::new();
        fs.create_user(name).unwrap();
        fs.login(name).unwrap();
        fs
    }

    #[test]
    fn test_new_filesystem() {
        let fs = Filesystem::new();
        assert_eq!(fs.current_path(), "/");
        assert_eq!(fs.current_user(), None);
        assert!(fs.list_directory().unwrap().is_empty());
    }

    #[test]
    fn test_create_user_duplicate() {
        let mut fs = Filesystem::new();
        fs.create_user("alice").unwrap();
        assert!(matches!(
            fs.create_user("alice"),
            Err(FsError::Duplicate { .. })
        ));
        assert!(matches!(fs.create_user(" "), Err(FsError::InvalidName(_))));
        assert_eq!(fs.users().collect::<Vec<_>>(), ["alice"]);
    }

    #[test]
    fn test_session_state_machine() {
        let mut fs = Filesystem::new();
        fs.create_user("alice").unwrap();
        fs.create_user("bob").unwrap();

        assert_eq!(fs.logout(), Err(FsError::NoSession));
        assert!(matches!(
            fs.login("carol"),
            Err(FsError::NotFound { kind: ObjectKind::User, .. })
        ));

        fs.login("alice").unwrap();
        assert_eq!(fs.current_user(), Some("alice"));
        assert_eq!(
            fs.login("bob"),
            Err(FsError::AlreadyLoggedIn("alice".into()))
        );
        assert_eq!(fs.current_user(), Some("alice"));

        fs.logout().unwrap();
        assert_eq!(fs.current_user(), None);
        fs.login("bob").unwrap();
        assert_eq!(fs.current_user(), Some("bob"));
    }

    #[test]
    fn test_file_ops_require_session() {
        let mut fs = Filesystem::new();
        assert_eq!(fs.create_file("a"), Err(FsError::NoSession));
        assert_eq!(fs.delete_file("a"), Err(FsError::NoSession));
        assert_eq!(fs.open_file("a"), Err(FsError::NoSession));
        assert_eq!(fs.close_file(), Err(FsError::NoSession));
        assert_eq!(fs.read_file(), Err(FsError::NoSession));
        assert_eq!(fs.write_file("x"), Err(FsError::NoSession));
        assert_eq!(fs.rename_file("a", "b"), Err(FsError::NoSession));
    }

    #[test]
    fn test_create_file_invalid_name() {
        let mut fs = logged_in("alice");
        assert!(matches!(fs.create_file(""), Err(FsError::InvalidName(_))));
        assert!(matches!(fs.create_file("  "), Err(FsError::InvalidName(_))));
        assert!(fs.list_directory().unwrap().is_empty());
    }

    #[test]
    fn test_create_file_uses_configured_permission() {
        let config = FsConfig::default().with_default_permission("r--".parse().unwrap());
        let mut fs = Filesystem::with_config(config);
        fs.create_user("alice").unwrap();
        fs.login("alice").unwrap();
        fs.create_file("ro.txt").unwrap();

        assert_eq!(fs.file_info("ro.txt").unwrap().permission.to_string(), "r--");
        fs.open_file("ro.txt").unwrap();
        assert!(!fs.write_file("x").unwrap().is_granted());
    }

    #[test]
    fn test_single_open_handle() {
        let mut fs = logged_in("alice");
        fs.create_file("a").unwrap();
        fs.create_file("b").unwrap();

        assert_eq!(fs.close_file(), Err(FsError::NotOpen));
        assert_eq!(fs.read_file(), Err(FsError::NotOpen));
        fs.open_file("a").unwrap();
        assert_eq!(fs.open_file("b"), Err(FsError::AlreadyOpen("a".into())));
        assert_eq!(fs.opened_file().map(|f| f.name()), Some("a"));

        fs.close_file().unwrap();
        fs.open_file("b").unwrap();
        assert_eq!(fs.opened_file().map(|f| f.name()), Some("b"));
    }

    #[test]
    fn test_open_missing_file() {
        let mut fs = logged_in("alice");
        fs.make_directory("docs").unwrap();
        assert!(matches!(
            fs.open_file("nope"),
            Err(FsError::NotFound { kind: ObjectKind::File, .. })
        ));
        assert!(matches!(
            fs.open_file("docs"),
            Err(FsError::NotFound { kind: ObjectKind::File, .. })
        ));
    }

    #[test]
    fn test_write_then_read() {
        let mut fs = logged_in("alice");
        fs.create_file("notes.txt").unwrap();
        fs.open_file("notes.txt").unwrap();

        assert!(fs.write_file("x").unwrap().is_granted());
        assert!(fs.write_file("yz").unwrap().is_granted());
        assert_eq!(fs.read_file().unwrap(), Access::Granted("xyz".to_string()));
        assert_eq!(fs.file_info("notes.txt").unwrap().size, 3);
    }

    #[test]
    fn test_open_has_no_ownership_check() {
        let mut fs = logged_in("alice");
        fs.create_user("bob").unwrap();
        fs.create_file("secret").unwrap();
        fs.open_file("secret").unwrap();
        let _ = fs.write_file("alice's data").unwrap();
        fs.close_file().unwrap();
        fs.logout().unwrap();

        fs.login("bob").unwrap();
        fs.open_file("secret").unwrap();
        assert!(!fs.read_file().unwrap().is_granted());
        let before = fs.file_info("secret").unwrap();
        assert!(!fs.write_file("bob was here").unwrap().is_granted());
        let after = fs.file_info("secret").unwrap();
        assert_eq!(before, after);

        // Denial leaves the handle open.
        assert_eq!(fs.opened_file().map(|f| f.name()), Some("secret"));
        fs.close_file().unwrap();
    }

    #[test]
    fn test_handle_survives_logout() {
        let mut fs = logged_in("alice");
        fs.create_file("a").unwrap();
        fs.open_file("a").unwrap();
        fs.logout().unwrap();
        assert!(fs.opened_file().is_none());

        fs.login("alice").unwrap();
        assert_eq!(fs.opened_file().map(|f| f.name()), Some("a"));
    }

    #[test]
    fn test_delete_open_file_closes_handle() {
        let mut fs = logged_in("alice");
        fs.create_file("a").unwrap();
        fs.open_file("a").unwrap();
        fs.delete_file("a").unwrap();

        assert_eq!(fs.read_file(), Err(FsError::NotOpen));
        fs.create_file("a").unwrap();
        fs.open_file("a").unwrap();
    }

    #[test]
    fn test_delete_file_wrong_type() {
        let mut fs = logged_in("alice");
        fs.make_directory("docs").unwrap();
        assert!(matches!(
            fs.delete_file("docs"),
            Err(FsError::WrongType { .. })
        ));
        assert!(matches!(
            fs.delete_file("nope"),
            Err(FsError::NotFound { .. })
        ));
    }

    #[test]
    fn test_rename_keeps_handle() {
        let mut fs = logged_in("alice");
        fs.create_file("old").unwrap();
        fs.open_file("old").unwrap();
        fs.rename_file("old", "new").unwrap();

        assert_eq!(fs.opened_file().map(|f| f.name()), Some("new"));
        assert!(fs.write_file("still works").unwrap().is_granted());
        assert_eq!(fs.list_directory().unwrap().files, ["new"]);
        assert!(matches!(
            fs.rename_file("new", ""),
            Err(FsError::InvalidName(_))
        ));
        fs.rename_file("new", "new").unwrap();
    }

    #[test]
    fn test_directory_navigation() {
        let mut fs = Filesystem::new();
        fs.make_directory("a").unwrap();
        assert_eq!(fs.change_directory("a"), Ok(DirChange::Moved));
        fs.make_directory("b").unwrap();
        assert_eq!(fs.change_directory("b"), Ok(DirChange::Moved));
        assert_eq!(fs.current_path(), "/a/b");

        assert_eq!(fs.change_directory("."), Ok(DirChange::Stayed));
        assert_eq!(fs.current_path(), "/a/b");
        assert!(matches!(
            fs.change_directory("missing"),
            Err(FsError::NotFound { .. })
        ));

        fs.change_directory("..").unwrap();
        fs.change_directory("..").unwrap();
        assert_eq!(fs.current_path(), "/");
        assert_eq!(fs.change_directory(".."), Ok(DirChange::AtRoot));
        assert_eq!(fs.current_path(), "/");
    }

    #[test]
    fn test_change_directory_single_segment_only() {
        let mut fs = Filesystem::new();
        fs.make_directory("a").unwrap();
        fs.change_directory("a").unwrap();
        fs.make_directory("b").unwrap();
        fs.change_directory("..").unwrap();

        assert!(matches!(
            fs.change_directory("a/b"),
            Err(FsError::NotFound { .. })
        ));
        assert_eq!(fs.current_path(), "/");
    }

    #[test]
    fn test_make_directory_validation() {
        let mut fs = Filesystem::new();
        for bad in ["", " ", ".", "..", "a/b"] {
            assert!(matches!(
                fs.make_directory(bad),
                Err(FsError::InvalidName(_))
            ));
        }
        fs.make_directory("docs").unwrap();
        assert!(matches!(
            fs.make_directory("docs"),
            Err(FsError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_listing_snapshot() {
        let mut fs = logged_in("alice");
        fs.make_directory("src").unwrap();
        fs.make_directory("docs").unwrap();
        fs.create_file("b.txt").unwrap();
        fs.create_file("a.txt").unwrap();

        let listing = fs.list_directory().unwrap();
        assert_eq!(listing.path, "/");
        assert_eq!(listing.directories, ["docs", "src"]);
        assert_eq!(listing.files, ["a.txt", "b.txt"]);
    }

    #[test]
    fn test_listing_of_detached_current_dir_fails() {
        let mut fs = logged_in("alice");
        fs.make_directory("gone").unwrap();
        fs.change_directory("gone").unwrap();
        let stale = fs.current_dir;
        fs.change_directory("..").unwrap();
        fs.remove_directory("gone").unwrap();

        fs.current_dir = stale;
        assert!(matches!(
            fs.list_directory(),
            Err(FsError::NotFound {
                kind: ObjectKind::Directory,
                ..
            })
        ));
    }

    #[test]
    fn test_set_permission_owner_only() {
        let mut fs = logged_in("alice");
        fs.create_user("bob").unwrap();
        fs.create_file("f").unwrap();
        fs.set_permission("f", "r".parse().unwrap()).unwrap();
        assert_eq!(fs.file_info("f").unwrap().permission.to_string(), "r--");

        fs.logout().unwrap();
        fs.login("bob").unwrap();
        assert_eq!(
            fs.set_permission("f", Permission::ALL),
            Err(FsError::NotOwner {
                user: "bob".into(),
                file: "f".into()
            })
        );
        assert_eq!(fs.file_info("f").unwrap().permission.to_string(), "r--");
    }

    #[test]
    fn test_file_info_wrong_type() {
        let mut fs = Filesystem::new();
        fs.make_directory("docs").unwrap();
        assert!(matches!(
            fs.file_info("docs"),
            Err(FsError::WrongType { .. })
        ));
    }
}
