//! Directory tree.
//!
//! Directories and FCBs are stored in an arena (`DirTree`) and refer to each
//! other by id. A `Directory` maps names to the ids of its children and keeps
//! the id of its parent, which is how paths are rebuilt without the tree
//! holding references into itself.
//!
//! Each directory has a single flat namespace: a name is either a file or a
//! subdirectory, never both.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{FsError, FsResult, ObjectKind};
use crate::fcb::FileControlBlock;
use crate::names::ROOT_NAME;

/// Handle of a directory node in a [`DirTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirId(u32);

/// Handle of an FCB in a [`DirTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

impl fmt::Display for DirId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a name in a directory refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    File(FileId),
    Dir(DirId),
}

/// A directory node.
#[derive(Debug, Clone)]
pub struct Directory {
    name: String,
    parent: Option<DirId>,
    files: BTreeMap<String, FileId>,
    subdirs: BTreeMap<String, DirId>,
}

impl Directory {
    fn new(name: impl Into<String>, parent: Option<DirId>) -> Self {
        Self {
            name: name.into(),
            parent,
            files: BTreeMap::new(),
            subdirs: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent directory, `None` for the root and for detached nodes.
    pub fn parent(&self) -> Option<DirId> {
        self.parent
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.subdirs.is_empty()
    }

    /// Look up a name in this directory's namespace.
    pub fn entry(&self, name: &str) -> Option<Entry> {
        if let Some(&id) = self.files.get(name) {
            return Some(Entry::File(id));
        }
        self.subdirs.get(name).map(|&id| Entry::Dir(id))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name) || self.subdirs.contains_key(name)
    }

    /// File names, sorted.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|s| s.as_str())
    }

    /// Subdirectory names, sorted.
    pub fn subdir_names(&self) -> impl Iterator<Item = &str> {
        self.subdirs.keys().map(|s| s.as_str())
    }

    pub fn file(&self, name: &str) -> Option<FileId> {
        self.files.get(name).copied()
    }

    pub fn subdir(&self, name: &str) -> Option<DirId> {
        self.subdirs.get(name).copied()
    }
}

/// Arena owning every directory node and every FCB.
#[derive(Debug, Clone)]
pub struct DirTree {
    dirs: HashMap<DirId, Directory>,
    files: HashMap<FileId, FileControlBlock>,
    root: DirId,
    next_dir: u32,
    next_file: u32,
}

impl Default for DirTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DirTree {
    /// Create a tree holding only the root directory `/`.
    pub fn new() -> Self {
        let root = DirId(0);
        let mut dirs = HashMap::new();
        dirs.insert(root, Directory::new(ROOT_NAME, None));
        Self {
            dirs,
            files: HashMap::new(),
            root,
            next_dir: 1,
            next_file: 0,
        }
    }

    pub fn root(&self) -> DirId {
        self.root
    }

    /// Get a directory node.
    pub fn dir(&self, id: DirId) -> FsResult<&Directory> {
        self.dirs
            .get(&id)
            .ok_or_else(|| FsError::not_found(ObjectKind::Directory, &id.to_string()))
    }

    fn dir_mut(&mut self, id: DirId) -> FsResult<&mut Directory> {
        self.dirs
            .get_mut(&id)
            .ok_or_else(|| FsError::not_found(ObjectKind::Directory, &id.to_string()))
    }

    pub fn file(&self, id: FileId) -> Option<&FileControlBlock> {
        self.files.get(&id)
    }

    pub fn file_mut(&mut self, id: FileId) -> Option<&mut FileControlBlock> {
        self.files.get_mut(&id)
    }

    /// Look up `name` in directory `dir`.
    pub fn lookup(&self, dir: DirId, name: &str) -> FsResult<Option<Entry>> {
        Ok(self.dir(dir)?.entry(name))
    }

    fn ensure_free(&self, dir: DirId, name: &str) -> FsResult<()> {
        if self.dir(dir)?.contains(name) {
            return Err(FsError::Duplicate {
                name: name.to_string(),
                scope: format!("'{}'", self.path(dir)),
            });
        }
        Ok(())
    }

    /// Insert `fcb` into `dir` under its own name.
    pub fn add_file(&mut self, dir: DirId, fcb: FileControlBlock) -> FsResult<FileId> {
        self.ensure_free(dir, fcb.name())?;
        let id = FileId(next_id(&mut self.next_file, ObjectKind::File)?);
        self.dir_mut(dir)?.files.insert(fcb.name().to_string(), id);
        self.files.insert(id, fcb);
        Ok(id)
    }

    /// Remove the file `name` from `dir`, returning its id and FCB.
    pub fn remove_file(&mut self, dir: DirId, name: &str) -> FsResult<(FileId, FileControlBlock)> {
        let id = match self.lookup(dir, name)? {
            None => return Err(FsError::not_found(ObjectKind::File, name)),
            Some(Entry::Dir(_)) => {
                return Err(FsError::WrongType {
                    name: name.to_string(),
                    expected: ObjectKind::File,
                    actual: ObjectKind::Directory,
                })
            }
            Some(Entry::File(id)) => id,
        };
        let fcb = self
            .files
            .remove(&id)
            .ok_or_else(|| FsError::not_found(ObjectKind::File, name))?;
        self.dir_mut(dir)?.files.remove(name);
        Ok((id, fcb))
    }

    /// Create an empty subdirectory `name` inside `dir`.
    pub fn add_subdir(&mut self, dir: DirId, name: &str) -> FsResult<DirId> {
        self.ensure_free(dir, name)?;
        let id = DirId(next_id(&mut self.next_dir, ObjectKind::Directory)?);
        self.dir_mut(dir)?.subdirs.insert(name.to_string(), id);
        self.dirs.insert(id, Directory::new(name, Some(dir)));
        Ok(id)
    }

    /// Remove the empty subdirectory `name` from `dir`.
    ///
    /// The returned node is detached: its parent link is cleared.
    pub fn remove_dir(&mut self, dir: DirId, name: &str) -> FsResult<Directory> {
        let id = match self.lookup(dir, name)? {
            None => return Err(FsError::not_found(ObjectKind::Directory, name)),
            Some(Entry::File(_)) => {
                return Err(FsError::WrongType {
                    name: name.to_string(),
                    expected: ObjectKind::Directory,
                    actual: ObjectKind::File,
                })
            }
            Some(Entry::Dir(id)) => id,
        };
        if !self.dir(id)?.is_empty() {
            return Err(FsError::NotEmpty(name.to_string()));
        }
        let mut removed = self
            .dirs
            .remove(&id)
            .ok_or_else(|| FsError::not_found(ObjectKind::Directory, name))?;
        removed.parent = None;
        self.dir_mut(dir)?.subdirs.remove(name);
        Ok(removed)
    }

    /// Move file `old` in `dir` to the key `new`. The FCB keeps its id.
    pub fn rename_file(&mut self, dir: DirId, old: &str, new: &str) -> FsResult<FileId> {
        let id = match self.lookup(dir, old)? {
            None => return Err(FsError::not_found(ObjectKind::File, old)),
            Some(Entry::Dir(_)) => {
                return Err(FsError::WrongType {
                    name: old.to_string(),
                    expected: ObjectKind::File,
                    actual: ObjectKind::Directory,
                })
            }
            Some(Entry::File(id)) => id,
        };
        if old == new {
            return Ok(id);
        }
        self.ensure_free(dir, new)?;

        let node = self.dir_mut(dir)?;
        node.files.remove(old);
        node.files.insert(new.to_string(), id);
        if let Some(fcb) = self.files.get_mut(&id) {
            fcb.set_name(new);
        }
        Ok(id)
    }

    /// Absolute path of `dir`, rebuilt from parent links.
    ///
    /// The root renders as `/`; an id that is not in the tree renders as the
    /// root as well.
    pub fn path(&self, dir: DirId) -> String {
        let mut components = Vec::new();
        let mut current = self.dirs.get(&dir);
        while let Some(node) = current {
            match node.parent {
                Some(parent) => {
                    components.push(node.name.as_str());
                    current = self.dirs.get(&parent);
                }
                None => break,
            }
        }
        components.reverse();
        format!("/{}", components.join("/"))
    }

    /// Number of live directory nodes, root included.
    #[cfg(test)]
    pub(crate) fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    /// Number of live FCBs.
    #[cfg(test)]
    pub(crate) fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Take the counter's value and advance it, failing instead of wrapping.
fn next_id(counter: &mut u32, kind: ObjectKind) -> FsResult<u32> {
    let id = *counter;
    *counter = id.checked_add(1).ok_or(FsError::IdsExhausted(kind))?;
    Ok(id)
}
