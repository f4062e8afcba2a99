//! Generic filesystem interface.
//!
//! [`FileSystem`] is the contract shared by every filesystem view in
//! romvfs. Read-only implementations still provide the mutating methods and
//! fail them, so any implementation can stand in for another.

use crate::storage::Storage;
use crate::{Error, Result};

/// Access requested when opening a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
    /// Write access that may extend the file.
    Append,
}

impl OpenMode {
    /// Returns true if the mode includes any kind of write access.
    pub fn can_write(self) -> bool {
        !matches!(self, OpenMode::Read)
    }
}

/// Which kinds of children a directory listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenDirectoryMode {
    pub directories: bool,
    pub files: bool,
}

impl OpenDirectoryMode {
    pub const ALL: Self = Self {
        directories: true,
        files: true,
    };
    pub const DIRECTORIES: Self = Self {
        directories: true,
        files: false,
    };
    pub const FILES: Self = Self {
        directories: false,
        files: true,
    };
}

impl Default for OpenDirectoryMode {
    fn default() -> Self {
        Self::ALL
    }
}

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// One child returned by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
    /// File size in bytes; zero for directories.
    pub size: u64,
}

/// Raw timestamps of a file, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTimeStampRaw {
    pub created: u64,
    pub accessed: u64,
    pub modified: u64,
    /// The values are local time rather than UTC.
    pub is_local_time: bool,
}

/// Implementation-specific queries accepted by [`FileSystem::query_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryId {
    SetConcatenationFileAttribute,
    UpdateMac,
    IsSignedSystemPartitionOnSdCardValid,
    QueryUnpreparedFileInformation,
}

/// A hierarchical filesystem.
///
/// Paths are `/`-separated; a leading slash is optional.
pub trait FileSystem {
    /// Storage returned for an opened file.
    type File: Storage;
    /// Iterator over one directory's children.
    type Directory<'a>: Iterator<Item = Result<DirectoryEntry>>
    where
        Self: 'a;

    fn open_file(&self, path: &str, mode: OpenMode) -> Result<Self::File>;

    fn open_directory(&self, path: &str, mode: OpenDirectoryMode) -> Result<Self::Directory<'_>>;

    /// Kind of the entry at `path`, or [`Error::PathNotFound`].
    fn get_entry_type(&self, path: &str) -> Result<EntryKind>;

    fn file_exists(&self, path: &str) -> bool {
        matches!(self.get_entry_type(path), Ok(EntryKind::File))
    }

    fn directory_exists(&self, path: &str) -> bool {
        matches!(self.get_entry_type(path), Ok(EntryKind::Directory))
    }

    fn create_directory(&mut self, path: &str) -> Result<()>;
    fn create_file(&mut self, path: &str, size: u64) -> Result<()>;
    fn delete_directory(&mut self, path: &str) -> Result<()>;
    fn delete_directory_recursively(&mut self, path: &str) -> Result<()>;
    fn clean_directory_recursively(&mut self, path: &str) -> Result<()>;
    fn delete_file(&mut self, path: &str) -> Result<()>;
    fn rename_directory(&mut self, from: &str, to: &str) -> Result<()>;
    fn rename_file(&mut self, from: &str, to: &str) -> Result<()>;

    fn free_space_size(&self, path: &str) -> Result<u64>;
    fn total_space_size(&self, path: &str) -> Result<u64>;

    fn get_file_time_stamp_raw(&self, path: &str) -> Result<FileTimeStampRaw>;

    /// Run an implementation-specific query on the entry at `path`.
    ///
    /// `input` and `out` carry the query's arguments and result.
    fn query_entry(&self, out: &mut [u8], input: &[u8], query: QueryId, path: &str) -> Result<()>;

    /// Persist pending changes.
    fn commit(&mut self) -> Result<()>;
}

/// Recursively list everything below `path`.
///
/// Returns `(full path, entry)` pairs, parents before their children.
/// Full paths start with `/`.
pub fn enumerate_entries<F>(fs: &F, path: &str) -> Result<Vec<(String, DirectoryEntry)>>
where
    F: FileSystem + ?Sized,
{
    if !fs.directory_exists(path) {
        return Err(Error::PathNotFound(path.to_owned()));
    }

    let mut out = Vec::new();
    let mut pending = vec![join("", path)];
    while let Some(dir) = pending.pop() {
        let mut subdirs = Vec::new();
        for entry in fs.open_directory(&dir, OpenDirectoryMode::ALL)? {
            let entry = entry?;
            let full = join(&dir, &entry.name);
            if entry.kind == EntryKind::Directory {
                subdirs.push(full.clone());
            }
            out.push((full, entry));
        }
        // Reversed so the first subdirectory is visited next.
        pending.extend(subdirs.into_iter().rev());
    }
    Ok(out)
}

fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_matches('/');
    match (dir.is_empty(), name.is_empty()) {
        (true, true) => "/".to_owned(),
        (true, false) => format!("/{name}"),
        (false, true) => dir.to_owned(),
        (false, false) => format!("{dir}/{name}"),
    }
}
