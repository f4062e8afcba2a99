//! RomFS image builder.
//!
//! ## Output layout
//! ```text
//! [0x000]  Header (0x50, zero padded)
//! [0x200]  File data, each file aligned to 0x10
//! [align4] Directory hash table
//!          Directory entries
//!          File hash table
//!          File entries
//! ```
//! Entries are added in path order and the hash tables are trimmed to the
//! preferred bucket count, so the same tree always produces the same bytes.

use std::collections::BTreeMap;
use std::ops::Bound;

use tracing::debug;

use super::header::{HEADER_SIZE, RomFsHeader};
use super::table::HierarchicalRomFileTable;
use crate::fs::{EntryKind, FileSystem, OpenMode, enumerate_entries};
use crate::storage::{MemoryStorage, Storage};
use crate::utils::{align_up, align_up_u64};
use crate::{Error, Result};

/// Offset of the file data region in built images.
pub const DATA_REGION_OFFSET: u64 = 0x200;

/// Alignment of each file's data within the data region.
pub const FILE_DATA_ALIGNMENT: u64 = 0x10;

enum Node<'a> {
    Directory,
    File(Box<dyn Storage + 'a>),
}

/// Collects files and directories and serialises them as a RomFS image.
///
/// ```
/// use romvfs::romfs::{RomFsBuilder, RomFsFileSystem};
/// use romvfs::storage::MemoryStorage;
///
/// let mut builder = RomFsBuilder::new();
/// builder.add_file("data/hello.txt", MemoryStorage::new(b"hi".to_vec()))?;
/// let image = builder.build()?;
///
/// let fs = RomFsFileSystem::new(&image)?;
/// assert!(fs.file_exists("data/hello.txt"));
/// # Ok::<(), romvfs::Error>(())
/// ```
#[derive(Default)]
pub struct RomFsBuilder<'a> {
    /// Files keyed by path, directories by path plus a trailing `/`, so a
    /// directory sorts right before its first descendant.
    nodes: BTreeMap<String, Node<'a>>,
}

impl<'a> RomFsBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every file and directory of `fs` into a new builder.
    ///
    /// File contents are read lazily from the opened files during
    /// [`RomFsBuilder::build`].
    pub fn from_file_system<F>(fs: &F) -> Result<Self>
    where
        F: FileSystem + ?Sized,
        F::File: 'a,
    {
        let mut builder = Self::new();
        for (path, entry) in enumerate_entries(fs, "/")? {
            match entry.kind {
                EntryKind::Directory => builder.add_directory(&path)?,
                EntryKind::File => builder.add_file(&path, fs.open_file(&path, OpenMode::Read)?)?,
            }
        }
        Ok(builder)
    }

    /// Add a file whose contents are the whole of `data`.
    ///
    /// Fails with [`Error::DuplicateKey`] if the path is already used, if an
    /// ancestor is a file, or if entries were already added below the path.
    pub fn add_file<S: Storage + 'a>(&mut self, path: &str, data: S) -> Result<()> {
        let path = normalize(path)?;
        if path.is_empty() {
            return Err(Error::InvalidInput("file path has no file name"));
        }
        self.check_ancestors(&path)?;
        if self.nodes.contains_key(&path) || self.has_entries_under(&format!("{path}/")) {
            return Err(Error::DuplicateKey);
        }
        self.nodes.insert(path, Node::File(Box::new(data)));
        Ok(())
    }

    /// Add a directory. Directories that only hold files need not be added
    /// explicitly; this is for empty ones.
    pub fn add_directory(&mut self, path: &str) -> Result<()> {
        let path = normalize(path)?;
        if path.is_empty() {
            return Ok(());
        }
        self.check_ancestors(&path)?;
        if self.nodes.contains_key(&path) {
            return Err(Error::DuplicateKey);
        }
        self.nodes
            .entry(format!("{path}/"))
            .or_insert(Node::Directory);
        Ok(())
    }

    /// Fail if any proper ancestor of `path` was added as a file.
    fn check_ancestors(&self, path: &str) -> Result<()> {
        for (at, _) in path.match_indices('/') {
            if self.nodes.contains_key(&path[..at]) {
                return Err(Error::DuplicateKey);
            }
        }
        Ok(())
    }

    fn has_entries_under(&self, prefix: &str) -> bool {
        self.nodes
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .next()
            .is_some_and(|(key, _)| key.starts_with(prefix))
    }

    /// Serialise the collected tree.
    pub fn build(&self) -> Result<MemoryStorage> {
        let file_count = self
            .nodes
            .values()
            .filter(|n| matches!(n, Node::File(_)))
            .count();
        let dir_count = self.nodes.len() - file_count + 1;

        let mut table = HierarchicalRomFileTable::with_capacity(dir_count, file_count)?;
        let mut placed = Vec::with_capacity(file_count);
        let mut data_size = 0u64;

        for (path, node) in &self.nodes {
            match node {
                Node::Directory => {
                    table.add_directory(path.trim_end_matches('/'))?;
                }
                Node::File(data) => {
                    let offset = align_up_u64(data_size, FILE_DATA_ALIGNMENT);
                    let length = data.size();
                    data_size = offset.checked_add(length).ok_or(Error::CapacityOverflow)?;
                    table.add_file(path, to_i64(offset)?, to_i64(length)?)?;
                    placed.push((offset, data));
                }
            }
        }
        table.trim_excess()?;

        let dirs = table.directory_table();
        let files = table.file_table();
        let data_end = DATA_REGION_OFFSET
            .checked_add(data_size)
            .ok_or(Error::CapacityOverflow)?;
        let dir_hash_offset = to_usize(data_end)?;
        let dir_hash_offset = align_up(dir_hash_offset, 4);
        let dir_meta_offset = dir_hash_offset + dirs.bucket_table_size();
        let file_hash_offset = dir_meta_offset + dirs.entry_table_size();
        let file_meta_offset = file_hash_offset + files.bucket_table_size();
        let total = file_meta_offset + files.entry_table_size();

        let header = RomFsHeader {
            header_size: HEADER_SIZE as i64,
            dir_hash_table_offset: dir_hash_offset as i64,
            dir_hash_table_size: dirs.bucket_table_size() as i64,
            dir_meta_table_offset: dir_meta_offset as i64,
            dir_meta_table_size: dirs.entry_table_size() as i64,
            file_hash_table_offset: file_hash_offset as i64,
            file_hash_table_size: files.bucket_table_size() as i64,
            file_meta_table_offset: file_meta_offset as i64,
            file_meta_table_size: files.entry_table_size() as i64,
            data_offset: DATA_REGION_OFFSET as i64,
        };

        let mut out = vec![0u8; total];
        out[..HEADER_SIZE as usize].copy_from_slice(&header.to_bytes());
        for (offset, data) in placed {
            let start = to_usize(DATA_REGION_OFFSET + offset)?;
            let end = start + to_usize(data.size())?;
            data.read(&mut out[start..end], 0)?;
        }
        out[dir_hash_offset..dir_meta_offset].copy_from_slice(&dirs.bucket_bytes());
        out[dir_meta_offset..file_hash_offset].copy_from_slice(dirs.entry_bytes());
        out[file_hash_offset..file_meta_offset].copy_from_slice(&files.bucket_bytes());
        out[file_meta_offset..].copy_from_slice(files.entry_bytes());

        debug!(
            files = file_count,
            directories = dir_count,
            size = total,
            "built romfs image"
        );
        Ok(MemoryStorage::new(out))
    }
}

/// Canonical form of a builder path: components joined by `/`, without
/// leading or trailing slashes.
fn normalize(path: &str) -> Result<String> {
    let parts: Vec<&str> = path
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect();
    if parts.contains(&"..") {
        return Err(Error::InvalidInput("`..` is not allowed when adding entries"));
    }
    Ok(parts.join("/"))
}

fn to_i64(v: u64) -> Result<i64> {
    i64::try_from(v).map_err(|_| Error::CapacityOverflow)
}

fn to_usize(v: u64) -> Result<usize> {
    usize::try_from(v).map_err(|_| Error::CapacityOverflow)
}
