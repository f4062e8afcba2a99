//! Directory listings.

use super::table::{FindPosition, HierarchicalRomFileTable};
use crate::Result;
use crate::fs::{DirectoryEntry, EntryKind, OpenDirectoryMode};

/// An open directory of a RomFS.
///
/// Yields child directories first, then files, each in on-disk sibling
/// order. The iterator stops after the first error.
#[derive(Debug, Clone)]
pub struct RomFsDirectory<'a> {
    table: &'a HierarchicalRomFileTable,
    path: String,
    start: FindPosition,
    position: FindPosition,
    mode: OpenDirectoryMode,
    failed: bool,
}

impl<'a> RomFsDirectory<'a> {
    pub(crate) fn new(
        table: &'a HierarchicalRomFileTable,
        path: &str,
        start: FindPosition,
        mode: OpenDirectoryMode,
    ) -> Self {
        Self {
            table,
            path: path.to_owned(),
            start,
            position: start,
            mode,
            failed: false,
        }
    }

    /// The path this directory was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mode(&self) -> OpenDirectoryMode {
        self.mode
    }

    /// Number of entries the listing yields in total, independent of how far
    /// it has been read.
    pub fn entry_count(&self) -> Result<u64> {
        let mut pos = self.start;
        let mut count = 0;
        if self.mode.directories {
            while self.table.next_directory(&mut pos)?.is_some() {
                count += 1;
            }
        }
        if self.mode.files {
            while self.table.next_file(&mut pos)?.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Fill `buf` with the next entries and return how many were written.
    /// Zero means the listing is exhausted.
    pub fn read(&mut self, buf: &mut [DirectoryEntry]) -> Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.next() {
                Some(entry) => {
                    buf[n] = entry?;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn advance(&mut self) -> Result<Option<DirectoryEntry>> {
        if self.mode.directories
            && let Some(dir) = self.table.next_directory(&mut self.position)?
        {
            return Ok(Some(DirectoryEntry {
                name: String::from_utf8_lossy(dir.name).into_owned(),
                kind: EntryKind::Directory,
                size: 0,
            }));
        }
        if self.mode.files
            && let Some(file) = self.table.next_file(&mut self.position)?
        {
            return Ok(Some(DirectoryEntry {
                name: String::from_utf8_lossy(file.name).into_owned(),
                kind: EntryKind::File,
                size: u64::try_from(file.value.data_length()).unwrap_or(0),
            }));
        }
        Ok(None)
    }
}

impl Iterator for RomFsDirectory<'_> {
    type Item = Result<DirectoryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.advance() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
