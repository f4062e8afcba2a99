//! Directory and file tables of a RomFS, and path resolution over them.
//!
//! The tables hold every record twice over, in effect: the hash dictionaries
//! answer "which entry is called `name` under `parent`", while the sibling,
//! first-child and first-file links stored in each record give the
//! directory tree in enumeration order. Both views read the same records.

use super::dictionary::{RomEntry, RomFsDictionary};
use super::entry::{DirectoryInfo, EntryId, FileInfo, RomEntryKey};
use crate::storage::Storage;
use crate::{Error, Result};

/// Enumeration cursor over one directory's immediate children.
///
/// Obtained from [`HierarchicalRomFileTable::open_directory_listing`];
/// advance it with [`HierarchicalRomFileTable::next_directory`] and
/// [`HierarchicalRomFileTable::next_file`]. A fresh cursor restarts the
/// enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindPosition {
    next_directory: Option<EntryId>,
    next_file: Option<EntryId>,
    visited: usize,
}

impl FindPosition {
    /// Next child directory to be returned.
    pub fn next_directory(&self) -> Option<EntryId> {
        self.next_directory
    }

    /// Next file to be returned.
    pub fn next_file(&self) -> Option<EntryId> {
        self.next_file
    }
}

/// The two metadata tables of a RomFS plus path lookup.
#[derive(Debug, Clone)]
pub struct HierarchicalRomFileTable {
    dirs: RomFsDictionary<DirectoryInfo>,
    files: RomFsDictionary<FileInfo>,
}

impl HierarchicalRomFileTable {
    /// Load the tables from their four serialised regions.
    pub fn load<A, B, C, D>(
        dir_hash_table: &A,
        dir_entry_table: &B,
        file_hash_table: &C,
        file_entry_table: &D,
    ) -> Result<Self>
    where
        A: Storage + ?Sized,
        B: Storage + ?Sized,
        C: Storage + ?Sized,
        D: Storage + ?Sized,
    {
        Ok(Self {
            dirs: RomFsDictionary::load(dir_hash_table, dir_entry_table)?,
            files: RomFsDictionary::load(file_hash_table, file_entry_table)?,
        })
    }

    /// Create empty tables containing only the root directory.
    pub fn with_capacity(dir_count: usize, file_count: usize) -> Result<Self> {
        let mut dirs = RomFsDictionary::with_capacity(dir_count);
        dirs.insert(&RomEntryKey::new(EntryId::ROOT, b""), DirectoryInfo::empty())?;
        Ok(Self {
            dirs,
            files: RomFsDictionary::with_capacity(file_count),
        })
    }

    /// The directory dictionary.
    pub fn directory_table(&self) -> &RomFsDictionary<DirectoryInfo> {
        &self.dirs
    }

    /// The file dictionary.
    pub fn file_table(&self) -> &RomFsDictionary<FileInfo> {
        &self.files
    }

    /// Root directory, after checking that it is its own parent.
    pub fn root_entry(&self) -> Result<(EntryId, DirectoryInfo)> {
        let root = self
            .dirs
            .get(EntryId::ROOT)?
            .ok_or_else(|| Error::malformed(0, "directory table has no root"))?;
        if root.parent != EntryId::ROOT {
            return Err(Error::malformed(0, "root directory is not its own parent"));
        }
        Ok((root.id, root.value))
    }

    /// Decode the directory record at `id`.
    pub fn directory(&self, id: EntryId) -> Result<Option<RomEntry<'_, DirectoryInfo>>> {
        self.dirs.get(id)
    }

    /// Decode the file record at `id`.
    pub fn file(&self, id: EntryId) -> Result<Option<RomEntry<'_, FileInfo>>> {
        self.files.get(id)
    }

    /// Resolve a slash-separated directory path.
    ///
    /// Empty components and `.` are ignored, `..` moves to the parent, and
    /// the empty path names the root.
    pub fn resolve_directory(&self, path: &str) -> Result<(EntryId, DirectoryInfo)> {
        self.walk(components(path), path)
    }

    /// Resolve a slash-separated file path.
    pub fn resolve_file(&self, path: &str) -> Result<(EntryId, FileInfo)> {
        let mut parts: Vec<&str> = components(path).collect();
        let name = match parts.pop() {
            Some(name) if name != ".." => name,
            _ => return Err(Error::PathNotFound(path.to_owned())),
        };
        let (parent, _) = self.walk(parts.into_iter(), path)?;

        match self.files.find(&RomEntryKey::new(parent, name.as_bytes())) {
            Ok(Some(found)) => Ok(found),
            Ok(None) | Err(Error::NameTooLong(_)) => Err(Error::PathNotFound(path.to_owned())),
            Err(e) => Err(e),
        }
    }

    /// Start enumerating the immediate children of directory `id`.
    pub fn open_directory_listing(&self, id: EntryId) -> Result<FindPosition> {
        let info = self.dir_info(id)?;
        Ok(FindPosition {
            next_directory: info.first_child(),
            next_file: info.first_file(),
            visited: 0,
        })
    }

    /// Advance `pos` to the next child directory.
    pub fn next_directory(
        &self,
        pos: &mut FindPosition,
    ) -> Result<Option<RomEntry<'_, DirectoryInfo>>> {
        let Some(id) = pos.next_directory else {
            return Ok(None);
        };
        self.visit(pos, id)?;
        let entry = self
            .dirs
            .get(id)?
            .ok_or_else(|| Error::malformed(id.offset() as u64, "directory link outside table"))?;
        pos.next_directory = entry.value.next_sibling();
        Ok(Some(entry))
    }

    /// Advance `pos` to the next file.
    pub fn next_file(&self, pos: &mut FindPosition) -> Result<Option<RomEntry<'_, FileInfo>>> {
        let Some(id) = pos.next_file else {
            return Ok(None);
        };
        self.visit(pos, id)?;
        let entry = self
            .files
            .get(id)?
            .ok_or_else(|| Error::malformed(id.offset() as u64, "file link outside table"))?;
        pos.next_file = entry.value.next_sibling();
        Ok(Some(entry))
    }

    /// Add a directory, creating missing ancestors. Existing directories
    /// are returned unchanged.
    pub fn add_directory(&mut self, path: &str) -> Result<EntryId> {
        let mut cur = EntryId::ROOT;
        for name in components(path) {
            cur = self.ensure_directory(cur, name)?;
        }
        Ok(cur)
    }

    /// Add a file whose data lives at `data_offset` (relative to the data
    /// region) and spans `data_length` bytes. Parent directories are
    /// created as needed.
    ///
    /// Fails with [`Error::DuplicateKey`] if a file or directory already
    /// uses the path.
    pub fn add_file(&mut self, path: &str, data_offset: i64, data_length: i64) -> Result<EntryId> {
        let mut parts: Vec<&str> = components(path).collect();
        let name = match parts.pop() {
            Some(name) if name != ".." => name,
            _ => return Err(Error::InvalidInput("file path has no file name")),
        };
        let mut parent = EntryId::ROOT;
        for dir in parts {
            parent = self.ensure_directory(parent, dir)?;
        }

        let key = RomEntryKey::new(parent, name.as_bytes());
        if self.dirs.contains_key(&key)? {
            return Err(Error::DuplicateKey);
        }
        let id = self
            .files
            .insert(&key, FileInfo::new(None, data_offset, data_length))?;

        let mut parent_info = self.dir_info(parent)?;
        match parent_info.first_file() {
            None => {
                parent_info.set_first_file(Some(id));
                self.dirs.set_value(parent, parent_info)?;
            }
            Some(first) => {
                let last = self.last_file_sibling(first)?;
                let mut info = self.file_info(last)?;
                info.set_next_sibling(Some(id));
                self.files.set_value(last, info)?;
            }
        }
        Ok(id)
    }

    /// Shrink both hash tables to the format's preferred bucket counts.
    pub fn trim_excess(&mut self) -> Result<()> {
        self.dirs.trim_excess()?;
        self.files.trim_excess()
    }

    fn walk<'p>(
        &self,
        parts: impl Iterator<Item = &'p str>,
        path: &str,
    ) -> Result<(EntryId, DirectoryInfo)> {
        let (mut cur, mut info) = self.root_entry()?;
        for name in parts {
            if name == ".." {
                let entry = self
                    .dirs
                    .get(cur)?
                    .ok_or_else(|| Error::malformed(cur.offset() as u64, "dangling parent link"))?;
                cur = entry.parent;
                info = self.dir_info(cur)?;
                continue;
            }
            match self.dirs.find(&RomEntryKey::new(cur, name.as_bytes())) {
                Ok(Some((id, value))) => {
                    cur = id;
                    info = value;
                }
                Ok(None) | Err(Error::NameTooLong(_)) => {
                    return Err(Error::PathNotFound(path.to_owned()));
                }
                Err(e) => return Err(e),
            }
        }
        Ok((cur, info))
    }

    fn ensure_directory(&mut self, parent: EntryId, name: &str) -> Result<EntryId> {
        if name == ".." {
            return Err(Error::InvalidInput("`..` is not allowed when adding entries"));
        }
        let key = RomEntryKey::new(parent, name.as_bytes());
        if let Some((id, _)) = self.dirs.find(&key)? {
            return Ok(id);
        }
        if self.files.contains_key(&key)? {
            return Err(Error::DuplicateKey);
        }

        let id = self.dirs.insert(&key, DirectoryInfo::empty())?;
        let mut parent_info = self.dir_info(parent)?;
        match parent_info.first_child() {
            None => {
                parent_info.set_first_child(Some(id));
                self.dirs.set_value(parent, parent_info)?;
            }
            Some(first) => {
                let last = self.last_directory_sibling(first)?;
                let mut info = self.dir_info(last)?;
                info.set_next_sibling(Some(id));
                self.dirs.set_value(last, info)?;
            }
        }
        Ok(id)
    }

    fn last_directory_sibling(&self, first: EntryId) -> Result<EntryId> {
        let mut cur = first;
        for _ in 0..=self.dirs.max_records() {
            match self.dir_info(cur)?.next_sibling() {
                Some(next) => cur = next,
                None => return Ok(cur),
            }
        }
        Err(Error::malformed(first.offset() as u64, "sibling chain cycle"))
    }

    fn last_file_sibling(&self, first: EntryId) -> Result<EntryId> {
        let mut cur = first;
        for _ in 0..=self.files.max_records() {
            match self.file_info(cur)?.next_sibling() {
                Some(next) => cur = next,
                None => return Ok(cur),
            }
        }
        Err(Error::malformed(first.offset() as u64, "sibling chain cycle"))
    }

    fn dir_info(&self, id: EntryId) -> Result<DirectoryInfo> {
        self.dirs
            .get(id)?
            .map(|e| e.value)
            .ok_or_else(|| Error::malformed(id.offset() as u64, "directory link outside table"))
    }

    fn file_info(&self, id: EntryId) -> Result<FileInfo> {
        self.files
            .get(id)?
            .map(|e| e.value)
            .ok_or_else(|| Error::malformed(id.offset() as u64, "file link outside table"))
    }

    fn visit(&self, pos: &mut FindPosition, id: EntryId) -> Result<()> {
        pos.visited += 1;
        if pos.visited > self.dirs.max_records() + self.files.max_records() {
            return Err(Error::malformed(id.offset() as u64, "sibling chain cycle"));
        }
        Ok(())
    }
}

/// Split a path into its meaningful components.
fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty() && *c != ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn sample() -> HierarchicalRomFileTable {
        let mut table = HierarchicalRomFileTable::with_capacity(4, 4).unwrap();
        table.add_file("a/b/one.bin", 0, 1).unwrap();
        table.add_file("a/b/two.bin", 0x10, 2).unwrap();
        table.add_file("a/three.bin", 0x20, 3).unwrap();
        table.add_directory("empty").unwrap();
        table
    }

    fn names<T>(entries: Vec<RomEntry<'_, T>>) -> Vec<String> {
        entries
            .iter()
            .map(|e| String::from_utf8_lossy(e.name).into_owned())
            .collect()
    }

    fn list(table: &HierarchicalRomFileTable, path: &str) -> (Vec<String>, Vec<String>) {
        let (id, _) = table.resolve_directory(path).unwrap();
        let mut pos = table.open_directory_listing(id).unwrap();
        let mut dirs = Vec::new();
        while let Some(d) = table.next_directory(&mut pos).unwrap() {
            dirs.push(d);
        }
        let mut files = Vec::new();
        while let Some(f) = table.next_file(&mut pos).unwrap() {
            files.push(f);
        }
        (names(dirs), names(files))
    }

    #[test]
    fn root_is_self_parented() {
        let table = sample();
        let (root, _) = table.root_entry().unwrap();
        assert_eq!(root, EntryId::ROOT);
        assert_eq!(table.directory(root).unwrap().unwrap().parent, root);
        assert_eq!(table.resolve_directory("").unwrap().0, root);
        assert_eq!(table.resolve_directory("/").unwrap().0, root);
    }

    #[test]
    fn path_spellings_resolve_alike() {
        let table = sample();
        let expected = table.resolve_directory("a/b").unwrap();
        for path in ["/a/b/", "a//b", "./a/b", "a/b/../b", "/a/./b//"] {
            assert_eq!(table.resolve_directory(path).unwrap(), expected, "{path}");
        }
        assert_eq!(table.resolve_directory("..").unwrap().0, EntryId::ROOT);
    }

    #[test]
    fn files_resolve_through_directories() {
        let table = sample();
        let (_, info) = table.resolve_file("/a/b/two.bin").unwrap();
        assert_eq!(info.data_offset(), 0x10);
        assert_eq!(info.data_length(), 2);

        for missing in ["a/b/none.bin", "a/b", "", "x/one.bin", "a/b/one.bin/.."] {
            assert!(
                matches!(table.resolve_file(missing), Err(Error::PathNotFound(_))),
                "{missing}"
            );
        }
        // A file is not a directory.
        assert!(table.resolve_directory("a/three.bin").is_err());
    }

    #[test]
    fn overlong_components_are_not_found() {
        let table = sample();
        let long = "x".repeat(0x400);
        assert!(matches!(
            table.resolve_directory(&long),
            Err(Error::PathNotFound(_))
        ));
        assert!(matches!(
            table.resolve_file(&format!("a/{long}")),
            Err(Error::PathNotFound(_))
        ));
    }

    #[test]
    fn listing_follows_sibling_links() {
        let table = sample();
        assert_eq!(list(&table, ""), (vec!["a".into(), "empty".into()], vec![]));
        assert_eq!(list(&table, "a"), (vec!["b".into()], vec!["three.bin".into()]));
        assert_eq!(
            list(&table, "a/b"),
            (vec![], vec!["one.bin".into(), "two.bin".into()])
        );
        assert_eq!(list(&table, "empty"), (vec![], vec![]));
    }

    #[test]
    fn listing_agrees_with_hash_lookup() {
        let table = sample();
        let (id, _) = table.resolve_directory("a/b").unwrap();
        let mut pos = table.open_directory_listing(id).unwrap();
        while let Some(file) = table.next_file(&mut pos).unwrap() {
            assert_eq!(file.parent, id);
            let key = RomEntryKey::new(id, file.name);
            assert_eq!(
                table.file_table().find(&key).unwrap(),
                Some((file.id, file.value))
            );
        }
    }

    #[test]
    fn names_are_unique_across_kinds() {
        let mut table = sample();
        assert!(matches!(
            table.add_file("a/b", 0, 0),
            Err(Error::DuplicateKey)
        ));
        assert!(matches!(
            table.add_directory("a/three.bin"),
            Err(Error::DuplicateKey)
        ));
        assert!(matches!(
            table.add_file("a/three.bin", 0, 0),
            Err(Error::DuplicateKey)
        ));
        assert!(table.add_file("/", 0, 0).is_err());
        // Re-adding a directory is a no-op.
        let b = table.resolve_directory("a/b").unwrap().0;
        assert_eq!(table.add_directory("a/b").unwrap(), b);
    }

    #[test]
    fn trimmed_tables_survive_a_reload() {
        let mut table = sample();
        table.trim_excess().unwrap();
        assert_eq!(table.directory_table().bucket_count(), 5);
        assert_eq!(table.file_table().bucket_count(), 3);

        let dirs = table.directory_table();
        let files = table.file_table();
        let loaded = HierarchicalRomFileTable::load(
            &MemoryStorage::new(dirs.bucket_bytes()),
            &MemoryStorage::new(dirs.entry_bytes().to_vec()),
            &MemoryStorage::new(files.bucket_bytes()),
            &MemoryStorage::new(files.entry_bytes().to_vec()),
        )
        .unwrap();

        assert_eq!(
            loaded.resolve_file("a/b/one.bin").unwrap(),
            table.resolve_file("a/b/one.bin").unwrap()
        );
        assert_eq!(list(&loaded, "a"), list(&table, "a"));
    }

    #[test]
    fn sibling_cycles_are_detected() {
        let mut table = sample();
        // Make "a/b/two.bin" point back at "a/b/one.bin".
        let (one, _) = table.resolve_file("a/b/one.bin").unwrap();
        let (two, mut info) = table.resolve_file("a/b/two.bin").unwrap();
        info.set_next_sibling(Some(one));
        table.files.set_value(two, info).unwrap();

        let (id, _) = table.resolve_directory("a/b").unwrap();
        let mut pos = table.open_directory_listing(id).unwrap();
        let result = (0..64).try_for_each(|_| table.next_file(&mut pos).map(|_| ()));
        assert!(matches!(result, Err(Error::MalformedContainer { .. })));
    }
}
