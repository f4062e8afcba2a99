//! Read-only filesystem view over a RomFS container.

use tracing::{debug, warn};

use super::directory::RomFsDirectory;
use super::entry::EntryId;
use super::header::{HEADER_SIZE, Region, RomFsHeader};
use super::table::HierarchicalRomFileTable;
use crate::fs::{EntryKind, FileSystem, FileTimeStampRaw, OpenDirectoryMode, OpenMode, QueryId};
use crate::storage::{ReadOnly, Slice, Storage, StorageStream};
use crate::{Error, Result};

/// A mounted RomFS container.
///
/// The metadata tables are loaded once at construction; file contents are
/// read on demand through the views returned by
/// [`RomFsFileSystem::open_file`]. `S` is usually a shared handle such as
/// `&MemoryStorage` or `Arc<FileStorage>` so that opened files can refer to
/// the container without copying it.
#[derive(Debug)]
pub struct RomFsFileSystem<S> {
    base: ReadOnly<S>,
    header: RomFsHeader,
    data_offset: u64,
    table: HierarchicalRomFileTable,
}

impl<S: Storage + Clone> RomFsFileSystem<S> {
    /// Mount the container held by `storage`.
    ///
    /// Fails with [`Error::MalformedContainer`] if the header is truncated
    /// or describes tables that do not fit the container.
    pub fn new(storage: S) -> Result<Self> {
        let size = storage.size();
        if size < HEADER_SIZE {
            return Err(Error::malformed(0, "container smaller than header"));
        }

        let header = RomFsHeader::parse(&mut StorageStream::new(&storage))?;
        header.validate(size)?;

        let table = HierarchicalRomFileTable::load(
            &table_view(&storage, header.dir_hash_table()?)?,
            &table_view(&storage, header.dir_meta_table()?)?,
            &table_view(&storage, header.file_hash_table()?)?,
            &table_view(&storage, header.file_meta_table()?)?,
        )?;
        table.root_entry()?;

        debug!(
            size,
            directory_buckets = table.directory_table().bucket_count(),
            file_buckets = table.file_table().bucket_count(),
            data_offset = header.data_offset,
            "mounted romfs"
        );

        Ok(Self {
            base: ReadOnly::new(storage),
            data_offset: header.data_offset as u64,
            header,
            table,
        })
    }

    pub fn header(&self) -> &RomFsHeader {
        &self.header
    }

    /// The container storage, wrapped so that it rejects writes.
    pub fn base_storage(&self) -> &ReadOnly<S> {
        &self.base
    }

    pub fn file_table(&self) -> &HierarchicalRomFileTable {
        &self.table
    }

    /// Open the file at `path` for reading.
    ///
    /// The returned view covers exactly the file's bytes. Any `mode` with
    /// write access is rejected with [`Error::InvalidInput`] once the path
    /// is known to exist.
    pub fn open_file(&self, path: &str, mode: OpenMode) -> Result<Slice<ReadOnly<S>>> {
        let (id, info) = self.table.resolve_file(path)?;
        if mode.can_write() {
            return Err(Error::InvalidInput("romfs files cannot be opened for writing"));
        }

        let (offset, length) = match (
            u64::try_from(info.data_offset()),
            u64::try_from(info.data_length()),
        ) {
            (Ok(offset), Ok(length)) => (offset, length),
            _ => return Err(file_error(id, "negative file offset or length")),
        };
        let start = self
            .data_offset
            .checked_add(offset)
            .ok_or_else(|| file_error(id, "file data offset overflows"))?;

        Slice::new(self.base.clone(), start, length).map_err(|e| match e {
            Error::OutOfRange { .. } => file_error(id, "file data outside container"),
            e => e,
        })
    }

    /// Open the directory at `path` for listing.
    pub fn open_directory(&self, path: &str, mode: OpenDirectoryMode) -> Result<RomFsDirectory<'_>> {
        let (id, _) = self.table.resolve_directory(path)?;
        let start = self.table.open_directory_listing(id)?;
        Ok(RomFsDirectory::new(&self.table, path, start, mode))
    }

    /// Whether `path` names a file. Structural errors are logged and
    /// reported as absence.
    pub fn file_exists(&self, path: &str) -> bool {
        exists_or_log(path, self.table.resolve_file(path))
    }

    /// Whether `path` names a directory. Structural errors are logged and
    /// reported as absence.
    pub fn directory_exists(&self, path: &str) -> bool {
        exists_or_log(path, self.table.resolve_directory(path))
    }

    pub fn get_entry_type(&self, path: &str) -> Result<EntryKind> {
        match self.table.resolve_directory(path) {
            Ok(_) => return Ok(EntryKind::Directory),
            Err(Error::PathNotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.table.resolve_file(path).map(|_| EntryKind::File)
    }
}

impl<S: Storage + Clone> FileSystem for RomFsFileSystem<S> {
    type File = Slice<ReadOnly<S>>;
    type Directory<'a>
        = RomFsDirectory<'a>
    where
        Self: 'a;

    fn open_file(&self, path: &str, mode: OpenMode) -> Result<Self::File> {
        RomFsFileSystem::open_file(self, path, mode)
    }

    fn open_directory(&self, path: &str, mode: OpenDirectoryMode) -> Result<Self::Directory<'_>> {
        RomFsFileSystem::open_directory(self, path, mode)
    }

    fn get_entry_type(&self, path: &str) -> Result<EntryKind> {
        RomFsFileSystem::get_entry_type(self, path)
    }

    fn file_exists(&self, path: &str) -> bool {
        RomFsFileSystem::file_exists(self, path)
    }

    fn directory_exists(&self, path: &str) -> bool {
        RomFsFileSystem::directory_exists(self, path)
    }

    fn create_directory(&mut self, _path: &str) -> Result<()> {
        Err(Error::UnsupportedOperation("create_directory"))
    }

    fn create_file(&mut self, _path: &str, _size: u64) -> Result<()> {
        Err(Error::UnsupportedOperation("create_file"))
    }

    fn delete_directory(&mut self, _path: &str) -> Result<()> {
        Err(Error::UnsupportedOperation("delete_directory"))
    }

    fn delete_directory_recursively(&mut self, _path: &str) -> Result<()> {
        Err(Error::UnsupportedOperation("delete_directory_recursively"))
    }

    fn clean_directory_recursively(&mut self, _path: &str) -> Result<()> {
        Err(Error::UnsupportedOperation("clean_directory_recursively"))
    }

    fn delete_file(&mut self, _path: &str) -> Result<()> {
        Err(Error::UnsupportedOperation("delete_file"))
    }

    fn rename_directory(&mut self, _from: &str, _to: &str) -> Result<()> {
        Err(Error::UnsupportedOperation("rename_directory"))
    }

    fn rename_file(&mut self, _from: &str, _to: &str) -> Result<()> {
        Err(Error::UnsupportedOperation("rename_file"))
    }

    fn free_space_size(&self, _path: &str) -> Result<u64> {
        Err(Error::UnsupportedOperation("free_space_size"))
    }

    fn total_space_size(&self, _path: &str) -> Result<u64> {
        Err(Error::UnsupportedOperation("total_space_size"))
    }

    fn get_file_time_stamp_raw(&self, _path: &str) -> Result<FileTimeStampRaw> {
        Err(Error::UnsupportedOperation("get_file_time_stamp_raw"))
    }

    fn query_entry(
        &self,
        _out: &mut [u8],
        _input: &[u8],
        _query: QueryId,
        _path: &str,
    ) -> Result<()> {
        Err(Error::UnsupportedOperation("query_entry"))
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}

fn table_view<S: Storage + ?Sized>(storage: &S, region: Region) -> Result<Slice<&S>> {
    Slice::new(storage, region.offset, region.size)
}

fn file_error(id: EntryId, reason: &'static str) -> Error {
    Error::malformed(id.offset() as u64, reason)
}

fn exists_or_log<T>(path: &str, result: Result<T>) -> bool {
    match result {
        Ok(_) => true,
        Err(Error::PathNotFound(_)) => false,
        Err(e) => {
            warn!(path, error = %e, "romfs lookup failed");
            false
        }
    }
}
