//! Storage over a local file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;

use super::{Storage, check_range};
use crate::{Error, Result};

/// A storage backed by a [`File`].
///
/// The size is captured when the storage is opened; writes never extend the
/// file. Accesses are serialised through a mutex because positioned I/O on
/// a shared handle needs a seek followed by a read or write.
#[derive(Debug)]
pub struct FileStorage {
    file: Mutex<File>,
    size: u64,
    writable: bool,
}

impl FileStorage {
    /// Open `path` for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_file(file, false)
    }

    /// Open `path` for reading and writing.
    pub fn open_rw<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Self::from_file(file, true)
    }

    /// Wrap an already opened file.
    ///
    /// `writable` must only be set when `file` was opened with write access.
    pub fn from_file(file: File, writable: bool) -> Result<Self> {
        let size = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            size,
            writable,
        })
    }
}

impl Storage for FileStorage {
    fn read(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        check_range(offset, buf.len(), self.size)?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write(&self, buf: &[u8], offset: u64) -> Result<()> {
        if !self.writable {
            return Err(Error::Unsupported);
        }
        check_range(offset, buf.len(), self.size)?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn flush(&self) -> Result<()> {
        if self.writable {
            self.file.lock().flush()?;
        }
        Ok(())
    }
}
