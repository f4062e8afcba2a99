//! `std::io` adapter over a storage.

use std::io::{self, Read, Seek, SeekFrom, Write};

use super::Storage;

/// A cursor that reads and writes a [`Storage`] through [`Read`], [`Write`]
/// and [`Seek`].
///
/// Lets parsers written against `Read + Seek` consume any storage, such as
/// a file opened from a RomFS. Reads are short at the end of the region
/// rather than failing, matching the `Read` contract.
#[derive(Debug, Clone)]
pub struct StorageStream<S> {
    storage: S,
    pos: u64,
}

impl<S: Storage> StorageStream<S> {
    /// Wrap `storage`, positioned at its start.
    pub fn new(storage: S) -> Self {
        Self { storage, pos: 0 }
    }

    /// Current position.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Consume the stream, returning the storage.
    pub fn into_inner(self) -> S {
        self.storage
    }

    fn remaining(&self) -> u64 {
        self.storage.size().saturating_sub(self.pos)
    }
}

impl<S: Storage> Read for StorageStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = usize::try_from(self.remaining()).map_or(buf.len(), |r| r.min(buf.len()));
        if n == 0 {
            return Ok(0);
        }
        self.storage
            .read(&mut buf[..n], self.pos)
            .map_err(io::Error::other)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<S: Storage> Write for StorageStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = usize::try_from(self.remaining()).map_or(buf.len(), |r| r.min(buf.len()));
        if n == 0 && !buf.is_empty() {
            return Err(io::ErrorKind::WriteZero.into());
        }
        self.storage
            .write(&buf[..n], self.pos)
            .map_err(io::Error::other)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.storage.flush().map_err(io::Error::other)
    }
}

impl<S: Storage> Seek for StorageStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(p) => {
                self.pos = p;
                return Ok(p);
            }
            SeekFrom::End(d) => (self.storage.size(), d),
            SeekFrom::Current(d) => (self.pos, d),
        };
        match base.checked_add_signed(delta) {
            Some(p) => {
                self.pos = p;
                Ok(p)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )),
        }
    }
}
