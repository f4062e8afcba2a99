//! Byte-addressable storage regions.
//!
//! Every parser in romvfs reads through a [`Storage`] rather than touching a
//! file or buffer directly. Storages compose: a [`Slice`] is itself a
//! storage, so a container can hand out bounded views of its sub-regions
//! without copying.
//!
//! ## Contract
//! * `read(dst, offset)` copies exactly `dst.len()` bytes or fails with
//!   [`Error::OutOfRange`]; there are no short reads.
//! * `write(src, offset)` follows the same bounds rule. Read-only storages
//!   keep the default implementation, which returns [`Error::Unsupported`].
//! * All methods take `&self`. Reads never mutate observable state, so a
//!   `Sync` storage can be shared between threads freely.
//!
//! ## Implementations
//!
//! | Type | Backing |
//! |------|---------|
//! | [`MemoryStorage`] | In-memory buffer |
//! | [`FileStorage`]   | Local file |
//! | [`Slice`]         | Window into another storage |
//! | [`ReadOnly`]      | Write-rejecting wrapper |
//!
//! `&S`, [`Arc<S>`] and [`Box<S>`] are storages as well, which is how a
//! slice refers to its base without owning the medium.

use std::sync::Arc;

use zerocopy::{FromBytes, FromZeros, IntoBytes};

use crate::{Error, Result};

mod file;
mod memory;
mod read_only;
mod slice;
mod stream;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use read_only::ReadOnly;
pub use slice::Slice;
pub use stream::StorageStream;

/// A randomly accessible, fixed-size byte region.
pub trait Storage {
    /// Fill `buf` with the bytes starting at `offset`.
    fn read(&self, buf: &mut [u8], offset: u64) -> Result<()>;

    /// Write `buf` at `offset`.
    fn write(&self, buf: &[u8], offset: u64) -> Result<()> {
        let _ = (buf, offset);
        Err(Error::Unsupported)
    }

    /// Size of the region in bytes.
    fn size(&self) -> u64;

    /// Flush buffered writes to the underlying medium.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Convenience methods available on every [`Storage`].
pub trait StorageExt: Storage {
    /// Read `len` bytes at `offset` into a new `Vec`.
    fn read_vec(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read(&mut buf, offset)?;
        Ok(buf)
    }

    /// Read the whole region into a new `Vec`.
    fn read_all(&self) -> Result<Vec<u8>> {
        let len = usize::try_from(self.size()).map_err(|_| Error::CapacityOverflow)?;
        self.read_vec(0, len)
    }

    /// Read a plain-data value stored at `offset`.
    fn read_pod<T: FromBytes + IntoBytes>(&self, offset: u64) -> Result<T> {
        let mut value = <T as FromZeros>::new_zeroed();
        self.read(value.as_mut_bytes(), offset)?;
        Ok(value)
    }

    /// Create a bounded view of `len` bytes starting at `offset`.
    ///
    /// [`Slice`] has an inherent method of the same name that flattens
    /// nested slices onto the root storage.
    fn slice(&self, offset: u64, len: u64) -> Result<Slice<Self>>
    where
        Self: Clone + Sized,
    {
        Slice::new(self.clone(), offset, len)
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

/// Validate that `len` bytes at `offset` lie inside a region of `size`
/// bytes.
#[inline]
pub(crate) fn check_range(offset: u64, len: usize, size: u64) -> Result<()> {
    let len = len as u64;
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::OutOfRange { offset, len, size }),
    }
}

impl<S: Storage + ?Sized> Storage for &S {
    fn read(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        (**self).read(buf, offset)
    }

    fn write(&self, buf: &[u8], offset: u64) -> Result<()> {
        (**self).write(buf, offset)
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn read(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        (**self).read(buf, offset)
    }

    fn write(&self, buf: &[u8], offset: u64) -> Result<()> {
        (**self).write(buf, offset)
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn read(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        (**self).read(buf, offset)
    }

    fn write(&self, buf: &[u8], offset: u64) -> Result<()> {
        (**self).write(buf, offset)
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}
