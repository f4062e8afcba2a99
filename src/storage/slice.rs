//! Bounded views into another storage.

use super::{Storage, check_range};
use crate::Result;

/// A window of `size` bytes starting at `offset` within a base storage.
///
/// All offsets passed to a slice are relative to its start and validated
/// against its own size, never against the base. Slicing a slice produces a
/// slice of the same base with the offsets summed, so views never stack.
#[derive(Debug, Clone)]
pub struct Slice<S> {
    base: S,
    offset: u64,
    size: u64,
}

impl<S: Storage> Slice<S> {
    /// Create a view of `size` bytes at `offset` within `base`.
    ///
    /// Returns [`crate::Error::OutOfRange`] if the range does not fit.
    pub fn new(base: S, offset: u64, size: u64) -> Result<Self> {
        check_range(offset, to_len(size), base.size())?;
        Ok(Self { base, offset, size })
    }

    /// Create a sub-view of this slice, addressed against the same base.
    pub fn slice(&self, offset: u64, size: u64) -> Result<Slice<S>>
    where
        S: Clone,
    {
        check_range(offset, to_len(size), self.size)?;
        Ok(Slice {
            base: self.base.clone(),
            offset: self.offset + offset,
            size,
        })
    }

    /// Offset of this view within the base storage.
    pub fn base_offset(&self) -> u64 {
        self.offset
    }

    /// The storage this view reads from.
    pub fn base(&self) -> &S {
        &self.base
    }

    /// Consume the view, returning the base storage.
    pub fn into_base(self) -> S {
        self.base
    }
}

impl<S: Storage> Storage for Slice<S> {
    fn read(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        check_range(offset, buf.len(), self.size)?;
        self.base.read(buf, self.offset + offset)
    }

    fn write(&self, buf: &[u8], offset: u64) -> Result<()> {
        check_range(offset, buf.len(), self.size)?;
        self.base.write(buf, self.offset + offset)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn flush(&self) -> Result<()> {
        self.base.flush()
    }
}

// Sizes above usize::MAX cannot be read in one call anyway; saturating keeps
// the bounds check meaningful on 32-bit targets.
fn to_len(size: u64) -> usize {
    usize::try_from(size).unwrap_or(usize::MAX)
}
