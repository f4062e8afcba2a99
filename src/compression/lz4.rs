//! LZ4 image loader (requires the `compression` feature).
//!
//! The input is in the **size-prepended block format**: a little-endian
//! `u32` giving the decompressed byte count, followed by the raw LZ4 block.
//! This is the layout read by [`lz4_flex::decompress_size_prepended`].

#![cfg(feature = "compression")]

use crate::storage::{MemoryStorage, Storage, StorageExt};
use crate::{Error, Result};

/// Decompress an LZ4-compressed buffer.
///
/// Returns [`Error::Lz4`] on any decompression failure.
pub fn decompress_lz4(data: &[u8]) -> Result<Vec<u8>> {
    lz4_flex::decompress_size_prepended(data).map_err(|_| Error::Lz4)
}

/// Read an LZ4-compressed image out of `source` and return it decompressed.
pub fn open_lz4_image<S: Storage + ?Sized>(source: &S) -> Result<MemoryStorage> {
    let compressed = source.read_all()?;
    Ok(MemoryStorage::new(decompress_lz4(&compressed)?))
}
