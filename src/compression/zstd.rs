//! Zstandard image loader (requires the `compression` feature).
//!
//! A compressed image is a single Zstd frame holding the whole container.
//! Use [`open_zstd_image`] to get a mountable storage, or
//! [`decompress_zstd_with_size`] when the decompressed size is recorded
//! elsewhere and the output can be preallocated.

#![cfg(feature = "compression")]

use std::io;

use crate::storage::{MemoryStorage, Storage, StorageStream};
use crate::{Error, Result};

/// Decompress a complete Zstandard-compressed buffer.
///
/// Returns [`Error::Zstd`] on any decompression failure.
pub fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(data).map_err(|_| Error::Zstd)
}

/// Decompress a Zstandard-compressed buffer whose decompressed size is
/// known ahead of time.
///
/// Returns [`Error::Zstd`] if the decoder cannot be initialised, or
/// [`Error::Io`] if streaming the output fails.
pub fn decompress_zstd_with_size(data: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(decompressed_size);
    let mut decoder = zstd::Decoder::new(data).map_err(|_| Error::Zstd)?;
    io::copy(&mut decoder, &mut out)?;
    Ok(out)
}

/// Read a Zstd-compressed image out of `source` and return it decompressed.
///
/// The source is streamed through the decoder rather than read up front.
pub fn open_zstd_image<S: Storage>(source: S) -> Result<MemoryStorage> {
    let hint = usize::try_from(source.size()).unwrap_or(0);
    let mut out = Vec::with_capacity(hint);
    let mut decoder = zstd::Decoder::new(StorageStream::new(source)).map_err(|_| Error::Zstd)?;
    io::copy(&mut decoder, &mut out).map_err(|_| Error::Zstd)?;
    Ok(MemoryStorage::new(out))
}
