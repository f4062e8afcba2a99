//! **romvfs** - a read-only virtual filesystem over RomFS container images.
//!
//! # Modules
//! | Module | Contents |
//! |--------|----------|
//! | [`storage`]     | Byte-addressable storages: memory, file, slices |
//! | [`fs`]          | Generic filesystem trait and listing types |
//! | [`romfs`]       | RomFS tables, mounted filesystem and image builder |
//! | [`compression`] | LZ4/Zstd image loaders (`compression` feature) |
//!
//! # Example
//! ```
//! use romvfs::fs::OpenMode;
//! use romvfs::romfs::{RomFsBuilder, RomFsFileSystem};
//! use romvfs::storage::{MemoryStorage, StorageExt};
//!
//! let mut builder = RomFsBuilder::new();
//! builder.add_file("dir/f.bin", MemoryStorage::new(vec![0xAB; 16]))?;
//! let image = builder.build()?;
//!
//! let fs = RomFsFileSystem::new(&image)?;
//! let file = fs.open_file("dir/f.bin", OpenMode::Read)?;
//! assert_eq!(file.read_all()?, vec![0xAB; 16]);
//! # Ok::<(), romvfs::Error>(())
//! ```

pub mod compression;
pub mod error;
pub mod fs;
pub mod romfs;
pub mod storage;
mod utils;

pub use error::{Error, Result};
