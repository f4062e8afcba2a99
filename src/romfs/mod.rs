//! RomFS - the read-only filesystem used for game assets.
//!
//! ## Container layout
//! ```text
//! [0x00] Header (0x50)           - offsets and sizes of everything below
//!        Directory hash table    - i32 bucket heads
//!        Directory entry table   - packed directory records
//!        File hash table         - i32 bucket heads
//!        File entry table        - packed file records
//!        Data region             - file contents
//! ```
//! The header fixes where each table lives; tables may appear in any order.
//!
//! ## Layers
//!
//! | Type | Role |
//! |------|------|
//! | [`RomFsHeader`]               | Header parsing and validation |
//! | [`RomFsDictionary`]           | Hash index over one entry table |
//! | [`HierarchicalRomFileTable`]  | Path resolution and listings |
//! | [`RomFsFileSystem`]           | Mounted container |
//! | [`RomFsBuilder`]              | Image writer |
//!
//! ```no_run
//! use std::sync::Arc;
//! use romvfs::fs::OpenMode;
//! use romvfs::romfs::RomFsFileSystem;
//! use romvfs::storage::{FileStorage, StorageExt};
//!
//! let storage = Arc::new(FileStorage::open("game.romfs")?);
//! let fs = RomFsFileSystem::new(storage)?;
//! let data = fs.open_file("/data/config.bin", OpenMode::Read)?.read_all()?;
//! # Ok::<(), romvfs::Error>(())
//! ```

pub mod builder;
pub mod dictionary;
pub mod directory;
pub mod entry;
pub mod filesystem;
pub mod hash;
pub mod header;
pub mod table;

pub use builder::{DATA_REGION_OFFSET, FILE_DATA_ALIGNMENT, RomFsBuilder};
pub use dictionary::{RomEntry, RomFsDictionary};
pub use directory::RomFsDirectory;
pub use entry::{DirectoryInfo, EntryId, FileInfo, MAX_NAME_LENGTH, RomEntryKey};
pub use filesystem::RomFsFileSystem;
pub use hash::{romfs_bucket_count, romfs_hash};
pub use header::{HEADER_SIZE, Region, RomFsHeader};
pub use table::{FindPosition, HierarchicalRomFileTable};
