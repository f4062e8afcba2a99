//! Entry identifiers, keys and the fixed-size payloads stored in RomFS
//! metadata tables.

use std::fmt;

use static_assertions::const_assert_eq;
use zerocopy::little_endian::{I32, I64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::hash::romfs_hash;

/// Longest entry name the format allows, in bytes.
pub const MAX_NAME_LENGTH: usize = 0x300;

/// Byte offset of an entry within its metadata table.
///
/// Doubles as the entry's stable handle and as the parent half of a child's
/// [`RomEntryKey`]. Absent links are `None`; on disk they are stored as -1.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u32);

impl EntryId {
    /// The root directory always sits at the start of the directory table.
    pub const ROOT: EntryId = EntryId(0);

    /// Largest offset a link can encode.
    pub const MAX_OFFSET: u32 = i32::MAX as u32;

    /// Wrap a table offset. Returns `None` above [`EntryId::MAX_OFFSET`],
    /// which the signed on-disk links cannot represent.
    pub const fn new(offset: u32) -> Option<Self> {
        if offset > Self::MAX_OFFSET {
            None
        } else {
            Some(Self(offset))
        }
    }

    /// Table offset of the entry.
    pub const fn offset(self) -> u32 {
        self.0
    }

    /// Decode an on-disk link. Negative values mean "no entry".
    pub fn from_raw(raw: i32) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }

    /// Encode an optional link for storage.
    pub fn to_raw(id: Option<Self>) -> i32 {
        id.map_or(-1, |e| e.0 as i32)
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({:#x})", self.0)
    }
}

/// Dictionary key: a name scoped to its parent directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomEntryKey<'a> {
    pub parent: EntryId,
    pub name: &'a [u8],
}

impl<'a> RomEntryKey<'a> {
    pub fn new(parent: EntryId, name: &'a [u8]) -> Self {
        Self { parent, name }
    }

    /// The format's hash of this key.
    pub fn hash(&self) -> u32 {
        romfs_hash(self.parent.offset(), self.name)
    }
}

/// Directory payload: the links that make up the legacy tree view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct DirectoryInfo {
    next_sibling: I32,
    first_child: I32,
    first_file: I32,
}

const_assert_eq!(size_of::<DirectoryInfo>(), 0xC);

impl DirectoryInfo {
    pub fn new(
        next_sibling: Option<EntryId>,
        first_child: Option<EntryId>,
        first_file: Option<EntryId>,
    ) -> Self {
        Self {
            next_sibling: I32::new(EntryId::to_raw(next_sibling)),
            first_child: I32::new(EntryId::to_raw(first_child)),
            first_file: I32::new(EntryId::to_raw(first_file)),
        }
    }

    /// A directory with no siblings and no children.
    pub fn empty() -> Self {
        Self::new(None, None, None)
    }

    pub fn next_sibling(&self) -> Option<EntryId> {
        EntryId::from_raw(self.next_sibling.get())
    }

    pub fn first_child(&self) -> Option<EntryId> {
        EntryId::from_raw(self.first_child.get())
    }

    pub fn first_file(&self) -> Option<EntryId> {
        EntryId::from_raw(self.first_file.get())
    }

    pub fn set_next_sibling(&mut self, id: Option<EntryId>) {
        self.next_sibling = I32::new(EntryId::to_raw(id));
    }

    pub fn set_first_child(&mut self, id: Option<EntryId>) {
        self.first_child = I32::new(EntryId::to_raw(id));
    }

    pub fn set_first_file(&mut self, id: Option<EntryId>) {
        self.first_file = I32::new(EntryId::to_raw(id));
    }
}

/// File payload: sibling link plus the file's byte range in the data
/// region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct FileInfo {
    next_sibling: I32,
    offset: I64,
    length: I64,
}

const_assert_eq!(size_of::<FileInfo>(), 0x14);

impl FileInfo {
    pub fn new(next_sibling: Option<EntryId>, offset: i64, length: i64) -> Self {
        Self {
            next_sibling: I32::new(EntryId::to_raw(next_sibling)),
            offset: I64::new(offset),
            length: I64::new(length),
        }
    }

    pub fn next_sibling(&self) -> Option<EntryId> {
        EntryId::from_raw(self.next_sibling.get())
    }

    pub fn set_next_sibling(&mut self, id: Option<EntryId>) {
        self.next_sibling = I32::new(EntryId::to_raw(id));
    }

    /// Offset of the file's data relative to the data region. Negative only
    /// in corrupt tables.
    pub fn data_offset(&self) -> i64 {
        self.offset.get()
    }

    /// Length of the file's data in bytes. Negative only in corrupt tables.
    pub fn data_length(&self) -> i64 {
        self.length.get()
    }
}
