//! Hash dictionary stored in flat byte buffers.
//!
//! This is the on-disk lookup structure of a RomFS metadata table: an array
//! of bucket heads plus a packed blob of variable-length records that chain
//! to each other through byte offsets.
//!
//! ## Record layout (4-byte aligned)
//! ```text
//! [0x00]      Parent      - offset of the parent directory (i32 LE)
//! [0x04]      Value       - fixed-size payload T
//! [0x04+|T|]  Next        - next record in the same bucket, -1 = end (i32 LE)
//! [0x08+|T|]  NameLength  (u32 LE)
//! [0x0C+|T|]  Name        (NameLength bytes, zero padded to 4)
//! ```
//!
//! Every offset read from the blob is checked before it is followed, and
//! chain walks are bounded by the number of records the blob could hold, so
//! corrupt tables produce [`Error::MalformedContainer`] instead of panics or
//! endless loops.

use std::marker::PhantomData;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::entry::{EntryId, MAX_NAME_LENGTH, RomEntryKey};
use super::hash::romfs_bucket_count;
use crate::storage::{Storage, StorageExt};
use crate::utils::{align_up, read_le_i32};
use crate::{Error, Result};

/// Smallest entry buffer allocated once growth kicks in.
const MIN_GROWTH: usize = 256;

/// Bytes reserved per expected entry for its name when sizing a new table.
const ESTIMATED_NAME_SIZE: usize = 0x10;

/// A record decoded from the entry blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomEntry<'a, T> {
    /// Offset of this record.
    pub id: EntryId,
    /// Offset of the parent directory.
    pub parent: EntryId,
    pub value: T,
    pub name: &'a [u8],
}

/// Open hash dictionary keyed by `(parent, name)` with values of type `T`.
///
/// `T` must be plain data whose size is a multiple of four bytes; both
/// [`super::DirectoryInfo`] and [`super::FileInfo`] qualify.
#[derive(Debug, Clone)]
pub struct RomFsDictionary<T> {
    buckets: Vec<i32>,
    /// Used part of the entry table; `entries.len()` is the append offset.
    entries: Vec<u8>,
    /// Bytes reserved for the entry table under the doubling policy.
    capacity: usize,
    _value: PhantomData<T>,
}

impl<T> RomFsDictionary<T>
where
    T: FromBytes + IntoBytes + Immutable + KnownLayout + Copy,
{
    const VALUE_SIZE: usize = size_of::<T>();
    const NEXT_OFFSET: usize = 4 + Self::VALUE_SIZE;
    const NAME_LENGTH_OFFSET: usize = 8 + Self::VALUE_SIZE;
    /// Size of a record without its name.
    pub const HEADER_SIZE: usize = 12 + Self::VALUE_SIZE;

    /// Load a dictionary from its serialised bucket and entry tables.
    ///
    /// Both regions are read into memory as-is; records are only decoded
    /// when a lookup reaches them.
    pub fn load<B: Storage + ?Sized, E: Storage + ?Sized>(
        bucket_storage: &B,
        entry_storage: &E,
    ) -> Result<Self> {
        let raw = bucket_storage.read_all()?;
        if raw.len() % 4 != 0 {
            return Err(Error::malformed(
                raw.len() as u64,
                "hash table size is not a multiple of 4",
            ));
        }
        let buckets = raw
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let entries = entry_storage.read_all()?;
        let capacity = entries.len();

        Ok(Self {
            buckets,
            entries,
            capacity,
            _value: PhantomData,
        })
    }

    /// Create an empty dictionary sized for roughly `count` entries.
    ///
    /// The bucket count follows [`romfs_bucket_count`], the same rule
    /// [`trim_excess`](Self::trim_excess) applies before serialisation.
    pub fn with_capacity(count: usize) -> Self {
        let bucket_count = romfs_bucket_count(count);
        let capacity = (Self::HEADER_SIZE + ESTIMATED_NAME_SIZE) * bucket_count;
        Self {
            buckets: vec![-1; bucket_count],
            entries: Vec::with_capacity(capacity),
            capacity,
            _value: PhantomData,
        }
    }

    /// Number of hash buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Size in bytes of the used part of the entry table.
    pub fn entry_table_size(&self) -> usize {
        self.entries.len()
    }

    /// Size in bytes of the serialised bucket table.
    pub fn bucket_table_size(&self) -> usize {
        self.buckets.len() * 4
    }

    /// Serialised bucket table.
    pub fn bucket_bytes(&self) -> Vec<u8> {
        self.buckets.iter().flat_map(|b| b.to_le_bytes()).collect()
    }

    /// Serialised entry table.
    pub fn entry_bytes(&self) -> &[u8] {
        &self.entries
    }

    /// Look up `key`, returning the entry's offset and value.
    pub fn find(&self, key: &RomEntryKey<'_>) -> Result<Option<(EntryId, T)>> {
        Ok(self.find_entry(key)?.map(|e| (e.id, e.value)))
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &RomEntryKey<'_>) -> Result<bool> {
        Ok(self.find_entry(key)?.is_some())
    }

    /// Decode the record at `id`.
    ///
    /// Returns `None` if `id` does not point inside the table.
    pub fn get(&self, id: EntryId) -> Result<Option<RomEntry<'_, T>>> {
        let start = id.offset() as usize;
        match start.checked_add(Self::HEADER_SIZE) {
            Some(end) if end <= self.entries.len() => self.record(id).map(Some),
            _ => Ok(None),
        }
    }

    /// Insert a new entry and return its offset.
    ///
    /// The record is appended to the entry table and becomes the head of its
    /// bucket's chain.
    pub fn insert(&mut self, key: &RomEntryKey<'_>, value: T) -> Result<EntryId> {
        check_name(key.name)?;
        if self.find_entry(key)?.is_some() {
            return Err(Error::DuplicateKey);
        }
        if self.buckets.is_empty() {
            self.buckets = vec![-1; romfs_bucket_count(0)];
        }

        let record_size = align_up(Self::HEADER_SIZE + key.name.len(), 4);
        let (id, end) = record_span(self.entries.len(), record_size)?;
        self.ensure_capacity(end);

        let bucket = self.bucket_index(key);
        let next = self.buckets[bucket];

        self.entries
            .extend_from_slice(&EntryId::to_raw(Some(key.parent)).to_le_bytes());
        self.entries.extend_from_slice(value.as_bytes());
        self.entries.extend_from_slice(&next.to_le_bytes());
        self.entries
            .extend_from_slice(&(key.name.len() as u32).to_le_bytes());
        self.entries.extend_from_slice(key.name);
        self.entries.resize(end, 0);

        self.buckets[bucket] = EntryId::to_raw(Some(id));
        Ok(id)
    }

    /// Overwrite the value of an existing entry.
    ///
    /// Offsets and chain links are left untouched. Returns false if `key` is
    /// absent.
    pub fn update(&mut self, key: &RomEntryKey<'_>, value: T) -> Result<bool> {
        let Some(id) = self.find_entry(key)?.map(|e| e.id) else {
            return Ok(false);
        };
        self.set_value(id, value)?;
        Ok(true)
    }

    /// Overwrite the value of the entry at `id`.
    pub fn set_value(&mut self, id: EntryId, value: T) -> Result<()> {
        self.record(id)?;
        let start = id.offset() as usize + 4;
        self.entries[start..start + Self::VALUE_SIZE].copy_from_slice(value.as_bytes());
        Ok(())
    }

    /// Rehash every entry into `bucket_count` buckets.
    ///
    /// Records stay where they are; only bucket heads and `next` links are
    /// rewritten. Entries are relinked in offset order, which keeps the
    /// output identical to other RomFS writers.
    pub fn resize(&mut self, bucket_count: usize) -> Result<()> {
        if bucket_count == 0 {
            return Err(Error::InvalidInput("bucket count must be non-zero"));
        }
        let offsets = self.entries_in_order()?;
        let mut buckets = vec![-1i32; bucket_count];

        for id in offsets {
            let hash = {
                let entry = self.record(id)?;
                RomEntryKey::new(entry.parent, entry.name).hash()
            };
            let bucket = hash as usize % bucket_count;
            let next_at = id.offset() as usize + Self::NEXT_OFFSET;
            self.entries[next_at..next_at + 4].copy_from_slice(&buckets[bucket].to_le_bytes());
            buckets[bucket] = EntryId::to_raw(Some(id));
        }

        tracing::trace!(
            from = self.buckets.len(),
            to = bucket_count,
            "rehashed RomFS dictionary"
        );
        self.buckets = buckets;
        Ok(())
    }

    /// Shrink the bucket array to the format's preferred size for the
    /// current entry count.
    pub fn trim_excess(&mut self) -> Result<()> {
        let count = self.len()?;
        self.resize(romfs_bucket_count(count))
    }

    /// Offsets of every live entry, ascending.
    ///
    /// Ascending offset is insertion order, so re-serialising entries in
    /// this order is reproducible.
    pub fn entries_in_order(&self) -> Result<Vec<EntryId>> {
        let limit = self.max_records();
        let mut offsets = Vec::new();

        for (index, &head) in self.buckets.iter().enumerate() {
            let mut cur = link(head, index as u64 * 4)?;
            while let Some(id) = cur {
                if offsets.len() >= limit {
                    return Err(Error::malformed(id.offset() as u64, "hash chain cycle"));
                }
                offsets.push(id);
                cur = self.next_of(id)?;
            }
        }

        offsets.sort_unstable();
        offsets.dedup();
        Ok(offsets)
    }

    /// Number of live entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self.entries_in_order()?.len())
    }

    /// Returns true if the dictionary holds no entries.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|&b| b < 0)
    }

    fn find_entry(&self, key: &RomEntryKey<'_>) -> Result<Option<RomEntry<'_, T>>> {
        check_name(key.name)?;
        if self.buckets.is_empty() {
            return Ok(None);
        }

        let bucket = self.bucket_index(key);
        let mut cur = link(self.buckets[bucket], bucket as u64 * 4)?;
        let mut steps = 0;

        while let Some(id) = cur {
            let entry = self.record(id)?;
            if entry.parent == key.parent && entry.name == key.name {
                return Ok(Some(entry));
            }
            steps += 1;
            if steps > self.max_records() {
                return Err(Error::malformed(id.offset() as u64, "hash chain cycle"));
            }
            cur = self.next_of(id)?;
        }
        Ok(None)
    }

    fn bucket_index(&self, key: &RomEntryKey<'_>) -> usize {
        key.hash() as usize % self.buckets.len()
    }

    /// Upper bound on the number of records the entry table can hold.
    pub(crate) fn max_records(&self) -> usize {
        self.entries.len() / Self::HEADER_SIZE
    }

    fn next_of(&self, id: EntryId) -> Result<Option<EntryId>> {
        let at = id.offset() as usize + Self::NEXT_OFFSET;
        let raw = read_le_i32(&self.entries, at)
            .ok_or_else(|| Error::malformed(at as u64, "entry outside table"))?;
        link(raw, at as u64)
    }

    fn record(&self, id: EntryId) -> Result<RomEntry<'_, T>> {
        let start = id.offset() as usize;
        let offset = start as u64;
        if start % 4 != 0 {
            return Err(Error::malformed(offset, "misaligned entry offset"));
        }
        let header = start
            .checked_add(Self::HEADER_SIZE)
            .and_then(|end| self.entries.get(start..end))
            .ok_or_else(|| Error::malformed(offset, "entry outside table"))?;

        let parent_raw = read_le_i32(header, 0).unwrap_or(-1);
        let parent = EntryId::from_raw(parent_raw)
            .ok_or_else(|| Error::malformed(offset, "entry has no parent"))?;
        let value = T::read_from_bytes(&header[4..Self::NEXT_OFFSET])
            .map_err(|_| Error::malformed(offset, "truncated entry value"))?;
        let name_len = read_le_i32(header, Self::NAME_LENGTH_OFFSET).unwrap_or(-1) as u32 as usize;
        if name_len > MAX_NAME_LENGTH {
            return Err(Error::malformed(offset, "entry name exceeds 0x300 bytes"));
        }

        let name_start = start + Self::HEADER_SIZE;
        let name = self
            .entries
            .get(name_start..name_start + name_len)
            .ok_or_else(|| Error::malformed(offset, "entry name outside table"))?;

        Ok(RomEntry {
            id,
            parent,
            value,
            name,
        })
    }

    fn ensure_capacity(&mut self, required: usize) {
        if required <= self.capacity {
            return;
        }
        let new_capacity = required
            .max(MIN_GROWTH)
            .max(self.capacity.saturating_mul(2))
            .min(i32::MAX as usize);

        tracing::trace!(
            from = self.capacity,
            to = new_capacity,
            "growing RomFS entry table"
        );
        self.entries
            .reserve_exact(new_capacity - self.entries.len());
        self.capacity = new_capacity;
    }
}

/// Offset and end of a record of `size` bytes appended at `offset`.
///
/// Fails with [`Error::CapacityOverflow`] if the record would end past the
/// range a signed 32-bit link can address.
fn record_span(offset: usize, size: usize) -> Result<(EntryId, usize)> {
    let end = offset
        .checked_add(size)
        .filter(|&end| end <= EntryId::MAX_OFFSET as usize)
        .ok_or(Error::CapacityOverflow)?;
    let id = u32::try_from(offset)
        .ok()
        .and_then(EntryId::new)
        .ok_or(Error::CapacityOverflow)?;
    Ok((id, end))
}

fn check_name(name: &[u8]) -> Result<()> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(Error::NameTooLong(name.len()));
    }
    Ok(())
}

/// Decode a chain link read at `at`.
fn link(raw: i32, at: u64) -> Result<Option<EntryId>> {
    match raw {
        -1 => Ok(None),
        r if r < 0 => Err(Error::malformed(at, "invalid entry link")),
        r => Ok(EntryId::from_raw(r)),
    }
}
