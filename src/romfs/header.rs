//! RomFS header.
//!
//! ## Layout (0x50 bytes, all fields i64 LE)
//! ```text
//! [0x00] HeaderSize           (0x50)
//! [0x08] DirHashTableOffset
//! [0x10] DirHashTableSize
//! [0x18] DirMetaTableOffset
//! [0x20] DirMetaTableSize
//! [0x28] FileHashTableOffset
//! [0x30] FileHashTableSize
//! [0x38] FileMetaTableOffset
//! [0x40] FileMetaTableSize
//! [0x48] DataOffset
//! ```
//! All offsets are relative to the start of the container.

use std::io::Read;

use crate::utils::le_i64;
use crate::{Error, Result};

/// Size of the header structure.
pub const HEADER_SIZE: u64 = 0x50;

/// One table region named by the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub offset: u64,
    pub size: u64,
}

impl Region {
    /// End of the region, or `None` if it does not fit in a `u64`.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }

    fn overlaps(&self, other: &Region) -> bool {
        let (Some(end), Some(other_end)) = (self.end(), other.end()) else {
            return self.size != 0 && other.size != 0;
        };
        self.size != 0 && other.size != 0 && self.offset < other_end && other.offset < end
    }
}

/// Parsed RomFS header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RomFsHeader {
    pub header_size: i64,
    pub dir_hash_table_offset: i64,
    pub dir_hash_table_size: i64,
    pub dir_meta_table_offset: i64,
    pub dir_meta_table_size: i64,
    pub file_hash_table_offset: i64,
    pub file_hash_table_size: i64,
    pub file_meta_table_offset: i64,
    pub file_meta_table_size: i64,
    pub data_offset: i64,
}

impl RomFsHeader {
    /// Parse a header from `r`.
    ///
    /// The reader must be positioned at the start of the container. Field
    /// values are not checked; see [`RomFsHeader::validate`].
    pub fn parse<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            header_size: le_i64(r)?,
            dir_hash_table_offset: le_i64(r)?,
            dir_hash_table_size: le_i64(r)?,
            dir_meta_table_offset: le_i64(r)?,
            dir_meta_table_size: le_i64(r)?,
            file_hash_table_offset: le_i64(r)?,
            file_hash_table_size: le_i64(r)?,
            file_meta_table_offset: le_i64(r)?,
            file_meta_table_size: le_i64(r)?,
            data_offset: le_i64(r)?,
        })
    }

    /// Serialise the header.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE as usize] {
        let fields = [
            self.header_size,
            self.dir_hash_table_offset,
            self.dir_hash_table_size,
            self.dir_meta_table_offset,
            self.dir_meta_table_size,
            self.file_hash_table_offset,
            self.file_hash_table_size,
            self.file_meta_table_offset,
            self.file_meta_table_size,
            self.data_offset,
        ];
        let mut out = [0u8; HEADER_SIZE as usize];
        for (chunk, field) in out.chunks_exact_mut(8).zip(fields) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        out
    }

    /// Check that the header describes a plausible layout for a container
    /// of `container_size` bytes.
    ///
    /// Every table must lie inside the container and no two tables may
    /// overlap. The reported offset is the header field at fault.
    pub fn validate(&self, container_size: u64) -> Result<()> {
        if self.header_size < HEADER_SIZE as i64 {
            return Err(Error::malformed(0x00, "header size smaller than 0x50"));
        }
        if to_u64(self.data_offset).is_none_or(|d| d > container_size) {
            return Err(Error::malformed(0x48, "data offset outside container"));
        }

        let regions = self.regions()?;
        for (i, (field, region)) in regions.iter().enumerate() {
            if region.end().is_none_or(|end| end > container_size) {
                return Err(Error::malformed(*field, "table extends past end of container"));
            }
            if regions[..i].iter().any(|(_, other)| region.overlaps(other)) {
                return Err(Error::malformed(*field, "tables overlap"));
            }
        }
        Ok(())
    }

    pub fn dir_hash_table(&self) -> Result<Region> {
        region(self.dir_hash_table_offset, self.dir_hash_table_size, 0x08)
    }

    pub fn dir_meta_table(&self) -> Result<Region> {
        region(self.dir_meta_table_offset, self.dir_meta_table_size, 0x18)
    }

    pub fn file_hash_table(&self) -> Result<Region> {
        region(self.file_hash_table_offset, self.file_hash_table_size, 0x28)
    }

    pub fn file_meta_table(&self) -> Result<Region> {
        region(self.file_meta_table_offset, self.file_meta_table_size, 0x38)
    }

    /// The four tables, each paired with the header offset of its field.
    fn regions(&self) -> Result<[(u64, Region); 4]> {
        Ok([
            (0x08, self.dir_hash_table()?),
            (0x18, self.dir_meta_table()?),
            (0x28, self.file_hash_table()?),
            (0x38, self.file_meta_table()?),
        ])
    }
}

fn to_u64(v: i64) -> Option<u64> {
    u64::try_from(v).ok()
}

fn region(offset: i64, size: i64, field: u64) -> Result<Region> {
    let offset = to_u64(offset).ok_or_else(|| Error::malformed(field, "negative table offset"))?;
    let size = to_u64(size).ok_or_else(|| Error::malformed(field + 8, "negative table size"))?;
    Ok(Region { offset, size })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RomFsHeader {
        RomFsHeader {
            header_size: 0x50,
            dir_hash_table_offset: 0x200,
            dir_hash_table_size: 0x0C,
            dir_meta_table_offset: 0x20C,
            dir_meta_table_size: 0x30,
            file_hash_table_offset: 0x23C,
            file_hash_table_size: 0x0C,
            file_meta_table_offset: 0x248,
            file_meta_table_size: 0x28,
            data_offset: 0x200,
        }
    }

    #[test]
    fn parse_reads_fields_in_order() {
        let bytes = sample().to_bytes();
        assert_eq!(&bytes[0x08..0x10], &0x200i64.to_le_bytes());
        let parsed = RomFsHeader::parse(&mut &bytes[..]).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn truncated_header_fails() {
        let bytes = sample().to_bytes();
        assert!(RomFsHeader::parse(&mut &bytes[..0x48]).is_err());
    }

    #[test]
    fn valid_layout_passes() {
        sample().validate(0x270).unwrap();
    }

    #[test]
    fn table_past_end_is_rejected() {
        let err = sample().validate(0x26F).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedContainer { offset: 0x38, .. }
        ));
    }

    #[test]
    fn overlapping_tables_are_rejected() {
        let mut header = sample();
        header.file_hash_table_offset = 0x230;
        let err = header.validate(0x270).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedContainer { offset: 0x28, reason: "tables overlap" }
        ));
    }

    #[test]
    fn region_end_does_not_overflow() {
        let region = Region {
            offset: u64::MAX - 1,
            size: 4,
        };
        assert_eq!(region.end(), None);
        assert_eq!(Region { offset: 0x200, size: 0xC }.end(), Some(0x20C));
    }

    #[test]
    fn negative_and_small_fields_are_rejected() {
        let mut header = sample();
        header.header_size = 0x10;
        assert!(header.validate(0x270).is_err());

        let mut header = sample();
        header.dir_meta_table_size = -4;
        assert!(matches!(
            header.validate(0x270),
            Err(Error::MalformedContainer { offset: 0x20, .. })
        ));

        let mut header = sample();
        header.data_offset = 0x1000;
        assert!(matches!(
            header.validate(0x270),
            Err(Error::MalformedContainer { offset: 0x48, .. })
        ));
    }
}
