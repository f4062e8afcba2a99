//! Low-level byte helpers shared by the parsers.
//!
//! Stream readers read exactly the bytes they promise or return an error -
//! there is no partial-read ambiguity.

use std::io::Read;

use crate::Result;

/// Read a little-endian `i64`.
#[inline]
pub(crate) fn le_i64<R: Read>(r: &mut R) -> Result<i64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(i64::from_le_bytes(b))
}

/// Decode a little-endian `i32` at `at` within `buf`.
///
/// Returns [`None`] if the four bytes are not all inside `buf`.
#[inline]
pub(crate) fn read_le_i32(buf: &[u8], at: usize) -> Option<i32> {
    let bytes = buf.get(at..at.checked_add(4)?)?;
    Some(i32::from_le_bytes(bytes.try_into().ok()?))
}

/// Round `value` up to a multiple of `align` (a power of two).
#[inline]
pub(crate) const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Round `value` up to a multiple of `align` (a power of two).
#[inline]
pub(crate) const fn align_up_u64(value: u64, align: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment() {
        assert_eq!(align_up(0, 4), 0);
        assert_eq!(align_up(1, 4), 4);
        assert_eq!(align_up(0x24, 4), 0x24);
        assert_eq!(align_up_u64(0x201, 0x10), 0x210);
    }

    #[test]
    fn read_le_i32_is_bounds_checked() {
        let buf = [0xFF, 0xFF, 0xFF, 0xFF, 0x10, 0, 0];
        assert_eq!(read_le_i32(&buf, 0), Some(-1));
        assert_eq!(read_le_i32(&buf, 3), Some(0x10FF));
        assert_eq!(read_le_i32(&buf, 4), None);
        assert_eq!(read_le_i32(&buf, usize::MAX), None);
    }

    #[test]
    fn le_i64_needs_all_bytes() {
        let mut ok: &[u8] = &[1, 0, 0, 0, 0, 0, 0, 0x80];
        assert_eq!(le_i64(&mut ok).unwrap(), i64::MIN + 1);
        let mut short: &[u8] = &[1, 2, 3];
        assert!(le_i64(&mut short).is_err());
    }
}
