//! RomFS name hashing and hash-table sizing.
//!
//! Both functions are fixed by the container format. Changing either one
//! produces tables that other tools cannot read.

/// Seed XORed with the parent offset before hashing a name.
pub const HASH_SEED: u32 = 123_456_789;

/// Hash a `(parent, name)` key.
///
/// ```text
/// hash = parent ^ 123456789
/// for byte in name:
///     hash = rotate_right(hash, 5) ^ byte
/// ```
pub fn romfs_hash(parent: u32, name: &[u8]) -> u32 {
    let mut hash = parent ^ HASH_SEED;
    for &b in name {
        hash = hash.rotate_right(5) ^ b as u32;
    }
    hash
}

/// Number of hash buckets a table holding `entries` entries should use.
///
/// Small tables use `entries | 1` (minimum 3); larger ones use the first
/// count at or above `entries` with no prime factor up to 17.
pub fn romfs_bucket_count(entries: usize) -> usize {
    if entries < 3 {
        return 3;
    }
    if entries < 19 {
        return entries | 1;
    }
    let mut count = entries;
    while [2, 3, 5, 7, 11, 13, 17].iter().any(|p| count % p == 0) {
        count += 1;
    }
    count
}
