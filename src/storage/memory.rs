//! In-memory storage.

use parking_lot::RwLock;

use super::{Storage, check_range};
use crate::Result;

/// A fixed-size, writable storage backed by a byte buffer.
///
/// Writes never change the size; use [`MemoryStorage::into_inner`] to get
/// the buffer back.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<Vec<u8>>,
}

impl MemoryStorage {
    /// Wrap an existing buffer.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Create a zero-filled storage of `size` bytes.
    pub fn zeroed(size: usize) -> Self {
        Self::new(vec![0u8; size])
    }

    /// Copy the current contents into a new `Vec`.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Consume the storage, returning the buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.data.into_inner()
    }
}

impl From<Vec<u8>> for MemoryStorage {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for MemoryStorage {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}

impl Storage for MemoryStorage {
    fn read(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        let data = self.data.read();
        check_range(offset, buf.len(), data.len() as u64)?;
        let start = offset as usize;
        buf.copy_from_slice(&data[start..start + buf.len()]);
        Ok(())
    }

    fn write(&self, buf: &[u8], offset: u64) -> Result<()> {
        let mut data = self.data.write();
        check_range(offset, buf.len(), data.len() as u64)?;
        let start = offset as usize;
        data[start..start + buf.len()].copy_from_slice(buf);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.data.read().len() as u64
    }
}
