//! Read-only view of a storage.

use super::Storage;
use crate::{Error, Result};

/// Forwards reads to `S` and rejects every write with
/// [`Error::Unsupported`], whether or not `S` itself is writable.
#[derive(Debug, Clone)]
pub struct ReadOnly<S>(S);

impl<S: Storage> ReadOnly<S> {
    pub fn new(storage: S) -> Self {
        Self(storage)
    }

    /// The wrapped storage.
    pub fn get_ref(&self) -> &S {
        &self.0
    }

    pub fn into_inner(self) -> S {
        self.0
    }
}

impl<S: Storage> Storage for ReadOnly<S> {
    fn read(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        self.0.read(buf, offset)
    }

    fn write(&self, _buf: &[u8], _offset: u64) -> Result<()> {
        Err(Error::Unsupported)
    }

    fn size(&self) -> u64 {
        self.0.size()
    }
}
