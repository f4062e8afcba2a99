//! Library-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout romvfs.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Error messages are kept intentionally terse; callers that need richer
/// context should wrap `Error` in their own type.
#[derive(Debug)]
pub enum Error {
    /// A storage access fell outside the valid region.
    OutOfRange {
        /// Requested offset, relative to the accessed storage.
        offset: u64,
        /// Requested length in bytes.
        len: u64,
        /// Size of the accessed storage.
        size: u64,
    },
    /// No file or directory exists at the given path.
    PathNotFound(String),
    /// The caller asked for something the object can never do (for example
    /// write access to a read-only file).
    InvalidInput(&'static str),
    /// The storage does not support writing.
    Unsupported,
    /// The filesystem is immutable; the named operation is never available.
    UnsupportedOperation(&'static str),
    /// A dictionary already holds an entry with this key.
    DuplicateKey,
    /// An entry name exceeds the format's maximum length.
    NameTooLong(usize),
    /// An entry table would outgrow the 32-bit offset range.
    CapacityOverflow,
    /// Header or table data is structurally invalid.
    MalformedContainer {
        /// Offset of the offending field or record within its region.
        offset: u64,
        /// Which constraint was violated.
        reason: &'static str,
    },
    /// An underlying I/O operation failed.
    Io(io::Error),
    /// LZ4 decompression failed.
    #[cfg(feature = "compression")]
    Lz4,
    /// Zstandard decompression failed.
    #[cfg(feature = "compression")]
    Zstd,
}

impl Error {
    /// Shorthand for [`Error::MalformedContainer`].
    pub(crate) fn malformed(offset: u64, reason: &'static str) -> Self {
        Error::MalformedContainer {
            offset,
            reason,
        }
    }

    /// Returns true for [`Error::PathNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::PathNotFound(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfRange { offset, len, size } => write!(
                f,
                "out of range: {len:#x} bytes at {offset:#x} (storage size {size:#x})"
            ),
            Error::PathNotFound(p) => write!(f, "path not found: {p}"),
            Error::InvalidInput(s) => write!(f, "invalid input: {s}"),
            Error::Unsupported => write!(f, "storage is read-only"),
            Error::UnsupportedOperation(op) => write!(f, "unsupported operation: {op}"),
            Error::DuplicateKey => write!(f, "key already exists"),
            Error::NameTooLong(n) => write!(f, "entry name too long: {n} bytes"),
            Error::CapacityOverflow => write!(f, "entry table capacity overflow"),
            Error::MalformedContainer { offset, reason } => {
                write!(f, "malformed container at {offset:#x}: {reason}")
            }
            Error::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "compression")]
            Error::Lz4 => write!(f, "lz4 decompression failed"),
            #[cfg(feature = "compression")]
            Error::Zstd => write!(f, "zstd decompression failed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
