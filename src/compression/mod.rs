//! Loaders for compressed container images (requires the `compression`
//! feature).
//!
//! Each loader decompresses a whole image into a [`MemoryStorage`] that can
//! be mounted directly:
//!
//! ```toml
//! [dependencies]
//! romvfs = { version = "0.1", features = ["compression"] }
//! ```
//!
//! ## Submodules
//!
//! | Module | Algorithm | Input |
//! |--------|-----------|-------|
//! | [`lz4`]  | LZ4 block | Size-prepended block |
//! | [`zstd`] | Zstandard | Single frame |
//!
//! [`MemoryStorage`]: crate::storage::MemoryStorage

#[cfg(feature = "compression")]
pub mod lz4;

#[cfg(feature = "compression")]
pub mod zstd;
