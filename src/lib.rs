//! # drt
//!
//! A read-only, on-disk radix tree for byte-string set membership.
//!
//! Keys are collected once by a [`Builder`] and committed to a single file.
//! The file is an [rkyv](https://docs.rs/rkyv) archive that a [`Reader`]
//! memory-maps, validates once, and then walks in place: nothing is
//! deserialized, and lookups only follow relative pointers through the
//! mapping. This suits large static dictionaries such as password
//! blocklists.
//!
//! ## Example
//!
//! ```rust
//! # fn main() -> drt::Result<()> {
//! # let dir = tempfile::tempdir()?;
//! # let path = dir.path().join("words.drt");
//! let mut builder = drt::create(&path)?;
//! builder.insert("tester");
//! builder.insert("test");
//! builder.commit()?;
//!
//! let reader = drt::open(&path)?;
//! assert!(reader.has("test"));
//! assert!(reader.has("tester"));
//! assert!(!reader.has("tes"));
//! reader.close();
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

pub mod builder;
pub mod config;
pub mod error;
pub mod format;
pub mod reader;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub use builder::{Builder, Sink};
pub use config::{Access, BuilderConfig, ReaderConfig};
pub use error::{Error, Result};
pub use format::NodeView;
pub use reader::{Reader, Storage};

/// Open the trie file at `path` for lookups.
pub fn open(path: impl AsRef<Path>) -> Result<Reader> {
    Reader::open(path)
}

/// Create (or truncate) a trie file at `path`. Nothing is written until
/// [`Builder::commit`].
pub fn create(path: impl AsRef<Path>) -> Result<Builder<BufWriter<File>>> {
    Builder::create(path)
}


#[cfg(test)]
mod proptests;
