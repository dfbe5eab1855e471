//! Error types for building and reading trie files.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file cannot be interpreted as a trie.
    #[error("malformed trie file: {0}")]
    Malformed(String),

    /// The tree could not be serialized, e.g. because it outgrew the 32-bit
    /// relative pointers of the archive.
    #[error("failed to encode trie: {0}")]
    Encode(String),

    #[error("radix invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;
