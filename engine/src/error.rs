//! Error taxonomy for the B+Tree index.

use thiserror::Error;

/// Errors surfaced by [`crate::index::Index`] and the node layer beneath it.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Internal signal: a node has no room for one more entry.
    ///
    /// Never escapes `Index`'s public API; the insertion protocol absorbs
    /// this into a split before returning to the caller.
    #[error("node is full")]
    NodeFull,

    /// `locate` found no entry with the requested key.
    #[error("no entry with the requested key")]
    NoSuchRecord,

    /// A sibling or child pointer was negative.
    #[error("invalid page id: {0}")]
    InvalidPid(i32),

    /// An entry index was out of bounds for the node.
    #[error("invalid entry index: {0}")]
    InvalidEid(usize),

    /// Key `0` is reserved as the empty-slot sentinel and can never be stored.
    #[error("key 0 is reserved and cannot be inserted")]
    ReservedKey,

    /// Page zero does not describe a consistent index (bad page size, torn write, etc).
    #[error("index file format error: {0}")]
    FileFormat(String),

    /// Pass-through I/O failure from the backing page file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type IndexResult<T> = Result<T, IndexError>;
