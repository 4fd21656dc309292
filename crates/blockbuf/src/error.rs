// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::TryReserveError;

use thiserror::Error;

/// An error returned by the operations of a [`ResizableBuffer`][crate::ResizableBuffer].
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Memory for a new block could not be allocated.
    ///
    /// The buffer is left exactly as it was before the failed operation.
    #[error("out of memory")]
    OutOfMemory,

    /// A size is out of bounds.
    ///
    /// Returned when a resize or write would take the buffer beyond its configured maximum
    /// size, or when a read range extends past the end of the buffer. `limit` is the
    /// bound that was exceeded.
    #[error("size {size} exceeds the limit of {limit} bytes")]
    BadSize {
        /// The size that was requested. This may not fit in `u32` if the request overflowed.
        size: u64,
        /// The bound that was exceeded.
        limit: u32,
    },

    /// A read starts past the end of the buffer.
    #[error("offset {offset} is past the end of the buffer ({len} bytes)")]
    BadOffset {
        /// The requested start offset.
        offset: u32,
        /// The logical size of the buffer at the time of the request.
        len: u32,
    },

    /// The block store failed in a way that does not have a more specific error variant.
    #[error("block store failure")]
    Generic(#[source] StoreError),
}

/// A specialized `Result` for use with buffer operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<StoreError> for Error {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::OutOfMemory => Self::OutOfMemory,
            other => Self::Generic(other),
        }
    }
}

/// Represents a buffer error as a standard I/O error.
/// This is used by the `std::io` adapters of the buffer.
impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        let kind = match value {
            Error::OutOfMemory => std::io::ErrorKind::OutOfMemory,
            Error::BadSize { .. } | Error::BadOffset { .. } => std::io::ErrorKind::InvalidInput,
            Error::Generic(_) => std::io::ErrorKind::Other,
        };

        Self::new(kind, value)
    }
}

/// An error reported by a [`BlockStore`][crate::BlockStore].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Memory for a block (or for the store's own bookkeeping) could not be allocated.
    #[error("out of memory")]
    OutOfMemory,

    /// A block was to be released but the store holds no blocks.
    #[error("the block store is empty")]
    Empty,

    /// A block index does not refer to a block held by the store.
    #[error("block index {index} is out of range, the store holds {block_count} blocks")]
    OutOfRange {
        /// The index that was requested.
        index: u32,
        /// The number of blocks in the store at the time of the request.
        block_count: u32,
    },

    /// The storage region of a block is smaller than the block size of the buffer.
    #[error("block {index} has {len} bytes of storage, expected {expected}")]
    ShortBlock {
        /// The index of the offending block.
        index: u32,
        /// The length of the region the store returned.
        len: usize,
        /// The block size of the buffer.
        expected: u32,
    },
}

impl From<TryReserveError> for StoreError {
    fn from(_value: TryReserveError) -> Self {
        Self::OutOfMemory
    }
}
