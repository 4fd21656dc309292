// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::num::NonZero;

use crate::StoreError;

/// An integer type that can represent the size of a memory block in bytes.
///
/// The logical size of a buffer is limited to the same range, so a single block can
/// never be larger than the largest buffer.
pub type BlockSize = u32;

/// An ordered sequence of fixed-capacity memory blocks.
///
/// A [`ResizableBuffer`][crate::ResizableBuffer] owns exactly one block store and is its only
/// user. The buffer only ever adds or removes blocks at the tail of the sequence and accesses
/// the storage of individual blocks by index.
///
/// # Contract
///
/// * [`block_count()`][Self::block_count] must change only through
///   [`allocate_tail()`][Self::allocate_tail] and [`release_tail()`][Self::release_tail].
/// * Every block must expose at least as many bytes of storage as the capacity it was
///   allocated with. Stores that hand out shorter regions cause buffer operations to fail
///   with [`Error::Generic`][crate::Error::Generic].
/// * Releasing a block that was appended by the immediately preceding call must succeed. The
///   buffer relies on this to roll back a partially completed growth step and will panic if
///   the store violates it.
///
/// The content of a newly appended block is unspecified.
pub trait BlockStore: Debug {
    /// Number of blocks currently held by the store.
    fn block_count(&self) -> u32;

    /// Prepares the store for `additional` subsequent calls to
    /// [`allocate_tail()`][Self::allocate_tail].
    ///
    /// This is the first phase of a growth step - a store that can fail here does so before
    /// any block has been appended. The default implementation does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OutOfMemory`] if the bookkeeping for the additional blocks
    /// cannot be allocated.
    fn reserve(&mut self, additional: u32) -> Result<(), StoreError> {
        _ = additional;
        Ok(())
    }

    /// Appends one block with at least `capacity` bytes of storage to the end of the sequence.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OutOfMemory`] if the block cannot be allocated. The store is
    /// unchanged in that case.
    fn allocate_tail(&mut self, capacity: NonZero<BlockSize>) -> Result<(), StoreError>;

    /// Removes the most recently appended block.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Empty`] if the store holds no blocks.
    fn release_tail(&mut self) -> Result<(), StoreError>;

    /// Returns the storage region of the block at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OutOfRange`] if there is no block at `index`.
    fn block(&self, index: u32) -> Result<&[u8], StoreError>;

    /// Returns the storage region of the block at `index` for writing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OutOfRange`] if there is no block at `index`.
    fn block_mut(&mut self, index: u32) -> Result<&mut [u8], StoreError>;
}

impl<S: BlockStore + ?Sized> BlockStore for Box<S> {
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn block_count(&self) -> u32 {
        (**self).block_count()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn reserve(&mut self, additional: u32) -> Result<(), StoreError> {
        (**self).reserve(additional)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn allocate_tail(&mut self, capacity: NonZero<BlockSize>) -> Result<(), StoreError> {
        (**self).allocate_tail(capacity)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn release_tail(&mut self) -> Result<(), StoreError> {
        (**self).release_tail()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn block(&self, index: u32) -> Result<&[u8], StoreError> {
        (**self).block(index)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn block_mut(&mut self, index: u32) -> Result<&mut [u8], StoreError> {
        (**self).block_mut(index)
    }
}
