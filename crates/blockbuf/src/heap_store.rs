// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::num::NonZero;

use crate::{BlockSize, BlockStore, StoreError};

/// A block store that allocates blocks from the Rust global allocator.
///
/// Each block is a separate heap allocation, so appending a block never moves the storage
/// of existing blocks. Only the small table of block pointers is ever reallocated.
///
/// Allocation failures are reported as [`StoreError::OutOfMemory`] instead of aborting the
/// process. Released blocks are returned to the allocator immediately, there is no pooling.
#[derive(Debug, Default)]
pub struct HeapBlockStore {
    blocks: Vec<Box<[u8]>>,
}

impl HeapBlockStore {
    /// Creates an empty store. Does not allocate.
    #[must_use]
    pub const fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    fn out_of_range(&self, index: u32) -> StoreError {
        StoreError::OutOfRange {
            index,
            block_count: self.block_count(),
        }
    }
}

impl BlockStore for HeapBlockStore {
    fn block_count(&self) -> u32 {
        // The buffer never holds more than `u32::MAX` blocks because its size is a `u32`.
        u32::try_from(self.blocks.len()).unwrap_or(u32::MAX)
    }

    fn reserve(&mut self, additional: u32) -> Result<(), StoreError> {
        self.blocks.try_reserve(additional as usize)?;
        Ok(())
    }

    fn allocate_tail(&mut self, capacity: NonZero<BlockSize>) -> Result<(), StoreError> {
        self.blocks.try_reserve(1)?;

        let mut block = Vec::new();
        block.try_reserve_exact(capacity.get() as usize)?;

        // Safe Rust cannot hand out uninitialized memory, so the block is zero-filled here.
        // Callers still must not rely on the content of blocks they have not written.
        block.resize(capacity.get() as usize, 0);

        self.blocks.push(block.into_boxed_slice());
        Ok(())
    }

    fn release_tail(&mut self) -> Result<(), StoreError> {
        self.blocks.pop().map(drop).ok_or(StoreError::Empty)
    }

    fn block(&self, index: u32) -> Result<&[u8], StoreError> {
        self.blocks
            .get(index as usize)
            .map(|block| &**block)
            .ok_or_else(|| self.out_of_range(index))
    }

    fn block_mut(&mut self, index: u32) -> Result<&mut [u8], StoreError> {
        let block_count = self.block_count();

        self.blocks
            .get_mut(index as usize)
            .map(|block| &mut **block)
            .ok_or(StoreError::OutOfRange { index, block_count })
    }
}
