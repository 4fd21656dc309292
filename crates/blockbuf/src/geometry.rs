// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::num::NonZero;

use crate::BlockSize;

/// The relationship between the logical size of a buffer and the blocks that back it.
///
/// A geometry is never updated field by field. It is always computed in full from the block
/// size and the logical size, so the derived fields cannot drift apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Geometry {
    block_num: u32,
    capacity: u64,
    logical_size: u32,
    tail_used: u32,
}

impl Geometry {
    /// The minimal geometry that holds `logical_size` bytes in blocks of `block_size` bytes.
    pub(crate) fn compute(block_size: NonZero<BlockSize>, logical_size: u32) -> Self {
        let block_num = required_blocks(block_size, logical_size);

        let remainder = logical_size % block_size.get();
        let tail_used = if logical_size != 0 && remainder == 0 {
            block_size.get()
        } else {
            remainder
        };

        Self {
            block_num,
            capacity: u64::from(block_num) * u64::from(block_size.get()),
            logical_size,
            tail_used,
        }
    }

    /// The largest geometry that fits into `block_num` blocks without exceeding `logical_size`.
    ///
    /// Used to describe a buffer that lost blocks from its tail.
    pub(crate) fn truncated_to_blocks(block_size: NonZero<BlockSize>, logical_size: u32, block_num: u32) -> Self {
        let capacity = u64::from(block_num) * u64::from(block_size.get());
        let logical_size = u32::try_from(capacity).map_or(logical_size, |capacity| capacity.min(logical_size));

        Self::compute(block_size, logical_size)
    }

    pub(crate) const fn block_num(&self) -> u32 {
        self.block_num
    }

    pub(crate) const fn capacity(&self) -> u64 {
        self.capacity
    }

    pub(crate) const fn logical_size(&self) -> u32 {
        self.logical_size
    }

    pub(crate) const fn tail_used(&self) -> u32 {
        self.tail_used
    }

    /// Checks the invariants that every geometry must uphold.
    #[cfg_attr(test, mutants::skip)] // Only used in debug assertions.
    pub(crate) fn is_valid(&self, block_size: NonZero<BlockSize>) -> bool {
        let block_size = u64::from(block_size.get());
        let logical_size = u64::from(self.logical_size);

        logical_size <= self.capacity
            && self.capacity - logical_size < block_size
            && self.capacity == u64::from(self.block_num) * block_size
            && u64::from(self.tail_used) <= block_size
    }
}

/// Number of blocks of `block_size` bytes needed to hold `size` bytes.
pub(crate) const fn required_blocks(block_size: NonZero<BlockSize>, size: u32) -> u32 {
    size.div_ceil(block_size.get())
}
