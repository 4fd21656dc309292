// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::iter::FusedIterator;
use std::num::NonZero;
use std::ops::Range;

use crate::BlockSize;

/// One contiguous piece of a byte range that lies within a single block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Segment {
    /// Index of the block that holds the piece.
    pub(crate) block_index: u32,

    /// Where the piece lives inside the block.
    pub(crate) in_block: Range<usize>,

    /// Where the piece lives inside the caller's slice.
    pub(crate) in_slice: Range<usize>,
}

/// Splits the byte range `[offset, offset + len)` of a buffer into per-block segments.
///
/// The first segment (the head) starts at the intra-block offset of `offset` and runs to the
/// end of its block or the end of the range, whichever comes first. Every following segment
/// starts at offset 0 of the next block. Middle segments span a full block, the last segment
/// (the tail) holds whatever remains. An empty range yields no segments.
#[derive(Clone, Debug)]
pub(crate) struct Segments {
    block_size: u64,

    // Absolute byte position of the next segment within the buffer.
    position: u64,

    // Absolute byte position one past the end of the range.
    end: u64,

    // Number of bytes of the caller's slice covered by segments yielded so far.
    consumed: usize,
}

impl Segments {
    pub(crate) fn new(block_size: NonZero<BlockSize>, offset: u32, len: usize) -> Self {
        let position = u64::from(offset);

        Self {
            block_size: u64::from(block_size.get()),
            position,
            end: position + len as u64,
            consumed: 0,
        }
    }

    /// Number of bytes of the range that have not been covered by a segment yet.
    pub(crate) fn remaining(&self) -> u64 {
        self.end - self.position
    }
}

impl Iterator for Segments {
    type Item = Segment;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.end {
            return None;
        }

        let block_offset = self.position % self.block_size;
        let len = (self.block_size - block_offset).min(self.remaining());

        // Both values are bounded by the block size, which is a `u32`.
        #[expect(clippy::cast_possible_truncation, reason = "bounded by a u32 block size, see above")]
        let (block_offset, len) = (block_offset as usize, len as usize);

        // Positions are bounded by `u32::MAX` plus one block, so the quotient fits in `u32`.
        #[expect(clippy::cast_possible_truncation, reason = "quotient of a bounded position, see above")]
        let block_index = (self.position / self.block_size) as u32;

        let segment = Segment {
            block_index,
            in_block: block_offset..block_offset + len,
            in_slice: self.consumed..self.consumed + len,
        };

        self.position += len as u64;
        self.consumed += len;

        Some(segment)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.position >= self.end {
            return (0, Some(0));
        }

        let first_block = self.position / self.block_size;
        let last_block = (self.end - 1) / self.block_size;
        let count = usize::try_from(last_block - first_block + 1).unwrap_or(usize::MAX);

        (count, Some(count))
    }
}

impl ExactSizeIterator for Segments {}

impl FusedIterator for Segments {}
