// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Utilities for testing code that uses resizable buffers.

use std::num::NonZero;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::{BlockSize, BlockStore, HeapBlockStore, StoreError};

/// A block store that keeps count of its blocks and can be told to fail.
///
/// Blocks are allocated from the Rust global allocator via [`HeapBlockStore`]. Every append
/// and release is recorded in a [`StoreStats`] handle that remains readable after the store
/// itself (and the buffer that owns it) has been dropped, which makes it possible to verify
/// that a buffer releases all of its blocks.
///
/// Failures can be injected to exercise error handling paths:
///
/// * [`fail_allocations_after()`][Self::fail_allocations_after]
/// * [`fail_releases_after()`][Self::fail_releases_after]
/// * [`fail_reservations()`][Self::fail_reservations]
///
/// This store is meant for tests only and should not be used in real code.
#[derive(Debug, Default)]
pub struct TrackingBlockStore {
    inner: HeapBlockStore,
    stats: StoreStats,

    // Number of further successful calls before injected failures start. `None` means never.
    allocations_left: Option<u32>,
    releases_left: Option<u32>,

    fail_reservations: bool,
}

impl TrackingBlockStore {
    /// Creates an empty store that never fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the counters of this store.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.stats.clone()
    }

    /// Lets the next `count` block allocations succeed and fails every one after that with
    /// [`StoreError::OutOfMemory`].
    pub fn fail_allocations_after(&mut self, count: u32) {
        self.allocations_left = Some(count);
    }

    /// Lets the next `count` block releases succeed and fails every one after that with
    /// [`StoreError::Empty`], leaving the block in place.
    pub fn fail_releases_after(&mut self, count: u32) {
        self.releases_left = Some(count);
    }

    /// Makes every reservation fail with [`StoreError::OutOfMemory`].
    pub fn fail_reservations(&mut self, fail: bool) {
        self.fail_reservations = fail;
    }

    /// Removes all injected failures.
    pub fn heal(&mut self) {
        self.allocations_left = None;
        self.releases_left = None;
        self.fail_reservations = false;
    }
}

/// Takes one permit from a failure injection budget, returning `false` if none are left.
fn take_permit(budget: &mut Option<u32>) -> bool {
    match budget {
        None => true,
        Some(0) => false,
        Some(left) => {
            *left -= 1;
            true
        }
    }
}

impl BlockStore for TrackingBlockStore {
    fn block_count(&self) -> u32 {
        self.inner.block_count()
    }

    fn reserve(&mut self, additional: u32) -> Result<(), StoreError> {
        if self.fail_reservations {
            return Err(StoreError::OutOfMemory);
        }

        self.inner.reserve(additional)
    }

    fn allocate_tail(&mut self, capacity: NonZero<BlockSize>) -> Result<(), StoreError> {
        if !take_permit(&mut self.allocations_left) {
            return Err(StoreError::OutOfMemory);
        }

        self.inner.allocate_tail(capacity)?;
        self.stats.inner.allocations.fetch_add(1, Ordering::Relaxed);
        self.stats.inner.live_blocks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn release_tail(&mut self) -> Result<(), StoreError> {
        if !take_permit(&mut self.releases_left) {
            return Err(StoreError::Empty);
        }

        self.inner.release_tail()?;
        self.stats.inner.releases.fetch_add(1, Ordering::Relaxed);
        self.stats.inner.live_blocks.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }

    fn block(&self, index: u32) -> Result<&[u8], StoreError> {
        self.inner.block(index)
    }

    fn block_mut(&mut self, index: u32) -> Result<&mut [u8], StoreError> {
        self.inner.block_mut(index)
    }
}

impl Drop for TrackingBlockStore {
    fn drop(&mut self) {
        // Blocks still held here are freed with the inner store, so they are no longer live.
        let remaining = self.inner.block_count();
        self.stats.inner.live_blocks.fetch_sub(remaining, Ordering::Relaxed);
        self.stats.inner.dropped_with_blocks.fetch_add(remaining, Ordering::Relaxed);
    }
}

/// Counters of a [`TrackingBlockStore`].
///
/// Cloning the handle shares the counters.
#[derive(Clone, Debug, Default)]
pub struct StoreStats {
    inner: Arc<StoreStatsInner>,
}

#[derive(Debug, Default)]
struct StoreStatsInner {
    allocations: AtomicU32,
    releases: AtomicU32,
    live_blocks: AtomicU32,
    dropped_with_blocks: AtomicU32,
}

impl StoreStats {
    /// Number of blocks successfully appended.
    #[must_use]
    pub fn allocations(&self) -> u32 {
        self.inner.allocations.load(Ordering::Relaxed)
    }

    /// Number of blocks successfully released via [`BlockStore::release_tail()`].
    #[must_use]
    pub fn releases(&self) -> u32 {
        self.inner.releases.load(Ordering::Relaxed)
    }

    /// Number of blocks currently allocated.
    #[must_use]
    pub fn live_blocks(&self) -> u32 {
        self.inner.live_blocks.load(Ordering::Relaxed)
    }

    /// Number of blocks that were still in the store when it was dropped, instead of having
    /// been released by its owner.
    #[must_use]
    pub fn dropped_with_blocks(&self) -> u32 {
        self.inner.dropped_with_blocks.load(Ordering::Relaxed)
    }
}
