// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cmp::Ordering;
use std::mem::ManuallyDrop;

use tracing::{Level, event};

use crate::geometry::Geometry;
use crate::segments::Segments;
use crate::{BlockStore, BufferConfig, BufferReader, Error, HeapBlockStore, Result, StoreError};

/// A byte buffer whose logical size can grow or shrink without moving bytes already written.
///
/// The buffer is backed by a sequence of fixed-size blocks obtained from a [`BlockStore`].
/// Growing the buffer appends blocks to the tail of the sequence, shrinking it releases
/// blocks from the tail. Blocks that stay in use are never touched by a resize.
///
/// The buffer always holds the minimum number of blocks sufficient for its logical size:
/// `ceil(len / block_size)`. Its logical size never exceeds the configured
/// [`size_max`][BufferConfig::size_max].
///
/// # Example
///
/// ```
/// use blockbuf::{BufferConfig, ResizableBuffer};
/// use new_zealand::nz;
///
/// let mut buffer = ResizableBuffer::new(BufferConfig::new(nz!(4), 32));
///
/// // Writing past the end grows the buffer to fit.
/// buffer.write_at(2, b"hello")?;
/// assert_eq!(buffer.len(), 7);
/// assert_eq!(buffer.status().block_num, 2);
///
/// let mut greeting = [0_u8; 5];
/// buffer.read_at(2, &mut greeting)?;
/// assert_eq!(&greeting, b"hello");
///
/// // Shrinking keeps the front of the buffer intact.
/// buffer.resize(4)?;
/// assert_eq!(buffer.status().block_num, 1);
///
/// let mut prefix = [0_u8; 2];
/// buffer.read_at(2, &mut prefix)?;
/// assert_eq!(&prefix, b"he");
/// # Ok::<(), blockbuf::Error>(())
/// ```
///
/// # Uninitialized content
///
/// Bytes that become part of the buffer without being written - because the buffer was grown
/// via [`resize()`][Self::resize] or because a write started past the end of the buffer - have
/// unspecified content. Do not rely on them being zero.
///
/// # Thread safety
///
/// All operations take place synchronously on the calling thread. The buffer is [`Send`] and
/// [`Sync`] if its block store is, but it performs no locking of its own - mutation requires
/// `&mut self`, so sharing a buffer between threads for mutation requires an external lock.
#[derive(Debug)]
pub struct ResizableBuffer<S: BlockStore = HeapBlockStore> {
    config: BufferConfig,
    store: S,
    geometry: Geometry,
}

/// A snapshot of the geometry of a [`ResizableBuffer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Status {
    /// Number of blocks currently held by the buffer.
    pub block_num: u32,

    /// Logical size of the buffer in bytes.
    pub logical_size: u32,
}

impl ResizableBuffer {
    /// Creates an empty buffer that takes its blocks from the global allocator.
    ///
    /// No memory is allocated until the buffer grows.
    #[must_use]
    pub fn new(config: BufferConfig) -> Self {
        event!(
            Level::TRACE,
            message = "new buffer",
            block_size = config.block_size().get(),
            size_max = config.size_max()
        );

        Self {
            config,
            store: HeapBlockStore::new(),
            geometry: Geometry::default(),
        }
    }
}

impl Default for ResizableBuffer {
    fn default() -> Self {
        Self::new(BufferConfig::default())
    }
}

impl<S: BlockStore> ResizableBuffer<S> {
    /// Creates an empty buffer that takes its blocks from `store`.
    ///
    /// Any blocks that `store` already holds are released first, so the new buffer starts
    /// out empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generic`] if the store fails to release its existing blocks. The
    /// store is dropped in that case.
    pub fn with_store(config: BufferConfig, mut store: S) -> Result<Self> {
        while store.block_count() > 0 {
            store.release_tail()?;
        }

        event!(
            Level::TRACE,
            message = "new buffer",
            block_size = config.block_size().get(),
            size_max = config.size_max()
        );

        Ok(Self {
            config,
            store,
            geometry: Geometry::default(),
        })
    }

    /// The configuration the buffer was created with.
    #[must_use]
    pub const fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// The block store that holds the blocks of the buffer.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// A snapshot of the current geometry.
    #[must_use]
    pub fn status(&self) -> Status {
        Status {
            block_num: self.geometry.block_num(),
            logical_size: self.geometry.logical_size(),
        }
    }

    /// Logical size of the buffer in bytes.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.geometry.logical_size()
    }

    /// Whether the logical size of the buffer is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of blocks currently held by the buffer.
    #[must_use]
    pub fn block_count(&self) -> u32 {
        self.geometry.block_num()
    }

    /// Total storage of all blocks held by the buffer, in bytes.
    ///
    /// This is always less than one block larger than [`len()`][Self::len].
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.geometry.capacity()
    }

    /// Number of bytes of the last block that lie within the logical size.
    ///
    /// This is zero for an empty buffer and otherwise between 1 and the block size.
    #[must_use]
    pub fn tail_used(&self) -> u32 {
        self.geometry.tail_used()
    }

    /// Changes the logical size of the buffer to `size` bytes.
    ///
    /// Blocks are appended or released at the tail until the buffer holds exactly
    /// `ceil(size / block_size)` blocks. Bytes below `min(size, len())` keep their content,
    /// bytes added by growing have unspecified content.
    ///
    /// Resizing to the current size does nothing.
    ///
    /// # Errors
    ///
    /// * [`Error::BadSize`] if `size` is larger than the configured maximum.
    /// * [`Error::OutOfMemory`] if a block cannot be allocated.
    /// * [`Error::Generic`] if the block store fails in another way.
    ///
    /// When growing fails, the buffer is left exactly as it was. When shrinking fails
    /// part-way through, the buffer reflects the blocks that were actually released.
    pub fn resize(&mut self, size: u32) -> Result<()> {
        if size > self.config.size_max() {
            event!(
                Level::DEBUG,
                message = "resize rejected",
                requested = size,
                size_max = self.config.size_max()
            );

            return Err(Error::BadSize {
                size: u64::from(size),
                limit: self.config.size_max(),
            });
        }

        let block_size = self.config.block_size();
        let target = Geometry::compute(block_size, size);
        let current_blocks = self.geometry.block_num();

        match target.block_num().cmp(&current_blocks) {
            Ordering::Greater => self.grow(target.block_num() - current_blocks)?,
            Ordering::Less => self.shrink(current_blocks - target.block_num())?,
            Ordering::Equal => {}
        }

        if target != self.geometry {
            event!(
                Level::TRACE,
                message = "resized",
                from = self.geometry.logical_size(),
                to = size,
                from_blocks = current_blocks,
                to_blocks = target.block_num()
            );
        }

        self.geometry = target;
        self.debug_assert_geometry();

        Ok(())
    }

    /// Copies `data` into the buffer, starting at byte `offset`.
    ///
    /// If the write reaches past the end of the buffer, the buffer first grows to
    /// `offset + data.len()` bytes. A write that starts past the end of the buffer leaves a gap
    /// of unspecified content between the old end and `offset`.
    ///
    /// # Errors
    ///
    /// * [`Error::BadSize`] if `offset + data.len()` is larger than the configured maximum.
    /// * [`Error::OutOfMemory`] if a block cannot be allocated.
    /// * [`Error::Generic`] if the block store fails in another way.
    ///
    /// If the buffer needed to grow and growing failed, no data has been written.
    pub fn write_at(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let end = u64::from(offset) + data.len() as u64;

        if end > u64::from(self.len()) {
            let Ok(end) = u32::try_from(end) else {
                return Err(Error::BadSize {
                    size: end,
                    limit: self.config.size_max(),
                });
            };

            self.resize(end)?;
        }

        let block_size = self.config.block_size();
        let mut segments = Segments::new(block_size, offset, data.len());

        for segment in segments.by_ref() {
            let block = self.store.block_mut(segment.block_index)?;
            let block_len = block.len();

            let target = block.get_mut(segment.in_block).ok_or(StoreError::ShortBlock {
                index: segment.block_index,
                len: block_len,
                expected: block_size.get(),
            })?;

            target.copy_from_slice(&data[segment.in_slice]);
        }

        assert_eq!(segments.remaining(), 0, "scatter loop ended with bytes left over");

        Ok(())
    }

    /// Copies `dest.len()` bytes starting at byte `offset` of the buffer into `dest`.
    ///
    /// Reading never changes the buffer.
    ///
    /// # Errors
    ///
    /// * [`Error::BadOffset`] if `offset` is past the end of the buffer.
    /// * [`Error::BadSize`] if the range extends past the end of the buffer.
    /// * [`Error::Generic`] if the block store fails.
    ///
    /// `dest` is not modified if the range is out of bounds.
    pub fn read_at(&self, offset: u32, dest: &mut [u8]) -> Result<()> {
        let len = self.len();

        if offset > len {
            return Err(Error::BadOffset { offset, len });
        }

        let end = u64::from(offset) + dest.len() as u64;
        if end > u64::from(len) {
            return Err(Error::BadSize { size: end, limit: len });
        }

        let block_size = self.config.block_size();
        let mut segments = Segments::new(block_size, offset, dest.len());

        for segment in segments.by_ref() {
            let block = self.store.block(segment.block_index)?;

            let source = block.get(segment.in_block).ok_or(StoreError::ShortBlock {
                index: segment.block_index,
                len: block.len(),
                expected: block_size.get(),
            })?;

            dest[segment.in_slice].copy_from_slice(source);
        }

        assert_eq!(segments.remaining(), 0, "gather loop ended with bytes left over");

        Ok(())
    }

    /// Appends `data` to the end of the buffer.
    ///
    /// Equivalent to `write_at(self.len(), data)`.
    ///
    /// # Errors
    ///
    /// See [`write_at()`][Self::write_at].
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        self.write_at(self.len(), data)
    }

    /// Copies the whole logical content of the buffer into a new vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generic`] if the block store fails.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut vec = vec![0; self.len() as usize];
        self.read_at(0, &mut vec)?;
        Ok(vec)
    }

    /// Creates a [`std::io::Read`] adapter over the logical content of the buffer.
    #[must_use]
    pub fn reader(&self) -> BufferReader<'_, S> {
        BufferReader::new(self)
    }

    /// Releases all blocks of the buffer and returns the now empty block store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generic`] if the store fails to release a block. The buffer is dropped
    /// regardless.
    pub fn into_store(self) -> Result<S> {
        let mut this = ManuallyDrop::new(self);
        let result = this.release_all();

        // SAFETY: `this` is never used again and its destructor does not run, so the store is
        // moved out exactly once. The other fields are `Copy` and need no drop.
        let store = unsafe { std::ptr::read(&this.store) };

        result.map(|()| store)
    }

    pub(crate) fn block(&self, index: u32) -> Result<&[u8]> {
        Ok(self.store.block(index)?)
    }

    fn grow(&mut self, additional: u32) -> Result<()> {
        self.store.reserve(additional)?;

        let block_size = self.config.block_size();

        for appended in 0..additional {
            if let Err(error) = self.store.allocate_tail(block_size) {
                event!(
                    Level::WARN,
                    message = "block allocation failed, rolling back",
                    appended,
                    requested = additional,
                    error = %error
                );

                self.roll_back(appended);
                return Err(error.into());
            }
        }

        Ok(())
    }

    #[expect(clippy::panic, reason = "block store contract violation is not recoverable")]
    fn roll_back(&mut self, appended: u32) {
        for _ in 0..appended {
            if let Err(error) = self.store.release_tail() {
                // The store just handed out this block, so failing to take it back means the
                // store is broken and the geometry can no longer be trusted.
                panic!("block store failed to release a block it just appended: {error}");
            }
        }
    }

    fn shrink(&mut self, count: u32) -> Result<()> {
        for released in 0..count {
            if let Err(error) = self.store.release_tail() {
                let remaining = self.geometry.block_num() - released;

                self.geometry = Geometry::truncated_to_blocks(
                    self.config.block_size(),
                    self.geometry.logical_size(),
                    remaining,
                );

                event!(
                    Level::WARN,
                    message = "block release failed, geometry truncated to remaining blocks",
                    released,
                    requested = count,
                    logical_size = self.geometry.logical_size(),
                    error = %error
                );

                self.debug_assert_geometry();
                return Err(error.into());
            }
        }

        Ok(())
    }

    fn release_all(&mut self) -> Result<()> {
        let blocks = self.geometry.block_num();

        let result = self.shrink(blocks);
        if result.is_ok() {
            self.geometry = Geometry::default();
        }

        event!(Level::TRACE, message = "buffer released", blocks);

        result
    }

    #[cfg_attr(test, mutants::skip)] // Debug-only consistency check.
    fn debug_assert_geometry(&self) {
        debug_assert!(
            self.geometry.is_valid(self.config.block_size()),
            "geometry is inconsistent: {:?}",
            self.geometry
        );
        debug_assert_eq!(
            self.geometry.block_num(),
            self.store.block_count(),
            "geometry does not match the block store"
        );
    }
}

impl<S: BlockStore> Drop for ResizableBuffer<S> {
    fn drop(&mut self) {
        // A failure here can only come from a store that breaks its own contract. The store
        // is dropped right after, which reclaims whatever it still holds.
        if let Err(error) = self.release_all() {
            event!(Level::WARN, message = "failed to release blocks on drop", error = %error);
        }
    }
}
