// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! A resizable byte buffer backed by fixed-size memory blocks.
//!
//! [`ResizableBuffer`] behaves like a growable `Vec<u8>` with one key difference: growing the
//! buffer never moves bytes that have already been written. Instead of reallocating one
//! contiguous region, the buffer holds a sequence of equally sized memory blocks and adds or
//! removes blocks at the tail as its logical size changes.
//!
//! This makes the buffer suitable for constrained environments where a reallocate-and-copy
//! cycle on every growth step is too expensive, or where large contiguous allocations are
//! hard to come by.
//!
//! # Geometry
//!
//! The relationship between the logical size of the buffer and the blocks that back it is
//! called its geometry. With a block size of `B` bytes and a logical size of `n` bytes, the
//! buffer always holds exactly `ceil(n / B)` blocks - the minimum number sufficient to hold
//! its contents.
//!
//! ```
//! use blockbuf::{BufferConfig, ResizableBuffer};
//! use new_zealand::nz;
//!
//! let mut buffer = ResizableBuffer::new(BufferConfig::new(nz!(8), 64));
//!
//! buffer.append(b"ABCDEFGH")?;
//! buffer.append(b"IJ")?;
//!
//! let status = buffer.status();
//! assert_eq!(status.logical_size, 10);
//! assert_eq!(status.block_num, 2);
//!
//! let mut out = [0_u8; 10];
//! buffer.read_at(0, &mut out)?;
//! assert_eq!(&out, b"ABCDEFGHIJ");
//! # Ok::<(), blockbuf::Error>(())
//! ```
//!
//! # Reading and writing
//!
//! [`write_at()`][ResizableBuffer::write_at] scatters a byte slice over as many blocks as it
//! spans, growing the buffer first if the write reaches past the current end.
//! [`read_at()`][ResizableBuffer::read_at] gathers bytes from the blocks into a destination
//! slice and never grows the buffer. [`append()`][ResizableBuffer::append] writes at the end.
//!
//! Bytes that become part of the buffer without having been written (by growing via
//! [`resize()`][ResizableBuffer::resize] or by writing past the end) have unspecified content.
//!
//! # Block stores
//!
//! Blocks are obtained from a [`BlockStore`]. The default store, [`HeapBlockStore`], allocates
//! blocks from the Rust global allocator and reports allocation failures as errors instead of
//! aborting. Custom stores may be supplied via [`ResizableBuffer::with_store()`].
//!
//! # Failure atomicity
//!
//! Growing the buffer by several blocks is performed one block at a time. If the store fails
//! part-way through, the blocks added by the failed call are released again, so the buffer
//! geometry always matches the blocks that the store actually holds.

mod buffer;
mod config;
mod error;
mod geometry;
mod heap_store;
mod io_adapter;
mod segments;
mod store;

pub use buffer::{ResizableBuffer, Status};
pub use config::BufferConfig;
pub use error::{Error, Result, StoreError};
pub use heap_store::HeapBlockStore;
pub use io_adapter::BufferReader;
pub use store::{BlockSize, BlockStore};

#[cfg(any(test, feature = "test-util"))]
pub mod testing;
