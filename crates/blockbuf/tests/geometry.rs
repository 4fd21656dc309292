// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for how the buffer reconciles its logical size with its blocks.

use std::num::NonZero;

use blockbuf::testing::{StoreStats, TrackingBlockStore};
use blockbuf::{BlockStore, BufferConfig, Error, ResizableBuffer, Status};
use rstest::rstest;

fn tracked(block_size: u32, size_max: u32) -> (ResizableBuffer<TrackingBlockStore>, StoreStats) {
    let store = TrackingBlockStore::new();
    let stats = store.stats();
    let config = BufferConfig::new(NonZero::new(block_size).unwrap(), size_max);

    (ResizableBuffer::with_store(config, store).unwrap(), stats)
}

#[test]
fn created_with_defaults_is_empty() {
    let buffer = ResizableBuffer::new(BufferConfig::default());

    assert_eq!(
        buffer.status(),
        Status {
            block_num: 0,
            logical_size: 0
        }
    );
    assert_eq!(buffer.config().block_size().get(), 512);
    assert_eq!(buffer.config().size_max(), 1024);
}

#[rstest]
#[case(512, 1024)]
#[case(8, 100)]
#[case(7, 50)]
#[case(1, 20)]
#[case(100, 99)]
fn every_allowed_size_has_minimal_geometry(#[case] block_size: u32, #[case] size_max: u32) {
    let (mut buffer, stats) = tracked(block_size, size_max);

    // Walk up and then back down so that both directions are exercised from every size.
    let sizes = (0..=size_max).chain((0..size_max).rev());

    for size in sizes {
        buffer.resize(size).unwrap();

        let status = buffer.status();
        assert_eq!(status.logical_size, size);
        assert_eq!(status.block_num, size.div_ceil(block_size));
        assert!(buffer.capacity() - u64::from(size) < u64::from(block_size));
        assert!(u64::from(size) <= buffer.capacity());

        assert_eq!(buffer.store().block_count(), status.block_num);
        assert_eq!(stats.live_blocks(), status.block_num);
    }
}

#[rstest]
#[case(0)]
#[case(100)]
#[case(1024)]
fn oversized_resize_leaves_geometry_unchanged(#[case] initial: u32) {
    let (mut buffer, stats) = tracked(512, 1024);
    buffer.resize(initial).unwrap();

    let before = buffer.status();
    let allocations = stats.allocations();

    for size in [1025, 4096, u32::MAX] {
        let error = buffer.resize(size).unwrap_err();
        assert!(matches!(error, Error::BadSize { limit: 1024, .. }));
    }

    assert_eq!(buffer.status(), before);
    assert_eq!(stats.allocations(), allocations);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(8)]
#[case(9)]
#[case(64)]
fn repeated_resize_is_idempotent(#[case] size: u32) {
    let (mut buffer, stats) = tracked(8, 64);

    buffer.resize(size).unwrap();
    let status = buffer.status();
    let allocations = stats.allocations();
    let releases = stats.releases();

    buffer.resize(size).unwrap();

    assert_eq!(buffer.status(), status);
    assert_eq!(stats.allocations(), allocations);
    assert_eq!(stats.releases(), releases);
}

#[test]
fn blocks_are_added_and_removed_one_at_a_time_at_the_tail() {
    let (mut buffer, stats) = tracked(8, 1024);

    buffer.resize(100).unwrap();
    assert_eq!(stats.allocations(), 13);

    buffer.resize(30).unwrap();
    assert_eq!(stats.releases(), 9);
    assert_eq!(stats.live_blocks(), 4);

    buffer.resize(31).unwrap();
    assert_eq!(stats.allocations(), 13);
    assert_eq!(stats.releases(), 9);
}

#[test]
fn tail_usage() {
    let (mut buffer, _stats) = tracked(8, 64);

    buffer.resize(0).unwrap();
    assert_eq!(buffer.tail_used(), 0);

    buffer.resize(3).unwrap();
    assert_eq!(buffer.tail_used(), 3);

    buffer.resize(16).unwrap();
    assert_eq!(buffer.tail_used(), 8);

    buffer.resize(17).unwrap();
    assert_eq!(buffer.tail_used(), 1);
}

#[rstest]
#[case::first_block_fails(0)]
#[case::middle_block_fails(3)]
#[case::last_block_fails(6)]
fn failed_growth_is_rolled_back(#[case] successful_allocations: u32) {
    let mut store = TrackingBlockStore::new();
    let stats = store.stats();

    // The first append below takes one allocation, the growth step needs seven more.
    store.fail_allocations_after(successful_allocations + 1);

    let mut buffer = ResizableBuffer::with_store(BufferConfig::new(NonZero::new(8).unwrap(), 1024), store).unwrap();
    buffer.append(b"keep me").unwrap();
    let before = buffer.status();

    let error = buffer.resize(64).unwrap_err();

    assert!(matches!(error, Error::OutOfMemory));
    assert_eq!(buffer.status(), before);
    assert_eq!(buffer.store().block_count(), before.block_num);
    assert_eq!(stats.live_blocks(), before.block_num);
    assert_eq!(stats.allocations(), successful_allocations + 1);
    assert_eq!(stats.releases(), successful_allocations);
    assert_eq!(buffer.to_vec().unwrap(), b"keep me");
}

#[test]
fn failed_release_leaves_geometry_matching_store() {
    let mut store = TrackingBlockStore::new();
    let stats = store.stats();
    store.fail_releases_after(1);

    let mut buffer = ResizableBuffer::with_store(BufferConfig::new(NonZero::new(4).unwrap(), 64), store).unwrap();
    buffer.append(b"0123456789abcdef").unwrap();

    let error = buffer.resize(2).unwrap_err();

    assert!(matches!(error, Error::Generic(_)));
    assert_eq!(
        buffer.status(),
        Status {
            block_num: 3,
            logical_size: 12
        }
    );
    assert_eq!(stats.live_blocks(), 3);
    assert_eq!(buffer.to_vec().unwrap(), b"0123456789ab");
}
