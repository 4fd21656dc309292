// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::num::NonZero;

use new_zealand::nz;

use crate::BlockSize;

/// Configuration of a [`ResizableBuffer`][crate::ResizableBuffer].
///
/// The configuration is fixed when the buffer is created.
///
/// # Example
///
/// ```
/// use blockbuf::BufferConfig;
/// use new_zealand::nz;
///
/// let config = BufferConfig::default().with_block_size(nz!(4096)).with_size_max(1 << 20);
///
/// assert_eq!(config.block_size().get(), 4096);
/// assert_eq!(config.size_max(), 1 << 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BufferConfig {
    block_size: NonZero<BlockSize>,
    size_max: u32,
}

impl BufferConfig {
    /// The block size used when none is configured.
    pub const DEFAULT_BLOCK_SIZE: NonZero<BlockSize> = nz!(512);

    /// The maximum buffer size used when none is configured.
    pub const DEFAULT_SIZE_MAX: u32 = 1024;

    /// Creates a configuration with the given block size and maximum logical size.
    #[must_use]
    pub const fn new(block_size: NonZero<BlockSize>, size_max: u32) -> Self {
        Self { block_size, size_max }
    }

    /// Returns a copy of the configuration with a different block size.
    #[must_use]
    pub const fn with_block_size(self, block_size: NonZero<BlockSize>) -> Self {
        Self { block_size, ..self }
    }

    /// Returns a copy of the configuration with a different maximum logical size.
    #[must_use]
    pub const fn with_size_max(self, size_max: u32) -> Self {
        Self { size_max, ..self }
    }

    /// Number of bytes in each block.
    #[must_use]
    pub const fn block_size(&self) -> NonZero<BlockSize> {
        self.block_size
    }

    /// The hard ceiling on the logical size of the buffer.
    #[must_use]
    pub const fn size_max(&self) -> u32 {
        self.size_max
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BLOCK_SIZE, Self::DEFAULT_SIZE_MAX)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(BufferConfig: Send, Sync, Copy);

    #[test]
    fn defaults() {
        let config = BufferConfig::default();

        assert_eq!(config.block_size().get(), 512);
        assert_eq!(config.size_max(), 1024);
    }

    #[test]
    fn setters_only_touch_their_field() {
        let config = BufferConfig::default().with_block_size(nz!(8));
        assert_eq!(config.block_size().get(), 8);
        assert_eq!(config.size_max(), 1024);

        let config = config.with_size_max(77);
        assert_eq!(config.block_size().get(), 8);
        assert_eq!(config.size_max(), 77);

        assert_eq!(config, BufferConfig::new(nz!(8), 77));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_partial() {
        let config: BufferConfig = serde_json::from_str(r#"{ "block_size": 64 }"#).unwrap();

        assert_eq!(config, BufferConfig::new(nz!(64), BufferConfig::DEFAULT_SIZE_MAX));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn zero_block_size_is_rejected() {
        serde_json::from_str::<BufferConfig>(r#"{ "block_size": 0, "size_max": 10 }"#).unwrap_err();
    }
}
