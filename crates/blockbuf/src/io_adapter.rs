// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};

use crate::{BlockStore, ResizableBuffer};

/// Adapter that implements [`Read`], [`BufRead`] and [`Seek`] over the content of a
/// [`ResizableBuffer`].
///
/// Create an instance via [`ResizableBuffer::reader()`][1].
///
/// The blocks of the buffer already act as a read buffer, so [`BufRead::fill_buf()`] returns
/// the remainder of the current block without copying. Prefer this over wrapping the reader
/// in [`std::io::BufReader`].
///
/// [1]: crate::ResizableBuffer::reader
#[derive(Debug)]
pub struct BufferReader<'b, S: BlockStore> {
    buffer: &'b ResizableBuffer<S>,
    position: u32,
}

impl<'b, S: BlockStore> BufferReader<'b, S> {
    #[must_use]
    pub(crate) const fn new(buffer: &'b ResizableBuffer<S>) -> Self {
        Self { buffer, position: 0 }
    }

    /// The offset in the buffer that the next read starts at.
    #[must_use]
    pub const fn position(&self) -> u32 {
        self.position
    }

    fn remaining(&self) -> u32 {
        self.buffer.len().saturating_sub(self.position)
    }
}

impl<S: BlockStore> Read for BufferReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let to_read = buf.len().min(self.remaining() as usize);
        if to_read == 0 {
            return Ok(0);
        }

        self.buffer.read_at(self.position, &mut buf[..to_read])?;

        // `to_read` is bounded by `remaining()`, which is a `u32`.
        #[expect(clippy::cast_possible_truncation, reason = "bounded by a u32, see above")]
        let advance = to_read as u32;
        self.position += advance;

        Ok(to_read)
    }
}

impl<S: BlockStore> BufRead for BufferReader<'_, S> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(&[]);
        }

        let block_size = self.buffer.config().block_size().get();
        let block_offset = (self.position % block_size) as usize;
        let len = (block_size - self.position % block_size).min(remaining) as usize;

        let block = self.buffer.block(self.position / block_size)?;

        block
            .get(block_offset..block_offset + len)
            .ok_or_else(|| io::Error::other("block is shorter than the configured block size"))
    }

    fn consume(&mut self, amount: usize) {
        let amount = u32::try_from(amount).unwrap_or(u32::MAX).min(self.remaining());
        self.position += amount;
    }
}

impl<S: BlockStore> Seek for BufferReader<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::End(delta) => i128::from(self.buffer.len()) + i128::from(delta),
            SeekFrom::Current(delta) => i128::from(self.position) + i128::from(delta),
        };

        // Seeking past the end is allowed, reads from there return no data.
        let position = u32::try_from(target).map_err(|_out_of_range| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek target is outside the addressable range")
        })?;

        self.position = position;
        Ok(u64::from(position))
    }
}

/// Appends written bytes to the end of the buffer.
///
/// A write either appends all of `buf` or fails, partial writes do not happen.
impl<S: BlockStore> Write for ResizableBuffer<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf)?;
        Ok(buf.len())
    }

    #[cfg_attr(test, mutants::skip)] // Nothing to flush.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use new_zealand::nz;

    use super::*;
    use crate::BufferConfig;

    fn filled(content: &[u8]) -> ResizableBuffer {
        let mut buffer = ResizableBuffer::new(BufferConfig::new(nz!(4), 64));
        buffer.append(content).unwrap();
        buffer
    }

    #[test]
    fn smoke_test() {
        let buffer = filled(b"Hello, world");
        let mut reader = buffer.reader();

        let mut chunk = [0_u8; 5];

        assert_eq!(reader.read(&mut chunk).unwrap(), 5);
        assert_eq!(&chunk, b"Hello");

        assert_eq!(reader.read(&mut chunk).unwrap(), 5);
        assert_eq!(&chunk, b", wor");

        assert_eq!(reader.read(&mut chunk).unwrap(), 2);
        assert_eq!(&chunk[..2], b"ld");

        assert_eq!(reader.read(&mut chunk).unwrap(), 0);
        assert_eq!(reader.position(), 12);
    }

    #[test]
    fn read_to_end() {
        let buffer = filled(b"0123456789abcdef01");
        let mut content = Vec::new();

        buffer.reader().read_to_end(&mut content).unwrap();

        assert_eq!(content, b"0123456789abcdef01");
    }

    #[test]
    fn fill_buf_is_limited_to_one_block() {
        let buffer = filled(b"first\nsecond\n");
        let mut reader = buffer.reader();

        assert_eq!(reader.fill_buf().unwrap(), b"firs");

        reader.consume(2);
        assert_eq!(reader.fill_buf().unwrap(), b"rs");

        reader.consume(2);
        assert_eq!(reader.fill_buf().unwrap(), b"t\nse");
    }

    #[test]
    fn fill_buf_stops_at_logical_end() {
        let buffer = filled(b"abcdef");
        let mut reader = buffer.reader();
        reader.consume(4);

        assert_eq!(reader.fill_buf().unwrap(), b"ef");

        reader.consume(100);
        assert!(reader.fill_buf().unwrap().is_empty());
    }

    #[test]
    fn read_lines_across_blocks() {
        let buffer = filled(b"first\nsecond\n");
        let lines: Vec<String> = buffer.reader().lines().map(Result::unwrap).collect();

        assert_eq!(lines, ["first", "second"]);
    }

    #[test]
    fn seek() {
        let buffer = filled(b"0123456789");
        let mut reader = buffer.reader();

        assert_eq!(reader.seek(SeekFrom::End(-3)).unwrap(), 7);
        let mut tail = String::new();
        reader.read_to_string(&mut tail).unwrap();
        assert_eq!(tail, "789");

        assert_eq!(reader.seek(SeekFrom::Start(2)).unwrap(), 2);
        assert_eq!(reader.seek(SeekFrom::Current(1)).unwrap(), 3);

        let mut byte = [0_u8; 1];
        reader.read_exact(&mut byte).unwrap();
        assert_eq!(&byte, b"3");

        reader.seek(SeekFrom::Current(-10)).unwrap_err();
        assert_eq!(reader.position(), 4);

        assert_eq!(reader.seek(SeekFrom::Start(50)).unwrap(), 50);
        assert_eq!(reader.read(&mut byte).unwrap(), 0);
    }

    #[test]
    fn write_appends() {
        let mut buffer = ResizableBuffer::new(BufferConfig::new(nz!(4), 64));

        write!(buffer, "{}-{}", 12, "ab").unwrap();
        buffer.write_all(b"!!").unwrap();
        buffer.flush().unwrap();

        assert_eq!(buffer.to_vec().unwrap(), b"12-ab!!");
    }

    #[test]
    fn write_beyond_max_is_invalid_input() {
        let mut buffer = ResizableBuffer::new(BufferConfig::new(nz!(4), 4));

        let error = buffer.write_all(b"too long").unwrap_err();

        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
        assert!(buffer.is_empty());
    }
}
