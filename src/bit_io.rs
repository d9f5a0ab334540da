use std::io::{self, Read, Write};

use bitvec::prelude::*;

use crate::error::{HuffmanError, Result};

/// Packs bits MSB first into bytes written to `W`.
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    inner: W,
    pending: u8,
    filled: u8,
    bytes_written: u64,
}

impl<W: Write> BitWriter<W> {
    pub fn new(inner: W) -> Self {
        BitWriter {
            inner,
            pending: 0,
            filled: 0,
            bytes_written: 0,
        }
    }

    pub fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        self.pending = (self.pending << 1) | bit as u8;
        self.filled += 1;
        if self.filled == 8 {
            self.inner.write_all(&[self.pending])?;
            self.bytes_written += 1;
            self.pending = 0;
            self.filled = 0;
        }
        Ok(())
    }

    pub fn write_code(&mut self, code: &BitSlice<u8, Msb0>) -> io::Result<()> {
        for bit in code.iter().by_vals() {
            self.write_bit(bit)?;
        }
        Ok(())
    }

    /// Bits accepted so far, padding excluded.
    pub fn bit_count(&self) -> u64 {
        self.bytes_written * 8 + self.filled as u64
    }

    /// Zero-pads the last partial byte, flushes, and hands back the sink along
    /// with the number of bytes written.
    pub fn finish(mut self) -> io::Result<(W, u64)> {
        if self.filled > 0 {
            let last = self.pending << (8 - self.filled);
            self.inner.write_all(&[last])?;
            self.bytes_written += 1;
        }
        self.inner.flush()?;
        Ok((self.inner, self.bytes_written))
    }
}

/// Yields the bits of `R` MSB first, one byte at a time.
#[derive(Debug)]
pub struct BitReader<R: Read> {
    inner: R,
    current: u8,
    remaining: u8,
    bits_read: u64,
}

impl<R: Read> BitReader<R> {
    pub fn new(inner: R) -> Self {
        BitReader {
            inner,
            current: 0,
            remaining: 0,
            bits_read: 0,
        }
    }

    /// Next bit, or `StreamTruncated` if another byte is needed and the
    /// stream has none.
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.remaining == 0 {
            let mut buf = [0u8; 1];
            match self.inner.read_exact(&mut buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(HuffmanError::StreamTruncated {
                        bits_read: self.bits_read,
                    });
                }
                Err(e) => return Err(e.into()),
            }
            self.current = buf[0];
            self.remaining = 8;
        }
        self.remaining -= 1;
        self.bits_read += 1;
        Ok((self.current >> self.remaining) & 1 == 1)
    }

    pub fn bits_read(&self) -> u64 {
        self.bits_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msb_first_with_zero_padding() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_code(bits![u8, Msb0; 1, 0, 1]).unwrap();
        assert_eq!(writer.bit_count(), 3);
        let (out, written) = writer.finish().unwrap();
        assert_eq!(out, vec![0b1010_0000]);
        assert_eq!(written, 1);
    }

    #[test]
    fn test_full_bytes_are_flushed_without_padding() {
        let mut writer = BitWriter::new(Vec::new());
        for bit in [1, 1, 0, 0, 1, 0, 1, 0, 1] {
            writer.write_bit(bit == 1).unwrap();
        }
        let (out, _) = writer.finish().unwrap();
        assert_eq!(out, vec![0b1100_1010, 0b1000_0000]);
    }

    #[test]
    fn test_empty_writer_emits_nothing() {
        let (out, written) = BitWriter::new(Vec::new()).finish().unwrap();
        assert!(out.is_empty());
        assert_eq!(written, 0);
    }

    #[test]
    fn test_reader_mirrors_writer() {
        let data = [0b1011_0001u8, 0b0100_0000];
        let mut reader = BitReader::new(&data[..]);
        let bits: Vec<bool> = (0..16).map(|_| reader.read_bit().unwrap()).collect();
        let expected = [1, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0];
        assert_eq!(bits, expected.iter().map(|&b| b == 1).collect::<Vec<_>>());
        assert_eq!(reader.bits_read(), 16);
    }

    #[test]
    fn test_reader_reports_truncation() {
        let data = [0xffu8];
        let mut reader = BitReader::new(&data[..]);
        for _ in 0..8 {
            assert!(reader.read_bit().unwrap());
        }
        match reader.read_bit() {
            Err(HuffmanError::StreamTruncated { bits_read }) => assert_eq!(bits_read, 8),
            other => panic!("expected truncation, got {:?}", other),
        }
    }
}
