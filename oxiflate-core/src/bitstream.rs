//! Bit-level output for the DEFLATE bitstream.
//!
//! This module provides [`BitWriter`], the bit sink the compressor writes
//! Huffman codes, extra bits and stored-block payloads into, and the
//! [`BitSink`] trait describing the three primitives the block writer needs.
//!
//! # Bit Ordering
//!
//! DEFLATE packs bits LSB-first within bytes: the first bit written lands in
//! the least significant bit of the first byte. Huffman codes are therefore
//! stored bit-reversed so that they can be emitted with a single
//! [`BitSink::write_bits`] call.
//!
//! # Example
//!
//! ```
//! use oxiflate_core::bitstream::{BitSink, BitWriter};
//!
//! let mut output = Vec::new();
//! {
//!     let mut writer = BitWriter::new(&mut output);
//!     writer.write_bits(0b101, 3).unwrap();
//!     writer.write_bits(0b11001, 5).unwrap();
//!     writer.flush().unwrap();
//! }
//! assert_eq!(output, vec![0xCD]);
//! ```

use crate::error::Result;
use std::io::Write;

/// The bit sink the block writer emits into.
///
/// Values are written LSB-first. Implementations must buffer partial bytes
/// until they are complete or until [`BitSink::align_to_byte`] pads them.
pub trait BitSink {
    /// Write the low `count` bits of `value` (0-32 bits).
    fn write_bits(&mut self, value: u32, count: u8) -> Result<()>;

    /// Pad with zero bits up to the next byte boundary.
    fn align_to_byte(&mut self) -> Result<()>;

    /// Write a block of raw bytes. The sink must be byte aligned.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;
}

/// A bit-level writer that wraps any `Write` implementation.
///
/// `BitWriter` accumulates bits in an internal buffer and flushes complete
/// bytes to the underlying writer. Call `flush()` when done to write any
/// remaining partial byte.
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    /// Underlying writer.
    writer: W,
    /// Bit buffer (LSB-first).
    buffer: u64,
    /// Number of bits in buffer.
    bits_in_buffer: u8,
    /// Total bits written.
    total_bits_written: u64,
}

impl<W: Write> BitWriter<W> {
    /// Create a new `BitWriter` wrapping the given writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: 0,
            bits_in_buffer: 0,
            total_bits_written: 0,
        }
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Get a mutable reference to the underlying writer.
    ///
    /// Bits still held in the internal buffer have not reached the writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Pad to a byte boundary, flush, and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.writer)
    }

    /// Get the total number of bits written so far, including padding.
    pub fn bits_written(&self) -> u64 {
        self.total_bits_written
    }

    /// Number of bits waiting for a complete byte.
    pub fn pending_bits(&self) -> u8 {
        self.bits_in_buffer
    }

    /// Whether the next bit starts a new byte.
    pub fn is_aligned(&self) -> bool {
        self.bits_in_buffer % 8 == 0
    }

    /// Flush complete bytes from the buffer to the writer.
    #[inline]
    fn flush_bytes(&mut self) -> Result<()> {
        if self.bits_in_buffer >= 32 {
            let bytes = (self.buffer as u32).to_le_bytes();
            self.writer.write_all(&bytes)?;
            self.buffer >>= 32;
            self.bits_in_buffer -= 32;
        }

        while self.bits_in_buffer >= 8 {
            let byte = (self.buffer & 0xFF) as u8;
            self.writer.write_all(&[byte])?;
            self.buffer >>= 8;
            self.bits_in_buffer -= 8;
        }
        Ok(())
    }

    /// Write up to 32 bits to the stream.
    ///
    /// # Arguments
    ///
    /// * `value` - The bits to write (LSB-first)
    /// * `count` - Number of bits to write (0-32)
    #[inline]
    pub fn write_bits(&mut self, value: u32, count: u8) -> Result<()> {
        debug_assert!(count <= 32, "Cannot write more than 32 bits at once");

        if count == 0 {
            return Ok(());
        }

        let mask = if count == 32 {
            u32::MAX
        } else {
            (1u32 << count).wrapping_sub(1)
        };
        let value = value & mask;

        self.buffer |= (value as u64) << self.bits_in_buffer;
        self.bits_in_buffer += count;
        self.total_bits_written += count as u64;

        self.flush_bytes()
    }

    /// Pad to byte boundary with zeros.
    pub fn align_to_byte(&mut self) -> Result<()> {
        if self.bits_in_buffer % 8 != 0 {
            let padding = 8 - (self.bits_in_buffer % 8);
            self.write_bits(0, padding)?;
        }
        Ok(())
    }

    /// Flush any remaining bits to the underlying writer.
    ///
    /// If there are partial bits, they are padded with zeros to complete
    /// the final byte.
    pub fn flush(&mut self) -> Result<()> {
        self.align_to_byte()?;
        self.flush_bytes()?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write bytes directly to the stream.
    ///
    /// When the buffer holds a partial byte the bytes are shifted in bit by
    /// bit; otherwise they are passed straight to the writer.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.flush_bytes()?;

        if self.bits_in_buffer > 0 {
            for &byte in buf {
                self.write_bits(byte as u32, 8)?;
            }
        } else {
            self.writer.write_all(buf)?;
            self.total_bits_written += buf.len() as u64 * 8;
        }

        Ok(())
    }
}

impl<W: Write> BitSink for BitWriter<W> {
    #[inline]
    fn write_bits(&mut self, value: u32, count: u8) -> Result<()> {
        BitWriter::write_bits(self, value, count)
    }

    fn align_to_byte(&mut self) -> Result<()> {
        BitWriter::align_to_byte(self)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        BitWriter::write_bytes(self, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitwriter_basic() {
        let mut output = Vec::new();
        {
            let mut writer = BitWriter::new(&mut output);
            // 0b10110101, LSB first
            for bit in [true, false, true, false, true, true, false, true] {
                writer.write_bits(u32::from(bit), 1).unwrap();
            }
            writer.flush().unwrap();
        }
        assert_eq!(output, vec![0xB5]);
    }

    #[test]
    fn test_bitwriter_multi_bits() {
        let mut output = Vec::new();
        {
            let mut writer = BitWriter::new(&mut output);
            writer.write_bits(0b101, 3).unwrap();
            writer.write_bits(0b11001, 5).unwrap();
            writer.flush().unwrap();
        }
        // 3 bits: 101, 5 bits: 11001 -> 11001_101 = 0xCD
        assert_eq!(output, vec![0xCD]);
    }

    #[test]
    fn test_write_bits_crossing_bytes() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0x3, 2).unwrap();
        writer.write_bits(0xABCD, 16).unwrap();
        assert_eq!(writer.pending_bits(), 2);
        let output = writer.into_inner().unwrap();
        // 0xABCD << 2 | 0b11 = 0x2AF37
        assert_eq!(output, vec![0x37, 0xAF, 0x02]);
    }

    #[test]
    fn test_align_and_write_bytes() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0b1, 3).unwrap();
        assert!(!writer.is_aligned());
        writer.align_to_byte().unwrap();
        assert!(writer.is_aligned());
        writer.write_bytes(&[0x12, 0x34]).unwrap();
        assert_eq!(writer.bits_written(), 24);
        assert_eq!(writer.get_ref(), &vec![0x01, 0x12, 0x34]);
    }

    #[test]
    fn test_write_bytes_unaligned() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0b1, 4).unwrap();
        writer.write_bytes(&[0xFF]).unwrap();
        let output = writer.into_inner().unwrap();
        assert_eq!(output, vec![0xF1, 0x0F]);
    }

    #[test]
    fn test_sink_trait_dispatch() {
        fn emit(sink: &mut dyn BitSink) -> Result<()> {
            sink.write_bits(0b1, 1)?;
            sink.align_to_byte()?;
            sink.write_bytes(b"ok")
        }

        let mut writer = BitWriter::new(Vec::new());
        emit(&mut writer).unwrap();
        assert_eq!(writer.into_inner().unwrap(), vec![0x01, b'o', b'k']);
    }
}
