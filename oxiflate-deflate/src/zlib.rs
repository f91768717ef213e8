//! Zlib format wrapper for DEFLATE compression.
//!
//! The zlib format (RFC 1950) wraps raw DEFLATE data with a header and
//! an Adler-32 checksum. It is widely used in PNG, HTTP compression, and
//! many other applications.
//!
//! # Format
//!
//! ```text
//! +---+---+============+---+---+---+---+
//! |CMF|FLG| compressed |    ADLER32    |
//! +---+---+============+---+---+---+---+
//! ```
//!
//! - CMF: Compression Method and Flags
//!   - Bits 0-3: CM (Compression Method) - must be 8 for DEFLATE
//!   - Bits 4-7: CINFO (Compression Info) - log2(window size) - 8
//! - FLG: Flags
//!   - Bits 0-4: FCHECK - check bits so (CMF*256 + FLG) mod 31 == 0
//!   - Bit 5: FDICT - preset dictionary present (never set here)
//!   - Bits 6-7: FLEVEL - compression level (0-3)
//! - Compressed data (DEFLATE format)
//! - ADLER32: Adler-32 checksum of uncompressed data (big-endian)

use crate::deflate::{DeflateConfig, deflate};
use crate::encoder::DeflateEncoder;
use crate::lz77::WINDOW_SIZE;
use oxiflate_core::checksum::Adler32;
use oxiflate_core::error::Result;
use oxiflate_core::traits::FlushMode;
use std::io::{self, Write};

/// Compression method 8: DEFLATE.
const CM_DEFLATE: u8 = 8;

/// Zlib compression level indicator in header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ZlibLevel {
    /// Fastest compression.
    Fastest = 0,
    /// Fast compression.
    Fast = 1,
    /// Default compression.
    Default = 2,
    /// Maximum compression.
    Maximum = 3,
}

impl ZlibLevel {
    /// Convert from compression level (0-9) to zlib level indicator.
    pub fn from_level(level: u8) -> Self {
        match level {
            0..=2 => Self::Fastest,
            3..=5 => Self::Fast,
            6 => Self::Default,
            _ => Self::Maximum,
        }
    }
}

/// Build the two header bytes for a level and window size.
pub fn zlib_header(level: u8, window_size: usize) -> [u8; 2] {
    // CINFO is log2(window) - 8; 32KB gives 7.
    let cinfo = (window_size.trailing_zeros().saturating_sub(8)).min(7) as u8;
    let cmf = (cinfo << 4) | CM_DEFLATE;

    let flevel = ZlibLevel::from_level(level) as u8;
    let base = (cmf as u16) * 256 + (flevel << 6) as u16;
    let fcheck = (31 - base % 31) % 31;
    let flg = (flevel << 6) | fcheck as u8;

    [cmf, flg]
}

/// Compress data using zlib format.
///
/// # Arguments
///
/// * `input` - Data to compress
/// * `level` - Compression level (0-9)
///
/// # Example
///
/// ```
/// use oxiflate_deflate::zlib::zlib_compress;
///
/// let data = b"Hello, World! Hello, World!";
/// let compressed = zlib_compress(data, 6).unwrap();
/// assert_eq!(compressed[0], 0x78);
/// ```
pub fn zlib_compress(input: &[u8], level: u8) -> Result<Vec<u8>> {
    let level = level.min(9);
    let compressed = deflate(input, level)?;

    let mut output = Vec::with_capacity(6 + compressed.len());
    output.extend_from_slice(&zlib_header(level, WINDOW_SIZE));
    output.extend_from_slice(&compressed);
    output.extend_from_slice(&Adler32::checksum(input).to_be_bytes());

    Ok(output)
}

/// A zlib encoder that compresses everything written to it.
///
/// The header is written before the first compressed byte; the Adler-32
/// trailer is written by [`ZlibEncoder::finish`].
#[derive(Debug)]
pub struct ZlibEncoder<W: Write> {
    inner: DeflateEncoder<W>,
    header: [u8; 2],
    header_written: bool,
    trailer_written: bool,
}

impl<W: Write> ZlibEncoder<W> {
    /// Create an encoder with the specified level (0-9).
    pub fn new(writer: W, level: u8) -> Self {
        Self {
            inner: DeflateEncoder::new(writer, level),
            header: zlib_header(level.min(9), WINDOW_SIZE),
            header_written: false,
            trailer_written: false,
        }
    }

    /// Create an encoder from an explicit configuration.
    pub fn with_config(writer: W, config: DeflateConfig) -> Result<Self> {
        Ok(Self {
            inner: DeflateEncoder::with_config(writer, config)?,
            header: zlib_header(config.level.level(), config.window_size),
            header_written: false,
            trailer_written: false,
        })
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }

    /// The wrapped raw encoder.
    pub fn encoder(&self) -> &DeflateEncoder<W> {
        &self.inner
    }

    fn write_header(&mut self) -> Result<()> {
        if !self.header_written {
            self.inner.get_mut().write_all(&self.header)?;
            self.header_written = true;
        }
        Ok(())
    }

    /// Compress `data` with the given flush mode and pass the output on.
    pub fn write_with_flush(&mut self, data: &[u8], flush: FlushMode) -> Result<()> {
        self.write_header()?;
        self.inner.write_with_flush(data, flush)
    }

    /// Write the final block and the checksum trailer without giving up
    /// the writer.
    pub fn try_finish(&mut self) -> Result<()> {
        self.write_header()?;
        self.inner.try_finish()?;
        if !self.trailer_written {
            let checksum = self.inner.deflater().checksum();
            let writer = self.inner.get_mut();
            writer.write_all(&checksum.to_be_bytes())?;
            writer.flush()?;
            self.trailer_written = true;
        }
        Ok(())
    }

    /// Write the final block and the checksum trailer, returning the writer.
    pub fn finish(mut self) -> Result<W> {
        self.try_finish()?;
        self.inner.finish()
    }
}

impl<W: Write> Write for ZlibEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_with_flush(buf, FlushMode::None)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.write_header()?;
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn zlib_decompress(data: &[u8]) -> io::Result<Vec<u8>> {
        let mut output = Vec::new();
        flate2::read::ZlibDecoder::new(data).read_to_end(&mut output)?;
        Ok(output)
    }

    #[test]
    fn test_zlib_header() {
        let compressed = zlib_compress(b"test", 6).expect("compress failed");

        // Check CMF byte
        assert_eq!(compressed[0], 0x78);
        assert_eq!(compressed[1], 0x9C);

        // Check FLG header validation
        for level in 0..=9 {
            for bits in 10..=15 {
                let [cmf, flg] = zlib_header(level, 1 << bits);
                assert_eq!(cmf & 0x0F, 8);
                assert_eq!((cmf >> 4) as u32, bits - 8);
                assert_eq!((cmf as u16 * 256 + flg as u16) % 31, 0);
                assert_eq!(flg & 0x20, 0);
            }
        }
    }

    #[test]
    fn test_zlib_roundtrip_simple() {
        let data = b"Hello, World!";
        let compressed = zlib_compress(data, 6).expect("compress failed");
        let decompressed = zlib_decompress(&compressed).expect("decompress failed");
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_zlib_roundtrip_empty() {
        let compressed = zlib_compress(b"", 6).expect("compress failed");
        assert_eq!(compressed, vec![0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
        let decompressed = zlib_decompress(&compressed).expect("decompress failed");
        assert!(decompressed.is_empty());
    }

    #[test]
    fn test_zlib_levels() {
        let data = b"Hello, World! Hello, World! Hello, World!";

        for level in 0..=9 {
            let compressed = zlib_compress(data, level)
                .unwrap_or_else(|_| panic!("level {} compress failed", level));
            let decompressed = zlib_decompress(&compressed)
                .unwrap_or_else(|_| panic!("level {} decompress failed", level));
            assert_eq!(&decompressed[..], &data[..]);
        }
    }

    #[test]
    fn test_zlib_trailer_is_adler32() {
        let data = b"Wikipedia";
        let compressed = zlib_compress(data, 6).expect("compress failed");
        let trailer = &compressed[compressed.len() - 4..];
        assert_eq!(trailer, &0x11E6_0398u32.to_be_bytes());
    }

    #[test]
    fn test_encoder_matches_one_shot() {
        let data: Vec<u8> = (0..10000).map(|i| (i % 256) as u8).collect();

        let mut encoder = ZlibEncoder::new(Vec::new(), 6);
        for chunk in data.chunks(1000) {
            encoder.write_all(chunk).expect("write failed");
        }
        let streamed = encoder.finish().expect("finish failed");

        assert_eq!(streamed, zlib_compress(&data, 6).expect("compress failed"));
        assert_eq!(zlib_decompress(&streamed).expect("decompress failed"), data);
    }

    #[test]
    fn test_try_finish_is_idempotent() {
        let mut encoder = ZlibEncoder::new(Vec::new(), 6);
        encoder.write_all(b"once").expect("write failed");
        encoder.try_finish().expect("finish failed");
        let len = encoder.get_ref().len();
        encoder.try_finish().expect("second finish failed");
        assert_eq!(encoder.get_ref().len(), len);
        assert!(encoder.write(b"twice").is_err());

        let streamed = encoder.finish().expect("finish failed");
        assert_eq!(zlib_decompress(&streamed).expect("decompress failed"), b"once");
    }

    #[test]
    fn test_encoder_with_small_window() {
        let config = DeflateConfig::from_level(9).with_window_bits(10);
        let mut encoder = ZlibEncoder::with_config(Vec::new(), config).expect("config rejected");
        let data = b"small window, small window, small window".repeat(100);
        encoder.write_all(&data).expect("write failed");
        encoder.flush().expect("flush failed");
        assert_eq!(encoder.get_ref()[0], 0x28);

        let streamed = encoder.finish().expect("finish failed");
        assert_eq!(zlib_decompress(&streamed).expect("decompress failed"), data);
    }

    #[test]
    fn test_corrupted_trailer_is_detected() {
        let data = b"Test data for checksum";
        let mut compressed = zlib_compress(data, 6).expect("compress failed");
        let len = compressed.len();
        compressed[len - 1] ^= 0xFF;
        assert!(zlib_decompress(&compressed).is_err());
    }
}
