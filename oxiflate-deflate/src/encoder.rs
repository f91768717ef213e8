//! `io::Write` adapter over the streaming [`Deflater`].

use crate::deflate::{DeflateConfig, Deflater};
use oxiflate_core::error::Result;
use oxiflate_core::traits::FlushMode;
use std::io::{self, Write};

/// Size of the buffer used to move compressed bytes to the writer.
const OUTPUT_CHUNK: usize = 16 * 1024;

/// A raw DEFLATE encoder that compresses everything written to it.
///
/// Call [`DeflateEncoder::finish`] to write the final block; dropping the
/// encoder abandons the stream. [`Write::flush`] performs a sync flush.
///
/// # Example
///
/// ```
/// use oxiflate_deflate::DeflateEncoder;
/// use std::io::Write;
///
/// let mut encoder = DeflateEncoder::new(Vec::new(), 6);
/// encoder.write_all(b"Hello, World! Hello, World!").unwrap();
/// let compressed = encoder.finish().unwrap();
/// assert!(!compressed.is_empty());
/// ```
#[derive(Debug)]
pub struct DeflateEncoder<W: Write> {
    deflater: Deflater,
    writer: W,
    buffer: Vec<u8>,
}

impl<W: Write> DeflateEncoder<W> {
    /// Create an encoder with the specified level (0-9).
    pub fn new(writer: W, level: u8) -> Self {
        Self::from_deflater(writer, Deflater::new(level))
    }

    /// Create an encoder from an explicit configuration.
    pub fn with_config(writer: W, config: DeflateConfig) -> Result<Self> {
        Ok(Self::from_deflater(writer, Deflater::with_config(config)?))
    }

    fn from_deflater(writer: W, deflater: Deflater) -> Self {
        Self {
            deflater,
            writer,
            buffer: vec![0; OUTPUT_CHUNK],
        }
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Get a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// The engine, for checksums, counters and block summaries.
    pub fn deflater(&self) -> &Deflater {
        &self.deflater
    }

    /// Compress `data` with the given flush mode and pass the output on.
    pub fn write_with_flush(&mut self, data: &[u8], flush: FlushMode) -> Result<()> {
        self.deflater.set_input(data, 0, data.len())?;
        self.deflater.deflate(flush)?;
        self.dump()
    }

    fn dump(&mut self) -> Result<()> {
        loop {
            let n = self.deflater.read_output(&mut self.buffer);
            if n == 0 {
                return Ok(());
            }
            self.writer.write_all(&self.buffer[..n])?;
        }
    }

    /// Write the final block without giving up the writer.
    pub fn try_finish(&mut self) -> Result<()> {
        if !self.deflater.is_finished() {
            self.write_with_flush(&[], FlushMode::Finish)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Write the final block and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.try_finish()?;
        Ok(self.writer)
    }
}

impl<W: Write> Write for DeflateEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_with_flush(buf, FlushMode::None)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.deflater.is_finished() {
            self.write_with_flush(&[], FlushMode::Sync)?;
        }
        self.writer.flush()
    }
}
