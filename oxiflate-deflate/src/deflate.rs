//! DEFLATE compression.
//!
//! This module implements the streaming DEFLATE engine as specified in
//! RFC 1951. Input is supplied with [`Deflater::set_input`], compressed with
//! [`Deflater::deflate`] and collected with [`Deflater::read_output`]. Each
//! block is written as whichever of the following is smallest:
//! - Stored blocks (no compression)
//! - Fixed Huffman codes
//! - Dynamic Huffman codes

use crate::block::{BlockEncoder, BlockSummary, DEFAULT_PENDING_SYMBOLS, write_empty_stored_block};
use crate::lz77::{MIN_WINDOW_SIZE, MatchFinder, WINDOW_SIZE};
use oxiflate_core::bitstream::BitWriter;
use oxiflate_core::checksum::{Adler32, RollingChecksum};
use oxiflate_core::error::{OxiFlateError, Result};
use oxiflate_core::traits::{CompressStatus, CompressionLevel, Compressor, FlushMode};
use tracing::trace;

/// Largest accepted pending symbol capacity.
const MAX_PENDING_SYMBOLS: usize = 1 << 20;

/// Block summaries retained by a [`Deflater`]; older ones are dropped.
pub const BLOCK_HISTORY: usize = 1024;

/// Tuning for a [`Deflater`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateConfig {
    /// Compression level the remaining fields were derived from.
    pub level: CompressionLevel,
    /// History window in bytes, a power of two in 1024..=32768.
    pub window_size: usize,
    /// Hash chain entries checked per search. Zero disables matching.
    pub max_chain: usize,
    /// Defer a match by one byte when the next position matches longer.
    pub lazy_matching: bool,
    /// Tokens buffered before a block is forced out.
    pub pending_symbols: usize,
}

impl DeflateConfig {
    /// Configuration for a compression level (0-9).
    pub fn from_level(level: impl Into<CompressionLevel>) -> Self {
        let level = level.into();
        let (max_chain, lazy_matching) = MatchFinder::level_params(level.level());
        Self {
            level,
            window_size: WINDOW_SIZE,
            max_chain,
            lazy_matching,
            pending_symbols: DEFAULT_PENDING_SYMBOLS,
        }
    }

    /// Set the window size in bytes.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Set the window size as a power of two (10-15).
    pub fn with_window_bits(mut self, bits: u8) -> Self {
        self.window_size = 1usize.checked_shl(bits as u32).unwrap_or(0);
        self
    }

    /// Set the hash chain budget.
    pub fn with_max_chain(mut self, max_chain: usize) -> Self {
        self.max_chain = max_chain;
        self
    }

    /// Enable or disable lazy matching.
    pub fn with_lazy_matching(mut self, lazy_matching: bool) -> Self {
        self.lazy_matching = lazy_matching;
        self
    }

    /// Set the pending symbol capacity.
    pub fn with_pending_symbols(mut self, pending_symbols: usize) -> Self {
        self.pending_symbols = pending_symbols;
        self
    }

    /// Check that every field is in range.
    pub fn validate(&self) -> Result<()> {
        if !self.window_size.is_power_of_two()
            || !(MIN_WINDOW_SIZE..=WINDOW_SIZE).contains(&self.window_size)
        {
            return Err(OxiFlateError::invalid_config(format!(
                "window size must be a power of two between {} and {}, got {}",
                MIN_WINDOW_SIZE, WINDOW_SIZE, self.window_size
            )));
        }
        if !(1..=MAX_PENDING_SYMBOLS).contains(&self.pending_symbols) {
            return Err(OxiFlateError::invalid_config(format!(
                "pending symbol capacity must be between 1 and {}, got {}",
                MAX_PENDING_SYMBOLS, self.pending_symbols
            )));
        }
        Ok(())
    }
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self::from_level(CompressionLevel::DEFAULT)
    }
}

/// Streaming DEFLATE compressor.
#[derive(Debug)]
pub struct Deflater {
    config: DeflateConfig,
    finder: MatchFinder,
    block: BlockEncoder,
    /// Complete output bytes land in the inner vector.
    writer: BitWriter<Vec<u8>>,
    /// Read cursor into the writer's vector.
    output_pos: usize,
    input: Vec<u8>,
    input_pos: usize,
    checksum: Adler32,
    total_in: u64,
    total_out: u64,
    blocks: Vec<BlockSummary>,
    block_count: u64,
    finished: bool,
}

impl Deflater {
    /// Create a new DEFLATE compressor with the specified level (0-9).
    pub fn new(level: u8) -> Self {
        Self::build(DeflateConfig::from_level(level))
    }

    /// Create a compressor from an explicit configuration.
    pub fn with_config(config: DeflateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: DeflateConfig) -> Self {
        trace!(?config, "creating deflater");
        Self {
            config,
            finder: MatchFinder::new(config.window_size, config.max_chain, config.lazy_matching),
            block: BlockEncoder::new(config.pending_symbols),
            writer: BitWriter::new(Vec::new()),
            output_pos: 0,
            input: Vec::new(),
            input_pos: 0,
            checksum: Adler32::new(),
            total_in: 0,
            total_out: 0,
            blocks: Vec::new(),
            block_count: 0,
            finished: false,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &DeflateConfig {
        &self.config
    }

    /// Supply `len` bytes of `buf` starting at `offset`.
    ///
    /// Fails without changing any state if the previous input has not been
    /// consumed, if the range lies outside `buf`, or if the stream has
    /// already been finished.
    pub fn set_input(&mut self, buf: &[u8], offset: usize, len: usize) -> Result<()> {
        if !self.needs_input() {
            return Err(OxiFlateError::input_pending(self.input.len() - self.input_pos));
        }
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= buf.len())
            .ok_or_else(|| OxiFlateError::input_out_of_bounds(offset, len, buf.len()))?;
        if self.finished && len > 0 {
            return Err(OxiFlateError::StreamFinished);
        }

        self.input.clear();
        self.input.extend_from_slice(&buf[offset..end]);
        self.input_pos = 0;
        Ok(())
    }

    /// Whether all supplied input has been consumed.
    pub fn needs_input(&self) -> bool {
        self.input_pos == self.input.len()
    }

    /// Run the engine over the supplied input.
    ///
    /// All input is consumed. `FlushMode::Sync` and `FlushMode::Full` close
    /// the current block and byte-align the output with an empty stored
    /// block; `Full` also forgets the match history. `FlushMode::Finish`
    /// writes the final block. Returns whether any progress was made.
    pub fn deflate(&mut self, flush: FlushMode) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }

        let mut progress = false;
        loop {
            let taken = self.finder.fill(&self.input[self.input_pos..]);
            if taken > 0 {
                let consumed = &self.input[self.input_pos..self.input_pos + taken];
                self.checksum.update(consumed);
                self.input_pos += taken;
                self.total_in += taken as u64;
                progress = true;
            }

            let flushing = flush.is_flush() && self.needs_input();
            let mut tokens = 0usize;
            while let Some(token) = self.finder.next_token(flushing) {
                self.block.tally(token, self.finder.recent(token.byte_len()));
                tokens += 1;
                if self.block.is_full() {
                    self.emit_block(false)?;
                }
            }
            progress |= tokens > 0;

            if self.needs_input() {
                break;
            }
            if taken == 0 && tokens == 0 {
                return Err(OxiFlateError::internal(
                    "match finder accepted no input and produced no tokens",
                ));
            }
        }

        match flush {
            FlushMode::None => {}
            FlushMode::Sync | FlushMode::Full => {
                if !self.block.is_empty() {
                    self.emit_block(false)?;
                }
                write_empty_stored_block(&mut self.writer)?;
                if flush == FlushMode::Full {
                    self.finder.reset();
                }
                progress = true;
            }
            FlushMode::Finish => {
                self.emit_block(true)?;
                self.writer.flush()?;
                self.finished = true;
                progress = true;
            }
        }

        Ok(progress)
    }

    fn emit_block(&mut self, final_block: bool) -> Result<()> {
        let summary = self.block.flush_block(final_block, &mut self.writer)?;
        if self.blocks.len() == BLOCK_HISTORY {
            self.blocks.drain(..BLOCK_HISTORY / 2);
        }
        self.blocks.push(summary);
        self.block_count += 1;
        Ok(())
    }

    /// Copy complete output bytes into `buf`, returning how many were copied.
    pub fn read_output(&mut self, buf: &mut [u8]) -> usize {
        let output = self.writer.get_mut();
        let available = &output[self.output_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);

        self.output_pos += n;
        if self.output_pos == output.len() {
            output.clear();
            self.output_pos = 0;
        }
        self.total_out += n as u64;
        n
    }

    /// Complete output bytes not yet read.
    pub fn pending_output(&self) -> usize {
        self.writer.get_ref().len() - self.output_pos
    }

    /// Adler-32 of all input consumed so far.
    pub fn checksum(&self) -> u32 {
        self.checksum.value()
    }

    /// Restart the checksum without touching the stream.
    pub fn reset_checksum(&mut self) {
        self.checksum.reset();
    }

    /// Bytes of input consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Bytes of output read through [`Deflater::read_output`].
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Summaries of the most recent blocks, oldest first.
    ///
    /// At most [`BLOCK_HISTORY`] are kept; use [`Deflater::take_blocks`] to
    /// collect every summary of a long stream.
    pub fn blocks(&self) -> &[BlockSummary] {
        &self.blocks
    }

    /// Remove and return the retained block summaries.
    pub fn take_blocks(&mut self) -> Vec<BlockSummary> {
        std::mem::take(&mut self.blocks)
    }

    /// Number of blocks written so far.
    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    /// Whether the final block has been written.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Reset the compressor for a new, independent stream.
    pub fn reset(&mut self) {
        self.finder.reset();
        self.block.reset();
        self.writer = BitWriter::new(Vec::new());
        self.output_pos = 0;
        self.input.clear();
        self.input_pos = 0;
        self.checksum.reset();
        self.total_in = 0;
        self.total_out = 0;
        self.blocks.clear();
        self.block_count = 0;
        self.finished = false;
    }
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Compressor for Deflater {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        // Drain output left over from a previous call first.
        if input.is_empty() && (self.pending_output() > 0 || self.finished) {
            let written = self.read_output(output);
            return Ok((0, written, self.status()));
        }

        self.set_input(input, 0, input.len())?;
        self.deflate(flush)?;
        let written = self.read_output(output);

        Ok((input.len(), written, self.status()))
    }

    fn reset(&mut self) {
        Deflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Deflater {
    fn status(&self) -> CompressStatus {
        if self.pending_output() > 0 {
            CompressStatus::NeedsOutput
        } else if self.finished {
            CompressStatus::Done
        } else {
            CompressStatus::NeedsInput
        }
    }
}

/// Compress data using DEFLATE.
pub fn deflate(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let mut deflater = Deflater::new(level);
    deflater.set_input(data, 0, data.len())?;
    deflater.deflate(FlushMode::Finish)?;

    let mut output = vec![0u8; deflater.pending_output()];
    deflater.read_output(&mut output);
    Ok(output)
}
