//! Block coordination: symbol tallies, cost sizing and block emission.
//!
//! [`BlockEncoder`] collects the tokens of one block together with their raw
//! bytes. When the block is closed it sizes the three possible encodings,
//! writes the cheapest one and starts over with empty tallies.
//!
//! ```text
//! ACCUMULATING --(queue full / flush)--> SIZING --> EMITTING --> ACCUMULATING
//! ```

use crate::codelen::DynamicHeader;
use crate::huffman::{
    CodeTable, DISTANCE_ALPHABET_SIZE, END_OF_BLOCK, FrequencyTable, HuffmanBuilder,
    LITLEN_ALPHABET_SIZE,
};
use crate::lz77::{Lz77Token, MAX_MATCH};
use crate::tables::{distance_to_code, fixed_distance_codes, fixed_litlen_codes, length_to_code};
use oxiflate_core::bitstream::BitSink;
use oxiflate_core::error::{OxiFlateError, Result};
use tracing::debug;

/// Default capacity of the pending symbol queue.
pub const DEFAULT_PENDING_SYMBOLS: usize = 1 << 14;

/// Largest payload of a single stored block.
pub const MAX_STORED_BLOCK: usize = 65535;

/// Block encoding (the BTYPE field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    /// Uncompressed bytes.
    Stored,
    /// Fixed Huffman codes.
    Static,
    /// Huffman codes transmitted in the block header.
    Dynamic,
}

impl BlockType {
    /// Two-bit BTYPE value.
    pub fn bits(self) -> u32 {
        match self {
            Self::Stored => 0b00,
            Self::Static => 0b01,
            Self::Dynamic => 0b10,
        }
    }

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What was decided and written for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSummary {
    /// Encoding that was written.
    pub block_type: BlockType,
    /// Whether this was the last block of the stream.
    pub final_block: bool,
    /// Uncompressed bytes covered by the block.
    pub raw_len: usize,
    /// Literal and match tokens in the block, excluding end-of-block.
    pub symbols: usize,
    /// Cost of a stored encoding in bits.
    pub stored_bits: u64,
    /// Cost of a static encoding in bits.
    pub static_bits: u64,
    /// Cost of a dynamic encoding in bits.
    pub dynamic_bits: u64,
}

impl BlockSummary {
    /// Cost of the encoding that was written.
    pub fn chosen_bits(&self) -> u64 {
        match self.block_type {
            BlockType::Stored => self.stored_bits,
            BlockType::Static => self.static_bits,
            BlockType::Dynamic => self.dynamic_bits,
        }
    }
}

/// Accumulates one block and writes it in its cheapest encoding.
#[derive(Debug)]
pub struct BlockEncoder {
    litlen_freqs: FrequencyTable,
    dist_freqs: FrequencyTable,
    tokens: Vec<Lz77Token>,
    raw: Vec<u8>,
    /// Length and distance extra bits tallied so far.
    extra_bits: u64,
    capacity: usize,
}

impl BlockEncoder {
    /// Create an encoder whose queue holds `capacity` tokens.
    pub fn new(capacity: usize) -> Self {
        Self {
            litlen_freqs: FrequencyTable::new(LITLEN_ALPHABET_SIZE),
            dist_freqs: FrequencyTable::new(DISTANCE_ALPHABET_SIZE),
            tokens: Vec::with_capacity(capacity),
            raw: Vec::with_capacity(MAX_STORED_BLOCK),
            extra_bits: 0,
            capacity,
        }
    }

    /// Record a literal byte.
    pub fn tally_literal(&mut self, byte: u8) {
        self.litlen_freqs.increment(byte as u16);
        self.tokens.push(Lz77Token::Literal(byte));
        self.raw.push(byte);
    }

    /// Record a match covering `bytes`.
    pub fn tally_match(&mut self, length: u16, distance: u16, bytes: &[u8]) {
        debug_assert_eq!(bytes.len(), length as usize);

        let (len_code, len_extra_bits, _) = length_to_code(length);
        let (dist_code, dist_extra_bits, _) = distance_to_code(distance);
        self.litlen_freqs.increment(len_code);
        self.dist_freqs.increment(dist_code);
        self.extra_bits += len_extra_bits as u64 + dist_extra_bits as u64;

        self.tokens.push(Lz77Token::Match { length, distance });
        self.raw.extend_from_slice(bytes);
    }

    /// Record a token produced by the match finder together with its bytes.
    pub fn tally(&mut self, token: Lz77Token, bytes: &[u8]) {
        match token {
            Lz77Token::Literal(byte) => self.tally_literal(byte),
            Lz77Token::Match { length, distance } => self.tally_match(length, distance, bytes),
        }
    }

    /// Whether the block must be closed before the next token.
    ///
    /// Also true when another match could push the raw bytes past what a
    /// single stored block can hold.
    pub fn is_full(&self) -> bool {
        self.tokens.len() >= self.capacity || self.raw.len() >= MAX_STORED_BLOCK - MAX_MATCH
    }

    /// Whether no token has been recorded since the last flush.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens queued in the current block.
    pub fn pending_symbols(&self) -> usize {
        self.tokens.len()
    }

    /// Raw bytes covered by the current block.
    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }

    /// Drop everything recorded since the last flush.
    pub fn reset(&mut self) {
        self.litlen_freqs.reset();
        self.dist_freqs.reset();
        self.tokens.clear();
        self.raw.clear();
        self.extra_bits = 0;
    }

    /// Close the block: size all encodings and write the cheapest one.
    pub fn flush_block<S: BitSink + ?Sized>(
        &mut self,
        final_block: bool,
        sink: &mut S,
    ) -> Result<BlockSummary> {
        self.litlen_freqs.increment(END_OF_BLOCK);

        let litlen = HuffmanBuilder::litlen().build(&self.litlen_freqs)?;
        let dist = HuffmanBuilder::distance().build(&self.dist_freqs)?;
        let header = DynamicHeader::new(&litlen, &dist)?;

        let fixed_litlen = fixed_litlen_codes();
        let fixed_dist = fixed_distance_codes();

        let stored_bits = (self.raw.len() as u64 + 5) * 8;
        let static_bits = 3
            + fixed_litlen.encoded_length(&self.litlen_freqs)
            + fixed_dist.encoded_length(&self.dist_freqs)
            + self.extra_bits;
        let dynamic_bits = 3
            + header.cost()
            + litlen.encoded_length(&self.litlen_freqs)
            + dist.encoded_length(&self.dist_freqs)
            + self.extra_bits;

        let (huffman_type, huffman_bits) = if static_bits <= dynamic_bits {
            (BlockType::Static, static_bits)
        } else {
            (BlockType::Dynamic, dynamic_bits)
        };
        let block_type = if stored_bits < huffman_bits && self.raw.len() <= MAX_STORED_BLOCK {
            BlockType::Stored
        } else {
            huffman_type
        };

        sink.write_bits(final_block as u32 | (block_type.bits() << 1), 3)?;
        match block_type {
            BlockType::Stored => write_stored_payload(&self.raw, sink)?,
            BlockType::Static => self.write_symbols(fixed_litlen, fixed_dist, sink)?,
            BlockType::Dynamic => {
                header.write(sink)?;
                self.write_symbols(&litlen, &dist, sink)?;
            }
        }

        let summary = BlockSummary {
            block_type,
            final_block,
            raw_len: self.raw.len(),
            symbols: self.tokens.len(),
            stored_bits,
            static_bits,
            dynamic_bits,
        };
        debug!(
            block_type = %summary.block_type,
            final_block,
            raw_len = summary.raw_len,
            symbols = summary.symbols,
            stored_bits,
            static_bits,
            dynamic_bits,
            "emitted block"
        );

        self.reset();
        if !self.litlen_freqs.is_empty() || !self.dist_freqs.is_empty() {
            return Err(OxiFlateError::internal(
                "frequency tables not empty after block reset",
            ));
        }

        Ok(summary)
    }

    fn write_symbols<S: BitSink + ?Sized>(
        &self,
        litlen: &CodeTable,
        dist: &CodeTable,
        sink: &mut S,
    ) -> Result<()> {
        for token in &self.tokens {
            match *token {
                Lz77Token::Literal(byte) => {
                    let (code, len) = litlen.code(byte as usize);
                    sink.write_bits(code as u32, len)?;
                }
                Lz77Token::Match { length, distance } => {
                    let (len_code, len_extra_bits, len_extra) = length_to_code(length);
                    let (code, len) = litlen.code(len_code as usize);
                    sink.write_bits(code as u32, len)?;
                    if len_extra_bits > 0 {
                        sink.write_bits(len_extra as u32, len_extra_bits)?;
                    }

                    let (dist_code, dist_extra_bits, dist_extra) = distance_to_code(distance);
                    let (code, len) = dist.code(dist_code as usize);
                    sink.write_bits(code as u32, len)?;
                    if dist_extra_bits > 0 {
                        sink.write_bits(dist_extra as u32, dist_extra_bits)?;
                    }
                }
            }
        }

        let (code, len) = litlen.code(END_OF_BLOCK as usize);
        sink.write_bits(code as u32, len)
    }
}

/// Write the body of a stored block: align, LEN, NLEN, bytes.
///
/// The 3-bit block header must already have been written.
pub fn write_stored_payload<S: BitSink + ?Sized>(data: &[u8], sink: &mut S) -> Result<()> {
    let len = data.len() as u16;
    sink.align_to_byte()?;
    sink.write_bits(len as u32, 16)?;
    sink.write_bits(!len as u32, 16)?;
    sink.write_bytes(data)
}

/// Write an empty, non-final stored block.
///
/// Used by flushes to bring the output to a byte boundary.
pub fn write_empty_stored_block<S: BitSink + ?Sized>(sink: &mut S) -> Result<()> {
    sink.write_bits(BlockType::Stored.bits() << 1, 3)?;
    write_stored_payload(&[], sink)
}
