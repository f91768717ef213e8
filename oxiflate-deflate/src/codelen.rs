//! Dynamic block headers: run-length coded code lengths.
//!
//! A dynamic block transmits its literal/length and distance code lengths
//! using a third Huffman code over the code length alphabet (RFC 1951
//! Section 3.2.7):
//!
//! - 0-15: a code length
//! - 16: repeat the previous length 3-6 times (2 extra bits)
//! - 17: repeat a zero length 3-10 times (3 extra bits)
//! - 18: repeat a zero length 11-138 times (7 extra bits)
//!
//! Each table is run-length coded on its own, literal/length first.

use crate::huffman::{CODELEN_ALPHABET_SIZE, CodeTable, FrequencyTable, HuffmanBuilder};
use crate::tables::CODE_LENGTH_ORDER;
use oxiflate_core::bitstream::BitSink;
use oxiflate_core::error::Result;

const REPEAT_PREVIOUS: u8 = 16;
const REPEAT_ZERO_SHORT: u8 = 17;
const REPEAT_ZERO_LONG: u8 = 18;

/// One symbol of the code length alphabet plus its extra bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLengthSymbol {
    /// Symbol in 0-18.
    pub symbol: u8,
    /// Extra bits value (repeat count minus the base).
    pub extra: u8,
    /// Number of extra bits.
    pub extra_bits: u8,
}

impl CodeLengthSymbol {
    fn length(len: u8) -> Self {
        Self {
            symbol: len,
            extra: 0,
            extra_bits: 0,
        }
    }

    fn repeat(symbol: u8, extra: usize, extra_bits: u8) -> Self {
        Self {
            symbol,
            extra: extra as u8,
            extra_bits,
        }
    }
}

/// Run-length code one table's lengths.
pub fn run_length_encode(lengths: &[u8], out: &mut Vec<CodeLengthSymbol>) {
    let mut i = 0;
    while i < lengths.len() {
        let len = lengths[i];
        let run = lengths[i..].iter().take_while(|&&l| l == len).count();
        i += run;

        let mut remaining = run;
        if len == 0 {
            while remaining >= 11 {
                let count = remaining.min(138);
                out.push(CodeLengthSymbol::repeat(REPEAT_ZERO_LONG, count - 11, 7));
                remaining -= count;
            }
            if remaining >= 3 {
                out.push(CodeLengthSymbol::repeat(REPEAT_ZERO_SHORT, remaining - 3, 3));
                remaining = 0;
            }
        } else {
            out.push(CodeLengthSymbol::length(len));
            remaining -= 1;
            while remaining >= 3 {
                let count = remaining.min(6);
                out.push(CodeLengthSymbol::repeat(REPEAT_PREVIOUS, count - 3, 2));
                remaining -= count;
            }
        }
        out.extend(std::iter::repeat_n(CodeLengthSymbol::length(len), remaining));
    }
}

/// Everything a dynamic block sends before its symbol stream.
#[derive(Debug, Clone)]
pub struct DynamicHeader {
    litlen_count: usize,
    dist_count: usize,
    symbols: Vec<CodeLengthSymbol>,
    freqs: FrequencyTable,
    table: CodeTable,
    hclen: usize,
}

impl DynamicHeader {
    /// Encode the lengths of a literal/length and a distance table.
    pub fn new(litlen: &CodeTable, dist: &CodeTable) -> Result<Self> {
        let litlen_count = litlen.num_codes();
        let dist_count = dist.num_codes();

        let mut symbols = Vec::with_capacity(litlen_count + dist_count);
        run_length_encode(&litlen.lengths()[..litlen_count], &mut symbols);
        run_length_encode(&dist.lengths()[..dist_count], &mut symbols);

        let mut freqs = FrequencyTable::new(CODELEN_ALPHABET_SIZE);
        for sym in &symbols {
            freqs.increment(sym.symbol as u16);
        }
        let table = HuffmanBuilder::codelen().build(&freqs)?;

        let hclen = CODE_LENGTH_ORDER
            .iter()
            .rposition(|&s| table.length(s) > 0)
            .map_or(0, |p| p + 1)
            .max(4);

        Ok(Self {
            litlen_count,
            dist_count,
            symbols,
            freqs,
            table,
            hclen,
        })
    }

    /// Number of transmitted literal/length codes (HLIT + 257).
    pub fn litlen_count(&self) -> usize {
        self.litlen_count
    }

    /// Number of transmitted distance codes (HDIST + 1).
    pub fn dist_count(&self) -> usize {
        self.dist_count
    }

    /// Number of transmitted code length code lengths (HCLEN + 4).
    pub fn hclen(&self) -> usize {
        self.hclen
    }

    /// The run-length coded symbols.
    pub fn symbols(&self) -> &[CodeLengthSymbol] {
        &self.symbols
    }

    /// The code length code.
    pub fn table(&self) -> &CodeTable {
        &self.table
    }

    /// Header size in bits, excluding the 3-bit block header.
    pub fn cost(&self) -> u64 {
        let extra: u64 = self.symbols.iter().map(|s| s.extra_bits as u64).sum();
        14 + 3 * self.hclen as u64 + self.table.encoded_length(&self.freqs) + extra
    }

    /// Write HLIT, HDIST, HCLEN, the code length code and the coded tables.
    pub fn write<S: BitSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        sink.write_bits((self.litlen_count - 257) as u32, 5)?;
        sink.write_bits((self.dist_count - 1) as u32, 5)?;
        sink.write_bits((self.hclen - 4) as u32, 4)?;

        for &symbol in &CODE_LENGTH_ORDER[..self.hclen] {
            sink.write_bits(self.table.length(symbol) as u32, 3)?;
        }

        for sym in &self.symbols {
            let (code, len) = self.table.code(sym.symbol as usize);
            sink.write_bits(code as u32, len)?;
            if sym.extra_bits > 0 {
                sink.write_bits(sym.extra as u32, sym.extra_bits)?;
            }
        }
        Ok(())
    }
}
