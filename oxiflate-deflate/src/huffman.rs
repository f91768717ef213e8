//! Huffman coding for DEFLATE compression.
//!
//! This module builds the length-limited canonical Huffman codes that
//! dynamic blocks transmit, as specified in RFC 1951. DEFLATE uses canonical
//! Huffman codes, where codes of the same length are assigned consecutive
//! values in lexicographic order, so only the bit lengths need to be sent.
//!
//! # Alphabets
//!
//! DEFLATE uses three Huffman alphabets:
//! - **Literal/Length**: 0-285 (0-255 literals, 256 EOB, 257-285 lengths)
//! - **Distance**: 0-29 (back-reference distances)
//! - **Code Length**: 0-18 (for encoding dynamic Huffman trees)
//!
//! # Construction
//!
//! [`HuffmanBuilder::build`] runs in three steps:
//! 1. An unconstrained Huffman tree ([`HuffmanTree`]) gives each symbol a depth.
//! 2. If any depth exceeds the cap, package-merge recomputes the lengths
//!    as the optimal code within the cap.
//! 3. Canonical codes are assigned from the final lengths ([`CodeTable`]).

use oxiflate_core::error::{OxiFlateError, Result};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Maximum code length in DEFLATE (15 bits).
pub const MAX_CODE_LENGTH: usize = 15;

/// Maximum code length for the code length alphabet (7 bits).
pub const MAX_CODELEN_LENGTH: usize = 7;

/// Size of the literal/length alphabet (0-285).
pub const LITLEN_ALPHABET_SIZE: usize = 286;

/// Size of the distance alphabet (0-29).
pub const DISTANCE_ALPHABET_SIZE: usize = 30;

/// Size of the code length alphabet (0-18).
pub const CODELEN_ALPHABET_SIZE: usize = 19;

/// End of block symbol.
pub const END_OF_BLOCK: u16 = 256;

/// Per-symbol occurrence counts for one alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: Vec<u32>,
}

impl FrequencyTable {
    /// Create an all-zero table for an alphabet of `alphabet_size` symbols.
    pub fn new(alphabet_size: usize) -> Self {
        Self {
            counts: vec![0; alphabet_size],
        }
    }

    /// Create a table from explicit counts.
    pub fn from_counts(counts: &[u32]) -> Self {
        Self {
            counts: counts.to_vec(),
        }
    }

    /// Record one occurrence of `symbol`.
    #[inline]
    pub fn increment(&mut self, symbol: u16) {
        self.counts[symbol as usize] += 1;
    }

    /// Record `count` occurrences of `symbol`.
    #[inline]
    pub fn add(&mut self, symbol: u16, count: u32) {
        self.counts[symbol as usize] += count;
    }

    /// Count for `symbol`.
    #[inline]
    pub fn get(&self, symbol: usize) -> u32 {
        self.counts[symbol]
    }

    /// Zero every count.
    pub fn reset(&mut self) {
        self.counts.fill(0);
    }

    /// Whether every count is zero.
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Number of symbols in the alphabet.
    pub fn alphabet_size(&self) -> usize {
        self.counts.len()
    }

    /// Raw counts indexed by symbol.
    pub fn as_slice(&self) -> &[u32] {
        &self.counts
    }
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf { symbol: u16 },
    Internal { left: usize, right: usize },
}

/// An unconstrained Huffman tree, stored as an arena of nodes.
///
/// Built once per block and alphabet, queried for leaf depths, then dropped.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    weights: Vec<u64>,
    root: Option<usize>,
    alphabet_size: usize,
}

impl HuffmanTree {
    /// Build the tree for every symbol with a nonzero count.
    ///
    /// Merges always take the two lightest subtrees, ordered by
    /// (weight, height, creation order). A lone symbol is paired with the
    /// lowest unused symbol id at weight zero so that it still receives a
    /// one-bit code.
    pub fn build(freqs: &FrequencyTable) -> Self {
        let alphabet_size = freqs.alphabet_size();
        let mut tree = Self {
            nodes: Vec::with_capacity(2 * alphabet_size),
            weights: Vec::with_capacity(2 * alphabet_size),
            root: None,
            alphabet_size,
        };

        let mut heap = BinaryHeap::new();
        for (symbol, &count) in freqs.as_slice().iter().enumerate() {
            if count > 0 {
                let idx = tree.push(Node::Leaf { symbol: symbol as u16 }, count as u64);
                heap.push(Reverse((count as u64, 0u32, idx)));
            }
        }

        match heap.len() {
            0 => return tree,
            1 => {
                // Symbols at or past `alphabet_size` are dropped from the depths.
                let sibling = freqs
                    .as_slice()
                    .iter()
                    .position(|&c| c == 0)
                    .unwrap_or(alphabet_size);
                let idx = tree.push(
                    Node::Leaf {
                        symbol: sibling as u16,
                    },
                    0,
                );
                heap.push(Reverse((0, 0, idx)));
            }
            _ => {}
        }

        while let Some(Reverse((w1, h1, a))) = heap.pop() {
            let Some(Reverse((w2, h2, b))) = heap.pop() else {
                tree.root = Some(a);
                break;
            };
            let idx = tree.push(Node::Internal { left: a, right: b }, w1 + w2);
            heap.push(Reverse((w1 + w2, h1.max(h2) + 1, idx)));
        }

        tree
    }

    fn push(&mut self, node: Node, weight: u64) -> usize {
        self.nodes.push(node);
        self.weights.push(weight);
        self.nodes.len() - 1
    }

    /// Depth of every leaf, indexed by symbol. Absent symbols have depth 0.
    pub fn leaf_depths(&self) -> Vec<u32> {
        let mut depths = vec![0u32; self.alphabet_size];
        let Some(root) = self.root else {
            return depths;
        };

        let mut stack = vec![(root, 0u32)];
        while let Some((idx, depth)) = stack.pop() {
            match self.nodes[idx] {
                Node::Leaf { symbol } => {
                    if let Some(slot) = depths.get_mut(symbol as usize) {
                        *slot = depth;
                    }
                }
                Node::Internal { left, right } => {
                    stack.push((left, depth + 1));
                    stack.push((right, depth + 1));
                }
            }
        }
        depths
    }

    /// Total encoded size in bits of the unconstrained code.
    ///
    /// Equal to the sum of the weights of all internal nodes.
    pub fn cost(&self) -> u64 {
        self.nodes
            .iter()
            .zip(&self.weights)
            .filter(|(node, _)| matches!(node, Node::Internal { .. }))
            .map(|(_, &w)| w)
            .sum()
    }
}

/// Builder for length-limited canonical codes.
#[derive(Debug, Clone, Copy)]
pub struct HuffmanBuilder {
    max_length: u8,
    min_codes: usize,
}

impl HuffmanBuilder {
    /// Create a builder with a length cap and a minimum number of
    /// transmitted codes.
    pub fn new(max_length: u8, min_codes: usize) -> Self {
        Self {
            max_length,
            min_codes,
        }
    }

    /// Builder for the literal/length alphabet.
    pub fn litlen() -> Self {
        Self::new(MAX_CODE_LENGTH as u8, 257)
    }

    /// Builder for the distance alphabet.
    pub fn distance() -> Self {
        Self::new(MAX_CODE_LENGTH as u8, 1)
    }

    /// Builder for the code length alphabet.
    pub fn codelen() -> Self {
        Self::new(MAX_CODELEN_LENGTH as u8, 4)
    }

    /// Build a code table for the given frequencies.
    pub fn build(&self, freqs: &FrequencyTable) -> Result<CodeTable> {
        let tree = HuffmanTree::build(freqs);
        let depths = tree.leaf_depths();
        let lengths = self.limit_lengths(&depths, freqs)?;
        Ok(CodeTable::from_lengths(&lengths).with_min_codes(self.min_codes))
    }

    /// Cap the tree depths at `max_length`.
    ///
    /// Depths that already fit are returned as they are, since the tree is
    /// optimal. Otherwise the lengths come from package-merge, which gives
    /// the cheapest complete code within the cap.
    fn limit_lengths(&self, depths: &[u32], freqs: &FrequencyTable) -> Result<Vec<u8>> {
        let max = self.max_length as usize;
        if depths.iter().all(|&d| d as usize <= max) {
            return Ok(depths.iter().map(|&d| d as u8).collect());
        }

        let mut leaves: Vec<usize> = (0..depths.len()).filter(|&s| depths[s] > 0).collect();
        if leaves.len() > 1 << max {
            return Err(OxiFlateError::internal(format!(
                "{} symbols do not fit in codes of at most {} bits",
                leaves.len(),
                max
            )));
        }
        leaves.sort_by_key(|&s| (freqs.get(s), s));
        let weights: Vec<u64> = leaves.iter().map(|&s| u64::from(freqs.get(s))).collect();
        let n = weights.len();

        // One row per bit length, deepest first. A row lists its items in
        // weight order and marks which of them are packages.
        let mut rows: Vec<Vec<bool>> = Vec::with_capacity(max);
        rows.push(vec![false; n]);
        let mut row = weights.clone();
        for _ in 1..max {
            let packages: Vec<u64> = row.chunks_exact(2).map(|pair| pair[0] + pair[1]).collect();
            let mut merged = Vec::with_capacity(n + packages.len());
            let mut kinds = Vec::with_capacity(n + packages.len());
            let (mut i, mut j) = (0, 0);
            while i < n || j < packages.len() {
                if j == packages.len() || (i < n && weights[i] <= packages[j]) {
                    merged.push(weights[i]);
                    kinds.push(false);
                    i += 1;
                } else {
                    merged.push(packages[j]);
                    kinds.push(true);
                    j += 1;
                }
            }
            rows.push(kinds);
            row = merged;
        }

        // Walk back down from the shortest length. Every leaf among the
        // selected items gains a bit; every package selects two items of
        // the row below.
        let mut lengths = vec![0u8; depths.len()];
        let mut take = 2 * n - 2;
        for kinds in rows.iter().rev() {
            let selected = kinds.iter().take(take);
            let leaf_count = selected.filter(|&&package| !package).count();
            for &symbol in &leaves[..leaf_count] {
                lengths[symbol] += 1;
            }
            take = 2 * (take - leaf_count);
        }

        Ok(lengths)
    }
}

/// Bit length and bit-reversed canonical code for every symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    lengths: Vec<u8>,
    codes: Vec<u16>,
    num_codes: usize,
}

impl CodeTable {
    /// Assign canonical codes (RFC 1951 Section 3.2.2) to `lengths`.
    ///
    /// Codes are stored bit-reversed so they can be written LSB-first.
    pub fn from_lengths(lengths: &[u8]) -> Self {
        let mut bl_count = [0u32; MAX_CODE_LENGTH + 1];
        for &len in lengths {
            bl_count[len as usize] += 1;
        }
        bl_count[0] = 0;

        let mut next_code = [0u32; MAX_CODE_LENGTH + 1];
        let mut code = 0u32;
        for bits in 1..=MAX_CODE_LENGTH {
            code = (code + bl_count[bits - 1]) << 1;
            next_code[bits] = code;
        }

        let mut codes = vec![0u16; lengths.len()];
        for (symbol, &len) in lengths.iter().enumerate() {
            if len > 0 {
                let len = len as usize;
                codes[symbol] = reverse_bits(next_code[len] as u16, len as u8);
                next_code[len] += 1;
            }
        }

        let num_codes = lengths.iter().rposition(|&l| l > 0).map_or(0, |p| p + 1);

        Self {
            lengths: lengths.to_vec(),
            codes,
            num_codes,
        }
    }

    fn with_min_codes(mut self, min_codes: usize) -> Self {
        self.num_codes = self.num_codes.max(min_codes).min(self.lengths.len());
        self
    }

    /// `(code, length)` for `symbol`.
    #[inline]
    pub fn code(&self, symbol: usize) -> (u16, u8) {
        (self.codes[symbol], self.lengths[symbol])
    }

    /// Bit length for `symbol`.
    #[inline]
    pub fn length(&self, symbol: usize) -> u8 {
        self.lengths[symbol]
    }

    /// All bit lengths, indexed by symbol.
    pub fn lengths(&self) -> &[u8] {
        &self.lengths
    }

    /// Number of codes to transmit in a dynamic header.
    pub fn num_codes(&self) -> usize {
        self.num_codes
    }

    /// `Σ freq × length` over the alphabet.
    pub fn encoded_length(&self, freqs: &FrequencyTable) -> u64 {
        self.lengths
            .iter()
            .zip(freqs.as_slice())
            .map(|(&len, &count)| len as u64 * count as u64)
            .sum()
    }
}

/// Reverse the low `length` bits of `code`.
pub fn reverse_bits(mut code: u16, length: u8) -> u16 {
    let mut reversed = 0u16;
    for _ in 0..length {
        reversed = (reversed << 1) | (code & 1);
        code >>= 1;
    }
    reversed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kraft_units(lengths: &[u8], max: u8) -> u64 {
        lengths
            .iter()
            .filter(|&&l| l > 0)
            .map(|&l| 1u64 << (max - l))
            .sum()
    }

    #[test]
    fn test_huffman_builder() {
        let freqs = FrequencyTable::from_counts(&[100, 50, 25, 25]);
        let table = HuffmanBuilder::new(15, 1).build(&freqs).unwrap();
        let lengths = table.lengths();

        // Higher frequency symbols should have shorter codes
        assert!(lengths[0] <= lengths[1]);
        assert!(lengths[1] <= lengths[2]);
        assert_eq!(lengths, &[1, 2, 3, 3]);
        assert_eq!(table.encoded_length(&freqs), 100 + 100 + 75 + 75);
    }

    #[test]
    fn test_unconstrained_cost_is_optimal() {
        let freqs = FrequencyTable::from_counts(&[5, 9, 12, 13, 16, 45]);
        let tree = HuffmanTree::build(&freqs);
        assert_eq!(tree.cost(), 224);

        let table = HuffmanBuilder::new(15, 1).build(&freqs).unwrap();
        assert_eq!(table.encoded_length(&freqs), 224);
        assert_eq!(table.length(5), 1);
    }

    #[test]
    fn test_length_limit_with_skewed_frequencies() {
        // Fibonacci weights give a maximally deep tree (depth 24 here).
        let mut counts = vec![1u32, 1];
        while counts.len() < 25 {
            let n = counts.len();
            counts.push(counts[n - 1] + counts[n - 2]);
        }
        let freqs = FrequencyTable::from_counts(&counts);
        assert!(HuffmanTree::build(&freqs).leaf_depths().iter().any(|&d| d > 15));

        let table = HuffmanBuilder::new(15, 1).build(&freqs).unwrap();
        assert!(table.lengths().iter().all(|&l| (1..=15).contains(&l)));
        assert_eq!(kraft_units(table.lengths(), 15), 1 << 15);

        let freqs = FrequencyTable::from_counts(&counts[..19]);
        let table = HuffmanBuilder::codelen().build(&freqs).unwrap();
        assert!(table.lengths().iter().all(|&l| (1..=7).contains(&l)));
        assert_eq!(kraft_units(table.lengths(), 7), 1 << 7);
    }

    #[test]
    fn test_length_limit_is_optimal() {
        // Unlimited depths run to 7; the best code within 4 bits costs 135.
        let freqs = FrequencyTable::from_counts(&[1, 1, 2, 3, 5, 8, 13, 21]);
        let table = HuffmanBuilder::new(4, 1).build(&freqs).unwrap();
        assert_eq!(table.lengths(), &[4, 4, 4, 4, 3, 3, 2, 2]);
        assert_eq!(table.encoded_length(&freqs), 135);

        // A cap the tree already meets leaves the depths alone.
        let table = HuffmanBuilder::new(7, 1).build(&freqs).unwrap();
        assert_eq!(table.encoded_length(&freqs), HuffmanTree::build(&freqs).cost());
    }

    #[test]
    fn test_limited_code_is_prefix_free() {
        let mut counts = vec![1u32, 1];
        while counts.len() < 30 {
            let n = counts.len();
            counts.push(counts[n - 1].saturating_add(counts[n - 2]));
        }
        let table = HuffmanBuilder::distance()
            .build(&FrequencyTable::from_counts(&counts))
            .unwrap();

        let codes: Vec<(u16, u8)> = (0..30).map(|s| table.code(s)).collect();
        for (i, &(ci, li)) in codes.iter().enumerate() {
            for (j, &(cj, lj)) in codes.iter().enumerate() {
                if i == j || li > lj {
                    continue;
                }
                // Reversed codes are prefix-free on their low bits.
                let mask = (1u16 << li) - 1;
                assert_ne!(ci, cj & mask, "code {} is a prefix of code {}", i, j);
            }
        }
    }

    #[test]
    fn test_single_symbol_gets_sibling() {
        let mut freqs = FrequencyTable::new(DISTANCE_ALPHABET_SIZE);
        freqs.add(5, 10);

        let table = HuffmanBuilder::distance().build(&freqs).unwrap();
        assert_eq!(table.length(5), 1);
        assert_eq!(table.length(0), 1);
        assert_eq!(kraft_units(table.lengths(), 15), 1 << 15);
        assert_eq!(table.num_codes(), 6);
        assert_ne!(table.code(0), table.code(5));
    }

    #[test]
    fn test_empty_table() {
        let freqs = FrequencyTable::new(DISTANCE_ALPHABET_SIZE);
        let table = HuffmanBuilder::distance().build(&freqs).unwrap();
        assert!(table.lengths().iter().all(|&l| l == 0));
        assert_eq!(table.num_codes(), 1);

        let table = HuffmanBuilder::litlen()
            .build(&FrequencyTable::new(LITLEN_ALPHABET_SIZE))
            .unwrap();
        assert_eq!(table.num_codes(), 257);
    }

    #[test]
    fn test_frequency_table() {
        let mut freqs = FrequencyTable::new(CODELEN_ALPHABET_SIZE);
        assert!(freqs.is_empty());
        freqs.increment(3);
        freqs.add(18, 4);
        assert_eq!(freqs.get(3), 1);
        assert_eq!(freqs.get(18), 4);
        assert_eq!(freqs.total(), 5);
        freqs.reset();
        assert!(freqs.is_empty());
        assert_eq!(freqs.alphabet_size(), CODELEN_ALPHABET_SIZE);
    }

    #[test]
    fn test_canonical_codes() {
        // RFC 1951 3.2.2 example: ABCDEFGH with lengths (3, 3, 3, 3, 3, 2, 4, 4)
        let table = CodeTable::from_lengths(&[3, 3, 3, 3, 3, 2, 4, 4]);
        let expected = [0b010, 0b011, 0b100, 0b101, 0b110, 0b00, 0b1110, 0b1111];
        for (symbol, &code) in expected.iter().enumerate() {
            let len = table.length(symbol);
            assert_eq!(table.code(symbol).0, reverse_bits(code, len));
        }
    }

    #[test]
    fn test_reverse_bits() {
        assert_eq!(reverse_bits(0b101, 3), 0b101);
        assert_eq!(reverse_bits(0b1100, 4), 0b0011);
        assert_eq!(reverse_bits(0b10101010, 8), 0b01010101);
    }
}
