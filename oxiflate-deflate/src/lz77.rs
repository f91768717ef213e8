//! LZ77 match finding for DEFLATE.
//!
//! This module implements the LZ77 algorithm as used in DEFLATE compression.
//! LZ77 finds repeated sequences in the input and replaces them with
//! back-references (length, distance pairs).
//!
//! # Algorithm
//!
//! [`MatchFinder`] keeps a buffer of twice the window size holding history
//! and lookahead. Every position is hashed on its first three bytes and
//! linked into a hash chain. For each position the chain is walked, newest
//! candidate first, and the longest match is kept:
//! - Emits a literal byte if no match of 3+ bytes is found
//! - Emits a (length, distance) pair otherwise
//!
//! Matches may overlap the bytes they produce (distance < length), which is
//! how runs of a single byte compress to one literal and one match.

/// Default and maximum window size for DEFLATE (32KB).
pub const WINDOW_SIZE: usize = 32768;

/// Smallest supported window size.
pub const MIN_WINDOW_SIZE: usize = 1024;

/// Minimum match length.
pub const MIN_MATCH: usize = 3;

/// Maximum match length.
pub const MAX_MATCH: usize = 257;

/// Lookahead required before a search runs outside of a flush.
///
/// With this much lookahead a match can always reach `MAX_MATCH`, so token
/// boundaries do not depend on how the input was split into chunks.
pub const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Size of the hash table (power of 2).
const HASH_SIZE: usize = 32768;

/// Hash mask.
const HASH_MASK: usize = HASH_SIZE - 1;

/// Empty hash head or chain link.
const NIL: u32 = u32::MAX;

/// A token produced by LZ77 compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lz77Token {
    /// A literal byte.
    Literal(u8),
    /// A back-reference to previously seen data.
    Match {
        /// Number of bytes to copy (3-257).
        length: u16,
        /// Distance back into the window (1-32768).
        distance: u16,
    },
}

impl Lz77Token {
    /// Number of input bytes this token covers.
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Literal(_) => 1,
            Self::Match { length, .. } => *length as usize,
        }
    }
}

/// Hash-chain longest match finder over a sliding window.
#[derive(Debug)]
pub struct MatchFinder {
    /// History followed by lookahead, `2 * window_size` bytes.
    buffer: Vec<u8>,
    window_size: usize,
    /// Start of the lookahead.
    pos: usize,
    /// End of valid data.
    end: usize,
    /// Next position to link into the hash chains.
    ins_pos: usize,
    /// Hash table: maps hash -> most recent position.
    head: Vec<u32>,
    /// Hash chain: previous position with the same hash, by `pos & mask`.
    prev: Vec<u32>,
    /// Chain entries to check per search. Zero disables matching.
    max_chain: usize,
    /// Enable lazy matching.
    lazy_match: bool,
}

impl MatchFinder {
    /// Create a match finder.
    ///
    /// `window_size` must be a power of two in
    /// `MIN_WINDOW_SIZE..=WINDOW_SIZE`; callers validate it beforehand.
    pub fn new(window_size: usize, max_chain: usize, lazy_match: bool) -> Self {
        debug_assert!(window_size.is_power_of_two());
        debug_assert!((MIN_WINDOW_SIZE..=WINDOW_SIZE).contains(&window_size));

        Self {
            buffer: vec![0; window_size * 2],
            window_size,
            pos: 0,
            end: 0,
            ins_pos: 0,
            head: vec![NIL; HASH_SIZE],
            prev: vec![NIL; window_size],
            max_chain,
            lazy_match,
        }
    }

    /// Hash-chain budget and lazy matching for a compression level (0-9).
    pub fn level_params(level: u8) -> (usize, bool) {
        match level.min(9) {
            0 => (0, false), // Literals only
            1 => (4, false),
            2 => (8, false),
            3 => (16, false),
            4 => (32, false),
            5 => (64, true),
            6 => (128, true),
            7 => (256, true),
            8 => (1024, true),
            _ => (4096, true),
        }
    }

    /// Create a match finder tuned for a compression level (0-9).
    pub fn with_level(window_size: usize, level: u8) -> Self {
        let (max_chain, lazy_match) = Self::level_params(level);
        Self::new(window_size, max_chain, lazy_match)
    }

    /// Forget all history and lookahead.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.end = 0;
        self.ins_pos = 0;
        self.head.fill(NIL);
        self.prev.fill(NIL);
    }

    /// Window size in bytes.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Buffered bytes not yet covered by a token.
    pub fn lookahead(&self) -> usize {
        self.end - self.pos
    }

    /// The last `len` bytes covered by tokens.
    pub fn recent(&self, len: usize) -> &[u8] {
        &self.buffer[self.pos - len..self.pos]
    }

    /// Copy as much of `input` as fits into the buffer.
    ///
    /// Slides the window first when the buffer is full and a whole window of
    /// history is behind the current position. Returns the number of bytes
    /// taken.
    pub fn fill(&mut self, input: &[u8]) -> usize {
        if self.end == self.buffer.len() && self.pos >= self.window_size {
            self.slide_window();
        }

        let n = input.len().min(self.buffer.len() - self.end);
        self.buffer[self.end..self.end + n].copy_from_slice(&input[..n]);
        self.end += n;
        n
    }

    /// Produce the next token.
    ///
    /// Returns `None` when there is no lookahead, or when the lookahead is
    /// below [`MIN_LOOKAHEAD`] and the caller is not flushing.
    pub fn next_token(&mut self, flushing: bool) -> Option<Lz77Token> {
        let lookahead = self.lookahead();
        if lookahead == 0 || (!flushing && lookahead < MIN_LOOKAHEAD) {
            return None;
        }

        let token = match self.find_match(self.pos) {
            Some((length, distance)) if !self.defer_match(length) => Lz77Token::Match {
                length: length as u16,
                distance: distance as u16,
            },
            _ => Lz77Token::Literal(self.buffer[self.pos]),
        };

        self.pos += token.byte_len();
        Some(token)
    }

    /// Run the whole of `input` through the finder and collect the tokens.
    pub fn tokenize(&mut self, input: &[u8]) -> Vec<Lz77Token> {
        let mut tokens = Vec::with_capacity(input.len() / 2);
        let mut input_pos = 0;

        loop {
            input_pos += self.fill(&input[input_pos..]);
            let flushing = input_pos == input.len();
            while let Some(token) = self.next_token(flushing) {
                tokens.push(token);
            }
            if flushing {
                return tokens;
            }
        }
    }

    /// Whether a literal should be emitted so the next position can use a
    /// longer match.
    fn defer_match(&mut self, length: usize) -> bool {
        if !self.lazy_match || self.pos + 1 >= self.end {
            return false;
        }
        match self.find_match(self.pos + 1) {
            Some((next_len, _)) => next_len > length + 1,
            None => false,
        }
    }

    /// Compute hash for 3 bytes using improved mixing for better distribution.
    #[inline(always)]
    fn hash(b0: u8, b1: u8, b2: u8) -> usize {
        let h = ((b0 as usize).wrapping_mul(506832829))
            ^ ((b1 as usize).wrapping_mul(2654435761) << 8)
            ^ ((b2 as usize).wrapping_mul(374761393) << 16);
        (h ^ (h >> 15)) & HASH_MASK
    }

    /// Link every position before `target` that has three bytes available.
    fn insert_up_to(&mut self, target: usize) {
        let mask = self.window_size - 1;
        while self.ins_pos < target && self.ins_pos + MIN_MATCH <= self.end {
            let p = self.ins_pos;
            let h = Self::hash(self.buffer[p], self.buffer[p + 1], self.buffer[p + 2]);
            self.prev[p & mask] = self.head[h];
            self.head[h] = p as u32;
            self.ins_pos += 1;
        }
    }

    /// Find the longest match at `pos`, returning `(length, distance)`.
    fn find_match(&mut self, pos: usize) -> Option<(usize, usize)> {
        if self.max_chain == 0 || pos + MIN_MATCH > self.end {
            return None;
        }
        self.insert_up_to(pos);

        let max_len = (self.end - pos).min(MAX_MATCH);
        let mask = self.window_size - 1;
        let window = &self.buffer;

        let h = Self::hash(window[pos], window[pos + 1], window[pos + 2]);
        let mut candidate = self.head[h];
        let mut best_len = MIN_MATCH - 1;
        let mut best_dist = 0;
        let mut chain_len = 0;

        while candidate != NIL && chain_len < self.max_chain {
            let match_pos = candidate as usize;
            let dist = pos - match_pos;
            if dist > self.window_size {
                break;
            }

            // Check position at best_len first; cheap rejection of candidates
            // that cannot be longer.
            if window[match_pos + best_len] == window[pos + best_len] {
                let len = window[match_pos..match_pos + max_len]
                    .iter()
                    .zip(&window[pos..pos + max_len])
                    .take_while(|(a, b)| a == b)
                    .count();

                if len > best_len {
                    best_len = len;
                    best_dist = dist;
                    if len >= max_len {
                        break;
                    }
                }
            }

            candidate = self.prev[match_pos & mask];
            chain_len += 1;
        }

        (best_len >= MIN_MATCH).then_some((best_len, best_dist))
    }

    /// Slide the window to make room for more data.
    fn slide_window(&mut self) {
        if self.max_chain > 0 {
            self.insert_up_to(self.pos);
        }
        let slide = self.window_size as u32;

        self.buffer.copy_within(self.window_size..self.end, 0);
        self.pos -= self.window_size;
        self.end -= self.window_size;
        self.ins_pos = self.ins_pos.saturating_sub(self.window_size);

        for entry in self.head.iter_mut().chain(self.prev.iter_mut()) {
            *entry = if *entry != NIL && *entry >= slide {
                *entry - slide
            } else {
                NIL
            };
        }
    }
}
