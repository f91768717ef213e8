//! # OxiFlate Deflate
//!
//! Pure Rust streaming DEFLATE compressor (RFC 1951).
//!
//! Input is tokenized by a hash-chain LZ77 match finder, buffered per
//! block, and written with whichever block encoding is smallest for that
//! block: stored, fixed Huffman, or dynamic Huffman with length-limited
//! canonical codes.
//!
//! ## Features
//!
//! - **Streaming engine**: [`Deflater`] accepts input in arbitrary chunks
//!   and produces identical output regardless of chunking
//! - **Flush modes**: none, sync, full and finish
//! - **Block selection**: stored, fixed and dynamic blocks, costed exactly
//! - **Framing**: raw DEFLATE and zlib (RFC 1950)
//! - **I/O adapters**: [`DeflateEncoder`] and [`ZlibEncoder`] implement
//!   [`std::io::Write`]
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_deflate::{Deflater, FlushMode};
//!
//! let data = b"Hello, World! Hello, World!";
//! let mut deflater = Deflater::new(6);
//! deflater.set_input(data, 0, data.len()).unwrap();
//! deflater.deflate(FlushMode::Finish).unwrap();
//!
//! let mut compressed = vec![0u8; 64];
//! let n = deflater.read_output(&mut compressed);
//! compressed.truncate(n);
//!
//! assert!(deflater.is_finished());
//! assert_eq!(compressed, oxiflate_deflate::deflate(data, 6).unwrap());
//! ```
//!
//! ## Compression Levels
//!
//! - Level 0: No matching (literal and stored blocks only)
//! - Level 1-4: Greedy matching with short hash chains
//! - Level 5-9: Lazy matching with progressively longer chains
//!   (default is 6)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod codelen;
pub mod deflate;
pub mod encoder;
pub mod huffman;
pub mod lz77;
pub mod tables;
pub mod zlib;

// Re-exports
pub use block::{BlockSummary, BlockType};
pub use deflate::{BLOCK_HISTORY, DeflateConfig, Deflater, deflate};
pub use encoder::DeflateEncoder;
pub use huffman::{CodeTable, FrequencyTable, HuffmanBuilder, HuffmanTree};
pub use lz77::{Lz77Token, MatchFinder};
pub use oxiflate_core::traits::{CompressionLevel, FlushMode};
pub use zlib::{ZlibEncoder, zlib_compress};
