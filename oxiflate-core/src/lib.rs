//! # OxiFlate Core
//!
//! Core components for the OxiFlate compressor.
//!
//! This crate provides the building blocks the DEFLATE engine is written
//! against:
//!
//! - [`bitstream`]: LSB-first bit sink for Huffman codes and stored blocks
//! - [`checksum`]: Adler-32 rolling checksum
//! - [`traits`]: streaming compressor trait, flush modes, levels
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ CLI: oxiflate compress / stats                          │
//! ├─────────────────────────────────────────────────────────┤
//! │ Framing: raw DEFLATE, zlib (header + Adler-32 trailer)  │
//! ├─────────────────────────────────────────────────────────┤
//! │ Engine: match finder, Huffman builder, block writer     │
//! ├─────────────────────────────────────────────────────────┤
//! │ Core (this crate): BitWriter, Adler32, traits, errors   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_core::bitstream::BitWriter;
//! use oxiflate_core::checksum::Adler32;
//!
//! let mut writer = BitWriter::new(Vec::new());
//! writer.write_bits(0b011, 3).unwrap();
//! let bytes = writer.into_inner().unwrap();
//! assert_eq!(bytes, vec![0x03]);
//!
//! assert_eq!(Adler32::checksum(b"Wikipedia"), 0x11E60398);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod checksum;
pub mod error;
pub mod traits;

// Re-exports for convenience
pub use bitstream::{BitSink, BitWriter};
pub use checksum::{Adler32, RollingChecksum};
pub use error::{OxiFlateError, Result};
pub use traits::{CompressStatus, CompressionLevel, Compressor, FlushMode};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitSink, BitWriter};
    pub use crate::checksum::{Adler32, RollingChecksum};
    pub use crate::error::{OxiFlateError, Result};
    pub use crate::traits::{CompressStatus, CompressionLevel, Compressor, FlushMode};
}
