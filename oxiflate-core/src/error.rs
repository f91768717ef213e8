//! Error types for OxiFlate operations.
//!
//! The compressor is a pure in-memory transformation, so the error surface is
//! small: failures of the underlying writer, caller contract violations
//! (feeding input too early, out-of-range input regions, bad configuration),
//! and internal invariant breaches that indicate a bug in the engine itself.

use std::io;
use thiserror::Error;

/// The main error type for OxiFlate operations.
#[derive(Debug, Error)]
pub enum OxiFlateError {
    /// I/O error from the underlying writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// New input was supplied before the previous input was fully consumed.
    #[error("Previous input not fully consumed: {remaining} bytes still pending")]
    InputPending {
        /// Number of bytes of the previous input that are still unconsumed.
        remaining: usize,
    },

    /// The input region lies (partly) outside the supplied buffer.
    #[error("Input range out of bounds: offset {offset} + length {len} exceeds buffer of {buffer_len} bytes")]
    InputOutOfBounds {
        /// Requested start offset.
        offset: usize,
        /// Requested length.
        len: usize,
        /// Length of the buffer the range was taken from.
        buffer_len: usize,
    },

    /// Invalid compressor configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration problem.
        message: String,
    },

    /// The stream has already been finished.
    #[error("Compression stream already finished")]
    StreamFinished,

    /// An internal invariant of the compressor was violated.
    #[error("Internal invariant violated: {message}")]
    Internal {
        /// Description of the broken invariant.
        message: String,
    },
}

/// Result type alias for OxiFlate operations.
pub type Result<T> = std::result::Result<T, OxiFlateError>;

impl OxiFlateError {
    /// Create an input pending error.
    pub fn input_pending(remaining: usize) -> Self {
        Self::InputPending { remaining }
    }

    /// Create an input out of bounds error.
    pub fn input_out_of_bounds(offset: usize, len: usize, buffer_len: usize) -> Self {
        Self::InputOutOfBounds {
            offset,
            len,
            buffer_len,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an internal invariant error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error reports misuse by the caller rather than a failure
    /// of the writer or the engine.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::InputPending { .. }
                | Self::InputOutOfBounds { .. }
                | Self::InvalidConfig { .. }
                | Self::StreamFinished
        )
    }
}

impl From<OxiFlateError> for io::Error {
    fn from(err: OxiFlateError) -> Self {
        match err {
            OxiFlateError::Io(e) => e,
            OxiFlateError::InvalidConfig { .. }
            | OxiFlateError::InputOutOfBounds { .. }
            | OxiFlateError::InputPending { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
            other => io::Error::other(other),
        }
    }
}
