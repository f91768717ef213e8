//! Rolling checksums folded over the uncompressed stream.
//!
//! The compressor folds every byte it consumes into a [`RollingChecksum`]
//! so that a container can write an integrity trailer when the stream ends.
//! [`Adler32`] is the checksum used by the zlib format (RFC 1950).

/// A checksum that can be updated incrementally with byte ranges.
pub trait RollingChecksum {
    /// Fold `data` into the running checksum.
    fn update(&mut self, data: &[u8]);

    /// Current checksum value.
    fn value(&self) -> u32;

    /// Restart from the initial state.
    fn reset(&mut self);
}

/// Largest prime smaller than 65536.
const ADLER_MOD: u32 = 65521;

/// Number of bytes that can be summed before `b` may overflow a `u32`.
const NMAX: usize = 5552;

/// Adler-32 checksum calculator.
///
/// Adler-32 is a checksum algorithm designed by Mark Adler.
/// It is faster than CRC-32 but provides less protection against random errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    /// Create a new Adler-32 calculator.
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Update the checksum with more data.
    pub fn update(&mut self, data: &[u8]) {
        let mut a = self.a;
        let mut b = self.b;

        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                a += byte as u32;
                b += a;
            }
            a %= ADLER_MOD;
            b %= ADLER_MOD;
        }

        self.a = a;
        self.b = b;
    }

    /// Return the checksum of everything folded in so far.
    pub fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Compute Adler-32 checksum of data in one shot.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update(data);
        adler.finish()
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl RollingChecksum for Adler32 {
    fn update(&mut self, data: &[u8]) {
        Adler32::update(self, data);
    }

    fn value(&self) -> u32 {
        self.finish()
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}
