//! 32-bit flag word used by bit-vector table columns
//!
//! A handful of table columns pack up to 32 booleans into one on-disk i32;
//! each boolean column addresses a single bit of its parent vector.

/// A word of 32 independently addressable boolean flags.
///
/// Bit `n` corresponds to mask `1 << n`, for `n` in `0..32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitVector32(u32);

impl BitVector32 {
    /// Wrap a raw little-endian word as read from disk.
    pub fn from_word(word: u32) -> Self {
        BitVector32(word)
    }

    /// The raw word, as written to disk.
    pub fn to_word(self) -> u32 {
        self.0
    }

    /// Read the flag at `bit` (0-31).
    pub fn get(self, bit: u32) -> bool {
        debug_assert!(bit < 32);
        self.0 & (1 << bit) != 0
    }

    /// Set or clear the flag at `bit` (0-31).
    pub fn set(&mut self, bit: u32, value: bool) {
        debug_assert!(bit < 32);
        if value {
            self.0 |= 1 << bit;
        } else {
            self.0 &= !(1 << bit);
        }
    }
}
