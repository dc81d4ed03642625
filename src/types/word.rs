//! 256-bit machine word and the Keccak-256 builder.

pub use primitive_types::U256;
use sha3::{Digest, Keccak256};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// Word length in bytes.
pub const WORD_LEN: usize = 32;

/// Number of bits in a [`Word`].
pub const WORD_BITS: usize = WORD_LEN * 8;

/// A 256-bit unsigned value, the unit of every stack slot.
///
/// Arithmetic wraps modulo 2^256; byte views are big-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash, Ord, PartialOrd)]
pub struct Word(pub U256);

impl Word {
    pub fn zero() -> Word {
        Word(U256::zero())
    }

    pub fn one() -> Word {
        Word(U256::one())
    }

    /// All bits set.
    pub fn max() -> Word {
        Word(U256::MAX)
    }

    pub fn to_be_bytes(&self) -> [u8; WORD_LEN] {
        self.0.to_big_endian()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Converts to `usize` if the value fits.
    pub fn to_usize(&self) -> Option<usize> {
        if self.0.bits() > u64::BITS as usize {
            return None;
        }
        usize::try_from(self.0.low_u64()).ok()
    }

    /// Byte `index` counted from the most significant end; zero past the word.
    pub fn byte(&self, index: usize) -> u8 {
        if index >= WORD_LEN {
            return 0;
        }
        self.0.byte(WORD_LEN - 1 - index)
    }

    pub fn wrapping_add(&self, rhs: &Word) -> Word {
        Word(self.0.overflowing_add(rhs.0).0)
    }

    pub fn wrapping_sub(&self, rhs: &Word) -> Word {
        Word(self.0.overflowing_sub(rhs.0).0)
    }

    /// Logical left shift; shifting by a word or more yields zero.
    pub fn shl(&self, shift: usize) -> Word {
        if shift >= WORD_BITS {
            return Word::zero();
        }
        Word(self.0 << shift)
    }

    /// Logical right shift; shifting by a word or more yields zero.
    pub fn shr(&self, shift: usize) -> Word {
        if shift >= WORD_BITS {
            return Word::zero();
        }
        Word(self.0 >> shift)
    }

    /// Creates a new Keccak-256 builder for incremental hashing.
    pub fn keccak256() -> KeccakBuilder {
        KeccakBuilder::new()
    }
}

impl BitAnd for Word {
    type Output = Word;

    fn bitand(self, rhs: Word) -> Word {
        Word(self.0 & rhs.0)
    }
}

impl BitOr for Word {
    type Output = Word;

    fn bitor(self, rhs: Word) -> Word {
        Word(self.0 | rhs.0)
    }
}

impl BitXor for Word {
    type Output = Word;

    fn bitxor(self, rhs: Word) -> Word {
        Word(self.0 ^ rhs.0)
    }
}

impl Not for Word {
    type Output = Word;

    fn not(self) -> Word {
        Word(!self.0)
    }
}

impl From<U256> for Word {
    fn from(value: U256) -> Self {
        Word(value)
    }
}

impl From<u64> for Word {
    fn from(value: u64) -> Self {
        Word(U256::from(value))
    }
}

impl From<bool> for Word {
    fn from(value: bool) -> Self {
        if value { Word::one() } else { Word::zero() }
    }
}

impl From<[u8; WORD_LEN]> for Word {
    fn from(bytes: [u8; WORD_LEN]) -> Self {
        Word(U256::from_big_endian(&bytes))
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_be_bytes()))
    }
}

/// Incremental Keccak-256 builder.
pub struct KeccakBuilder {
    hasher: Keccak256,
}

impl KeccakBuilder {
    pub fn new() -> Self {
        Self {
            hasher: Keccak256::new(),
        }
    }

    /// Feeds data into the hash computation.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Builder-style [`update`](Self::update).
    pub fn chain(mut self, data: &[u8]) -> Self {
        self.update(data);
        self
    }

    /// Consumes the builder and returns the digest as a word.
    pub fn finalize(self) -> Word {
        let digest: [u8; WORD_LEN] = self.hasher.finalize().into();
        Word::from(digest)
    }
}

impl Default for KeccakBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_u64_is_big_endian() {
        let bytes = Word::from(0x0102u64).to_be_bytes();
        assert_eq!(bytes[30], 0x01);
        assert_eq!(bytes[31], 0x02);
        assert!(bytes[..30].iter().all(|&b| b == 0));
    }

    #[test]
    fn add_and_sub_wrap() {
        assert_eq!(Word::max().wrapping_add(&Word::one()), Word::zero());
        assert_eq!(Word::zero().wrapping_sub(&Word::one()), Word::max());
        assert_eq!(
            Word::from(1000u64).wrapping_sub(&Word::from(1u64)),
            Word::from(999u64)
        );
    }

    #[test]
    fn shifts_saturate_at_word_width() {
        let w = Word::from(0x0180u64);
        assert_eq!(w.shl(1), Word::from(0x0300u64));
        assert_eq!(w.shr(7), Word::from(0x03u64));
        assert_eq!(Word::one().shl(255).shr(255), Word::one());
        assert_eq!(Word::one().shl(256), Word::zero());
        assert_eq!(Word::max().shr(usize::MAX), Word::zero());
    }

    #[test]
    fn byte_counts_from_most_significant() {
        let mut bytes = [0u8; WORD_LEN];
        bytes[0] = 0x2a;
        bytes[31] = 0x07;
        let w = Word::from(bytes);
        assert_eq!(w.byte(0), 0x2a);
        assert_eq!(w.byte(31), 0x07);
        assert_eq!(w.byte(32), 0);
        assert_eq!(w.shr(248), Word::from(0x2au64));
    }

    #[test]
    fn bitwise_operators() {
        let a = Word::from(0b1100u64);
        let b = Word::from(0b1010u64);
        assert_eq!(a & b, Word::from(0b1000u64));
        assert_eq!(a | b, Word::from(0b1110u64));
        assert_eq!(a ^ b, Word::from(0b0110u64));
        assert_eq!(!Word::zero(), Word::max());
    }

    #[test]
    fn to_usize_bounds() {
        assert_eq!(Word::from(77u64).to_usize(), Some(77));
        assert_eq!(Word::one().shl(200).to_usize(), None);
    }

    #[test]
    fn display_is_full_width_hex() {
        assert_eq!(
            Word::from(U256::from(0xabu64) << 248).to_string(),
            format!("0xab{}", "0".repeat(62))
        );
    }

    #[test]
    fn keccak_of_empty_input() {
        let digest = Word::keccak256().finalize();
        assert_eq!(
            digest.to_string(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}
