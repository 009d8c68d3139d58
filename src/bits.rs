//! Bit-string type used by every codec in the crate.
//!
//! A [`Bits`] value is an ordered sequence of binary digits stored MSB-first in
//! a `bitvec` buffer. Text conversion is strict: parsing rejects anything other
//! than '0' and '1' and reports the first offending character, it never coerces.
//!
//! # Examples
//!
//! ```
//! use linkcode::bits::Bits;
//!
//! let bits: Bits = "01000001".parse().unwrap();
//! assert_eq!(bits.to_text(), "A");
//! assert_eq!(Bits::from_text("A"), bits);
//! assert_eq!(bits.grouped(4), "0100 0001");
//! ```

use crate::error::{Error, Result};
use bitvec::prelude::*;
use rand::Rng;
use std::fmt;
use std::ops::{Deref, Range};
use std::str::FromStr;

/// An owned, growable string of bits.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bits(BitVec<u8, Msb0>);

impl Bits {
    /// Creates an empty bit-string.
    pub fn new() -> Self {
        Self(BitVec::new())
    }

    /// Creates `len` zero bits.
    pub fn zeros(len: usize) -> Self {
        Self(bitvec![u8, Msb0; 0; len])
    }

    /// Expands bytes into bits, most significant bit of each byte first.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(BitVec::from_slice(bytes))
    }

    /// Expands the bytes of `text` into bits (ASCII text gives 8 bits per character).
    pub fn from_text(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    /// Draws `len` independent uniform bits from `rng`.
    pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        Self((0..len).map(|_| rng.gen::<bool>()).collect())
    }

    /// Packs complete groups of 8 bits back into bytes.
    ///
    /// An incomplete trailing byte is dropped.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0
            .chunks_exact(8)
            .map(|byte| byte.iter().by_vals().fold(0u8, |acc, bit| (acc << 1) | bit as u8))
            .collect()
    }

    /// Decodes complete bytes as single-byte characters.
    pub fn to_text(&self) -> String {
        self.to_bytes().into_iter().map(char::from).collect()
    }

    /// Borrows the underlying bit slice.
    pub fn as_bitslice(&self) -> &BitSlice<u8, Msb0> {
        &self.0
    }

    /// Consumes the bit-string and returns the underlying buffer.
    pub fn into_bitvec(self) -> BitVec<u8, Msb0> {
        self.0
    }

    /// Appends one bit.
    pub fn push(&mut self, bit: bool) {
        self.0.push(bit);
    }

    /// Appends every bit of `other`.
    pub fn extend_bits(&mut self, other: &BitSlice<u8, Msb0>) {
        self.0.extend_from_bitslice(other);
    }

    /// Inverts the bit at 0-based `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn flip(&mut self, index: usize) {
        let bit = self.0[index];
        self.0.set(index, !bit);
    }

    /// Shortens the bit-string to `len` bits; no-op when already shorter.
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Copies the bits in `range` into a new bit-string.
    pub fn subrange(&self, range: Range<usize>) -> Bits {
        Self(self.0[range].to_bitvec())
    }

    /// Number of positions at which the two strings differ.
    ///
    /// Positions past the end of the shorter string all count as differences.
    pub fn hamming_distance(&self, other: &Bits) -> usize {
        let common = self
            .0
            .iter()
            .by_vals()
            .zip(other.0.iter().by_vals())
            .filter(|(a, b)| a != b)
            .count();
        common + self.len().abs_diff(other.len())
    }

    /// Renders the bits with a space inserted every `group` bits.
    ///
    /// A group size of 0 disables grouping.
    pub fn grouped(&self, group: usize) -> String {
        let text = self.to_string();
        if group == 0 {
            return text;
        }
        let mut out = String::with_capacity(text.len() + text.len() / group);
        for (i, ch) in text.chars().enumerate() {
            if i > 0 && i % group == 0 {
                out.push(' ');
            }
            out.push(ch);
        }
        out
    }
}

impl Deref for Bits {
    type Target = BitSlice<u8, Msb0>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<BitVec<u8, Msb0>> for Bits {
    fn from(bits: BitVec<u8, Msb0>) -> Self {
        Self(bits)
    }
}

impl From<&BitSlice<u8, Msb0>> for Bits {
    fn from(bits: &BitSlice<u8, Msb0>) -> Self {
        Self(bits.to_bitvec())
    }
}

impl FromIterator<bool> for Bits {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for Bits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut bits = BitVec::with_capacity(s.len());
        for (position, found) in s.chars().enumerate() {
            match found {
                '0' => bits.push(false),
                '1' => bits.push(true),
                _ => return Err(Error::InvalidBit { position, found }),
            }
        }
        Ok(Self(bits))
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.0.iter().by_vals() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bits(\"{}\")", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_parse_and_display() {
        let bits: Bits = "1101".parse().unwrap();
        assert_eq!(bits.len(), 4);
        assert!(bits[0] && bits[1] && !bits[2] && bits[3]);
        assert_eq!(bits.to_string(), "1101");

        let empty: Bits = "".parse().unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_binary() {
        let result = "0102".parse::<Bits>();
        assert!(matches!(
            result,
            Err(Error::InvalidBit {
                position: 2,
                found: '2'
            })
        ));

        assert!(" 01".parse::<Bits>().is_err());
        assert!("01\n".parse::<Bits>().is_err());
    }

    #[test]
    fn test_text_round_trip() {
        let bits = Bits::from_text("Hi");
        assert_eq!(bits.to_string(), "0100100001101001");
        assert_eq!(bits.to_text(), "Hi");
    }

    #[test]
    fn test_to_bytes_drops_partial_byte() {
        let bits: Bits = "0100000111".parse().unwrap();
        assert_eq!(bits.to_bytes(), vec![0x41]);
    }

    #[test]
    fn test_grouped() {
        let bits: Bits = "1010101010".parse().unwrap();
        assert_eq!(bits.grouped(4), "1010 1010 10");
        assert_eq!(bits.grouped(0), "1010101010");
        assert_eq!(Bits::new().grouped(8), "");
    }

    #[test]
    fn test_hamming_distance() {
        let a: Bits = "101100".parse().unwrap();
        let b: Bits = "100101".parse().unwrap();
        assert_eq!(a.hamming_distance(&b), 2);
        assert_eq!(a.hamming_distance(&a), 0);

        let shorter: Bits = "1011".parse().unwrap();
        assert_eq!(a.hamming_distance(&shorter), 2);
    }

    #[test]
    fn test_flip_and_subrange() {
        let mut bits = Bits::zeros(6);
        bits.flip(2);
        assert_eq!(bits.to_string(), "001000");
        bits.flip(2);
        assert_eq!(bits, Bits::zeros(6));

        let bits: Bits = "110011".parse().unwrap();
        assert_eq!(bits.subrange(1..4).to_string(), "100");
    }

    #[test]
    fn test_random_is_reproducible() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(7);
        let mut rng2 = ChaCha8Rng::seed_from_u64(7);
        let a = Bits::random(128, &mut rng1);
        let b = Bits::random(128, &mut rng2);
        assert_eq!(a.len(), 128);
        assert_eq!(a, b);
    }
}
