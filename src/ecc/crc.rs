//! CRC-32 (IEEE 802.3 polynomial) over bit-strings.
//!
//! The register is the plain, non-reflected form of the Ethernet polynomial:
//! polynomial `0x04C11DB7`, initial value `0xFFFFFFFF`, final XOR `0xFFFFFFFF`,
//! no input or output reflection. Bits are consumed front to back, so the
//! checksum of a whole-byte message equals the CRC-32/BZIP2 value of those
//! bytes.
//!
//! A frame is `data ++ to_bits32(crc32(data))`. Verification recomputes the
//! checksum over the data part and compares the 32 check bits; CRCs detect
//! errors but never locate them.
//!
//! # Examples
//!
//! ```
//! use linkcode::bits::Bits;
//! use linkcode::ecc::crc::{append_crc, verify_frame};
//!
//! let data: Bits = "1101".parse().unwrap();
//! let mut frame = append_crc(&data);
//! assert!(verify_frame(&frame).unwrap().is_valid());
//!
//! frame.flip(frame.len() - 1);
//! let check = verify_frame(&frame).unwrap();
//! assert!(!check.is_valid());
//! assert_eq!(check.distance(), 1);
//! ```

use crate::bits::Bits;
use crate::error::{Error, Result};
use bitvec::prelude::*;

/// Generator polynomial, normal (non-reversed) form.
pub const POLYNOMIAL: u32 = 0x04C1_1DB7;
/// Initial register value.
pub const INITIAL_VALUE: u32 = 0xFFFF_FFFF;
/// Value XORed into the register after the last bit.
pub const FINAL_XOR: u32 = 0xFFFF_FFFF;
/// Number of check bits appended to a frame.
pub const CHECK_BITS: usize = 32;

/// Byte lookup table for the non-reflected register.
const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Streaming CRC-32 register.
///
/// Feed bits with [`update_bit`](Crc32::update_bit) or [`update`](Crc32::update)
/// and read the checksum with [`finalize`](Crc32::finalize); finalizing does not
/// disturb the register, so more input can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32 {
    state: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    /// Creates a register holding the initial value.
    pub fn new() -> Self {
        Self {
            state: INITIAL_VALUE,
        }
    }

    /// Resets the register to the initial value.
    pub fn reset(&mut self) {
        self.state = INITIAL_VALUE;
    }

    /// Shifts one message bit into the register.
    pub fn update_bit(&mut self, bit: bool) {
        let feedback = (self.state >> 31) ^ bit as u32;
        self.state <<= 1;
        if feedback == 1 {
            self.state ^= POLYNOMIAL;
        }
    }

    /// Shifts a run of bits into the register, front bit first.
    ///
    /// Whole bytes go through the lookup table, the tail bit by bit.
    pub fn update(&mut self, bits: &BitSlice<u8, Msb0>) {
        let chunks = bits.chunks_exact(8);
        let tail = chunks.remainder();
        for chunk in chunks {
            let byte = chunk
                .iter()
                .by_vals()
                .fold(0u8, |acc, bit| (acc << 1) | bit as u8);
            self.update_byte(byte);
        }
        for bit in tail.iter().by_vals() {
            self.update_bit(bit);
        }
    }

    /// Shifts whole bytes into the register, most significant bit first.
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.update_byte(byte);
        }
    }

    fn update_byte(&mut self, byte: u8) {
        let index = ((self.state >> 24) ^ byte as u32) & 0xFF;
        self.state = (self.state << 8) ^ TABLE[index as usize];
    }

    /// Returns the checksum of everything fed so far.
    pub fn finalize(&self) -> u32 {
        self.state ^ FINAL_XOR
    }
}

/// Computes the CRC-32 of a bit-string.
pub fn crc32(data: &BitSlice<u8, Msb0>) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finalize()
}

/// Computes the CRC-32 of a textual bit-string.
///
/// The whole string is validated before any bit enters the register.
pub fn crc32_str(bits: &str) -> Result<u32> {
    let bits: Bits = bits.parse()?;
    Ok(crc32(&bits))
}

/// Serializes a checksum as 32 bits, most significant first.
pub fn to_bits32(value: u32) -> Bits {
    Bits::from_bytes(&value.to_be_bytes())
}

/// Builds the frame `data ++ to_bits32(crc32(data))`.
///
/// # Arguments
///
/// * `data` - Message bits
///
/// # Returns
///
/// A frame `CHECK_BITS` longer than `data`
pub fn append_crc(data: &Bits) -> Bits {
    let mut frame = data.clone();
    frame.extend_bits(&to_bits32(crc32(data)));
    frame
}

/// Fraction of a frame occupied by the check bits for a `data_len`-bit message.
pub fn overhead(data_len: usize) -> f64 {
    CHECK_BITS as f64 / (data_len + CHECK_BITS) as f64
}

/// Result of checking received data against received check bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrcCheck {
    /// Received data bits
    pub data: Bits,
    /// Received check bits
    pub received: Bits,
    /// Check bits recomputed over `data`
    pub computed: Bits,
}

impl CrcCheck {
    /// True when the recomputed check bits match the received ones exactly.
    pub fn is_valid(&self) -> bool {
        self.computed == self.received
    }

    /// Number of check bits that differ between computed and received.
    pub fn distance(&self) -> usize {
        self.computed.hamming_distance(&self.received)
    }

    /// Recomputed checksum as an integer.
    pub fn computed_value(&self) -> u32 {
        crc32(&self.data)
    }
}

/// Checks `data` against separately received check bits.
pub fn verify(data: &Bits, check: &Bits) -> Result<CrcCheck> {
    if check.len() != CHECK_BITS {
        return Err(Error::BlockLengthMismatch {
            expected: CHECK_BITS,
            actual: check.len(),
        });
    }
    Ok(CrcCheck {
        data: data.clone(),
        received: check.clone(),
        computed: to_bits32(crc32(data)),
    })
}

/// Checks a frame whose last 32 bits are the check bits.
pub fn verify_frame(frame: &Bits) -> Result<CrcCheck> {
    if frame.len() < CHECK_BITS {
        return Err(Error::FrameTooShort {
            required: CHECK_BITS,
            actual: frame.len(),
        });
    }
    let split = frame.len() - CHECK_BITS;
    verify(&frame.subrange(0..split), &frame.subrange(split..frame.len()))
}

/// Checks a frame carrying a message of known length.
///
/// The first `data_len` bits are the data and the next 32 the check bits;
/// anything after them is ignored.
///
/// # Arguments
///
/// * `frame` - Received bits
/// * `data_len` - Declared message length in bits
///
/// # Returns
///
/// The comparison of received and recomputed check bits, or an error when the
/// frame cannot hold `data_len + 32` bits
pub fn verify_declared(frame: &Bits, data_len: usize) -> Result<CrcCheck> {
    let required = data_len.checked_add(CHECK_BITS).ok_or_else(|| {
        Error::InvalidInput(format!(
            "declared length {} overflows the frame length",
            data_len
        ))
    })?;
    if frame.len() < required {
        return Err(Error::FrameTooShort {
            required,
            actual: frame.len(),
        });
    }
    verify(
        &frame.subrange(0..data_len),
        &frame.subrange(data_len..required),
    )
}
