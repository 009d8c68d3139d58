//! Hamming single-error-correcting (SEC) block code.
//!
//! Hamming codes are a family of linear error-correcting codes developed by Richard Hamming in 1950.
//! A block of `k` data bits gains `r` parity bits, where `r` is the smallest integer with
//! `2^r >= k + r + 1`. Codeword positions are numbered from 1; the power-of-two positions
//! (1, 2, 4, 8, ...) hold parity, every other position holds data in order.
//!
//! The parity bit at position `p` is the even parity of every position `j` with `j & p != 0`,
//! the parity position itself included. The syndrome of a received block therefore names the
//! 1-based position of a single flipped bit, or 0 when every check passes.
//!
//! This code corrects one error per block. Two or more errors are only detected, and not
//! reliably: their syndrome can alias a single-bit pattern, in which case the decoder
//! "corrects" the wrong bit. There is no extra overall parity bit for double-error detection.
//!
//! # Examples
//!
//! ```
//! use linkcode::bits::Bits;
//! use linkcode::ecc::hamming::{BlockOutcome, HammingCode};
//!
//! let code = HammingCode::standard_7_4();
//! let data: Bits = "1011".parse().unwrap();
//! let mut block = code.encode_block(&data).unwrap();
//! assert_eq!(block.to_string(), "0110011");
//!
//! block.flip(4); // position 5
//! let decoded = code.decode_block(&block).unwrap();
//! assert!(matches!(decoded.outcome, BlockOutcome::Corrected { position: 5, .. }));
//! assert_eq!(decoded.data, data);
//! ```

use crate::bits::Bits;
use crate::error::{Error, Result};
use bitvec::prelude::*;
use log::debug;

/// Largest payload size a [`HammingCode`] accepts.
pub const MAX_DATA_BITS: usize = 64;

/// Smallest `r` with `k + r + 1 <= 2^r`.
///
/// Saturates instead of overflowing, so absurd `k` values still terminate; such
/// values are rejected by [`HammingCode::new`].
pub fn parity_bits_for(data_bits: usize) -> usize {
    let mut parity_bits = 0;
    while parity_bits < usize::BITS as usize
        && data_bits.saturating_add(parity_bits + 1) > (1usize << parity_bits)
    {
        parity_bits += 1;
    }
    parity_bits
}

/// Kind of bit a single-error correction landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectedBit {
    /// The flipped bit sat on a power-of-two position
    Parity,
    /// The flipped bit carried payload
    Data,
}

/// Outcome of decoding one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Zero syndrome
    NoError,
    /// One bit was flipped back at the given 1-based position
    Corrected { position: usize, kind: CorrectedBit },
    /// The syndrome does not name a correctable position; the block is left as received
    Uncorrectable { syndrome: usize },
}

/// A decoded block: the (possibly corrected) codeword and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDecode {
    /// Codeword after correction, or exactly as received when uncorrectable
    pub codeword: Bits,
    /// Payload extracted from `codeword`
    pub data: Bits,
    /// What the decoder did
    pub outcome: BlockOutcome,
}

/// A Hamming SEC code for a fixed payload size.
///
/// The parity coverage is computed once at construction and reused for every block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HammingCode {
    /// Number of data bits per block
    data_bits: usize,
    /// Number of parity bits per block
    parity_bits: usize,
    /// For each parity index `i`, the 1-based positions checked by parity bit `2^i`
    coverage: Vec<Vec<usize>>,
    /// 1-based positions that carry payload, in order
    data_positions: Vec<usize>,
}

impl HammingCode {
    /// Creates a Hamming code carrying `data_bits` payload bits per block.
    ///
    /// # Arguments
    ///
    /// * `data_bits` - Number of payload bits in each block, `1..=MAX_DATA_BITS`
    ///
    /// # Returns
    ///
    /// A new `HammingCode` with its parity coverage built, or
    /// [`Error::InvalidBlockSize`] when `data_bits` is out of range
    pub fn new(data_bits: usize) -> Result<Self> {
        if !(1..=MAX_DATA_BITS).contains(&data_bits) {
            return Err(Error::InvalidBlockSize(data_bits));
        }
        Ok(Self::build(data_bits))
    }

    /// Creates the classic (7,4) code.
    pub fn standard_7_4() -> Self {
        Self::build(4)
    }

    fn build(data_bits: usize) -> Self {
        let parity_bits = parity_bits_for(data_bits);
        let total = data_bits + parity_bits;

        let coverage = (0..parity_bits)
            .map(|i| {
                let mask = 1usize << i;
                (1..=total).filter(|pos| pos & mask != 0).collect()
            })
            .collect();
        let data_positions = (1..=total).filter(|pos| !pos.is_power_of_two()).collect();

        Self {
            data_bits,
            parity_bits,
            coverage,
            data_positions,
        }
    }

    /// Payload bits per block (`k`).
    pub fn data_bits(&self) -> usize {
        self.data_bits
    }

    /// Parity bits per block (`r`).
    pub fn parity_bits(&self) -> usize {
        self.parity_bits
    }

    /// Codeword length (`n = k + r`).
    pub fn total_bits(&self) -> usize {
        self.data_bits + self.parity_bits
    }

    /// Fraction of each codeword spent on parity.
    pub fn overhead(&self) -> f64 {
        self.parity_bits as f64 / self.total_bits() as f64
    }

    /// Positions covered by parity bit `2^parity_index`, or `None` past the last parity bit.
    pub fn coverage(&self, parity_index: usize) -> Option<&[usize]> {
        self.coverage.get(parity_index).map(Vec::as_slice)
    }

    /// The 1-based parity positions: 1, 2, 4, ...
    pub fn parity_positions(&self) -> impl Iterator<Item = usize> {
        (0..self.parity_bits).map(|i| 1usize << i)
    }

    /// The 1-based data positions in payload order.
    pub fn data_positions(&self) -> &[usize] {
        &self.data_positions
    }

    /// Encodes exactly `k` data bits into one codeword.
    ///
    /// # Arguments
    ///
    /// * `data` - The `k` payload bits of one block
    ///
    /// # Returns
    ///
    /// The `n`-bit codeword, or [`Error::BlockLengthMismatch`] if `data` is not `k` bits long
    pub fn encode_block(&self, data: &BitSlice<u8, Msb0>) -> Result<Bits> {
        if data.len() != self.data_bits {
            return Err(Error::BlockLengthMismatch {
                expected: self.data_bits,
                actual: data.len(),
            });
        }

        let mut code = bitvec![u8, Msb0; 0; self.total_bits()];
        for (bit, &pos) in data.iter().by_vals().zip(&self.data_positions) {
            code.set(pos - 1, bit);
        }

        // Parity positions never cover each other, so order does not matter.
        for (i, positions) in self.coverage.iter().enumerate() {
            let parity = positions.iter().fold(false, |acc, &pos| acc ^ code[pos - 1]);
            code.set((1usize << i) - 1, parity);
        }

        Ok(code.into())
    }

    /// Computes the syndrome of one received codeword.
    pub fn syndrome(&self, code: &BitSlice<u8, Msb0>) -> Result<usize> {
        self.check_codeword(code)?;
        Ok(self.syndrome_of(code))
    }

    fn syndrome_of(&self, code: &BitSlice<u8, Msb0>) -> usize {
        self.coverage
            .iter()
            .enumerate()
            .filter(|(_, positions)| {
                positions.iter().fold(false, |acc, &pos| acc ^ code[pos - 1])
            })
            .fold(0, |syndrome, (i, _)| syndrome | (1 << i))
    }

    /// Decodes one codeword, correcting at most one bit.
    ///
    /// A nonzero syndrome inside `1..=n` flips that position and re-checks; if the
    /// re-check passes the block is reported as corrected. Otherwise, or when the
    /// syndrome falls outside the codeword, the block is returned unmodified as
    /// uncorrectable. No second correction is ever attempted.
    ///
    /// # Arguments
    ///
    /// * `code` - One received `n`-bit codeword
    ///
    /// # Returns
    ///
    /// The codeword after correction, its payload and the [`BlockOutcome`]
    pub fn decode_block(&self, code: &BitSlice<u8, Msb0>) -> Result<BlockDecode> {
        self.check_codeword(code)?;

        let syndrome = self.syndrome_of(code);
        if syndrome == 0 {
            return Ok(self.finish(code.into(), BlockOutcome::NoError));
        }

        if (1..=self.total_bits()).contains(&syndrome) {
            let mut fixed = Bits::from(code);
            fixed.flip(syndrome - 1);
            if self.syndrome_of(&fixed) == 0 {
                let kind = if syndrome.is_power_of_two() {
                    CorrectedBit::Parity
                } else {
                    CorrectedBit::Data
                };
                debug!(
                    "hamming({}, {}): corrected {:?} bit at position {}",
                    self.total_bits(),
                    self.data_bits,
                    kind,
                    syndrome
                );
                return Ok(self.finish(
                    fixed,
                    BlockOutcome::Corrected {
                        position: syndrome,
                        kind,
                    },
                ));
            }
        }

        debug!(
            "hamming({}, {}): uncorrectable block, syndrome {}",
            self.total_bits(),
            self.data_bits,
            syndrome
        );
        Ok(self.finish(code.into(), BlockOutcome::Uncorrectable { syndrome }))
    }

    /// Reads the payload out of a codeword's data positions.
    pub fn extract_data(&self, code: &BitSlice<u8, Msb0>) -> Result<Bits> {
        self.check_codeword(code)?;
        Ok(self.extract_unchecked(code))
    }

    fn extract_unchecked(&self, code: &BitSlice<u8, Msb0>) -> Bits {
        self.data_positions.iter().map(|&pos| code[pos - 1]).collect()
    }

    fn finish(&self, codeword: Bits, outcome: BlockOutcome) -> BlockDecode {
        let data = self.extract_unchecked(&codeword);
        BlockDecode {
            codeword,
            data,
            outcome,
        }
    }

    fn check_codeword(&self, code: &BitSlice<u8, Msb0>) -> Result<()> {
        if code.len() != self.total_bits() {
            return Err(Error::BlockLengthMismatch {
                expected: self.total_bits(),
                actual: code.len(),
            });
        }
        Ok(())
    }
}
