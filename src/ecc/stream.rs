//! Hamming framing for messages of arbitrary length.
//!
//! A message is padded on the right with zeros up to a multiple of `k`, cut into
//! `k`-bit blocks and each block is encoded independently. The pad length travels
//! out of band so the receiver can trim it again.

use crate::bits::Bits;
use crate::ecc::hamming::{parity_bits_for, BlockOutcome, HammingCode};
use crate::error::{Error, Result};
use bitvec::prelude::*;
use log::warn;
use std::cmp::Reverse;
use std::ops::RangeInclusive;

/// Block sizes tried when `k` has to be inferred from the frame length.
pub const INFERENCE_RANGE: RangeInclusive<usize> = 3..=64;

/// A Hamming-encoded frame and the number of zero bits appended before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedStream {
    /// Concatenated codewords
    pub frame: Bits,
    /// Zero bits appended to the message
    pub pad: usize,
}

/// Single-bit correction applied to one block of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCorrection {
    /// 0-based block index in the frame
    pub block: usize,
    /// 1-based bit position inside the block
    pub position: usize,
}

/// Reassembled payload of a stream plus per-block outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedStream {
    /// Best-effort payload with padding removed
    pub data: Bits,
    /// Blocks fixed by a single-bit correction
    pub corrected: usize,
    /// Blocks whose syndrome could not be resolved
    pub uncorrectable: usize,
    /// Where each correction happened
    pub corrections: Vec<BlockCorrection>,
    /// Bits of an incomplete trailing block that were not decoded
    pub dropped_bits: usize,
}

impl DecodedStream {
    /// True when no block was uncorrectable.
    pub fn is_reliable(&self) -> bool {
        self.uncorrectable == 0
    }
}

/// Hamming stream encoder/decoder for one block size.
///
/// Holds a single [`HammingCode`], so the parity coverage is built once and shared
/// by every block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCodec {
    code: HammingCode,
}

impl StreamCodec {
    /// Creates a stream codec with `k` payload bits per block.
    pub fn new(block_size: usize) -> Result<Self> {
        Ok(Self {
            code: HammingCode::new(block_size)?,
        })
    }

    /// The underlying block code.
    pub fn code(&self) -> &HammingCode {
        &self.code
    }

    /// Zero bits needed to bring `len` up to a multiple of `k`.
    pub fn pad_for(&self, len: usize) -> usize {
        let k = self.code.data_bits();
        (k - len % k) % k
    }

    /// Pads, splits and encodes a message.
    pub fn encode(&self, data: &BitSlice<u8, Msb0>) -> Result<EncodedStream> {
        let pad = self.pad_for(data.len());
        let mut padded = Bits::from(data);
        padded.extend_bits(&Bits::zeros(pad));

        let mut frame = Bits::new();
        for block in padded.chunks(self.code.data_bits()) {
            frame.extend_bits(&self.code.encode_block(block)?);
        }
        Ok(EncodedStream { frame, pad })
    }

    /// Decodes every complete codeword, reassembles the payload and trims `pad` bits.
    ///
    /// A trailing piece shorter than one codeword is dropped rather than decoded.
    pub fn decode(&self, frame: &BitSlice<u8, Msb0>, pad: usize) -> Result<DecodedStream> {
        let n = self.code.total_bits();
        let blocks = frame.chunks_exact(n);
        let dropped_bits = blocks.remainder().len();
        if dropped_bits > 0 {
            warn!(
                "frame of {} bits is not a multiple of n={}, dropping {} trailing bits",
                frame.len(),
                n,
                dropped_bits
            );
        }

        let mut decoded = DecodedStream {
            data: Bits::new(),
            corrected: 0,
            uncorrectable: 0,
            corrections: Vec::new(),
            dropped_bits,
        };
        for (index, block) in blocks.enumerate() {
            let result = self.code.decode_block(block)?;
            match result.outcome {
                BlockOutcome::NoError => {}
                BlockOutcome::Corrected { position, .. } => {
                    decoded.corrected += 1;
                    decoded.corrections.push(BlockCorrection {
                        block: index,
                        position,
                    });
                }
                BlockOutcome::Uncorrectable { .. } => decoded.uncorrectable += 1,
            }
            decoded.data.extend_bits(&result.data);
        }

        let keep = decoded.data.len().saturating_sub(pad);
        decoded.data.truncate(keep);
        Ok(decoded)
    }
}

/// Encodes `data` as a stream of `k`-bit Hamming blocks.
pub fn encode_stream(data: &Bits, block_size: usize) -> Result<EncodedStream> {
    StreamCodec::new(block_size)?.encode(data)
}

/// Decodes a stream produced by [`encode_stream`] with the same `k` and `pad`.
pub fn decode_stream(frame: &Bits, block_size: usize, pad: usize) -> Result<DecodedStream> {
    StreamCodec::new(block_size)?.decode(frame, pad)
}

/// Block parameters guessed from a frame length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferredBlockSize {
    /// Payload bits per block
    pub k: usize,
    /// Parity bits per block
    pub r: usize,
    /// Codeword length
    pub n: usize,
    /// Number of codewords in the frame
    pub blocks: usize,
    /// Padding implied by the expected message length
    pub pad: usize,
}

/// Guesses `k` for a frame of `frame_len` bits carrying `message_len` payload bits.
///
/// A candidate fits when the frame is a whole number of codewords with room for the
/// message. The candidate with the least padding wins, larger `k` breaking ties.
/// Several block sizes can fit the same frame, so an explicit `k` should always be
/// preferred over this guess.
pub fn infer_block_size(frame_len: usize, message_len: usize) -> Result<InferredBlockSize> {
    INFERENCE_RANGE
        .filter_map(|k| {
            let r = parity_bits_for(k);
            let n = k + r;
            if frame_len % n != 0 {
                return None;
            }
            let blocks = frame_len / n;
            let capacity = blocks * k;
            (capacity >= message_len).then(|| InferredBlockSize {
                k,
                r,
                n,
                blocks,
                pad: capacity - message_len,
            })
        })
        .min_by_key(|candidate| (candidate.pad, Reverse(candidate.k)))
        .ok_or(Error::BlockSizeInference {
            frame_len,
            message_len,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn bits(s: &str) -> Bits {
        s.parse().unwrap()
    }

    #[test]
    fn test_ten_bits_with_k4() {
        let data = bits("1011001110");
        let encoded = encode_stream(&data, 4).unwrap();
        assert_eq!(encoded.pad, 2);
        assert_eq!(encoded.frame.len(), 3 * 7);

        let decoded = decode_stream(&encoded.frame, 4, encoded.pad).unwrap();
        assert_eq!(decoded.data, data);
        assert_eq!(decoded.corrected, 0);
        assert!(decoded.is_reliable());
    }

    #[test]
    fn test_no_padding_when_aligned() {
        let codec = StreamCodec::new(8).unwrap();
        assert_eq!(codec.pad_for(16), 0);
        assert_eq!(codec.pad_for(17), 7);
        assert_eq!(codec.pad_for(0), 0);
    }

    #[test]
    fn test_empty_message() {
        let encoded = encode_stream(&Bits::new(), 11).unwrap();
        assert!(encoded.frame.is_empty());
        assert_eq!(encoded.pad, 0);
        let decoded = decode_stream(&encoded.frame, 11, 0).unwrap();
        assert!(decoded.data.is_empty());
    }

    #[test]
    fn test_one_error_per_block_is_corrected() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let data = Bits::random(100, &mut rng);
        let codec = StreamCodec::new(11).unwrap();
        let encoded = codec.encode(&data).unwrap();
        let n = codec.code().total_bits();

        let mut noisy = encoded.frame.clone();
        let blocks = noisy.len() / n;
        for block in 0..blocks {
            noisy.flip(block * n + block % n);
        }

        let decoded = codec.decode(&noisy, encoded.pad).unwrap();
        assert_eq!(decoded.data, data);
        assert_eq!(decoded.corrected, blocks);
        assert_eq!(decoded.uncorrectable, 0);
        assert_eq!(
            decoded.corrections[1],
            BlockCorrection {
                block: 1,
                position: 2
            }
        );
    }

    #[test]
    fn test_uncorrectable_block_is_counted() {
        let codec = StreamCodec::new(8).unwrap();
        let data = Bits::zeros(16);
        let encoded = codec.encode(&data).unwrap();
        let mut noisy = encoded.frame.clone();
        // syndrome 3 ^ 12 = 15 lies outside a 12-bit codeword
        noisy.flip(2);
        noisy.flip(11);

        let decoded = codec.decode(&noisy, encoded.pad).unwrap();
        assert_eq!(decoded.uncorrectable, 1);
        assert!(!decoded.is_reliable());
        assert_eq!(decoded.data.len(), 16);
    }

    #[test]
    fn test_trailing_partial_block_is_dropped() {
        let data = bits("10110011");
        let encoded = encode_stream(&data, 4).unwrap();
        let mut frame = encoded.frame.clone();
        frame.extend_bits(&bits("101"));

        let decoded = decode_stream(&frame, 4, encoded.pad).unwrap();
        assert_eq!(decoded.dropped_bits, 3);
        assert_eq!(decoded.data, data);
    }

    #[test]
    fn test_invalid_block_size() {
        assert!(matches!(
            encode_stream(&bits("1"), 0),
            Err(Error::InvalidBlockSize(0))
        ));
    }

    #[test]
    fn test_infer_block_size_exact() {
        // 16 message bits with k=8: two 12-bit codewords, no padding
        let inferred = infer_block_size(24, 16).unwrap();
        assert_eq!(
            inferred,
            InferredBlockSize {
                k: 8,
                r: 4,
                n: 12,
                blocks: 2,
                pad: 0
            }
        );
    }

    #[test]
    fn test_infer_block_size_matches_sender() {
        let data = Bits::from_text("A");
        let encoded = encode_stream(&data, 4).unwrap();
        let inferred = infer_block_size(encoded.frame.len(), data.len()).unwrap();
        assert_eq!(inferred.k, 4);
        assert_eq!(inferred.blocks, 2);

        // k=7 and k=10 also divide 154 bits but need padding
        let inferred = infer_block_size(154, 88).unwrap();
        assert_eq!(inferred.k, 4);
        assert_eq!(inferred.pad, 0);
    }

    #[test]
    fn test_infer_block_size_can_pick_another_k() {
        // Sent with k=11 and 4 bits of padding, but five (12,8) codewords carry
        // the 40 message bits with no padding at all.
        let sent = encode_stream(&Bits::zeros(40), 11).unwrap();
        assert_eq!(sent.frame.len(), 60);
        assert_eq!(sent.pad, 4);

        let inferred = infer_block_size(60, 40).unwrap();
        assert_eq!(inferred.k, 8);
        assert_eq!(inferred.pad, 0);
    }

    #[test]
    fn test_infer_block_size_prefers_larger_k_on_ties() {
        // (30,25) x 6 and (36,30) x 5 both hold exactly 150 bits
        let inferred = infer_block_size(180, 150).unwrap();
        assert_eq!(
            inferred,
            InferredBlockSize {
                k: 30,
                r: 6,
                n: 36,
                blocks: 5,
                pad: 0
            }
        );
    }

    #[test]
    fn test_infer_block_size_failure() {
        assert!(matches!(
            infer_block_size(13, 8),
            Err(Error::BlockSizeInference {
                frame_len: 13,
                message_len: 8
            })
        ));
    }
}
