//! Channel codes for the simulated link.
//!
//! This module provides the two codes the link can run:
//! - CRC-32 (detection only)
//! - Hamming SEC over a stream of fixed-size blocks (single-error correction per block)
//!
//! Both implement [`FrameCodec`], which is what the experiment harness drives.

use crate::bits::Bits;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod crc;
pub mod hamming;
pub mod stream;

pub use crc::{append_crc, crc32, to_bits32, verify, verify_declared, verify_frame, CrcCheck};
pub use hamming::{BlockDecode, BlockOutcome, CorrectedBit, HammingCode};
pub use stream::{
    decode_stream, encode_stream, infer_block_size, DecodedStream, EncodedStream,
    InferredBlockSize, StreamCodec,
};

/// Which code protects a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// CRC-32 check bits appended to the data
    #[serde(rename = "CRC32")]
    Crc32,
    /// Hamming SEC blocks
    #[serde(rename = "HAMMING")]
    Hamming,
}

impl Algorithm {
    /// Wire tag of the algorithm.
    pub fn tag(&self) -> &'static str {
        match self {
            Algorithm::Crc32 => "CRC32",
            Algorithm::Hamming => "HAMMING",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    /// Parses a tag, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRC32" => Ok(Algorithm::Crc32),
            "HAMMING" => Ok(Algorithm::Hamming),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// A frame ready for the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Bits to transmit
    pub bits: Bits,
    /// Zero bits appended to the message before encoding
    pub pad: usize,
}

/// What the receiving side made of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    /// Recovered message bits
    pub data: Bits,
    /// Blocks repaired by single-bit correction
    pub corrected: usize,
    /// Blocks left unresolved
    pub uncorrectable: usize,
    /// The check failed and the frame should be discarded
    pub rejected: bool,
}

impl FrameReport {
    /// True when the receiver would hand the data upward.
    pub fn is_accepted(&self) -> bool {
        !self.rejected && self.uncorrectable == 0
    }
}

/// Trait for the codes the link can run
pub trait FrameCodec: Sync {
    /// Which code this is
    fn algorithm(&self) -> Algorithm;

    /// Hamming payload size, if the code is block based
    fn block_size(&self) -> Option<usize> {
        None
    }

    /// Turn message bits into a transmittable frame
    fn encode(&self, data: &Bits) -> Result<EncodedFrame>;

    /// Check or correct a received frame that carries `message_len` message bits
    fn decode(&self, frame: &Bits, message_len: usize) -> Result<FrameReport>;
}

/// CRC-32 as a [`FrameCodec`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrcCodec;

impl FrameCodec for CrcCodec {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Crc32
    }

    fn encode(&self, data: &Bits) -> Result<EncodedFrame> {
        Ok(EncodedFrame {
            bits: append_crc(data),
            pad: 0,
        })
    }

    fn decode(&self, frame: &Bits, message_len: usize) -> Result<FrameReport> {
        let check = verify_declared(frame, message_len)?;
        let rejected = !check.is_valid();
        Ok(FrameReport {
            data: check.data,
            corrected: 0,
            uncorrectable: 0,
            rejected,
        })
    }
}

impl FrameCodec for StreamCodec {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Hamming
    }

    fn block_size(&self) -> Option<usize> {
        Some(self.code().data_bits())
    }

    fn encode(&self, data: &Bits) -> Result<EncodedFrame> {
        let encoded = StreamCodec::encode(self, data)?;
        Ok(EncodedFrame {
            bits: encoded.frame,
            pad: encoded.pad,
        })
    }

    fn decode(&self, frame: &Bits, message_len: usize) -> Result<FrameReport> {
        let k = self.code().data_bits();
        let n = self.code().total_bits();
        let capacity = frame.len() / n * k;
        if capacity < message_len {
            return Err(Error::FrameTooShort {
                required: message_len.div_ceil(k).saturating_mul(n),
                actual: frame.len(),
            });
        }

        let decoded = StreamCodec::decode(self, frame, capacity - message_len)?;
        Ok(FrameReport {
            data: decoded.data,
            corrected: decoded.corrected,
            uncorrectable: decoded.uncorrectable,
            rejected: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_tags() {
        assert_eq!("CRC32".parse::<Algorithm>().unwrap(), Algorithm::Crc32);
        assert_eq!(" hamming\n".parse::<Algorithm>().unwrap(), Algorithm::Hamming);
        assert!(matches!(
            "md5".parse::<Algorithm>(),
            Err(Error::UnknownAlgorithm(_))
        ));
        assert_eq!(Algorithm::Hamming.to_string(), "HAMMING");
        assert_eq!(
            serde_json::to_string(&Algorithm::Crc32).unwrap(),
            "\"CRC32\""
        );
    }

    #[test]
    fn test_codecs_through_trait() {
        let data = Bits::from_text("hello");
        let codecs: Vec<Box<dyn FrameCodec>> =
            vec![Box::new(CrcCodec), Box::new(StreamCodec::new(11).unwrap())];

        for codec in &codecs {
            let frame = codec.encode(&data).unwrap();
            let report = codec.decode(&frame.bits, data.len()).unwrap();
            assert!(report.is_accepted());
            assert_eq!(report.data, data);
        }
        assert_eq!(codecs[0].block_size(), None);
        assert_eq!(codecs[1].block_size(), Some(11));
    }

    #[test]
    fn test_crc_codec_rejects_corruption() {
        let data = Bits::from_text("hi");
        let mut frame = CrcCodec.encode(&data).unwrap().bits;
        frame.flip(3);
        let report = CrcCodec.decode(&frame, data.len()).unwrap();
        assert!(report.rejected);
        assert!(!report.is_accepted());
    }

    #[test]
    fn test_stream_codec_short_frame() {
        let codec = StreamCodec::new(4).unwrap();
        let frame = Bits::zeros(14);
        assert!(matches!(
            FrameCodec::decode(&codec, &frame, 12),
            Err(Error::FrameTooShort {
                required: 21,
                actual: 14
            })
        ));
    }
}
