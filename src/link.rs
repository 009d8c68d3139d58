//! Sender and receiver halves of the simulated link.
//!
//! The sender turns ASCII text into a protected frame and describes it with a
//! one-line JSON [`LinkPayload`]:
//!
//! ```json
//! {"msg_ascii_len":2,"algo":"HAMMING","frame_bits":"0110011...","k":11}
//! ```
//!
//! The receiver checks or corrects the frame and reports a [`Reception`].
//! Uncorrectable frames are a [`Verdict`], not an error.

use crate::bits::Bits;
use crate::channel::BitFlipChannel;
use crate::ecc::crc::{verify_declared, CrcCheck};
use crate::ecc::hamming::{parity_bits_for, MAX_DATA_BITS};
use crate::ecc::stream::{infer_block_size, StreamCodec};
use crate::ecc::{Algorithm, CrcCodec, FrameCodec};
use crate::error::{Error, Result};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Largest block size a transmitter sends or a receiver accepts.
pub const MAX_BLOCK_SIZE: usize = MAX_DATA_BITS;

/// Block size used when a Hamming transmitter is not given one.
pub const DEFAULT_BLOCK_SIZE: usize = 11;

/// One JSON line travelling from sender to receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPayload {
    /// Message length in ASCII characters
    pub msg_ascii_len: usize,
    /// Algorithm tag, `CRC32` or `HAMMING`
    pub algo: String,
    /// The transmitted frame as '0'/'1' text
    pub frame_bits: String,
    /// Hamming block size, if the sender announced it
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_block_size"
    )]
    pub k: Option<usize>,
    /// Flip probability the sender applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_error: Option<f64>,
    /// Flip probability a relay applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulator_ber: Option<f64>,
}

/// Accepts `k` as a number or a string of digits; anything else counts as absent.
fn lenient_block_size<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|k| usize::try_from(k).ok()),
        Some(Value::String(s)) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse().ok()
        }
        _ => None,
    })
}

impl LinkPayload {
    /// Parses one JSON line.
    pub fn from_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }

    /// Renders the payload as one newline-terminated JSON line.
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Message length in bits.
    ///
    /// Fails with [`Error::InvalidInput`] when `msg_ascii_len` is too large to
    /// express in bits.
    pub fn message_bits(&self) -> Result<usize> {
        self.msg_ascii_len.checked_mul(8).ok_or_else(|| {
            Error::InvalidInput(format!(
                "msg_ascii_len {} overflows the bit length",
                self.msg_ascii_len
            ))
        })
    }

    /// Parsed algorithm tag.
    pub fn algorithm(&self) -> Result<Algorithm> {
        self.algo.parse()
    }

    /// Parsed frame.
    pub fn frame(&self) -> Result<Bits> {
        self.frame_bits.parse()
    }
}

/// Sender settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmitter {
    algorithm: Algorithm,
    block_size: usize,
    announce_block_size: bool,
}

/// Everything the sender produced for one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    /// ASCII bits of the message
    pub message_bits: Bits,
    /// Frame as put on the wire
    pub frame: Bits,
    /// Zero bits appended before Hamming encoding
    pub pad: usize,
    /// Line sent to the receiver
    pub payload: LinkPayload,
}

impl Transmitter {
    /// Creates a CRC-32 transmitter.
    pub fn crc32() -> Self {
        Self {
            algorithm: Algorithm::Crc32,
            block_size: DEFAULT_BLOCK_SIZE,
            announce_block_size: false,
        }
    }

    /// Creates a Hamming transmitter with `k` payload bits per block.
    pub fn hamming(block_size: usize) -> Result<Self> {
        if !(1..=MAX_BLOCK_SIZE).contains(&block_size) {
            return Err(Error::InvalidBlockSize(block_size));
        }
        Ok(Self {
            algorithm: Algorithm::Hamming,
            block_size,
            announce_block_size: true,
        })
    }

    /// Whether the block size goes into the payload. Without it the receiver
    /// has to infer `k` from the frame length.
    pub fn announce_block_size(mut self, announce: bool) -> Self {
        self.announce_block_size = announce;
        self
    }

    /// Algorithm this transmitter uses.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn codec(&self) -> Result<Box<dyn FrameCodec>> {
        Ok(match self.algorithm {
            Algorithm::Crc32 => Box::new(CrcCodec),
            Algorithm::Hamming => Box::new(StreamCodec::new(self.block_size)?),
        })
    }

    /// Encodes `text` without touching the channel.
    ///
    /// # Arguments
    ///
    /// * `text` - ASCII message; each character becomes 8 bits
    ///
    /// # Returns
    ///
    /// The message bits, the clean frame and the payload line, or
    /// [`Error::InvalidInput`] when `text` is not ASCII
    pub fn transmit(&self, text: &str) -> Result<Transmission> {
        if let Some(c) = text.chars().find(|c| !c.is_ascii()) {
            return Err(Error::InvalidInput(format!(
                "message must be ASCII, found {:?}",
                c
            )));
        }
        let message_bits = Bits::from_text(text);
        let encoded = self.codec()?.encode(&message_bits)?;
        let k = (self.algorithm == Algorithm::Hamming && self.announce_block_size)
            .then_some(self.block_size);

        let payload = LinkPayload {
            msg_ascii_len: text.len(),
            algo: self.algorithm.tag().to_string(),
            frame_bits: encoded.bits.to_string(),
            k,
            p_error: None,
            simulator_ber: None,
        };
        debug!(
            "{} frame: {} message bits, {} frame bits, pad {}",
            self.algorithm,
            message_bits.len(),
            encoded.bits.len(),
            encoded.pad
        );
        Ok(Transmission {
            message_bits,
            frame: encoded.bits,
            pad: encoded.pad,
            payload,
        })
    }

    /// Encodes `text` and sends the frame through `channel`.
    ///
    /// `frame` keeps the clean bits; the payload carries the noisy ones and the
    /// channel's probability as `p_error`.
    pub fn transmit_through<R: Rng>(
        &self,
        text: &str,
        channel: &mut BitFlipChannel<R>,
    ) -> Result<Transmission> {
        let mut transmission = self.transmit(text)?;
        let noisy = channel.transmit(&transmission.frame);
        info!(
            "sender noise p={}: {} bit(s) flipped",
            channel.probability(),
            noisy.flips
        );
        transmission.payload.frame_bits = noisy.bits.to_string();
        transmission.payload.p_error = Some(channel.probability());
        Ok(transmission)
    }
}

/// Receiver's judgement of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No error detected
    Intact,
    /// Every detected error was corrected
    Corrected,
    /// Errors were detected that could not be corrected; discard the message
    Rejected,
}

/// Block size the receiver used and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSizeUsed {
    /// Payload bits per block
    pub k: usize,
    /// Codeword length
    pub n: usize,
    /// True when `k` was guessed from the frame length
    pub inferred: bool,
}

/// Outcome of receiving one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reception {
    /// Algorithm the frame was protected with
    pub algorithm: Algorithm,
    /// Recovered message bits, trimmed to the declared length
    pub data: Bits,
    /// Overall judgement
    pub verdict: Verdict,
    /// Hamming blocks repaired
    pub corrected_blocks: usize,
    /// Hamming blocks left unresolved
    pub uncorrectable_blocks: usize,
    /// Hamming block size, `None` for CRC-32
    pub block_size: Option<BlockSizeUsed>,
    /// CRC comparison, `None` for Hamming
    pub crc: Option<CrcCheck>,
}

impl Reception {
    /// True unless the frame was rejected.
    pub fn is_accepted(&self) -> bool {
        self.verdict != Verdict::Rejected
    }

    /// Recovered message as text.
    pub fn text(&self) -> String {
        self.data.to_text()
    }
}

/// Checks or corrects the frame described by `payload`.
///
/// Invalid input (unknown tag, non-binary frame, frame too short, no block size
/// fits) is an [`Error`]; a corrupted frame is a [`Verdict::Rejected`].
pub fn receive(payload: &LinkPayload) -> Result<Reception> {
    let algorithm = payload.algorithm()?;
    let frame = payload.frame()?;
    let message_len = payload.message_bits()?;
    match algorithm {
        Algorithm::Crc32 => receive_crc(&frame, message_len),
        Algorithm::Hamming => receive_hamming(&frame, message_len, payload.k),
    }
}

fn receive_crc(frame: &Bits, message_len: usize) -> Result<Reception> {
    let check = verify_declared(frame, message_len)?;
    let verdict = if check.is_valid() {
        Verdict::Intact
    } else {
        info!(
            "CRC mismatch: {} check bit(s) differ, discarding frame",
            check.distance()
        );
        Verdict::Rejected
    };
    Ok(Reception {
        algorithm: Algorithm::Crc32,
        data: check.data.clone(),
        verdict,
        corrected_blocks: 0,
        uncorrectable_blocks: 0,
        block_size: None,
        crc: Some(check),
    })
}

fn receive_hamming(frame: &Bits, message_len: usize, k: Option<usize>) -> Result<Reception> {
    let block_size = match k {
        Some(k) => {
            if !(1..=MAX_BLOCK_SIZE).contains(&k) {
                return Err(Error::InvalidBlockSize(k));
            }
            let n = k + parity_bits_for(k);
            if frame.len() % n != 0 {
                warn!(
                    "frame length {} is not a multiple of n={}, continuing",
                    frame.len(),
                    n
                );
            }
            BlockSizeUsed {
                k,
                n,
                inferred: false,
            }
        }
        None => {
            let guess = infer_block_size(frame.len(), message_len)?;
            warn!(
                "no block size announced, inferred k={} r={} n={} blocks={} pad={}",
                guess.k, guess.r, guess.n, guess.blocks, guess.pad
            );
            BlockSizeUsed {
                k: guess.k,
                n: guess.n,
                inferred: true,
            }
        }
    };

    let codec = StreamCodec::new(block_size.k)?;
    let report = FrameCodec::decode(&codec, frame, message_len)?;
    let verdict = if report.uncorrectable > 0 {
        Verdict::Rejected
    } else if report.corrected > 0 {
        Verdict::Corrected
    } else {
        Verdict::Intact
    };
    Ok(Reception {
        algorithm: Algorithm::Hamming,
        data: report.data,
        verdict,
        corrected_blocks: report.corrected,
        uncorrectable_blocks: report.uncorrectable,
        block_size: Some(block_size),
        crc: None,
    })
}
