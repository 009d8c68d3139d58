//! Binary symmetric channel: every bit flips independently with probability `p`.
//!
//! All randomness comes from a caller-owned random source. A
//! [`BitFlipChannel::seeded`] channel uses ChaCha8, so a given seed and input
//! always produce the same noise.
//!
//! [`relay_line`] is the noisy-proxy contract: it perturbs the `frame_bits` of a
//! JSON line and forwards anything it does not understand untouched.

use crate::bits::Bits;
use crate::error::{Error, Result};
use log::{debug, warn};
use rand::distributions::{Bernoulli, Distribution};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::Value;

/// A frame after passing through the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoisyFrame {
    /// Received bits
    pub bits: Bits,
    /// Hamming distance between sent and received bits
    pub flips: usize,
}

impl NoisyFrame {
    /// Fraction of bits that flipped.
    pub fn flip_rate(&self) -> f64 {
        if self.bits.is_empty() {
            0.0
        } else {
            self.flips as f64 / self.bits.len() as f64
        }
    }
}

fn flip_distribution(probability: f64) -> Result<Bernoulli> {
    Bernoulli::new(probability).map_err(|_| Error::InvalidProbability(probability))
}

/// Flips each bit of `frame` independently with probability `probability`.
///
/// `0.0` returns the frame unchanged and `1.0` inverts every bit.
pub fn apply_noise<R: Rng + ?Sized>(
    frame: &Bits,
    probability: f64,
    rng: &mut R,
) -> Result<NoisyFrame> {
    let flip = flip_distribution(probability)?;
    Ok(transmit_with(frame, &flip, rng))
}

fn transmit_with<R: Rng + ?Sized>(frame: &Bits, flip: &Bernoulli, rng: &mut R) -> NoisyFrame {
    let bits: Bits = frame
        .iter()
        .by_vals()
        .map(|bit| bit ^ flip.sample(rng))
        .collect();
    let flips = frame.hamming_distance(&bits);
    NoisyFrame { bits, flips }
}

/// A noisy channel that owns its random source.
#[derive(Debug, Clone)]
pub struct BitFlipChannel<R> {
    probability: f64,
    flip: Bernoulli,
    rng: R,
}

impl BitFlipChannel<ChaCha8Rng> {
    /// Creates a reproducible channel.
    pub fn seeded(probability: f64, seed: u64) -> Result<Self> {
        Self::with_rng(probability, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Creates a channel seeded from operating-system entropy.
    pub fn from_entropy(probability: f64) -> Result<Self> {
        Self::with_rng(probability, ChaCha8Rng::from_entropy())
    }
}

impl<R: Rng> BitFlipChannel<R> {
    /// Creates a channel drawing from `rng`.
    pub fn with_rng(probability: f64, rng: R) -> Result<Self> {
        Ok(Self {
            probability,
            flip: flip_distribution(probability)?,
            rng,
        })
    }

    /// Per-bit flip probability.
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Sends one frame through the channel.
    pub fn transmit(&mut self, frame: &Bits) -> NoisyFrame {
        let noisy = transmit_with(frame, &self.flip, &mut self.rng);
        debug!(
            "channel p={}: {} of {} bits flipped (expected {:.1})",
            self.probability,
            noisy.flips,
            frame.len(),
            self.probability * frame.len() as f64
        );
        noisy
    }
}

/// A line forwarded by the noisy proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedLine {
    /// Newline-terminated line to send on
    pub line: String,
    /// Noise applied to `frame_bits`, or `None` when the line passed through untouched
    pub noise: Option<RelayNoise>,
}

/// Flip statistics of a relayed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayNoise {
    /// Bits that flipped
    pub flips: usize,
    /// Frame length
    pub frame_len: usize,
}

/// Perturbs the `frame_bits` of one JSON line.
///
/// A JSON object whose `frame_bits` is a binary string gets that field replaced
/// by its noisy version and a `simulator_ber` field recording `p`; other fields
/// keep their order. Anything else (not JSON, not an object, no `frame_bits`,
/// non-binary bits) is forwarded byte for byte apart from its line ending.
pub fn relay_line<R: Rng>(line: &str, channel: &mut BitFlipChannel<R>) -> RelayedLine {
    let body = line.trim_end_matches(['\r', '\n']);
    let passthrough = || RelayedLine {
        line: format!("{}\n", body),
        noise: None,
    };

    let mut packet: Value = match serde_json::from_str(body) {
        Ok(packet) => packet,
        Err(err) => {
            warn!("relaying non-JSON line unchanged: {}", err);
            return passthrough();
        }
    };
    let Some(fields) = packet.as_object_mut() else {
        return passthrough();
    };
    let frame: Bits = match fields.get("frame_bits").and_then(Value::as_str) {
        Some(text) => match text.parse() {
            Ok(frame) => frame,
            Err(err) => {
                warn!("relaying frame unchanged: {}", err);
                return passthrough();
            }
        },
        None => return passthrough(),
    };

    let noisy = channel.transmit(&frame);
    fields.insert("frame_bits".to_string(), Value::from(noisy.bits.to_string()));
    fields.insert("simulator_ber".to_string(), Value::from(channel.probability()));

    RelayedLine {
        line: format!("{}\n", packet),
        noise: Some(RelayNoise {
            flips: noisy.flips,
            frame_len: frame.len(),
        }),
    }
}
