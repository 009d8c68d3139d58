//! Monte Carlo comparison of CRC-32 and Hamming SEC over a noisy channel.
//!
//! For every (message size, flip probability) pair the harness runs one CRC-32
//! row and one Hamming row per block size. Each trial draws a fresh random
//! message, encodes it, sends it through the channel and decodes it again.
//!
//! Trials run in parallel on the rayon pool. Every trial seeds its own ChaCha8
//! generator from the base seed, the row index and the trial index, so a seeded
//! run produces the same rows however the pool schedules the work.

use crate::bits::Bits;
use crate::channel::apply_noise;
use crate::ecc::hamming::MAX_DATA_BITS;
use crate::ecc::{Algorithm, CrcCodec, FrameCodec, StreamCodec};
use crate::error::{Error, Result};
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Serialize, Serializer};

/// Column order of persisted experiment rows.
pub const CSV_FIELDS: [&str; 8] = [
    "algo",
    "k",
    "m_bits",
    "p_error",
    "runs",
    "ok_rate",
    "corrected_avg",
    "uncorrect_avg",
];

/// Configuration for an experiment run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    /// Trials per row.
    pub runs: usize,
    /// Message lengths in bits.
    pub message_sizes: Vec<usize>,
    /// Per-bit flip probabilities.
    pub error_probabilities: Vec<f64>,
    /// Hamming payload sizes to compare against CRC-32.
    pub block_sizes: Vec<usize>,
    /// Base seed; `None` draws one from the OS and logs it.
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            runs: 10_000,
            message_sizes: vec![64, 256, 1024],
            error_probabilities: vec![0.0, 0.001, 0.005, 0.01, 0.02, 0.05],
            block_sizes: vec![11],
            seed: Some(1234),
        }
    }
}

impl ExperimentConfig {
    /// Checks the configuration before any trial runs.
    pub fn validate(&self) -> Result<()> {
        if self.runs == 0 {
            return Err(Error::InvalidInput(
                "an experiment needs at least one run per row".to_string(),
            ));
        }
        if let Some(&p) = self
            .error_probabilities
            .iter()
            .find(|p| !(0.0..=1.0).contains(*p))
        {
            return Err(Error::InvalidProbability(p));
        }
        if let Some(&k) = self
            .block_sizes
            .iter()
            .find(|&&k| !(1..=MAX_DATA_BITS).contains(&k))
        {
            return Err(Error::InvalidBlockSize(k));
        }
        Ok(())
    }

    /// Number of rows a run produces.
    pub fn row_count(&self) -> usize {
        self.message_sizes.len() * self.error_probabilities.len() * (1 + self.block_sizes.len())
    }
}

/// Aggregated results for one (algorithm, k, message size, probability) point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentRow {
    /// Code under test
    pub algo: Algorithm,
    /// Hamming block size, written as 0 for CRC-32
    #[serde(serialize_with = "block_size_or_zero")]
    pub k: Option<usize>,
    /// Message length in bits
    pub m_bits: usize,
    /// Flip probability
    pub p_error: f64,
    /// Trials run
    pub runs: usize,
    /// Fraction of trials that delivered the original message and were accepted
    pub ok_rate: f64,
    /// Mean corrected blocks per trial
    pub corrected_avg: f64,
    /// Mean uncorrectable blocks per trial
    pub uncorrect_avg: f64,
}

fn block_size_or_zero<S: Serializer>(
    k: &Option<usize>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(k.unwrap_or(0) as u64)
}

impl ExperimentRow {
    /// One CSV line in [`CSV_FIELDS`] order, without a newline.
    pub fn csv_record(&self) -> String {
        format!(
            "{},{},{},{},{},{:.6},{:.6},{:.6}",
            self.algo,
            self.k.unwrap_or(0),
            self.m_bits,
            self.p_error,
            self.runs,
            self.ok_rate,
            self.corrected_avg,
            self.uncorrect_avg
        )
    }
}

/// Per-worker partial counts, merged after the parallel loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    ok: usize,
    corrected: usize,
    uncorrectable: usize,
}

impl Tally {
    fn merge(self, other: Tally) -> Tally {
        Tally {
            ok: self.ok + other.ok,
            corrected: self.corrected + other.corrected,
            uncorrectable: self.uncorrectable + other.uncorrectable,
        }
    }
}

/// Derives an independent seed for one trial (splitmix64 finalizer).
pub fn trial_seed(base: u64, point: u64, trial: u64) -> u64 {
    let mut z = base
        ^ point.wrapping_mul(0xD1B5_4A32_D192_ED03)
        ^ trial.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn run_trial(
    codec: &dyn FrameCodec,
    message_len: usize,
    probability: f64,
    seed: u64,
) -> Result<Tally> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let data = Bits::random(message_len, &mut rng);
    let frame = codec.encode(&data)?;
    let noisy = apply_noise(&frame.bits, probability, &mut rng)?;
    let report = codec.decode(&noisy.bits, message_len)?;
    Ok(Tally {
        ok: usize::from(report.is_accepted() && report.data == data),
        corrected: report.corrected,
        uncorrectable: report.uncorrectable,
    })
}

/// Runs the trial matrix described by an [`ExperimentConfig`].
pub struct Harness {
    config: ExperimentConfig,
    codecs: Vec<Box<dyn FrameCodec>>,
    base_seed: u64,
}

impl Harness {
    /// Validates `config` and builds one codec per row kind.
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        let mut codecs: Vec<Box<dyn FrameCodec>> = vec![Box::new(CrcCodec)];
        for &k in &config.block_sizes {
            codecs.push(Box::new(StreamCodec::new(k)?));
        }
        let base_seed = match config.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random();
                info!("no seed configured, using base seed {}", seed);
                seed
            }
        };
        Ok(Self {
            config,
            codecs,
            base_seed,
        })
    }

    /// Seed every trial seed is derived from.
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Runs every row and hands each one to `sink` as soon as it is complete.
    ///
    /// Rows come out ordered by message size, then probability, then CRC-32
    /// followed by each Hamming block size.
    pub fn run<F>(&self, mut sink: F) -> Result<()>
    where
        F: FnMut(ExperimentRow),
    {
        let runs = self.config.runs;
        let mut point = 0u64;
        for &message_len in &self.config.message_sizes {
            for &probability in &self.config.error_probabilities {
                for codec in &self.codecs {
                    let codec = codec.as_ref();
                    let tally = (0..runs)
                        .into_par_iter()
                        .map(|trial| {
                            let seed = trial_seed(self.base_seed, point, trial as u64);
                            run_trial(codec, message_len, probability, seed)
                        })
                        .try_reduce(Tally::default, |a, b| Ok(a.merge(b)))?;

                    let row = ExperimentRow {
                        algo: codec.algorithm(),
                        k: codec.block_size(),
                        m_bits: message_len,
                        p_error: probability,
                        runs,
                        ok_rate: tally.ok as f64 / runs as f64,
                        corrected_avg: tally.corrected as f64 / runs as f64,
                        uncorrect_avg: tally.uncorrectable as f64 / runs as f64,
                    };
                    info!(
                        "{} k={} m={} p={}: ok={:.4} corrected={:.3} uncorrectable={:.3}",
                        row.algo,
                        row.k.unwrap_or(0),
                        row.m_bits,
                        row.p_error,
                        row.ok_rate,
                        row.corrected_avg,
                        row.uncorrect_avg
                    );
                    sink(row);
                    point += 1;
                }
            }
        }
        Ok(())
    }
}

/// Runs the whole matrix and collects the rows.
pub fn run_matrix(config: &ExperimentConfig) -> Result<Vec<ExperimentRow>> {
    let harness = Harness::new(config.clone())?;
    let mut rows = Vec::with_capacity(config.row_count());
    harness.run(|row| rows.push(row))?;
    Ok(rows)
}
