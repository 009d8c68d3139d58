//! Error types shared by every module of the crate.
//!
//! Only malformed input and inconsistent parameters are errors. A transmission
//! error that the codes detect (a CRC mismatch, an uncorrectable Hamming block)
//! is a normal outcome and is reported through the codec result types instead.

use thiserror::Error;

/// Top-level error type for all operations in the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A bit-string contained something other than '0' or '1'
    #[error("invalid bit {found:?} at position {position}: only '0' and '1' are allowed")]
    InvalidBit { position: usize, found: char },

    /// Frame is shorter than the algorithm and its parameters require
    #[error("frame too short: need at least {required} bits, got {actual}")]
    FrameTooShort { required: usize, actual: usize },

    /// A single block handed to a block codec has the wrong length
    #[error("block length mismatch: expected {expected} bits, got {actual}")]
    BlockLengthMismatch { expected: usize, actual: usize },

    /// Hamming payload size is not usable
    #[error("invalid Hamming block size k={0}")]
    InvalidBlockSize(usize),

    /// No block size is consistent with the frame and message lengths
    #[error("no block size fits a frame of {frame_len} bits carrying {message_len} message bits")]
    BlockSizeInference { frame_len: usize, message_len: usize },

    /// Flip probability outside [0, 1] (or NaN)
    #[error("invalid error probability {0}: must lie within [0, 1]")]
    InvalidProbability(f64),

    /// Algorithm tag is neither CRC32 nor HAMMING
    #[error("unknown algorithm tag {0:?}")]
    UnknownAlgorithm(String),

    /// Transport payload could not be parsed or serialized
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Any other rejected argument
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = Error::InvalidBit {
            position: 3,
            found: '2',
        };
        assert_eq!(
            err.to_string(),
            "invalid bit '2' at position 3: only '0' and '1' are allowed"
        );

        let err = Error::FrameTooShort {
            required: 33,
            actual: 8,
        };
        assert_eq!(err.to_string(), "frame too short: need at least 33 bits, got 8");
    }

    #[test]
    fn test_from_serde() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Payload(_)));
    }
}
