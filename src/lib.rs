//! CRC-32 and Hamming SEC channel codes, a binary symmetric channel and a
//! Monte Carlo harness comparing the two codes.
//!
//! ```
//! use linkcode::link::{receive, Transmitter, Verdict};
//!
//! let sent = Transmitter::hamming(11).unwrap().transmit("hi").unwrap();
//! let received = receive(&sent.payload).unwrap();
//! assert_eq!(received.verdict, Verdict::Intact);
//! assert_eq!(received.text(), "hi");
//! ```

pub mod bits;
pub mod channel;
pub mod ecc;
pub mod error;
pub mod experiment;
pub mod link;

pub use bits::Bits;
pub use error::{Error, Result};
