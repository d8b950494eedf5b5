//! # Half-byte Packing
//!
//! Consecutive bytes sharing the same high nibble are grouped into blocks of
//! at most 15 bytes. A block of 4 or more bytes is packed:
//!
//! ```text
//!  ┌──────────┬──────┬───────┬──────┬──────┬─────┬──────┐
//!  │ SENTINEL │ HIGH │ COUNT │ LOW0 │ LOW1 │ ... │ LOWn │
//!  └──────────┴──────┴───────┴──────┴──────┴─────┴──────┘
//!     8 bits   4 bits 4 bits  4 bits ...
//! ```
//!
//! COUNT is in `4..=15`. Shorter blocks are written as plain 8 bit literals.
//!
//! The output is a bit string made of ASCII `'0'` and `'1'`. Since a payload
//! never contains the sentinel, an 8 bit literal never matches its pattern.
//!
//! # Run Length Coding
//!
//! A run of 4 or more identical bytes is replaced by a 3 byte marker:
//!
//! ```text
//!  ┌──────────┬───────┬───────────┐
//!  │ SENTINEL │ VALUE │ '4'..='9' │
//!  └──────────┴───────┴───────────┘
//! ```
//!
//! Shorter runs are copied as is. The length is a single ASCII digit, so a
//! run longer than 9 is either rejected or split into chained markers, see
//! [`RunOverflow`].
//!
//! Both schemes reserve one sentinel byte, `'$'` unless configured otherwise
//! through [`SentinelPolicy`].

#[macro_use]
extern crate log;

mod denibble;
mod derle;
mod error;
mod nibble;
mod rle;
mod sentinel;

pub use denibble::NibbleUnpacker;
pub use derle::DeRle;
pub use error::{Error, Result};
pub use nibble::{NibblePackCodec, NibblePacker};
pub use rle::{Rle, RunLengthCodec, RunOverflow};
pub use sentinel::SentinelPolicy;

pub const DEFAULT_SENTINEL: u8 = b'$';

/// blocks shorter than this are never compressed
const MIN_BLOCK_LEN: usize = 4;
/// largest value of the 4 bit COUNT field
const MAX_PACK_LEN: usize = 0b1111;
/// largest single ASCII digit
const MAX_RUN_LEN: usize = 9;

/// Shared surface of the two codecs.
///
/// A codec owns a validated payload. Encoding and decoding are pure, calling
/// them repeatedly yields the same result.
pub trait Codec: Sized {
    type Encoded;

    /// Validates `payload` against the default [`SentinelPolicy`].
    fn new(payload: impl Into<Vec<u8>>) -> Result<Self>;

    fn payload(&self) -> &[u8];

    fn encode(&self) -> Result<Self::Encoded>;

    fn decode(&self, encoded: &Self::Encoded) -> Result<Vec<u8>>;

    /// Encodes the payload and decodes it back.
    fn round_trip(&self) -> Result<Vec<u8>> {
        let encoded = self.encode()?;
        self.decode(&encoded)
    }

    /// Whether the round trip reproduces the payload exactly.
    fn verify(&self) -> Result<bool> {
        let decoded = self.round_trip()?;
        let ok = decoded == self.payload();
        if !ok {
            warn!(
                "round trip mismatch: {} bytes in, {} bytes out",
                self.payload().len(),
                decoded.len()
            );
        }
        Ok(ok)
    }
}
