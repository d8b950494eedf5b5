use crate::{Error, Result, SentinelPolicy, MIN_BLOCK_LEN};
use std::fmt::Debug;
use std::{fmt, io};

/// Streaming half-byte unpacker, reads ASCII `'0'`/`'1'` and writes the
/// recovered bytes into `W`.
pub struct NibbleUnpacker<W> {
    status: UnpackStatus,
    policy: SentinelPolicy,
    buf: u8,
    bit_len: u8,
    offset: usize,
    writer: W,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum UnpackStatus {
    Literal,
    High,
    Count { high: u8 },
    Low { high: u8, remaining: u8 },
}

impl<W: io::Write> NibbleUnpacker<W> {
    pub fn new(writer: W) -> Self {
        Self::with_sentinel(writer, SentinelPolicy::default())
    }

    pub fn with_sentinel(writer: W, policy: SentinelPolicy) -> Self {
        NibbleUnpacker {
            status: UnpackStatus::Literal,
            policy,
            buf: 0,
            bit_len: 0,
            offset: 0,
            writer,
        }
    }

    #[inline(always)]
    pub fn update(&mut self, bit: u8) -> Result<()> {
        let bit = match bit {
            b'0' => 0,
            b'1' => 1,
            _ => return Err(self.malformed("expected '0' or '1'")),
        };
        self.offset += 1;
        self.buf = (self.buf << 1) | bit;
        self.bit_len += 1;
        if self.bit_len < self.status.width() {
            return Ok(());
        }

        let value = self.buf;
        self.buf = 0;
        self.bit_len = 0;
        match self.status {
            UnpackStatus::Literal => {
                if self.policy.is_sentinel(value) {
                    self.status = UnpackStatus::High;
                    trace!("transit to {:?}", self.status);
                } else {
                    trace!("decode: 0x{value:02X}");
                    self.writer.write_all(&[value])?;
                }
            }
            UnpackStatus::High => {
                self.status = UnpackStatus::Count { high: value << 4 };
                trace!("transit to {:?}", self.status);
            }
            UnpackStatus::Count { high } => {
                if (value as usize) < MIN_BLOCK_LEN {
                    return Err(self.malformed("packed group count below 4"));
                }
                self.status = UnpackStatus::Low {
                    high,
                    remaining: value,
                };
                trace!("transit to {:?}", self.status);
            }
            UnpackStatus::Low { high, remaining } => {
                trace!("decode: 0x{:02X}", high | value);
                self.writer.write_all(&[high | value])?;
                self.status = if remaining == 1 {
                    UnpackStatus::Literal
                } else {
                    UnpackStatus::Low {
                        high,
                        remaining: remaining - 1,
                    }
                };
            }
        }
        Ok(())
    }

    fn malformed(&self, reason: &'static str) -> Error {
        debug!("malformed at bit {} in {:?}: {reason}", self.offset, self.status);
        Error::MalformedStream {
            offset: self.offset,
            reason,
        }
    }

    /// Fails if the stream stopped in the middle of a literal or a group.
    pub fn finalize(mut self) -> Result<()> {
        if self.status != UnpackStatus::Literal || self.bit_len != 0 {
            return Err(self.malformed("truncated bit stream"));
        }
        self.writer.flush()?;
        Ok(())
    }
}

impl UnpackStatus {
    /// bits needed before the next transition
    #[inline(always)]
    fn width(self) -> u8 {
        match self {
            UnpackStatus::Literal => 8,
            _ => 4,
        }
    }
}

impl Debug for UnpackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnpackStatus::Literal => f.write_str("Literal"),
            UnpackStatus::High => f.write_str("High"),
            UnpackStatus::Count { high } => f
                .debug_struct("Count")
                .field("high", &format!("{:X}", high >> 4))
                .finish(),
            UnpackStatus::Low { high, remaining } => f
                .debug_struct("Low")
                .field("high", &format!("{:X}", high >> 4))
                .field("remaining", &remaining)
                .finish(),
        }
    }
}

impl<W: io::Write> io::Write for NibbleUnpacker<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for bit in buf.iter() {
            self.update(*bit)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::NibbleUnpacker;
    use crate::test_util::setup;
    use crate::{Error, SentinelPolicy};
    use std::io::{self, Write};

    const TEST_VECTOR: [(&str, &str); 4] = [
        ("01100001", "61"),
        ("00100100101001000001001000110100", "a1a2a3a4"),
        ("0100100000100100011001000101110011001111", "48656c6c6f"),
        ("", ""),
    ];

    fn unpack(bits: &str) -> crate::Result<Vec<u8>> {
        let mut out = vec![];
        let mut unpacker = NibbleUnpacker::new(&mut out);
        for bit in bits.bytes() {
            unpacker.update(bit)?;
        }
        unpacker.finalize()?;
        Ok(out)
    }

    #[test]
    fn test_nibble_decode() {
        setup();
        for (input, expected) in TEST_VECTOR.into_iter() {
            let expected = hex::decode(expected).unwrap();
            let mut out = vec![];
            let mut unpacker = NibbleUnpacker::new(&mut out);
            unpacker.write_all(input.as_bytes()).unwrap();
            unpacker.finalize().unwrap();
            assert_eq!(expected, out);
        }
    }

    #[test]
    fn test_truncated_literal() {
        setup();
        assert!(matches!(
            unpack("0110000"),
            Err(Error::MalformedStream { offset: 7, .. })
        ));
    }

    #[test]
    fn test_truncated_group() {
        setup();
        // header only
        assert!(matches!(
            unpack("001001001010"),
            Err(Error::MalformedStream { offset: 12, .. })
        ));
        // count says 4, only 3 low nibbles follow
        assert!(matches!(
            unpack("0010010010100100000100100011"),
            Err(Error::MalformedStream { .. })
        ));
    }

    #[test]
    fn test_count_below_four() {
        setup();
        assert!(matches!(
            unpack("0010010010100011000100100011"),
            Err(Error::MalformedStream { offset: 16, .. })
        ));
    }

    #[test]
    fn test_bad_character() {
        setup();
        assert!(matches!(
            unpack("0110x001"),
            Err(Error::MalformedStream { offset: 4, .. })
        ));
    }

    #[test]
    fn test_custom_sentinel() {
        setup();
        let mut out = vec![];
        let mut unpacker = NibbleUnpacker::with_sentinel(&mut out, SentinelPolicy::new(0));
        unpacker
            .write_all(b"00000000001001000100010001000100")
            .unwrap();
        unpacker.finalize().unwrap();
        assert_eq!(out, b"$$$$");
    }

    #[test]
    fn test_write_reports_invalid_data() {
        setup();
        let mut out = vec![];
        let mut unpacker = NibbleUnpacker::new(&mut out);
        let err = unpacker.write_all(b"2").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
