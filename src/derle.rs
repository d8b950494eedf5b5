use crate::{Error, Result, SentinelPolicy, MAX_RUN_LEN, MIN_BLOCK_LEN};
use std::io;

pub struct DeRle<W> {
    status: DeRleStatus,
    policy: SentinelPolicy,
    offset: usize,
    writer: W,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum DeRleStatus {
    Literal,
    Value,
    Digit { value: u8 },
}

impl<W: io::Write> DeRle<W> {
    pub fn new(writer: W) -> DeRle<W> {
        Self::with_sentinel(writer, SentinelPolicy::default())
    }

    pub fn with_sentinel(writer: W, policy: SentinelPolicy) -> DeRle<W> {
        DeRle {
            status: DeRleStatus::Literal,
            policy,
            offset: 0,
            writer,
        }
    }

    #[inline(always)]
    pub fn update(&mut self, byte: u8) -> Result<()> {
        match self.status {
            DeRleStatus::Literal => {
                if self.policy.is_sentinel(byte) {
                    self.status = DeRleStatus::Value;
                    trace!("marker at offset {}", self.offset);
                } else {
                    self.writer.write_all(&[byte])?;
                }
            }
            DeRleStatus::Value => {
                if self.policy.is_sentinel(byte) {
                    return Err(self.malformed("marker repeats the sentinel"));
                }
                self.status = DeRleStatus::Digit { value: byte };
            }
            DeRleStatus::Digit { value } => {
                let repeat = byte.wrapping_sub(b'0') as usize;
                if !(MIN_BLOCK_LEN..=MAX_RUN_LEN).contains(&repeat) {
                    return Err(self.malformed("marker length is not a digit in 4..=9"));
                }
                trace!("decode: {repeat} x 0x{value:02X}");
                self.writer.write_all(&[value; MAX_RUN_LEN][..repeat])?;
                self.status = DeRleStatus::Literal;
            }
        }
        self.offset += 1;
        Ok(())
    }

    fn malformed(&self, reason: &'static str) -> Error {
        debug!("malformed at byte {} in {:?}: {reason}", self.offset, self.status);
        Error::MalformedStream {
            offset: self.offset,
            reason,
        }
    }

    /// Fails if the stream ends inside a marker.
    #[inline(always)]
    pub fn finalize(mut self) -> Result<()> {
        if self.status != DeRleStatus::Literal {
            return Err(self.malformed("truncated marker"));
        }
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: io::Write> io::Write for DeRle<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for byte in buf.iter() {
            self.update(*byte)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
