use crate::{Error, Result, DEFAULT_SENTINEL};

/// The reserved byte that introduces a compressed block, and the rule that
/// payloads must never contain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SentinelPolicy {
    sentinel: u8,
}

impl SentinelPolicy {
    pub const fn new(sentinel: u8) -> Self {
        SentinelPolicy { sentinel }
    }

    #[inline(always)]
    pub const fn sentinel(&self) -> u8 {
        self.sentinel
    }

    #[inline(always)]
    pub fn is_sentinel(&self, byte: u8) -> bool {
        byte == self.sentinel
    }

    /// Rejects a single payload byte found at `offset`.
    #[inline(always)]
    pub fn check(&self, byte: u8, offset: usize) -> Result<()> {
        if self.is_sentinel(byte) {
            debug!("sentinel 0x{:02X} found at offset {offset}", self.sentinel);
            return Err(Error::InvalidInput {
                sentinel: self.sentinel,
                offset,
            });
        }
        Ok(())
    }

    /// Fails with [`Error::InvalidInput`] pointing at the first sentinel in
    /// `payload`.
    pub fn validate(&self, payload: &[u8]) -> Result<()> {
        match payload.iter().position(|&b| self.is_sentinel(b)) {
            Some(offset) => self.check(payload[offset], offset),
            None => Ok(()),
        }
    }

    /// The sentinel as eight ASCII `'0'`/`'1'` characters, MSB first.
    pub fn bit_pattern(&self) -> [u8; 8] {
        let mut bits = [b'0'; 8];
        for (i, bit) in bits.iter_mut().enumerate() {
            if (self.sentinel >> (7 - i)) & 1 == 1 {
                *bit = b'1';
            }
        }
        bits
    }
}

impl Default for SentinelPolicy {
    fn default() -> Self {
        SentinelPolicy::new(DEFAULT_SENTINEL)
    }
}
