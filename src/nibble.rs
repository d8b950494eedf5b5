use crate::{Codec, NibbleUnpacker, Result, SentinelPolicy, MAX_PACK_LEN, MIN_BLOCK_LEN};
use std::io;

/// Streaming half-byte packer, writes ASCII `'0'`/`'1'` into `W`.
pub struct NibblePacker<W> {
    policy: SentinelPolicy,
    block: [u8; MAX_PACK_LEN],
    block_len: usize,
    offset: usize,
    writer: W,
}

impl<W: io::Write> NibblePacker<W> {
    pub fn new(writer: W) -> Self {
        Self::with_sentinel(writer, SentinelPolicy::default())
    }

    pub fn with_sentinel(writer: W, policy: SentinelPolicy) -> Self {
        NibblePacker {
            policy,
            block: [0; MAX_PACK_LEN],
            block_len: 0,
            offset: 0,
            writer,
        }
    }

    #[inline(always)]
    pub fn update(&mut self, byte: u8) -> Result<()> {
        self.policy.check(byte, self.offset)?;
        self.offset += 1;
        if self.block_len != 0 {
            let same_prefix = self.block[0] >> 4 == byte >> 4;
            if !same_prefix || self.block_len == MAX_PACK_LEN {
                trace!(
                    "close block of {} (same_prefix={same_prefix})",
                    self.block_len
                );
                self.flush_block()?;
            }
        }
        self.block[self.block_len] = byte;
        self.block_len += 1;
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        let block = self.block;
        let block = &block[..self.block_len];
        self.block_len = 0;
        if block.len() < MIN_BLOCK_LEN {
            for byte in block.iter() {
                trace!("literal 0x{byte:02X}");
                self.write_bits(*byte, 8)?;
            }
            return Ok(());
        }

        let high = block[0] >> 4;
        trace!("pack {} bytes with high nibble {high:X}", block.len());
        self.writer.write_all(&self.policy.bit_pattern())?;
        self.write_bits(high, 4)?;
        self.write_bits(block.len() as u8, 4)?;
        for byte in block.iter() {
            self.write_bits(byte & 0x0F, 4)?;
        }
        Ok(())
    }

    #[inline(always)]
    fn write_bits(&mut self, value: u8, width: usize) -> Result<()> {
        let mut bits = [b'0'; 8];
        for (i, bit) in bits[..width].iter_mut().enumerate() {
            if (value >> (width - 1 - i)) & 1 == 1 {
                *bit = b'1';
            }
        }
        self.writer.write_all(&bits[..width])?;
        Ok(())
    }

    /// Flushes the trailing block.
    pub fn finalize(mut self) -> Result<()> {
        trace!("last block: {} bytes", self.block_len);
        self.flush_block()?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: io::Write> io::Write for NibblePacker<W> {
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

/// Half-byte packing over an owned payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NibblePackCodec {
    payload: Vec<u8>,
    policy: SentinelPolicy,
}

impl NibblePackCodec {
    pub fn with_sentinel(payload: impl Into<Vec<u8>>, policy: SentinelPolicy) -> Result<Self> {
        let payload = payload.into();
        policy.validate(&payload)?;
        Ok(NibblePackCodec { payload, policy })
    }

    pub fn sentinel(&self) -> SentinelPolicy {
        self.policy
    }
}

impl Codec for NibblePackCodec {
    type Encoded = String;

    fn new(payload: impl Into<Vec<u8>>) -> Result<Self> {
        Self::with_sentinel(payload, SentinelPolicy::default())
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn encode(&self) -> Result<String> {
        let mut out = Vec::with_capacity(self.payload.len() * 8);
        let mut packer = NibblePacker::with_sentinel(&mut out, self.policy);
        for byte in self.payload.iter() {
            packer.update(*byte)?;
        }
        packer.finalize()?;
        debug!("packed {} bytes into {} bits", self.payload.len(), out.len());
        Ok(out.into_iter().map(char::from).collect())
    }

    fn decode(&self, encoded: &String) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(encoded.len() / 4);
        let mut unpacker = NibbleUnpacker::with_sentinel(&mut out, self.policy);
        for bit in encoded.bytes() {
            unpacker.update(bit)?;
        }
        unpacker.finalize()?;
        Ok(out)
    }
}
