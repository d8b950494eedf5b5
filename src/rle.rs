use crate::{Codec, DeRle, Error, Result, SentinelPolicy, MAX_RUN_LEN, MIN_BLOCK_LEN};
use std::io;

/// What the encoder does with a run the single digit marker cannot hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RunOverflow {
    /// fail with [`Error::UnsupportedRunLength`]
    #[default]
    Reject,
    /// emit chained markers of at most 9 bytes each
    Split,
}

pub struct Rle<W> {
    status: RleStatus,
    policy: SentinelPolicy,
    overflow: RunOverflow,
    offset: usize,
    writer: W,
}

#[derive(Debug, Copy, Clone)]
enum RleStatus {
    Run { byte: u8, len: usize },
    Wait,
}

impl<W: io::Write> Rle<W> {
    pub fn new(writer: W) -> Self {
        Self::with_config(writer, SentinelPolicy::default(), RunOverflow::default())
    }

    pub fn with_config(writer: W, policy: SentinelPolicy, overflow: RunOverflow) -> Self {
        Rle {
            status: RleStatus::Wait,
            policy,
            overflow,
            offset: 0,
            writer,
        }
    }

    #[inline(always)]
    pub fn update(&mut self, byte: u8) -> Result<()> {
        trace!("update byte 0x{byte:02X}, current status {:?}", self.status);
        self.policy.check(byte, self.offset)?;
        self.offset += 1;
        match self.status {
            RleStatus::Run { byte: current, len } if current == byte => {
                if len == MAX_RUN_LEN && self.overflow == RunOverflow::Reject {
                    return Err(Error::UnsupportedRunLength {
                        byte,
                        len: len + 1,
                        max: MAX_RUN_LEN,
                    });
                }
                self.status = RleStatus::Run { byte, len: len + 1 };
            }
            RleStatus::Run { byte: current, len } => {
                self.emit_run(current, len)?;
                self.status = RleStatus::Run { byte, len: 1 };
                trace!("transit to {:?}", self.status);
            }
            RleStatus::Wait => {
                self.status = RleStatus::Run { byte, len: 1 };
                trace!("transit to {:?}", self.status);
            }
        }
        Ok(())
    }

    fn emit_run(&mut self, byte: u8, mut len: usize) -> Result<()> {
        while len > MAX_RUN_LEN {
            self.emit_marker(byte, MAX_RUN_LEN)?;
            len -= MAX_RUN_LEN;
        }
        if len < MIN_BLOCK_LEN {
            trace!("literal run of {len} x 0x{byte:02X}");
            for _ in 0..len {
                self.writer.write_all(&[byte])?;
            }
            Ok(())
        } else {
            self.emit_marker(byte, len)
        }
    }

    #[inline(always)]
    fn emit_marker(&mut self, byte: u8, len: usize) -> Result<()> {
        debug_assert!((MIN_BLOCK_LEN..=MAX_RUN_LEN).contains(&len));
        let marker = [self.policy.sentinel(), byte, b'0' + len as u8];
        trace!("encode marker {}", hex::encode(marker));
        self.writer.write_all(&marker)?;
        Ok(())
    }

    /// Flushes the trailing run.
    pub fn finalize(mut self) -> Result<()> {
        trace!("last block: {:?}", self.status);
        if let RleStatus::Run { byte, len } = self.status {
            self.emit_run(byte, len)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: io::Write> io::Write for Rle<W> {
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

/// Run length coding over an owned payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLengthCodec {
    payload: Vec<u8>,
    policy: SentinelPolicy,
    overflow: RunOverflow,
}

impl RunLengthCodec {
    pub fn with_sentinel(payload: impl Into<Vec<u8>>, policy: SentinelPolicy) -> Result<Self> {
        let payload = payload.into();
        policy.validate(&payload)?;
        Ok(RunLengthCodec {
            payload,
            policy,
            overflow: RunOverflow::default(),
        })
    }

    pub fn with_overflow(mut self, overflow: RunOverflow) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn sentinel(&self) -> SentinelPolicy {
        self.policy
    }

    pub fn overflow(&self) -> RunOverflow {
        self.overflow
    }
}

impl Codec for RunLengthCodec {
    type Encoded = Vec<u8>;

    fn new(payload: impl Into<Vec<u8>>) -> Result<Self> {
        Self::with_sentinel(payload, SentinelPolicy::default())
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.payload.len());
        let mut rle = Rle::with_config(&mut out, self.policy, self.overflow);
        for byte in self.payload.iter() {
            rle.update(*byte)?;
        }
        rle.finalize()?;
        debug!("encoded {} bytes into {} bytes", self.payload.len(), out.len());
        Ok(out)
    }

    fn decode(&self, encoded: &Vec<u8>) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(encoded.len());
        let mut derle = DeRle::with_sentinel(&mut out, self.policy);
        for byte in encoded.iter() {
            derle.update(*byte)?;
        }
        derle.finalize()?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{Rle, RunLengthCodec, RunOverflow};
    use crate::test_util::{setup, SAMPLE};
    use crate::{Codec, Error, SentinelPolicy};
    use std::io::Write;

    const TEST_VECTOR: [(&str, &str); 7] = [
        ("aaaa", "$a4"),
        ("abc", "abc"),
        ("aaa", "aaa"),
        ("a", "a"),
        ("xaaaaaaaaay", "x$a9y"),
        ("aaaabbbbbcc", "$a4$b5cc"),
        ("abbbbba", "a$b5a"),
    ];

    #[test]
    fn test_rle_encode() {
        setup();
        for (input, expected) in TEST_VECTOR.into_iter() {
            let mut out = vec![];
            let mut rle = Rle::new(&mut out);
            rle.write_all(input.as_bytes()).unwrap();
            rle.finalize().unwrap();
            assert_eq!(expected.as_bytes(), &out[..]);
        }
    }

    #[test]
    fn test_run_threshold() {
        setup();
        let three = RunLengthCodec::new(&b"zzz"[..]).unwrap();
        assert_eq!(three.encode().unwrap(), b"zzz");
        let four = RunLengthCodec::new(&b"zzzz"[..]).unwrap();
        assert_eq!(four.encode().unwrap(), b"$z4");
        assert_eq!(four.round_trip().unwrap(), b"zzzz");
    }

    #[test]
    fn test_sample_round_trip() {
        setup();
        let codec = RunLengthCodec::new(SAMPLE).unwrap();
        assert_eq!(
            codec.encode().unwrap(),
            &b"ngnaeomMF$44#MM)CM#M@)MNC)@N)MEDMf$F5VIJKE)JS)JMVGI)VMEONNFeieovv$e7"[..]
        );
        assert!(codec.verify().unwrap());
    }

    #[test]
    fn test_long_run_rejected() {
        setup();
        let codec = RunLengthCodec::new(vec![b'q'; 10]).unwrap();
        assert!(matches!(
            codec.encode(),
            Err(Error::UnsupportedRunLength {
                byte: b'q',
                len: 10,
                max: 9
            })
        ));
        let nine = RunLengthCodec::new(vec![b'q'; 9]).unwrap();
        assert_eq!(nine.encode().unwrap(), b"$q9");
    }

    #[test]
    fn test_long_run_split() {
        setup();
        for (len, expected) in [
            (10, &b"$q9q"[..]),
            (12, &b"$q9qqq"[..]),
            (13, &b"$q9$q4"[..]),
            (18, &b"$q9$q9"[..]),
            (22, &b"$q9$q9$q4"[..]),
        ] {
            let payload = vec![b'q'; len];
            let codec = RunLengthCodec::new(payload.clone())
                .unwrap()
                .with_overflow(RunOverflow::Split);
            let encoded = codec.encode().unwrap();
            assert_eq!(expected, &encoded[..]);
            assert_eq!(codec.decode(&encoded).unwrap(), payload);
        }
    }

    #[test]
    fn test_empty_payload() {
        setup();
        let codec = RunLengthCodec::new(Vec::new()).unwrap();
        assert!(codec.encode().unwrap().is_empty());
        assert!(codec.round_trip().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_sentinel() {
        setup();
        assert!(matches!(
            RunLengthCodec::new(&b"aa$aa"[..]),
            Err(Error::InvalidInput {
                sentinel: b'$',
                offset: 2
            })
        ));
    }

    #[test]
    fn test_custom_sentinel() {
        setup();
        let policy = SentinelPolicy::new(b'#');
        let codec = RunLengthCodec::with_sentinel(&b"$$$$$!"[..], policy).unwrap();
        assert_eq!(codec.encode().unwrap(), b"#$5!");
        assert_eq!(codec.round_trip().unwrap(), b"$$$$$!");
    }

    #[test]
    fn test_binary_round_trip() {
        setup();
        let mut payload = vec![];
        for byte in (0u8..=255).filter(|&b| b != b'$') {
            payload.extend(std::iter::repeat(byte).take((byte % 10) as usize));
        }
        let codec = RunLengthCodec::new(payload.clone()).unwrap();
        assert_eq!(codec.round_trip().unwrap(), payload);
    }
}
