use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("payload contains the reserved sentinel 0x{sentinel:02X} at offset {offset}")]
    InvalidInput { sentinel: u8, offset: usize },

    #[error("malformed stream at offset {offset}: {reason}")]
    MalformedStream { offset: usize, reason: &'static str },

    #[error("run of {len} x 0x{byte:02X} is longer than a marker can hold (max {max})")]
    UnsupportedRunLength { byte: u8, len: usize, max: usize },

    #[error("{0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(err) => err,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
