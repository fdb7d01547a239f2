use thiserror::Error;

#[derive(Error, Debug)]
pub enum BcError {
    #[error("invalid magic bytes")]
    InvalidMagic,

    #[error("invalid version: {0}")]
    InvalidVersion(u16),

    #[error("truncated bytecode stream")]
    Truncated,

    #[error("malformed constants block")]
    MalformedConstants,

    #[error("constant index out of range: {0}")]
    ConstantOutOfRange(u16),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BcError {
    pub fn kind(&self) -> &'static str {
        match self {
            BcError::InvalidMagic => "invalid-magic",
            BcError::InvalidVersion(_) => "invalid-version",
            BcError::Truncated => "truncated",
            BcError::MalformedConstants => "malformed-constants",
            BcError::ConstantOutOfRange(_) => "constant-out-of-range",
            BcError::Io(_) => "io",
        }
    }
}

/// `io::Error` with `ErrorKind::UnexpectedEof` is the short-read signal every
/// `byteorder` read call produces; callers treat that specific kind as a
/// truncation rather than a generic I/O failure.
pub(crate) fn map_read_err(err: std::io::Error) -> BcError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        BcError::Truncated
    } else {
        BcError::Io(err)
    }
}
