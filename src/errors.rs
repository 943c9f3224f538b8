use std::io;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KompressionError>;

/// Possible errors that arise from composing a compression configuration, or from
/// converting data into a compressed format and back.
#[derive(Error, Debug)]
pub enum KompressionError {
    /// The builder was missing a component that the chosen codec needs.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// The compressed input could not be decoded.
    #[error("corrupt stream{}: {reason}", fmt_offset(.offset))]
    CorruptStream {
        /// Byte offset in the compressed input where validation failed, when known
        offset: Option<usize>,
        reason: Corruption,
    },

    /// The input cannot be represented by the format (e.g. too large for a size field).
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("{0}")]
    Io(io::Error),
}

/// What exactly was wrong with a compressed stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    #[error("bad magic or header")]
    BadMagic,
    #[error("method {0:#x} is invalid and not supported")]
    UnknownMethod(u8),
    #[error("stream ended unexpectedly")]
    Truncated,
    #[error("displacement {displacement} reaches outside the {available} available bytes")]
    InvalidDisplacement {
        displacement: usize,
        available: usize,
    },
    #[error("length {0} is outside the window")]
    InvalidLength(usize),
    #[error("expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("bad huffman tree encoding")]
    BadTree,
    #[error("bad footer")]
    BadFooter,
}

fn fmt_offset(offset: &Option<usize>) -> String {
    match offset {
        Some(o) => format!(" at byte {:#x}", o),
        None => String::new(),
    }
}

impl KompressionError {
    pub(crate) fn corrupt(offset: usize, reason: Corruption) -> Self {
        Self::CorruptStream {
            offset: Some(offset),
            reason,
        }
    }

    pub(crate) fn corrupt_at_unknown(reason: Corruption) -> Self {
        Self::CorruptStream {
            offset: None,
            reason,
        }
    }

    pub(crate) fn too_large(format: &str, size: usize, max: usize) -> Self {
        Self::UnsupportedInput(format!(
            "{} can address at most {:#x} bytes, input has {:#x}",
            format, max, size
        ))
    }
}

impl From<io::Error> for KompressionError {
    fn from(error: io::Error) -> Self {
        // bit readers report a short stream as an io error
        if error.kind() == io::ErrorKind::UnexpectedEof {
            Self::corrupt_at_unknown(Corruption::Truncated)
        } else {
            Self::Io(error)
        }
    }
}
