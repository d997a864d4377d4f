//! Error types for bit stream operations.
//!
//! Every operation on a stream node is synchronous and in-memory, so an
//! error is always surfaced to the immediate caller and never retried
//! internally. The variants below cover the whole failure taxonomy of the
//! engine: use after teardown, invalid arguments, unsupported writes on
//! read-only nodes, and slices asking for more data than the tree holds.

use std::io;
use thiserror::Error;

/// The main error type for bit stream operations.
#[derive(Debug, Error)]
pub enum BitStreamError {
    /// The node (or one of its ancestors) has been disposed.
    #[error("Cannot access a disposed stream")]
    Disposed,

    /// A seek would move the cursor before the start of the stream.
    #[error("Invalid seek: resulting bit position {position} is negative")]
    InvalidSeek {
        /// The resulting (negative) bit position.
        position: i128,
    },

    /// A bit count outside `0..=64` was passed to a bit read or write.
    #[error("Invalid bit count: {count} (must be 0-64)")]
    InvalidBitCount {
        /// The offending bit count.
        count: usize,
    },

    /// Generic out-of-range or malformed argument.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the argument error.
        message: String,
    },

    /// The operation is not supported by this node (e.g. writing to a composite).
    #[error("Unsupported operation: {operation}")]
    Unsupported {
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// A slice asked for more bits than remain in the stream.
    #[error("Invalid length: requested {requested} bits, only {available} available")]
    InvalidLength {
        /// Number of bits requested.
        requested: u64,
        /// Number of bits that were available from the cursor.
        available: u64,
    },

    /// I/O error from a file-backed leaf.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for bit stream operations.
pub type Result<T> = std::result::Result<T, BitStreamError>;

impl BitStreamError {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    /// Create an invalid seek error.
    pub fn invalid_seek(position: i128) -> Self {
        Self::InvalidSeek { position }
    }

    /// Create an invalid length error.
    pub fn invalid_length(requested: u64, available: u64) -> Self {
        Self::InvalidLength {
            requested,
            available,
        }
    }

    /// Check that `count` is a legal bit count for a single read or write.
    pub(crate) fn check_bit_count(count: usize) -> Result<()> {
        if count > 64 {
            return Err(Self::InvalidBitCount { count });
        }
        Ok(())
    }
}

impl From<BitStreamError> for io::Error {
    fn from(err: BitStreamError) -> Self {
        match err {
            BitStreamError::Io(e) => e,
            BitStreamError::Disposed | BitStreamError::Unsupported { .. } => {
                io::Error::new(io::ErrorKind::Unsupported, err)
            }
            BitStreamError::InvalidLength { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err)
            }
            _ => io::Error::new(io::ErrorKind::InvalidInput, err),
        }
    }
}
