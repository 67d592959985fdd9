//! Error types for the entropy codec.

use thiserror::Error;

/// Failures reported by table construction, header transmission and symbol decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The caller handed in an alphabet, length array or table width the codec cannot use.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A transmitted code-length table could not be decoded into a usable code.
    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    /// The symbol stream does not match the code it is decoded with.
    #[error("corrupt stream at bit {position}")]
    CorruptStream { position: usize },

    /// A configuration value is missing its expected shape.
    #[error("config error: {0}")]
    Config(String),

    /// A configuration or data file could not be read or written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        CodecError::InvalidParameters(message.into())
    }

    pub(crate) fn header(message: impl Into<String>) -> Self {
        CodecError::CorruptHeader(message.into())
    }
}

/// A specialized Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
