//! Error types for the streaming encoder and its reader.

use std::io;

use thiserror::Error;

/// Result type alias for encoder operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`Compressor`](crate::Compressor) and
/// [`MultiCompressor`](crate::MultiCompressor).
#[derive(Error, Debug)]
pub enum Error {
    /// The sink rejected a write. The stream must not be used afterwards.
    #[error("failed to write {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// A dispatcher index that was never handed out by `add_compressor`.
    #[error("index out of range: {index} (have {len} compressors)")]
    IndexOutOfRange { index: usize, len: usize },

    /// `compress` was called after `finish`.
    #[error("compressor already finished")]
    Finished,
}

impl Error {
    pub(crate) fn io(context: &'static str) -> impl FnOnce(io::Error) -> Error {
        move |source| Error::Io { context, source }
    }

    /// Check if the error came from the underlying sink
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io { .. })
    }
}

/// Error type for decoding failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The input is shorter than the 32-bit header.
    #[error("compressed stream has no header")]
    MissingHeader,
    /// The compressed stream ended before an end-of-stream marker.
    #[error("unexpected end of compressed stream")]
    UnexpectedEnd,
    /// A new-window field whose leading and significant counts exceed 64 bits.
    #[error("invalid xor window: {leading} leading zeros, {significant} significant bits")]
    InvalidWindow { leading: u8, significant: u8 },
}
