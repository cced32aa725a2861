//! crates/handshake/src/error.rs
//!
//! Error types for handshake engines.

use std::io;

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by a handshake engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The transport or randomness source failed.
    #[error("I/O error: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
    /// A handshake or record message arrived out of order.
    #[error("unexpected message: expected {expected}, found type {found:#04x}")]
    UnexpectedMessage {
        /// Message the engine was waiting for.
        expected: &'static str,
        /// Type byte that arrived instead.
        found: u8,
    },
    /// A message could not be parsed.
    #[error("malformed message: {0}")]
    Malformed(&'static str),
    /// The peer speaks a different protocol version.
    #[error("protocol version mismatch: local {local}, remote {remote}")]
    VersionMismatch {
        /// Version this engine speaks.
        local: u8,
        /// Version the peer announced.
        remote: u8,
    },
    /// The peer's finished message did not match the derived keys.
    #[error("peer finished message failed verification")]
    VerificationFailed,
    /// A cryptographic primitive rejected its input.
    #[error("cryptographic failure: {0}")]
    Crypto(&'static str),
    /// The operation needs a completed handshake.
    #[error("handshake has not completed")]
    NotEstablished,
    /// The engine cannot expose its record sequence counters.
    #[error("engine does not support sequence counter access")]
    SequenceAccessUnsupported,
    /// A record sequence counter reached its maximum.
    #[error("record sequence counter exhausted")]
    SequenceExhausted,
    /// A record exceeds the configured limit.
    #[error("record of {len} bytes exceeds limit of {max}")]
    RecordTooLarge {
        /// Observed length.
        len: usize,
        /// Configured maximum.
        max: usize,
    },
    /// The connection was closed locally.
    #[error("connection closed")]
    Closed,
    /// An earlier handshake attempt on this engine failed.
    #[error("a previous handshake attempt failed")]
    Poisoned,
    /// The engine configuration is unusable.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(&'static str),
}

impl EngineError {
    /// Reports whether the error came from the transport or randomness source
    /// rather than from protocol validation.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Reports whether the peer's messages failed protocol validation.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedMessage { .. }
                | Self::Malformed(_)
                | Self::VersionMismatch { .. }
                | Self::VerificationFailed
                | Self::Crypto(_)
                | Self::RecordTooLarge { .. }
        )
    }

    /// The [`io::ErrorKind`] this error carries when surfaced through `Read` or `Write`.
    #[must_use]
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::Io(inner) => inner.kind(),
            Self::NotEstablished | Self::Closed | Self::Poisoned => io::ErrorKind::NotConnected,
            Self::InvalidConfig(_) | Self::SequenceAccessUnsupported => io::ErrorKind::InvalidInput,
            Self::SequenceExhausted => io::ErrorKind::Other,
            Self::UnexpectedMessage { .. }
            | Self::Malformed(_)
            | Self::VersionMismatch { .. }
            | Self::VerificationFailed
            | Self::Crypto(_)
            | Self::RecordTooLarge { .. } => io::ErrorKind::InvalidData,
        }
    }
}

impl From<EngineError> for io::Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Io(inner) => inner,
            other => Self::new(other.io_kind(), other),
        }
    }
}
