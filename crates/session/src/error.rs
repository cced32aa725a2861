//! crates/session/src/error.rs
//!
//! Error types for session capture and resume.

use std::fmt;
use std::io;

use handshake::{EngineError, Role};
use thiserror::Error;

use crate::diagnostics::ReplayDiagnostics;
use crate::state::StateDecodeError;

/// Which orchestration a handshake ran under.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandshakeMode {
    /// Fresh handshake with duplicating taps.
    Capture,
    /// Replayed handshake seeded from a [`State`](crate::State).
    Resume,
}

impl fmt::Display for HandshakeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Capture => "capture",
            Self::Resume => "resume",
        })
    }
}

/// Why a snapshot cannot seed a session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Incompatibility {
    /// The snapshot records no handshake.
    Empty,
    /// The snapshot was taken on the other side of the connection.
    Role {
        /// Role the session was asked to play.
        expected: Role,
        /// Role recorded in the snapshot.
        found: Role,
    },
    /// The snapshot was taken by a different engine.
    Engine {
        /// Identifier of the configured engine.
        expected: &'static str,
        /// Identifier recorded in the snapshot.
        found: String,
    },
}

impl fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("state records no handshake"),
            Self::Role { expected, found } => {
                write!(f, "state was taken by a {found}, session is a {expected}")
            }
            Self::Engine { expected, found } => {
                write!(f, "state was taken by engine {found:?}, session uses {expected:?}")
            }
        }
    }
}

/// Errors reported by [`Session`](crate::Session) construction and handshakes.
#[derive(Debug, Error)]
pub enum ResumeError {
    /// The engine could not complete the handshake.
    #[error("{mode} handshake failed: {source}")]
    HandshakeFailure {
        /// Orchestration the handshake ran under.
        mode: HandshakeMode,
        /// Engine failure.
        #[source]
        source: EngineError,
    },
    /// The replayed transcript does not match what the engine expects.
    #[error("replayed transcript does not match the engine: {source}")]
    TranscriptMismatch {
        /// Engine failure triggered by the replayed bytes.
        #[source]
        source: EngineError,
        /// Prefix consumption at the point of failure.
        diagnostics: ReplayDiagnostics,
    },
    /// The engine cannot expose its sequence counters.
    #[error("engine {engine_id} does not support sequence counter access")]
    EngineIncompatible {
        /// Identifier of the configured engine.
        engine_id: &'static str,
    },
    /// The snapshot cannot seed this session.
    #[error("state cannot be resumed: {0}")]
    StateIncompatible(Incompatibility),
    /// An earlier handshake on this session failed.
    #[error("session is unusable after a failed handshake")]
    Unusable,
    /// A persisted snapshot could not be decoded.
    #[error("state decode failed: {0}")]
    Decode(
        #[from]
        #[source]
        StateDecodeError,
    ),
}

impl ResumeError {
    /// Reports whether the error is a handshake failure. A transcript mismatch
    /// is a handshake failure with replay diagnostics attached.
    #[must_use]
    pub const fn is_handshake_failure(&self) -> bool {
        matches!(
            self,
            Self::HandshakeFailure { .. } | Self::TranscriptMismatch { .. }
        )
    }

    /// Engine failure behind a handshake error.
    #[must_use]
    pub const fn engine_error(&self) -> Option<&EngineError> {
        match self {
            Self::HandshakeFailure { source, .. } | Self::TranscriptMismatch { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    /// Replay diagnostics attached to a transcript mismatch.
    #[must_use]
    pub const fn diagnostics(&self) -> Option<&ReplayDiagnostics> {
        match self {
            Self::TranscriptMismatch { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

impl From<ResumeError> for io::Error {
    fn from(err: ResumeError) -> Self {
        let kind = match &err {
            ResumeError::HandshakeFailure { source, .. }
            | ResumeError::TranscriptMismatch { source, .. } => source.io_kind(),
            ResumeError::Unusable => io::ErrorKind::NotConnected,
            ResumeError::EngineIncompatible { .. } | ResumeError::StateIncompatible(_) => {
                io::ErrorKind::InvalidInput
            }
            ResumeError::Decode(_) => io::ErrorKind::InvalidData,
        };
        Self::new(kind, err)
    }
}
