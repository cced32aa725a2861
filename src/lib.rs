#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `handoff` captures a secure-transport handshake as a compact [`State`] and
//! reconstructs the session from it on another connection, without running
//! the handshake protocol against the peer a second time.
//!
//! # Design
//!
//! The workspace is split by concern and this crate re-exports the public
//! surface:
//!
//! - [`tap`]: duplicating and replaying byte-stream wrappers plus the
//!   discarding sink.
//! - [`handshake`]: the engine contract, sequence counter access and the
//!   [`SealedConfig`] reference engine.
//! - [`session`]: the [`Session`] facade, [`State`] snapshots and their
//!   persisted layout.
//! - [`logging`]: tracing targets and subscriber installation.
//!
//! # Examples
//!
//! Capture on one socket, resume on a second handle to it, and keep talking to
//! the same peer.
//!
//! ```no_run
//! use std::io::{Read, Write};
//! use std::os::unix::net::UnixStream;
//!
//! use handoff::{SealedConfig, Session};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SealedConfig::new();
//! let stream = UnixStream::connect("/run/peer.sock")?;
//! let spare = stream.try_clone()?;
//!
//! let mut session = Session::client(&config, stream)?;
//! session.write_all(b"hello")?;
//! let snapshot = session.state().encode()?;
//!
//! let mut resumed = Session::resume_encoded(&config, spare, &snapshot)?;
//! let mut reply = [0u8; 5];
//! resumed.read_exact(&mut reply)?;
//! # Ok(())
//! # }
//! ```

pub use handshake;
pub use logging;
pub use session;
pub use tap;

pub use handshake::sealed::SealedConfig;
pub use handshake::{EngineError, EngineFactory, OsEntropy, Role, SequenceCounters};
pub use logging::{LogConfig, init_tracing};
pub use session::{
    ReplayDiagnostics, ResumeError, Session, SessionBuilder, State, StateDecodeError, Transport,
};
pub use tap::FallbackPolicy;
