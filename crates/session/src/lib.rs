#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `session` turns a handshake engine into a connection that can be
//! snapshotted after its handshake and resumed on another transport without
//! running the handshake protocol against the peer again.
//!
//! # Design
//!
//! - [`Session`] wires an engine from an [`EngineFactory`](handshake::EngineFactory)
//!   to [`tap`] wrappers around the transport and the randomness source. A
//!   capture session records both inputs; a resume session replays them from a
//!   [`State`] and discards the engine's handshake writes.
//! - [`State`] holds the recorded transcript and entropy plus the record
//!   sequence counters, read from the engine when the snapshot is taken.
//!   [`State::encode`] and [`State::decode`] fix its persisted layout.
//! - [`SessionBuilder`] chooses the role, the [`FallbackPolicy`](tap::FallbackPolicy),
//!   the live entropy source and an optional prior state.
//! - [`Transport`] is the byte stream underneath, with deadline and shutdown
//!   operations the session forwards unchanged.
//!
//! # Invariants
//!
//! - Taps are detached as soon as the handshake succeeds or fails, so
//!   application data is never recorded or replayed.
//! - A failed capture keeps nothing; [`Session::state`] then returns
//!   [`State::empty`].
//! - Engines without sequence counter access are rejected at construction.
//! - Sessions resumed from clones of one [`State`] share no mutable state.
//!
//! # Errors
//!
//! Construction and handshakes report [`ResumeError`]. The [`std::io::Read`]
//! and [`std::io::Write`] implementations run the handshake lazily and convert
//! its error into [`std::io::Error`].
//!
//! # Examples
//!
//! ```
//! use handshake::Role;
//! use session::{SessionBuilder, State};
//!
//! let snapshot = State::empty(Role::Client);
//! assert!(snapshot.is_empty());
//! let builder = SessionBuilder::new(Role::Client);
//! assert!(!builder.is_resume());
//! ```

mod builder;
mod diagnostics;
mod error;
mod session;
pub mod state;
mod transport;

pub use builder::SessionBuilder;
pub use diagnostics::{ReplayDiagnostics, StreamDiagnostics};
pub use error::{HandshakeMode, Incompatibility, ResumeError};
pub use session::Session;
pub use state::{State, StateDecodeError, StateEncodeError};
pub use transport::Transport;
