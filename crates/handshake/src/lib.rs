#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `handshake` defines what the resumption machinery needs from a
//! secure-transport engine and ships one engine that provides it.
//!
//! # Design
//!
//! - [`HandshakeEngine`] runs a handshake over a caller-supplied byte stream
//!   and randomness source, then behaves as an encrypted [`std::io::Read`] /
//!   [`std::io::Write`] channel.
//! - [`SequenceAccess`] reads and overwrites the two per-direction record
//!   sequence counters of an established engine. Counters are exchanged as
//!   opaque [`SequenceCounters`] in the engine's own byte representation.
//! - [`EngineFactory`] builds engines for a given [`Role`], stream and entropy
//!   source. The stream and entropy types are chosen per call so callers can
//!   pass wrapped sources without mutating any shared configuration.
//! - [`sealed`] is the reference engine: X25519 key agreement, an HKDF-SHA256
//!   key schedule and ChaCha20-Poly1305 records whose counters are owned
//!   fields rather than hidden state.
//!
//! # Invariants
//!
//! - Engines read handshake messages with exact-length reads, so the bytes a
//!   handshake consumes from its stream are exactly the protocol's messages.
//! - Sequence counters are only readable or writable once the handshake has
//!   completed.
//!
//! # Errors
//!
//! All engine operations report [`EngineError`]. The [`std::io::Read`] and
//! [`std::io::Write`] implementations convert it into [`std::io::Error`].

mod contract;
mod counters;
mod entropy;
mod error;
mod role;
pub mod sealed;

pub use contract::{Capabilities, EngineFactory, HandshakeEngine, SequenceAccess};
pub use counters::SequenceCounters;
pub use entropy::OsEntropy;
pub use error::{EngineError, EngineResult};
pub use role::Role;
