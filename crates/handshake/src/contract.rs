use std::io::{Read, Write};

use crate::counters::SequenceCounters;
use crate::error::{EngineError, EngineResult};
use crate::role::Role;

/// A secure-transport engine that authenticates a peer and derives keys.
///
/// The engine owns its stream and entropy source. Before
/// [`handshake`](Self::handshake) succeeds, [`Read`] and [`Write`] fail with
/// [`std::io::ErrorKind::NotConnected`]; afterwards they carry protected
/// application records.
pub trait HandshakeEngine: Read + Write {
    /// Byte stream the engine reads handshake messages from and writes them to.
    type Stream;
    /// Randomness source consumed during the handshake.
    type Entropy;

    /// Side of the handshake this engine plays.
    fn role(&self) -> Role;

    /// Runs the handshake to completion. Returns immediately once established.
    fn handshake(&mut self) -> EngineResult<()>;

    /// Reports whether the handshake has completed.
    fn is_established(&self) -> bool;

    /// Returns the stream.
    fn stream(&self) -> &Self::Stream;

    /// Returns the stream mutably. Writing through it bypasses record protection.
    fn stream_mut(&mut self) -> &mut Self::Stream;

    /// Returns the entropy source.
    fn entropy(&self) -> &Self::Entropy;

    /// Returns the entropy source mutably.
    fn entropy_mut(&mut self) -> &mut Self::Entropy;

    /// Notifies the peer that no further records follow.
    fn close(&mut self) -> EngineResult<()>;
}

/// Read and overwrite access to an established engine's record sequence counters.
///
/// Both methods default to [`EngineError::SequenceAccessUnsupported`]. An
/// engine that keeps the defaults must not advertise
/// [`Capabilities::sequence_access`].
pub trait SequenceAccess {
    /// Returns the current counters.
    fn sequence_counters(&self) -> EngineResult<SequenceCounters> {
        Err(EngineError::SequenceAccessUnsupported)
    }

    /// Replaces the current counters verbatim.
    fn set_sequence_counters(&mut self, _counters: SequenceCounters) -> EngineResult<()> {
        Err(EngineError::SequenceAccessUnsupported)
    }
}

/// Optional engine features a session checks before any I/O.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Capabilities {
    /// [`SequenceAccess`] works on established engines.
    pub sequence_access: bool,
}

impl Capabilities {
    /// Everything supported.
    pub const FULL: Self = Self {
        sequence_access: true,
    };
}

/// Builds engines over caller-chosen stream and entropy types.
///
/// Implementations are usually the engine's configuration type. A factory is
/// only borrowed while building, so one configuration can serve many sessions
/// without any of them mutating it.
pub trait EngineFactory {
    /// Engine produced for stream `S` and entropy source `E`.
    type Engine<S: Read + Write, E: Read>: HandshakeEngine<Stream = S, Entropy = E>
        + SequenceAccess;

    /// Identifier recorded in snapshots to detect engine mismatches on resume.
    fn engine_id(&self) -> &'static str;

    /// Features the produced engines support.
    fn capabilities(&self) -> Capabilities;

    /// Builds an engine without performing any I/O.
    fn build<S: Read + Write, E: Read>(
        &self,
        role: Role,
        stream: S,
        entropy: E,
    ) -> EngineResult<Self::Engine<S, E>>;
}
