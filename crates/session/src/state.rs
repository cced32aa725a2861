//! Resumable handshake snapshots.

use std::fmt;

use handshake::{Role, SequenceCounters};
use zeroize::Zeroizing;

pub mod codec;

pub use codec::{StateDecodeError, StateEncodeError};

/// Snapshot of a completed handshake: its two recorded inputs and the record
/// sequence counters at the moment the snapshot was taken.
///
/// A `State` is a value. Cloning it and resuming from both copies produces two
/// sessions that share nothing. The transcript and entropy buffers are zeroized
/// on drop because the entropy holds key-share secrets.
#[derive(Clone, Eq, PartialEq)]
pub struct State {
    role: Role,
    engine_id: String,
    transcript: Zeroizing<Vec<u8>>,
    entropy: Zeroizing<Vec<u8>>,
    counters: SequenceCounters,
}

impl State {
    /// Builds a snapshot from its parts.
    pub fn new(
        role: Role,
        engine_id: impl Into<String>,
        transcript: Vec<u8>,
        entropy: Vec<u8>,
        counters: SequenceCounters,
    ) -> Self {
        Self {
            role,
            engine_id: engine_id.into(),
            transcript: Zeroizing::new(transcript),
            entropy: Zeroizing::new(entropy),
            counters,
        }
    }

    /// The snapshot reported before any handshake has succeeded: no engine,
    /// no recorded bytes, zero counters.
    pub fn empty(role: Role) -> Self {
        Self::new(role, String::new(), Vec::new(), Vec::new(), SequenceCounters::ZERO)
    }

    pub(crate) fn from_recorded(
        role: Role,
        engine_id: impl Into<String>,
        transcript: Zeroizing<Vec<u8>>,
        entropy: Zeroizing<Vec<u8>>,
        counters: SequenceCounters,
    ) -> Self {
        Self {
            role,
            engine_id: engine_id.into(),
            transcript,
            entropy,
            counters,
        }
    }

    pub(crate) fn into_recorded(self) -> (Zeroizing<Vec<u8>>, Zeroizing<Vec<u8>>) {
        (self.transcript, self.entropy)
    }

    /// Reports whether this is the empty snapshot.
    pub fn is_empty(&self) -> bool {
        self.engine_id.is_empty() && self.transcript.is_empty() && self.entropy.is_empty()
    }

    /// Side of the handshake the snapshot was taken on.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Identifier of the engine that produced the snapshot.
    pub fn engine_id(&self) -> &str {
        &self.engine_id
    }

    /// Bytes the handshake read from the transport.
    pub fn transcript(&self) -> &[u8] {
        &self.transcript
    }

    /// Bytes the handshake drew from the randomness source.
    pub fn entropy(&self) -> &[u8] {
        &self.entropy
    }

    /// Record sequence counters.
    pub const fn counters(&self) -> SequenceCounters {
        self.counters
    }

    /// Inbound counter bytes.
    pub const fn in_seq(&self) -> [u8; 8] {
        self.counters.inbound
    }

    /// Outbound counter bytes.
    pub const fn out_seq(&self) -> [u8; 8] {
        self.counters.outbound
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("role", &self.role)
            .field("engine_id", &self.engine_id)
            .field("transcript_len", &self.transcript.len())
            .field("entropy_len", &self.entropy.len())
            .field("in_seq", &self.counters.inbound_u64())
            .field("out_seq", &self.counters.outbound_u64())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_has_nothing_recorded() {
        let state = State::empty(Role::Server);
        assert!(state.is_empty());
        assert_eq!(state.role(), Role::Server);
        assert!(state.transcript().is_empty());
        assert!(state.entropy().is_empty());
        assert_eq!(state.counters(), SequenceCounters::ZERO);
    }

    #[test]
    fn counters_are_exposed_verbatim() {
        let counters = SequenceCounters::new([1, 2, 3, 4, 5, 6, 7, 8], [8, 7, 6, 5, 4, 3, 2, 1]);
        let state = State::new(Role::Client, "e", vec![1], vec![2], counters);
        assert_eq!(state.in_seq(), [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(state.out_seq(), [8, 7, 6, 5, 4, 3, 2, 1]);
        assert!(!state.is_empty());
    }

    #[test]
    fn debug_output_omits_recorded_bytes() {
        let state = State::new(
            Role::Client,
            "e",
            vec![0xde, 0xad],
            vec![0xbe, 0xef, 0x42],
            SequenceCounters::from_u64(3, 4),
        );
        let rendered = format!("{state:?}");
        assert!(rendered.contains("transcript_len: 2"));
        assert!(rendered.contains("entropy_len: 3"));
        assert!(!rendered.contains("222"));
    }
}
