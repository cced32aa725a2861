//! What a replayed handshake consumed.

use tap::ReplaySummary;

/// Consumption report for one replayed input.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StreamDiagnostics {
    /// Length of the recorded prefix.
    pub prefix_len: usize,
    /// Prefix bytes the handshake consumed.
    pub consumed: usize,
    /// Prefix bytes the handshake never asked for.
    pub unconsumed: usize,
    /// Reads that fell through to the live source.
    pub fallback_reads: usize,
    /// Bytes obtained from the live source.
    pub fallback_bytes: usize,
    /// Live reads refused by the fallback policy.
    pub refusals: usize,
}

impl StreamDiagnostics {
    /// Reports whether the handshake asked for more than the prefix held.
    pub const fn overran(&self) -> bool {
        self.fallback_reads > 0 || self.refusals > 0
    }

    /// Reports whether the handshake consumed the whole prefix and nothing beyond it.
    pub const fn is_exact(&self) -> bool {
        self.unconsumed == 0 && !self.overran()
    }
}

impl From<&ReplaySummary> for StreamDiagnostics {
    fn from(summary: &ReplaySummary) -> Self {
        Self {
            prefix_len: summary.prefix().len(),
            consumed: summary.consumed(),
            unconsumed: summary.unconsumed(),
            fallback_reads: summary.fallback_reads(),
            fallback_bytes: summary.fallback_bytes(),
            refusals: summary.refusals(),
        }
    }
}

/// Consumption report for a resumed handshake.
///
/// A resume from a complete snapshot consumes both prefixes exactly. Anything
/// else means the snapshot and the engine disagree about the handshake.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReplayDiagnostics {
    /// Transport transcript.
    pub transcript: StreamDiagnostics,
    /// Entropy stream.
    pub entropy: StreamDiagnostics,
    /// Handshake bytes the engine wrote into the discarding sink.
    pub discarded_writes: u64,
}

impl ReplayDiagnostics {
    /// Reports whether either input asked for more than its prefix held.
    pub const fn overran(&self) -> bool {
        self.transcript.overran() || self.entropy.overran()
    }

    /// Reports whether both prefixes were consumed exactly.
    pub const fn is_exact(&self) -> bool {
        self.transcript.is_exact() && self.entropy.is_exact()
    }
}
