use std::io;

use logging::{trace_replay, warn_replay};
use zeroize::Zeroizing;

use crate::policy::FallbackPolicy;

/// Message carried by the error returned when [`FallbackPolicy::Deny`] refuses a live read.
pub const PREFIX_EXHAUSTED_MSG: &str = "replay prefix exhausted before the handshake completed";

/// Recorded prefix served by a replay tap, together with its replay cursor.
///
/// The buffer also counts how often and how much the tap had to fall through
/// to the live source after the prefix ran out.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    prefix: Zeroizing<Vec<u8>>,
    pos: usize,
    policy: FallbackPolicy,
    fallback_reads: usize,
    fallback_bytes: usize,
    refusals: usize,
    label: &'static str,
}

impl ReplayBuffer {
    /// Creates a buffer that replays `prefix` under `policy`.
    #[must_use]
    pub fn new(prefix: Vec<u8>, policy: FallbackPolicy) -> Self {
        Self {
            prefix: Zeroizing::new(prefix),
            pos: 0,
            policy,
            fallback_reads: 0,
            fallback_bytes: 0,
            refusals: 0,
            label: "stream",
        }
    }

    /// Names the stream in diagnostics (`transcript`, `entropy`, ...).
    #[must_use]
    pub const fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Returns the diagnostic label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Returns the fallback policy.
    #[must_use]
    pub const fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Number of prefix bytes handed out so far.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.pos
    }

    /// Number of prefix bytes not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.prefix.len().saturating_sub(self.pos)
    }

    /// Reports whether the prefix has been fully consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Number of reads that reached the live source.
    #[must_use]
    pub const fn fallback_reads(&self) -> usize {
        self.fallback_reads
    }

    /// Number of bytes obtained from the live source.
    #[must_use]
    pub const fn fallback_bytes(&self) -> usize {
        self.fallback_bytes
    }

    /// Number of live reads refused under [`FallbackPolicy::Deny`].
    #[must_use]
    pub const fn refusals(&self) -> usize {
        self.refusals
    }

    /// Copies as much of the remaining prefix as fits into `buf`.
    pub(crate) fn copy_into(&mut self, buf: &mut [u8]) -> usize {
        if buf.is_empty() || self.is_exhausted() {
            return 0;
        }

        let available = &self.prefix[self.pos..];
        let to_copy = available.len().min(buf.len());
        buf[..to_copy].copy_from_slice(&available[..to_copy]);
        self.pos += to_copy;

        if self.is_exhausted() {
            trace_replay!(
                stream = self.label,
                consumed = self.pos,
                "replay prefix drained"
            );
        }
        to_copy
    }

    /// Applies the fallback policy before a live read of up to `requested` bytes.
    pub(crate) fn admit_fallback(&mut self, requested: usize) -> io::Result<()> {
        match self.policy {
            FallbackPolicy::Deny => {
                self.refusals += 1;
                warn_replay!(
                    stream = self.label,
                    consumed = self.pos,
                    requested,
                    "refusing live read after replay prefix"
                );
                Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{PREFIX_EXHAUSTED_MSG} ({} stream)", self.label),
                ))
            }
            FallbackPolicy::Warn if self.fallback_reads == 0 => {
                warn_replay!(
                    stream = self.label,
                    consumed = self.pos,
                    requested,
                    "replay prefix exhausted, reading live source"
                );
                Ok(())
            }
            FallbackPolicy::Warn | FallbackPolicy::Allow => {
                trace_replay!(stream = self.label, requested, "live fallback read");
                Ok(())
            }
        }
    }

    /// Accounts for a completed live read.
    pub(crate) fn record_fallback(&mut self, read: usize) {
        self.fallback_reads += 1;
        self.fallback_bytes += read;
    }

    /// Finishes replay and reports what happened.
    #[must_use]
    pub fn into_summary(self) -> ReplaySummary {
        ReplaySummary {
            consumed: self.pos,
            fallback_reads: self.fallback_reads,
            fallback_bytes: self.fallback_bytes,
            refusals: self.refusals,
            prefix: self.prefix,
        }
    }
}

/// Report produced when a replay tap is detached.
#[derive(Clone, Debug)]
pub struct ReplaySummary {
    prefix: Zeroizing<Vec<u8>>,
    consumed: usize,
    fallback_reads: usize,
    fallback_bytes: usize,
    refusals: usize,
}

impl ReplaySummary {
    /// The prefix that was replayed.
    #[must_use]
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Prefix bytes consumed by the handshake.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.consumed
    }

    /// Prefix bytes the handshake never asked for.
    #[must_use]
    pub fn unconsumed(&self) -> usize {
        self.prefix.len().saturating_sub(self.consumed)
    }

    /// Reads that reached the live source.
    #[must_use]
    pub const fn fallback_reads(&self) -> usize {
        self.fallback_reads
    }

    /// Bytes obtained from the live source.
    #[must_use]
    pub const fn fallback_bytes(&self) -> usize {
        self.fallback_bytes
    }

    /// Reports whether the live source was touched at all.
    #[must_use]
    pub const fn drew_from_live(&self) -> bool {
        self.fallback_reads > 0
    }

    /// Live reads refused under [`FallbackPolicy::Deny`].
    #[must_use]
    pub const fn refusals(&self) -> usize {
        self.refusals
    }

    /// Reports whether the handshake asked for more than the prefix held.
    #[must_use]
    pub const fn overran_prefix(&self) -> bool {
        self.fallback_reads > 0 || self.refusals > 0
    }

    /// Reports whether the handshake consumed the prefix exactly: all of it, and nothing more.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.unconsumed() == 0 && !self.overran_prefix()
    }

    /// Releases the replayed prefix.
    #[must_use]
    pub fn into_prefix(self) -> Zeroizing<Vec<u8>> {
        self.prefix
    }
}
