use std::io::{self, Read};
use std::mem;

use logging::trace_capture;
use zeroize::Zeroizing;

use crate::capture::CaptureBuffer;
use crate::policy::FallbackPolicy;
use crate::replay::{ReplayBuffer, ReplaySummary};

#[derive(Clone, Debug)]
enum ReadTap {
    Passthrough,
    Duplicate(CaptureBuffer),
    Replay(ReplayBuffer),
}

/// What a reader tap observed before it was detached.
#[derive(Clone, Debug)]
pub enum TapOutcome {
    /// The tap was already a pass-through.
    Passthrough,
    /// Bytes recorded by a duplicating tap.
    Captured(Zeroizing<Vec<u8>>),
    /// Report from a replay tap.
    Replayed(ReplaySummary),
}

impl TapOutcome {
    /// Returns the captured bytes, if this outcome came from a duplicating tap.
    #[must_use]
    pub fn into_captured(self) -> Option<Zeroizing<Vec<u8>>> {
        match self {
            Self::Captured(bytes) => Some(bytes),
            Self::Passthrough | Self::Replayed(_) => None,
        }
    }

    /// Returns the replay report, if this outcome came from a replay tap.
    #[must_use]
    pub fn into_replayed(self) -> Option<ReplaySummary> {
        match self {
            Self::Replayed(summary) => Some(summary),
            Self::Passthrough | Self::Captured(_) => None,
        }
    }
}

/// Byte source wrapped by a detachable tap.
///
/// The same type covers the three lifecycle stages of a handshake input:
/// duplicating (capture path), replaying (resume path) and pass-through
/// (after the handshake). Engines are generic over a single reader type, so
/// switching stages never changes the engine's type.
#[derive(Clone, Debug)]
pub struct TappedReader<R> {
    inner: R,
    tap: ReadTap,
    label: &'static str,
}

impl<R> TappedReader<R> {
    /// Wraps `inner` without intercepting anything.
    pub const fn passthrough(inner: R) -> Self {
        Self {
            inner,
            tap: ReadTap::Passthrough,
            label: "stream",
        }
    }

    /// Wraps `inner` and records every byte read through it.
    pub fn duplicating(inner: R) -> Self {
        Self {
            inner,
            tap: ReadTap::Duplicate(CaptureBuffer::new()),
            label: "stream",
        }
    }

    /// Wraps `inner` so reads are served from `prefix` first.
    pub fn replaying(inner: R, prefix: Vec<u8>, policy: FallbackPolicy) -> Self {
        Self {
            inner,
            tap: ReadTap::Replay(ReplayBuffer::new(prefix, policy)),
            label: "stream",
        }
    }

    /// Names the stream in diagnostics.
    #[must_use]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self.tap = match mem::replace(&mut self.tap, ReadTap::Passthrough) {
            ReadTap::Replay(buffer) => ReadTap::Replay(buffer.with_label(label)),
            other => other,
        };
        self
    }

    /// Returns the diagnostic label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Reports whether a duplicating or replay tap is still active.
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        !matches!(self.tap, ReadTap::Passthrough)
    }

    /// Bytes recorded so far by a duplicating tap.
    #[must_use]
    pub fn captured(&self) -> Option<&[u8]> {
        match &self.tap {
            ReadTap::Duplicate(capture) => Some(capture.as_slice()),
            ReadTap::Passthrough | ReadTap::Replay(_) => None,
        }
    }

    /// Replay state of an active replay tap.
    #[must_use]
    pub const fn replay(&self) -> Option<&ReplayBuffer> {
        match &self.tap {
            ReadTap::Replay(buffer) => Some(buffer),
            ReadTap::Passthrough | ReadTap::Duplicate(_) => None,
        }
    }

    /// Turns the wrapper into a pass-through and reports what the tap observed.
    pub fn detach(&mut self) -> TapOutcome {
        match mem::replace(&mut self.tap, ReadTap::Passthrough) {
            ReadTap::Passthrough => TapOutcome::Passthrough,
            ReadTap::Duplicate(capture) => {
                trace_capture!(
                    stream = self.label,
                    captured = capture.len(),
                    "duplicating tap detached"
                );
                TapOutcome::Captured(capture.into_bytes())
            }
            ReadTap::Replay(buffer) => TapOutcome::Replayed(buffer.into_summary()),
        }
    }

    /// Detaches and drops whatever the tap held.
    ///
    /// Used after a failed capture: no partial recording may survive.
    pub fn discard(&mut self) {
        let dropped = self.detach();
        if let TapOutcome::Captured(bytes) = &dropped {
            trace_capture!(
                stream = self.label,
                discarded = bytes.len(),
                "capture discarded"
            );
        }
    }

    /// Returns a shared reference to the wrapped source.
    pub const fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Returns a mutable reference to the wrapped source.
    ///
    /// Reading through this reference bypasses the tap.
    pub const fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Releases the wrapped source, dropping any tap state.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for TappedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        match &mut self.tap {
            ReadTap::Passthrough => self.inner.read(buf),
            ReadTap::Duplicate(capture) => {
                let read = self.inner.read(buf)?;
                capture.record(&buf[..read]);
                Ok(read)
            }
            ReadTap::Replay(replay) => {
                let copied = replay.copy_into(buf);
                if copied > 0 {
                    return Ok(copied);
                }

                replay.admit_fallback(buf.len())?;
                let read = self.inner.read(buf)?;
                replay.record_fallback(read);
                Ok(read)
            }
        }
    }
}
