use std::fmt;
use std::io::{self, Read, Write};
use std::mem;
use std::net::Shutdown;
use std::time::Duration;

use handshake::{
    EngineFactory, EngineResult, HandshakeEngine, OsEntropy, Role, SequenceAccess,
    SequenceCounters,
};
use logging::{trace_capture, trace_replay, trace_session, warn_replay};
use tap::{ReplaySummary, TappedReader, TappedStream};
use zeroize::Zeroizing;

use crate::builder::SessionBuilder;
use crate::diagnostics::{ReplayDiagnostics, StreamDiagnostics};
use crate::error::{HandshakeMode, Incompatibility, ResumeError};
use crate::state::State;
use crate::transport::Transport;


#[derive(Clone, Copy, Debug)]
enum Plan {
    Capture,
    Resume { counters: SequenceCounters },
}

impl Plan {
    const fn mode(self) -> HandshakeMode {
        match self {
            Self::Capture => HandshakeMode::Capture,
            Self::Resume { .. } => HandshakeMode::Resume,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Lifecycle {
    Pending,
    Established,
    Failed,
}

/// The two handshake inputs a session can be migrated with.
struct Recorded {
    transcript: Zeroizing<Vec<u8>>,
    entropy: Zeroizing<Vec<u8>>,
}

/// A connection that can be snapshotted after its handshake and resumed elsewhere.
///
/// Without a prior [`State`] the session captures: the engine reads the
/// transport and the randomness source through duplicating taps. With one it
/// resumes: both inputs are replayed from the snapshot, handshake writes land
/// in a discarding sink, and the snapshot's sequence counters are injected
/// once the replayed handshake completes.
///
/// The handshake runs on the first call to [`handshake`](Self::handshake),
/// [`Read::read`] or [`Write::write`]. After it succeeds the taps are
/// detached and all I/O goes straight to the engine.
pub struct Session<F: EngineFactory, T: Transport, E: Read = OsEntropy> {
    engine: F::Engine<TappedStream<T>, TappedReader<E>>,
    engine_id: &'static str,
    plan: Plan,
    lifecycle: Lifecycle,
    recorded: Option<Recorded>,
    diagnostics: Option<ReplayDiagnostics>,
}

impl<F: EngineFactory, T: Transport> Session<F, T> {
    /// Client session that captures a fresh handshake.
    pub fn client(factory: &F, transport: T) -> Result<Self, ResumeError> {
        SessionBuilder::new(Role::Client).connect(factory, transport)
    }

    /// Server session that captures a fresh handshake.
    pub fn server(factory: &F, transport: T) -> Result<Self, ResumeError> {
        SessionBuilder::new(Role::Server).connect(factory, transport)
    }

    /// Session that resumes from `state` on the side it was taken.
    pub fn resume(factory: &F, transport: T, state: State) -> Result<Self, ResumeError> {
        SessionBuilder::resume(state).connect(factory, transport)
    }

    /// Session that resumes from a snapshot encoded with [`State::encode`].
    pub fn resume_encoded(factory: &F, transport: T, encoded: &[u8]) -> Result<Self, ResumeError> {
        Self::resume(factory, transport, State::decode(encoded)?)
    }
}

impl<F: EngineFactory, T: Transport, E: Read> Session<F, T, E> {
    pub(crate) fn from_builder(
        factory: &F,
        transport: T,
        builder: SessionBuilder<E>,
    ) -> Result<Self, ResumeError> {
        let engine_id = factory.engine_id();
        if !factory.capabilities().sequence_access {
            trace_session!(engine = engine_id, "engine cannot expose sequence counters");
            return Err(ResumeError::EngineIncompatible { engine_id });
        }

        let (role, policy, entropy, state) = builder.into_parts();
        let (stream, entropy, plan) = match state {
            None => (
                TappedStream::capturing(transport),
                TappedReader::duplicating(entropy).with_label("entropy"),
                Plan::Capture,
            ),
            Some(state) => {
                check_compatible(&state, role, engine_id)?;
                let counters = state.counters();
                let (mut transcript, mut seed) = state.into_recorded();
                (
                    TappedStream::replaying(transport, mem::take(&mut *transcript), policy),
                    TappedReader::replaying(entropy, mem::take(&mut *seed), policy)
                        .with_label("entropy"),
                    Plan::Resume { counters },
                )
            }
        };

        let mode = plan.mode();
        let engine = factory
            .build(role, stream, entropy)
            .map_err(|source| ResumeError::HandshakeFailure { mode, source })?;
        trace_session!(engine = engine_id, %role, %mode, ?policy, "session created");

        Ok(Self {
            engine,
            engine_id,
            plan,
            lifecycle: Lifecycle::Pending,
            recorded: None,
            diagnostics: None,
        })
    }

    /// Runs the handshake, capturing or replaying as configured.
    ///
    /// Returns immediately once the session is established. After a failure
    /// the session is unusable and every later call reports
    /// [`ResumeError::Unusable`].
    pub fn handshake(&mut self) -> Result<(), ResumeError> {
        match self.lifecycle {
            Lifecycle::Established => return Ok(()),
            Lifecycle::Failed => return Err(ResumeError::Unusable),
            Lifecycle::Pending => {}
        }

        let outcome = self.engine.handshake();
        match self.plan {
            Plan::Capture => self.finish_capture(outcome),
            Plan::Resume { counters } => self.finish_resume(outcome, counters),
        }
    }

    fn finish_capture(&mut self, outcome: EngineResult<()>) -> Result<(), ResumeError> {
        if let Err(source) = outcome {
            self.engine.stream_mut().discard();
            self.engine.entropy_mut().discard();
            self.lifecycle = Lifecycle::Failed;
            trace_capture!(error = %source, "handshake failed, recorded inputs discarded");
            return Err(ResumeError::HandshakeFailure {
                mode: HandshakeMode::Capture,
                source,
            });
        }

        let transcript = self
            .engine
            .stream_mut()
            .detach()
            .read
            .into_captured()
            .unwrap_or_default();
        let entropy = self
            .engine
            .entropy_mut()
            .detach()
            .into_captured()
            .unwrap_or_default();
        trace_capture!(
            transcript = transcript.len(),
            entropy = entropy.len(),
            "handshake captured"
        );

        self.recorded = Some(Recorded {
            transcript,
            entropy,
        });
        self.lifecycle = Lifecycle::Established;
        Ok(())
    }

    fn finish_resume(
        &mut self,
        outcome: EngineResult<()>,
        counters: SequenceCounters,
    ) -> Result<(), ResumeError> {
        let report = self.engine.stream_mut().detach();
        let transcript = report.read.into_replayed();
        let entropy = self.engine.entropy_mut().detach().into_replayed();
        let diagnostics = ReplayDiagnostics {
            transcript: transcript
                .as_ref()
                .map(StreamDiagnostics::from)
                .unwrap_or_default(),
            entropy: entropy
                .as_ref()
                .map(StreamDiagnostics::from)
                .unwrap_or_default(),
            discarded_writes: report.discarded.unwrap_or_default(),
        };
        self.diagnostics = Some(diagnostics);

        if let Err(source) = outcome {
            self.lifecycle = Lifecycle::Failed;
            trace_replay!(
                error = %source,
                overran = diagnostics.overran(),
                "replayed handshake failed"
            );
            return Err(if source.is_protocol_violation() || diagnostics.overran() {
                ResumeError::TranscriptMismatch {
                    source,
                    diagnostics,
                }
            } else {
                ResumeError::HandshakeFailure {
                    mode: HandshakeMode::Resume,
                    source,
                }
            });
        }

        if let Err(source) = self.engine.set_sequence_counters(counters) {
            self.lifecycle = Lifecycle::Failed;
            return Err(ResumeError::HandshakeFailure {
                mode: HandshakeMode::Resume,
                source,
            });
        }

        if !diagnostics.is_exact() {
            warn_replay!(
                transcript_unconsumed = diagnostics.transcript.unconsumed,
                transcript_fallback = diagnostics.transcript.fallback_bytes,
                entropy_unconsumed = diagnostics.entropy.unconsumed,
                entropy_fallback = diagnostics.entropy.fallback_bytes,
                "resume did not consume the snapshot exactly"
            );
        }

        self.recorded = Some(Recorded {
            transcript: transcript
                .map(ReplaySummary::into_prefix)
                .unwrap_or_default(),
            entropy: entropy.map(ReplaySummary::into_prefix).unwrap_or_default(),
        });
        self.lifecycle = Lifecycle::Established;
        trace_session!(
            inbound = counters.inbound_u64(),
            outbound = counters.outbound_u64(),
            discarded = diagnostics.discarded_writes,
            "session resumed"
        );
        Ok(())
    }

    /// Snapshot of the handshake with the sequence counters as they are now.
    ///
    /// Before a successful handshake, or once the engine can no longer report
    /// its counters, this is [`State::empty`]. A resumed session reports the
    /// inputs it was resumed from, so it can be migrated again.
    pub fn state(&self) -> State {
        let role = self.role();
        let (Lifecycle::Established, Some(recorded)) = (self.lifecycle, &self.recorded) else {
            return State::empty(role);
        };

        match self.engine.sequence_counters() {
            Ok(counters) => State::from_recorded(
                role,
                self.engine_id,
                recorded.transcript.clone(),
                recorded.entropy.clone(),
                counters,
            ),
            Err(err) => {
                trace_session!(error = %err, "sequence counters unavailable");
                State::empty(role)
            }
        }
    }

    /// Side of the handshake this session plays.
    pub fn role(&self) -> Role {
        self.engine.role()
    }

    /// Whether the session captures or resumes.
    pub const fn mode(&self) -> HandshakeMode {
        self.plan.mode()
    }

    /// Identifier of the engine driving the session.
    pub const fn engine_id(&self) -> &'static str {
        self.engine_id
    }

    /// Reports whether the handshake has completed.
    pub fn is_established(&self) -> bool {
        self.lifecycle == Lifecycle::Established
    }

    /// Reports whether a handshake attempt failed.
    pub fn is_failed(&self) -> bool {
        self.lifecycle == Lifecycle::Failed
    }

    /// Prefix consumption of the replayed handshake, once a resume has run.
    pub const fn replay_diagnostics(&self) -> Option<&ReplayDiagnostics> {
        self.diagnostics.as_ref()
    }

    /// The underlying engine.
    pub const fn engine(&self) -> &F::Engine<TappedStream<T>, TappedReader<E>> {
        &self.engine
    }

    /// The underlying engine, mutably. I/O through it bypasses the lazy handshake.
    pub fn engine_mut(&mut self) -> &mut F::Engine<TappedStream<T>, TappedReader<E>> {
        &mut self.engine
    }

    /// Consumes the session and returns the engine.
    pub fn into_engine(self) -> F::Engine<TappedStream<T>, TappedReader<E>> {
        self.engine
    }

    /// The raw transport.
    pub fn transport(&self) -> &T {
        self.engine.stream().get_ref()
    }

    /// Closes the connection.
    ///
    /// An established session first sends the engine's close notification.
    /// The transport is shut down in both directions either way, even when the
    /// notification could not be sent.
    pub fn close(&mut self) -> io::Result<()> {
        let notified = match self.lifecycle {
            Lifecycle::Established => self.engine.close().map_err(io::Error::from),
            Lifecycle::Pending | Lifecycle::Failed => Ok(()),
        };
        let shut = self.transport().shutdown(Shutdown::Both);
        trace_session!(lifecycle = ?self.lifecycle, "session closed");
        notified.and(shut)
    }

    /// Forwards a read deadline to the transport.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.transport().set_read_timeout(timeout)
    }

    /// Forwards a write deadline to the transport.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.transport().set_write_timeout(timeout)
    }

    /// Forwards a shutdown to the transport.
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        self.transport().shutdown(how)
    }
}

fn check_compatible(state: &State, role: Role, engine_id: &'static str) -> Result<(), ResumeError> {
    let mismatch = if state.is_empty() {
        Incompatibility::Empty
    } else if state.role() != role {
        Incompatibility::Role {
            expected: role,
            found: state.role(),
        }
    } else if state.engine_id() != engine_id {
        Incompatibility::Engine {
            expected: engine_id,
            found: state.engine_id().to_owned(),
        }
    } else {
        return Ok(());
    };
    trace_session!(%mismatch, "state rejected");
    Err(ResumeError::StateIncompatible(mismatch))
}

impl<F: EngineFactory, T: Transport, E: Read> Read for Session<F, T, E> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.handshake()?;
        self.engine.read(buf)
    }
}

impl<F: EngineFactory, T: Transport, E: Read> Write for Session<F, T, E> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.handshake()?;
        self.engine.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.engine.flush()
    }
}

impl<F: EngineFactory, T: Transport, E: Read> fmt::Debug for Session<F, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("engine_id", &self.engine_id)
            .field("mode", &self.plan.mode())
            .field("lifecycle", &self.lifecycle)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}
