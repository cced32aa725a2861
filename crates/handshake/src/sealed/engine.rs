use std::io::{self, Read, Write};

use logging::trace_engine;
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::frame::{FrameKind, read_frame, read_handshake_frame, write_frame};
use super::messages::{Finished, Hello};
use super::record::{RecordLayer, TAG_LEN};
use super::schedule::{KeySchedule, export, finished_verify, transcript_hash};
use super::{ENTROPY_PER_HANDSHAKE, PROTOCOL_VERSION, SealedConfig};
use crate::contract::{HandshakeEngine, SequenceAccess};
use crate::counters::SequenceCounters;
use crate::error::{EngineError, EngineResult};
use crate::role::Role;

enum Phase {
    Idle,
    Established(Box<Established>),
    Failed,
}

struct Established {
    records: RecordLayer,
    exporter: Zeroizing<[u8; 32]>,
}

/// Per-handshake randomness: the hello random followed by the key-share secret.
struct HandshakeEntropy {
    random: [u8; 32],
    secret: StaticSecret,
}

impl HandshakeEntropy {
    fn draw<E: Read>(entropy: &mut E) -> EngineResult<Self> {
        let mut material = Zeroizing::new([0u8; ENTROPY_PER_HANDSHAKE]);
        entropy.read_exact(material.as_mut_slice())?;

        let mut random = [0u8; 32];
        let mut secret = Zeroizing::new([0u8; 32]);
        random.copy_from_slice(&material[..32]);
        secret.copy_from_slice(&material[32..]);
        Ok(Self {
            random,
            secret: StaticSecret::from(*secret),
        })
    }

    fn hello(&self) -> Hello {
        Hello {
            version: PROTOCOL_VERSION,
            random: self.random,
            key_share: PublicKey::from(&self.secret).to_bytes(),
        }
    }

    fn agree(&self, peer: &Hello) -> EngineResult<Zeroizing<[u8; 32]>> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(peer.key_share));
        if !shared.was_contributory() {
            return Err(EngineError::Crypto("peer key share is a low-order point"));
        }
        Ok(Zeroizing::new(*shared.as_bytes()))
    }
}

fn check_version(hello: &Hello) -> EngineResult<()> {
    if hello.version == PROTOCOL_VERSION {
        Ok(())
    } else {
        Err(EngineError::VersionMismatch {
            local: PROTOCOL_VERSION,
            remote: hello.version,
        })
    }
}

fn verify_finished(expected: &[u8; 32], finished: &Finished) -> EngineResult<()> {
    if bool::from(expected.as_slice().ct_eq(finished.verify.as_slice())) {
        Ok(())
    } else {
        Err(EngineError::VerificationFailed)
    }
}

/// The sealed reference engine.
///
/// Handshake messages are read with exact-length reads and the 64 bytes of
/// entropy per handshake are drawn in a single `read_exact`, so a duplicating
/// tap records exactly the bytes the handshake depends on.
pub struct SealedEngine<S, E> {
    role: Role,
    stream: S,
    entropy: E,
    config: SealedConfig,
    phase: Phase,
    pending: Zeroizing<Vec<u8>>,
    pending_pos: usize,
    peer_closed: bool,
    closed: bool,
}

impl<S: Read + Write, E: Read> SealedEngine<S, E> {
    pub(crate) fn new(config: SealedConfig, role: Role, stream: S, entropy: E) -> Self {
        Self {
            role,
            stream,
            entropy,
            config,
            phase: Phase::Idle,
            pending: Zeroizing::new(Vec::new()),
            pending_pos: 0,
            peer_closed: false,
            closed: false,
        }
    }

    /// Configuration the engine was built with.
    pub const fn config(&self) -> &SealedConfig {
        &self.config
    }

    /// Derives `out.len()` bytes of keying material bound to this session and `label`.
    ///
    /// A session resumed from a snapshot exports the same material as the
    /// session the snapshot was taken from.
    pub fn export_keying_material(&self, label: &[u8], out: &mut [u8]) -> EngineResult<()> {
        export(&self.established()?.exporter, label, out)
    }

    /// Reports whether the peer has sent its close notification.
    pub const fn peer_closed(&self) -> bool {
        self.peer_closed
    }

    /// Consumes the engine and returns its stream and entropy source.
    pub fn into_parts(self) -> (S, E) {
        (self.stream, self.entropy)
    }

    fn established(&self) -> EngineResult<&Established> {
        match &self.phase {
            Phase::Established(state) => Ok(state),
            Phase::Idle => Err(EngineError::NotEstablished),
            Phase::Failed => Err(EngineError::Poisoned),
        }
    }

    fn established_mut(&mut self) -> EngineResult<&mut Established> {
        match &mut self.phase {
            Phase::Established(state) => Ok(state),
            Phase::Idle => Err(EngineError::NotEstablished),
            Phase::Failed => Err(EngineError::Poisoned),
        }
    }

    fn run_client(&mut self) -> EngineResult<Established> {
        let local = HandshakeEntropy::draw(&mut self.entropy)?;
        let client_hello = write_frame(
            &mut self.stream,
            FrameKind::ClientHello,
            &local.hello().encode(),
        )?;

        let server_hello = read_handshake_frame(&mut self.stream, FrameKind::ServerHello)?;
        let peer = Hello::decode(server_hello.body())?;
        check_version(&peer)?;
        let server_hello = server_hello.to_bytes();

        let shared = local.agree(&peer)?;
        let hello_hash = transcript_hash(&[client_hello.as_slice(), server_hello.as_slice()]);
        let schedule = KeySchedule::derive(&shared, self.psk(), &hello_hash)?;

        let server_finished = read_handshake_frame(&mut self.stream, FrameKind::Finished)?;
        let expected = finished_verify(&schedule.server.finished, &hello_hash)?;
        verify_finished(&expected, &Finished::decode(server_finished.body())?)?;

        let full_hash = transcript_hash(&[
            client_hello.as_slice(),
            server_hello.as_slice(),
            server_finished.to_bytes().as_slice(),
        ]);
        let verify = finished_verify(&schedule.client.finished, &full_hash)?;
        write_frame(
            &mut self.stream,
            FrameKind::Finished,
            &Finished { verify }.encode(),
        )?;
        self.stream.flush()?;

        Ok(self.establish(&schedule))
    }

    fn run_server(&mut self) -> EngineResult<Established> {
        let client_hello = read_handshake_frame(&mut self.stream, FrameKind::ClientHello)?;
        let peer = Hello::decode(client_hello.body())?;
        check_version(&peer)?;
        let client_hello = client_hello.to_bytes();

        let local = HandshakeEntropy::draw(&mut self.entropy)?;
        let server_hello = write_frame(
            &mut self.stream,
            FrameKind::ServerHello,
            &local.hello().encode(),
        )?;

        let shared = local.agree(&peer)?;
        let hello_hash = transcript_hash(&[client_hello.as_slice(), server_hello.as_slice()]);
        let schedule = KeySchedule::derive(&shared, self.psk(), &hello_hash)?;

        let verify = finished_verify(&schedule.server.finished, &hello_hash)?;
        let server_finished = write_frame(
            &mut self.stream,
            FrameKind::Finished,
            &Finished { verify }.encode(),
        )?;
        self.stream.flush()?;

        let client_finished = read_handshake_frame(&mut self.stream, FrameKind::Finished)?;
        let full_hash = transcript_hash(&[
            client_hello.as_slice(),
            server_hello.as_slice(),
            server_finished.as_slice(),
        ]);
        let expected = finished_verify(&schedule.client.finished, &full_hash)?;
        verify_finished(&expected, &Finished::decode(client_finished.body())?)?;

        Ok(self.establish(&schedule))
    }

    fn psk(&self) -> Option<&[u8; 32]> {
        self.config.psk()
    }

    fn establish(&self, schedule: &KeySchedule) -> Established {
        Established {
            records: RecordLayer::new(self.role, schedule, self.config.max_record()),
            exporter: schedule.exporter.clone(),
        }
    }

    fn poison(&mut self, err: EngineError) -> EngineError {
        if err.is_protocol_violation() {
            self.phase = Phase::Failed;
        }
        err
    }

    /// Reads records until one carries application data or the peer closes.
    fn fill_pending(&mut self) -> EngineResult<()> {
        let max_body = self.established()?.records.max_plaintext() + TAG_LEN;
        while self.pending_pos >= self.pending.len() && !self.peer_closed {
            let Some(frame) = read_frame(&mut self.stream, max_body)? else {
                trace_engine!(role = %self.role, "stream ended without close notify");
                self.peer_closed = true;
                break;
            };

            let kind = frame.kind();
            let plaintext = self
                .established_mut()?
                .records
                .open(frame.header(), frame.body())?;
            if kind == FrameKind::Close.as_u8() {
                trace_engine!(role = %self.role, "peer sent close notify");
                self.peer_closed = true;
            } else if kind == FrameKind::Data.as_u8() {
                self.pending = plaintext;
                self.pending_pos = 0;
            } else {
                return Err(EngineError::UnexpectedMessage {
                    expected: FrameKind::Data.name(),
                    found: kind,
                });
            }
        }
        Ok(())
    }
}

impl<S: Read + Write, E: Read> HandshakeEngine for SealedEngine<S, E> {
    type Stream = S;
    type Entropy = E;

    fn role(&self) -> Role {
        self.role
    }

    fn handshake(&mut self) -> EngineResult<()> {
        match self.phase {
            Phase::Established(_) => return Ok(()),
            Phase::Failed => return Err(EngineError::Poisoned),
            Phase::Idle => {}
        }

        trace_engine!(role = %self.role, "handshake started");
        let outcome = match self.role {
            Role::Client => self.run_client(),
            Role::Server => self.run_server(),
        };
        match outcome {
            Ok(established) => {
                self.phase = Phase::Established(Box::new(established));
                trace_engine!(role = %self.role, "handshake complete");
                Ok(())
            }
            Err(err) => {
                trace_engine!(role = %self.role, error = %err, "handshake failed");
                self.phase = Phase::Failed;
                Err(err)
            }
        }
    }

    fn is_established(&self) -> bool {
        matches!(self.phase, Phase::Established(_))
    }

    fn stream(&self) -> &S {
        &self.stream
    }

    fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    fn entropy(&self) -> &E {
        &self.entropy
    }

    fn entropy_mut(&mut self) -> &mut E {
        &mut self.entropy
    }

    fn close(&mut self) -> EngineResult<()> {
        if self.closed {
            return Ok(());
        }
        let frame = self.established_mut()?.records.seal(FrameKind::Close, &[])?;
        self.stream.write_all(&frame)?;
        self.stream.flush()?;
        self.closed = true;
        trace_engine!(role = %self.role, "close notify sent");
        Ok(())
    }
}

impl<S: Read + Write, E: Read> SequenceAccess for SealedEngine<S, E> {
    fn sequence_counters(&self) -> EngineResult<SequenceCounters> {
        Ok(self.established()?.records.counters())
    }

    fn set_sequence_counters(&mut self, counters: SequenceCounters) -> EngineResult<()> {
        self.established_mut()?.records.set_counters(counters);
        trace_engine!(
            role = %self.role,
            inbound = counters.inbound_u64(),
            outbound = counters.outbound_u64(),
            "sequence counters replaced"
        );
        Ok(())
    }
}

impl<S: Read + Write, E: Read> Read for SealedEngine<S, E> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Err(err) = self.fill_pending() {
            return Err(self.poison(err).into());
        }

        let available = &self.pending[self.pending_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pending_pos += n;
        Ok(n)
    }
}

impl<S: Read + Write, E: Read> Write for SealedEngine<S, E> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(EngineError::Closed.into());
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let established = self.established_mut()?;
        let n = buf.len().min(established.records.max_plaintext());
        let frame = established.records.seal(FrameKind::Data, &buf[..n])?;
        self.stream.write_all(&frame)?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl<S, E> std::fmt::Debug for SealedEngine<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self.phase {
            Phase::Idle => "idle",
            Phase::Established(_) => "established",
            Phase::Failed => "failed",
        };
        f.debug_struct("SealedEngine")
            .field("role", &self.role)
            .field("phase", &phase)
            .field("config", &self.config)
            .field("peer_closed", &self.peer_closed)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
