//! End-to-end capture and resume over real sockets and in-memory transports.

#![cfg(unix)]

use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::time::Duration;

use handoff::handshake::sealed::{ENTROPY_PER_HANDSHAKE, SealedEngine};
use handoff::handshake::{HandshakeEngine, SequenceAccess};
use handoff::{
    FallbackPolicy, ResumeError, Role, SealedConfig, SequenceCounters, Session, SessionBuilder,
    State,
};
use test_support::{
    CountingEntropy, ForbiddenEntropy, MemoryTransport, connect_sealed, init_test_logging,
};

fn exporter<S: Read + Write, E: Read>(engine: &SealedEngine<S, E>) -> [u8; 32] {
    let mut out = [0u8; 32];
    engine
        .export_keying_material(b"integration", &mut out)
        .expect("export");
    out
}

fn resume_in_memory(
    config: &SealedConfig,
    state: State,
) -> Session<SealedConfig, MemoryTransport, ForbiddenEntropy> {
    let mut resumed = SessionBuilder::resume(state)
        .fallback_policy(FallbackPolicy::Deny)
        .entropy(ForbiddenEntropy)
        .connect(config, MemoryTransport::empty())
        .expect("resume session");
    resumed.handshake().expect("replayed handshake");
    resumed
}

#[test]
fn server_side_resume_keeps_talking_to_the_client() {
    init_test_logging();
    let config = SealedConfig::new();
    let mut pair = connect_sealed(&config, CountingEntropy::new(3));

    pair.client.write_all(b"ping").expect("write");
    let mut buf = [0u8; 4];
    pair.server.read_exact(&mut buf).expect("read");
    let snapshot = pair.server.state();
    assert_eq!(snapshot.counters(), SequenceCounters::from_u64(1, 0));

    let mut resumed = Session::resume(&config, pair.server_spare, snapshot).expect("resume");
    pair.client.write_all(b"pong").expect("write after migration");
    resumed.read_exact(&mut buf).expect("resumed read");
    assert_eq!(&buf, b"pong");

    resumed.write_all(b"ack").expect("resumed write");
    let mut ack = [0u8; 3];
    pair.client.read_exact(&mut ack).expect("read ack");
    assert_eq!(&ack, b"ack");

    assert_eq!(exporter(pair.server.engine()), exporter(resumed.engine()));
}

#[test]
fn exact_snapshot_never_touches_live_sources() {
    let config = SealedConfig::new();
    let pair = connect_sealed(&config, CountingEntropy::new(40));
    assert_eq!(
        pair.client.engine().entropy().get_ref().drawn(),
        ENTROPY_PER_HANDSHAKE
    );
    let snapshot = pair.client.state();

    let resumed = resume_in_memory(&config, snapshot.clone());

    let transport = resumed.transport();
    assert_eq!(transport.reads(), 0);
    assert_eq!(transport.writes(), 0);
    assert!(transport.written().is_empty());

    let diagnostics = resumed.replay_diagnostics().expect("diagnostics");
    assert_eq!(diagnostics.transcript.consumed, snapshot.transcript().len());
    assert_eq!(diagnostics.entropy.consumed, snapshot.entropy().len());
    assert_eq!(diagnostics.transcript.fallback_reads, 0);
    assert_eq!(diagnostics.entropy.fallback_reads, 0);
    assert!(diagnostics.is_exact());

    assert_eq!(resumed.state(), snapshot);
    assert_eq!(exporter(pair.client.engine()), exporter(resumed.engine()));
}

#[test]
fn resumes_from_one_state_are_independent() {
    let config = SealedConfig::new();
    let mut pair = connect_sealed(&config, CountingEntropy::new(0));
    pair.client.write_all(b"x").expect("write");
    let mut buf = [0u8; 1];
    pair.server.read_exact(&mut buf).expect("read");
    let snapshot = pair.client.state();

    let mut first = resume_in_memory(&config, snapshot.clone());
    let mut second = resume_in_memory(&config, snapshot.clone());

    first.write_all(b"same bytes").expect("write");
    second.write_all(b"same bytes").expect("write");
    assert_eq!(first.transport().written(), second.transport().written());

    first
        .engine_mut()
        .set_sequence_counters(SequenceCounters::from_u64(100, 200))
        .expect("override");
    assert_eq!(
        first.state().counters(),
        SequenceCounters::from_u64(100, 200)
    );
    assert_eq!(second.state().counters(), SequenceCounters::from_u64(0, 2));
    assert_eq!(snapshot.counters(), SequenceCounters::from_u64(0, 1));
}

#[test]
fn truncated_entropy_is_refused() {
    let config = SealedConfig::new();
    let pair = connect_sealed(&config, CountingEntropy::new(9));
    let snapshot = pair.client.state();
    let short = State::new(
        snapshot.role(),
        snapshot.engine_id(),
        snapshot.transcript().to_vec(),
        snapshot.entropy()[..ENTROPY_PER_HANDSHAKE - 1].to_vec(),
        snapshot.counters(),
    );

    let mut resumed = SessionBuilder::resume(short)
        .fallback_policy(FallbackPolicy::Deny)
        .entropy(ForbiddenEntropy)
        .connect(&config, MemoryTransport::empty())
        .expect("resume session");
    let err = resumed.handshake().expect_err("entropy prefix too short");

    let diagnostics = err.diagnostics().expect("mismatch diagnostics");
    assert_eq!(diagnostics.entropy.refusals, 1);
    assert_eq!(diagnostics.transcript.consumed, 0);
    assert_eq!(resumed.transport().reads(), 0);
}

#[test]
fn warn_policy_reports_live_fallback_as_a_mismatch() {
    let config = SealedConfig::new();
    let pair = connect_sealed(&config, CountingEntropy::new(1));
    let snapshot = pair.client.state();
    let cut = snapshot.transcript().len() - 10;
    let short = State::new(
        snapshot.role(),
        snapshot.engine_id(),
        snapshot.transcript()[..cut].to_vec(),
        snapshot.entropy().to_vec(),
        snapshot.counters(),
    );

    let attempt = |state: State| {
        let mut resumed = SessionBuilder::resume(state)
            .fallback_policy(FallbackPolicy::Warn)
            .entropy(ForbiddenEntropy)
            .connect(&config, MemoryTransport::empty())
            .expect("resume session");
        let err = resumed.handshake().expect_err("live transport is empty");
        (err.to_string(), err.diagnostics().copied(), resumed.transport().reads())
    };

    let (message, diagnostics, reads) = attempt(short.clone());
    let diagnostics = diagnostics.expect("mismatch diagnostics");
    assert!(diagnostics.transcript.fallback_reads > 0);
    assert_eq!(diagnostics.transcript.fallback_bytes, 0);
    assert!(reads > 0);

    assert_eq!(attempt(short), (message, Some(diagnostics), reads));
}

#[test]
fn lazy_read_resumes_before_delivering_data() {
    let config = SealedConfig::new();
    let mut pair = connect_sealed(&config, CountingEntropy::new(5));
    let snapshot = pair.client.state();

    let mut resumed = Session::resume(&config, pair.client_spare, snapshot).expect("resume");
    assert!(!resumed.is_established());

    pair.server.write_all(b"lazy").expect("server write");
    let mut buf = [0u8; 4];
    resumed.read_exact(&mut buf).expect("read triggers the replayed handshake");
    assert_eq!(&buf, b"lazy");
    assert!(resumed.is_established());
}

#[test]
fn failed_resume_cannot_be_retried() {
    let config = SealedConfig::new();
    let pair = connect_sealed(&config, CountingEntropy::new(8));
    let snapshot = pair.client.state();
    let mut transcript = snapshot.transcript().to_vec();
    transcript[10] ^= 0xff;
    let corrupted = State::new(
        snapshot.role(),
        snapshot.engine_id(),
        transcript,
        snapshot.entropy().to_vec(),
        snapshot.counters(),
    );

    let mut resumed = SessionBuilder::resume(corrupted)
        .entropy(ForbiddenEntropy)
        .connect(&config, MemoryTransport::empty())
        .expect("resume session");
    let err = resumed.handshake().expect_err("corrupted server random");
    assert!(matches!(err, ResumeError::TranscriptMismatch { .. }));
    assert!(matches!(resumed.handshake(), Err(ResumeError::Unusable)));
    assert!(resumed.state().is_empty());
}

#[test]
fn deadlines_and_shutdown_reach_the_transport_before_the_handshake() {
    let session = SessionBuilder::new(Role::Client)
        .entropy(ForbiddenEntropy)
        .connect(&SealedConfig::new(), MemoryTransport::empty())
        .expect("client session");

    session
        .set_read_timeout(Some(Duration::from_millis(7)))
        .expect("read deadline");
    session
        .set_write_timeout(Some(Duration::from_millis(9)))
        .expect("write deadline");
    assert_eq!(session.transport().read_timeout(), Some(Duration::from_millis(7)));
    assert_eq!(session.transport().write_timeout(), Some(Duration::from_millis(9)));

    session.shutdown(Shutdown::Write).expect("shutdown");
    assert!(session.transport().is_write_closed());
    assert_eq!(session.transport().reads(), 0);
    assert_eq!(session.transport().writes(), 0);
    assert!(!session.is_established());
}

#[test]
fn deadlines_reach_the_transport_after_a_resume() {
    let config = SealedConfig::new();
    let pair = connect_sealed(&config, CountingEntropy::new(12));
    let resumed = resume_in_memory(&config, pair.client.state());

    resumed
        .set_read_timeout(Some(Duration::from_secs(3)))
        .expect("read deadline");
    resumed.set_write_timeout(None).expect("write deadline");
    assert_eq!(resumed.transport().read_timeout(), Some(Duration::from_secs(3)));
    assert_eq!(resumed.transport().write_timeout(), None);
}

#[test]
fn close_before_the_handshake_only_shuts_the_transport() {
    let mut session = SessionBuilder::new(Role::Client)
        .entropy(ForbiddenEntropy)
        .connect(&SealedConfig::new(), MemoryTransport::empty())
        .expect("client session");

    session.close().expect("close");
    assert!(session.transport().is_write_closed());
    assert_eq!(session.transport().writes(), 0);
    assert!(session.transport().written().is_empty());
}

#[test]
fn close_after_a_resume_notifies_the_peer() {
    let config = SealedConfig::new();
    let mut pair = connect_sealed(&config, CountingEntropy::new(21));
    let mut resumed = resume_in_memory(&config, pair.client.state());

    resumed.close().expect("close");
    assert!(resumed.transport().is_write_closed());
    let notification = resumed.transport().written().to_vec();
    assert!(!notification.is_empty());

    let err = resumed.write(b"late").expect_err("closed");
    assert_eq!(err.kind(), io::ErrorKind::NotConnected);

    pair.client_spare
        .write_all(&notification)
        .expect("deliver close notification");
    let mut received = Vec::new();
    pair.server
        .read_to_end(&mut received)
        .expect("peer reads to the close notification");
    assert!(received.is_empty());
    assert!(pair.server.engine().peer_closed());
}
