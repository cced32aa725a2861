use std::io::{self, Cursor, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Duration;

use super::*;
use crate::contract::{HandshakeEngine, SequenceAccess};
use crate::counters::SequenceCounters;

type TestEngine = SealedEngine<UnixStream, Cursor<Vec<u8>>>;

fn entropy(seed: u8) -> Cursor<Vec<u8>> {
    Cursor::new((0u8..64).map(|i| seed.wrapping_add(i)).collect())
}

fn socket_pair() -> (UnixStream, UnixStream) {
    let (a, b) = UnixStream::pair().expect("socket pair");
    for sock in [&a, &b] {
        sock.set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout");
    }
    (a, b)
}

/// Records everything written through it.
struct Recorder<S> {
    inner: S,
    written: Vec<u8>,
}

impl<S: Read> Read for Recorder<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<S: Write> Write for Recorder<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn run_pair<C, S>(client: &mut C, server: &mut S) -> (EngineResult<()>, EngineResult<()>)
where
    C: HandshakeEngine<Stream = UnixStream>,
    S: HandshakeEngine + Send,
{
    thread::scope(|scope| {
        let server_side = scope.spawn(|| server.handshake());
        let client_result = client.handshake();
        if client_result.is_err() {
            let _ = client.stream().shutdown(Shutdown::Both);
        }
        let server_result = server_side.join().expect("server thread");
        (client_result, server_result)
    })
}

fn established(client: &SealedConfig, server: &SealedConfig) -> (TestEngine, TestEngine) {
    let (a, b) = socket_pair();
    let mut client = client.build(Role::Client, a, entropy(1)).expect("build");
    let mut server = server.build(Role::Server, b, entropy(101)).expect("build");
    let (c, s) = run_pair(&mut client, &mut server);
    c.expect("client handshake");
    s.expect("server handshake");
    (client, server)
}

#[test]
fn handshake_establishes_both_ends() {
    let config = SealedConfig::new();
    let (client, server) = established(&config, &config);

    assert!(client.is_established());
    assert!(server.is_established());
    assert_eq!(client.sequence_counters().expect("counters"), SequenceCounters::ZERO);
    assert_eq!(server.sequence_counters().expect("counters"), SequenceCounters::ZERO);
}

#[test]
fn application_data_advances_counters() {
    let config = SealedConfig::new();
    let (mut client, mut server) = established(&config, &config);

    client.write_all(b"hello").expect("write");
    let mut buf = [0u8; 5];
    server.read_exact(&mut buf).expect("read");
    assert_eq!(&buf, b"hello");

    server.write_all(b"ok").expect("reply");
    let mut reply = [0u8; 2];
    client.read_exact(&mut reply).expect("read reply");

    assert_eq!(
        client.sequence_counters().expect("counters"),
        SequenceCounters::from_u64(1, 1)
    );
    assert_eq!(
        server.sequence_counters().expect("counters"),
        SequenceCounters::from_u64(1, 1)
    );
}

#[test]
fn writes_are_split_at_the_record_limit() {
    let config = SealedConfig::new().with_max_record(4);
    let (mut client, mut server) = established(&config, &config);

    client.write_all(b"0123456789").expect("write");
    let mut buf = [0u8; 10];
    server.read_exact(&mut buf).expect("read");

    assert_eq!(&buf, b"0123456789");
    assert_eq!(client.sequence_counters().expect("counters").outbound_u64(), 3);
    assert_eq!(server.sequence_counters().expect("counters").inbound_u64(), 3);
}

#[test]
fn exported_keying_material_matches_across_the_connection() {
    let config = SealedConfig::new();
    let (client, server) = established(&config, &config);

    let mut ours = [0u8; 48];
    let mut theirs = [0u8; 48];
    client.export_keying_material(b"label", &mut ours).expect("export");
    server.export_keying_material(b"label", &mut theirs).expect("export");
    assert_eq!(ours, theirs);

    let mut other = [0u8; 48];
    client.export_keying_material(b"other", &mut other).expect("export");
    assert_ne!(ours, other);
}

#[test]
fn mismatched_psk_fails_verification() {
    let (a, b) = socket_pair();
    let mut client = SealedConfig::new()
        .with_psk([1; 32])
        .build(Role::Client, a, entropy(1))
        .expect("build");
    let mut server = SealedConfig::new()
        .with_psk([2; 32])
        .build(Role::Server, b, entropy(101))
        .expect("build");

    let (c, s) = run_pair(&mut client, &mut server);
    assert!(matches!(c, Err(EngineError::VerificationFailed)));
    assert!(s.expect_err("server sees the client hang up").is_io());
    assert!(matches!(client.handshake(), Err(EngineError::Poisoned)));
}

#[test]
fn handshake_output_is_a_function_of_entropy_and_input() {
    let config = SealedConfig::new();
    let mut runs = Vec::new();
    for _ in 0..2 {
        let (a, b) = socket_pair();
        let recorder = Recorder {
            inner: a,
            written: Vec::new(),
        };
        let mut client = config
            .build(Role::Client, recorder, entropy(9))
            .expect("build");
        let mut server = config.build(Role::Server, b, entropy(77)).expect("build");

        thread::scope(|scope| {
            let server_side = scope.spawn(|| server.handshake());
            client.handshake().expect("client handshake");
            server_side
                .join()
                .expect("server thread")
                .expect("server handshake");
        });
        let (recorder, _) = client.into_parts();
        runs.push(recorder.written);
    }

    assert_eq!(runs[0], runs[1]);
    assert!(!runs[0].is_empty());
}

#[test]
fn short_entropy_fails_before_any_bytes_are_sent() {
    let (a, _b) = socket_pair();
    let recorder = Recorder {
        inner: a,
        written: Vec::new(),
    };
    let mut client = SealedConfig::new()
        .build(Role::Client, recorder, Cursor::new(vec![0u8; 10]))
        .expect("build");

    let err = client.handshake().expect_err("entropy too short");
    assert!(err.is_io());
    assert!(client.stream().written.is_empty());
    assert!(matches!(client.handshake(), Err(EngineError::Poisoned)));
}

#[test]
fn counters_need_an_established_engine() {
    let (a, _b) = socket_pair();
    let mut engine = SealedConfig::new()
        .build(Role::Server, a, entropy(0))
        .expect("build");

    assert!(matches!(
        engine.sequence_counters(),
        Err(EngineError::NotEstablished)
    ));
    assert!(matches!(
        engine.set_sequence_counters(SequenceCounters::ZERO),
        Err(EngineError::NotEstablished)
    ));
    let err = engine.write(b"early").expect_err("not connected");
    assert_eq!(err.kind(), io::ErrorKind::NotConnected);
}

#[test]
fn desynchronised_counters_poison_the_reader() {
    let config = SealedConfig::new();
    let (mut client, mut server) = established(&config, &config);
    server
        .set_sequence_counters(SequenceCounters::from_u64(5, 0))
        .expect("set counters");

    client.write_all(b"lost").expect("write");
    let mut buf = [0u8; 4];
    let err = server.read(&mut buf).expect_err("authentication fails");
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);

    let err = server.read(&mut buf).expect_err("engine poisoned");
    assert_eq!(err.kind(), io::ErrorKind::NotConnected);
}

#[test]
fn close_notify_ends_the_peer_stream() {
    let config = SealedConfig::new();
    let (mut client, mut server) = established(&config, &config);

    client.write_all(b"last").expect("write");
    client.close().expect("close");

    let mut received = Vec::new();
    server.read_to_end(&mut received).expect("read to end");
    assert_eq!(received, b"last");
    assert!(server.peer_closed());

    let err = client.write(b"more").expect_err("closed");
    assert_eq!(err.kind(), io::ErrorKind::NotConnected);
}

#[test]
fn record_limit_is_validated_at_build() {
    let (a, _b) = socket_pair();
    let err = SealedConfig::new()
        .with_max_record(MAX_RECORD_LIMIT + 1)
        .build(Role::Client, a, entropy(0))
        .expect_err("limit too large");
    assert!(matches!(err, EngineError::InvalidConfig(_)));
}

#[test]
fn debug_output_redacts_the_psk() {
    let config = SealedConfig::new().with_psk([0x41; 32]);
    let rendered = format!("{config:?}");
    assert!(rendered.contains("<redacted>"));
    assert!(!rendered.contains("65"));
}
