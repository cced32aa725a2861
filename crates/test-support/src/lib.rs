//! Shared helpers for handoff tests: in-memory transports with I/O counters,
//! deterministic and forbidden entropy sources, and socket plumbing.

use std::cell::Cell;
use std::io::{self, Cursor, Read, Write};
use std::net::Shutdown;
use std::thread;
use std::time::Duration;

use handshake::OsEntropy;
use handshake::sealed::SealedConfig;
use logging::LogConfig;
use session::{Session, SessionBuilder, Transport};

/// Transport backed by memory that counts every call made on it.
///
/// Reads are served from a fixed inbound buffer and end with EOF. Writes are
/// collected. Deadlines are recorded but have no effect.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    inbound: Cursor<Vec<u8>>,
    outbound: Vec<u8>,
    reads: usize,
    bytes_read: usize,
    writes: usize,
    flushes: usize,
    read_timeout: Cell<Option<Duration>>,
    write_timeout: Cell<Option<Duration>>,
    read_closed: Cell<bool>,
    write_closed: Cell<bool>,
}

impl MemoryTransport {
    /// Transport whose reads return `inbound` and then EOF.
    pub fn new(inbound: impl Into<Vec<u8>>) -> Self {
        Self {
            inbound: Cursor::new(inbound.into()),
            ..Self::default()
        }
    }

    /// Transport with nothing to read.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of `read` calls that reached the transport.
    pub const fn reads(&self) -> usize {
        self.reads
    }

    /// Bytes handed out by `read`.
    pub const fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Number of `write` calls that reached the transport.
    pub const fn writes(&self) -> usize {
        self.writes
    }

    /// Number of `flush` calls that reached the transport.
    pub const fn flushes(&self) -> usize {
        self.flushes
    }

    /// Everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.outbound
    }

    /// Last read deadline set through [`Transport`].
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout.get()
    }

    /// Last write deadline set through [`Transport`].
    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout.get()
    }

    /// Reports whether the write half was shut down.
    pub fn is_write_closed(&self) -> bool {
        self.write_closed.get()
    }
}

impl Read for MemoryTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        if self.read_closed.get() {
            return Ok(0);
        }
        let n = self.inbound.read(buf)?;
        self.bytes_read += n;
        Ok(n)
    }
}

impl Write for MemoryTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes += 1;
        if self.write_closed.get() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "memory transport write half closed",
            ));
        }
        self.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

impl Transport for MemoryTransport {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.read_timeout.set(timeout);
        Ok(())
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.write_timeout.set(timeout);
        Ok(())
    }

    fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        if matches!(how, Shutdown::Read | Shutdown::Both) {
            self.read_closed.set(true);
        }
        if matches!(how, Shutdown::Write | Shutdown::Both) {
            self.write_closed.set(true);
        }
        Ok(())
    }
}

/// Deterministic randomness: byte `i` is `seed + i`, wrapping.
#[derive(Clone, Debug)]
pub struct CountingEntropy {
    next: u8,
    drawn: usize,
}

impl CountingEntropy {
    /// Source starting at `seed`.
    pub const fn new(seed: u8) -> Self {
        Self {
            next: seed,
            drawn: 0,
        }
    }

    /// Bytes handed out so far.
    pub const fn drawn(&self) -> usize {
        self.drawn
    }
}

impl Read for CountingEntropy {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        for byte in buf.iter_mut() {
            *byte = self.next;
            self.next = self.next.wrapping_add(1);
        }
        self.drawn += buf.len();
        Ok(buf.len())
    }
}

/// Randomness source that must never be read.
///
/// Resumes from a complete snapshot replay every entropy byte, so drawing
/// from this source means the snapshot did not cover the handshake.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForbiddenEntropy;

impl Read for ForbiddenEntropy {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        panic!("live entropy drawn for {} bytes", buf.len());
    }
}

/// Connected Unix socket pair with a read deadline so a stuck handshake fails
/// the test instead of hanging it.
#[cfg(unix)]
pub fn socket_pair() -> (std::os::unix::net::UnixStream, std::os::unix::net::UnixStream) {
    let (a, b) = std::os::unix::net::UnixStream::pair().expect("socket pair");
    for sock in [&a, &b] {
        sock.set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout");
    }
    (a, b)
}

/// Sealed-engine session over one end of a Unix socket pair.
#[cfg(unix)]
pub type SocketSession<E = OsEntropy> = Session<SealedConfig, std::os::unix::net::UnixStream, E>;

/// A client and server that completed a captured handshake, plus spare handles
/// on both sockets to resume onto.
#[cfg(unix)]
pub struct Connected<E: Read = OsEntropy> {
    /// Capturing client session.
    pub client: SocketSession<E>,
    /// Capturing server session.
    pub server: SocketSession,
    /// Second handle on the client's socket.
    pub client_spare: std::os::unix::net::UnixStream,
    /// Second handle on the server's socket.
    pub server_spare: std::os::unix::net::UnixStream,
}

/// Connects a client drawing from `client_entropy` to an OS-seeded server and
/// runs both handshakes.
#[cfg(unix)]
pub fn connect_sealed<E: Read + Send>(config: &SealedConfig, client_entropy: E) -> Connected<E> {
    let (a, b) = socket_pair();
    let client_spare = a.try_clone().expect("clone client socket");
    let server_spare = b.try_clone().expect("clone server socket");

    let mut client = SessionBuilder::new(handshake::Role::Client)
        .entropy(client_entropy)
        .connect(config, a)
        .expect("client session");
    let mut server = Session::server(config, b).expect("server session");

    let (c, s) = run_concurrently(|| client.handshake(), || server.handshake());
    c.expect("client handshake");
    s.expect("server handshake");

    Connected {
        client,
        server,
        client_spare,
        server_spare,
    }
}

/// Runs `local` on this thread and `remote` on a scoped thread, returning both results.
pub fn run_concurrently<A, B, RA, RB>(local: A, remote: B) -> (RA, RB)
where
    A: FnOnce() -> RA,
    B: FnOnce() -> RB + Send,
    RB: Send,
{
    thread::scope(|scope| {
        let remote = scope.spawn(remote);
        let local = local();
        (local, remote.join().expect("remote side panicked"))
    })
}

/// Installs a debug-level subscriber for all handoff targets, once per process.
pub fn init_test_logging() {
    let _ = logging::init_tracing(&LogConfig::default().with_filter("handoff=debug"));
}
