use std::io::{self, IoSlice, Read, Write};

use crate::policy::FallbackPolicy;
use crate::reader::{TapOutcome, TappedReader};
use crate::sink::DiscardingSink;

/// Bidirectional transport with a tapped read side and an optional discarding write side.
///
/// During capture, writes reach the transport unchanged. During replay, writes
/// land in a [`DiscardingSink`] so handshake messages are never re-sent onto a
/// live connection.
#[derive(Debug)]
pub struct TappedStream<T> {
    reader: TappedReader<T>,
    sink: Option<DiscardingSink>,
}

/// Report produced when a [`TappedStream`] is detached.
#[derive(Clone, Debug)]
pub struct StreamTapReport {
    /// What the read-side tap observed.
    pub read: TapOutcome,
    /// Bytes the discarding sink swallowed, if one was installed.
    pub discarded: Option<u64>,
}

impl<T> TappedStream<T> {
    /// Wraps `inner` without intercepting anything.
    pub const fn passthrough(inner: T) -> Self {
        Self {
            reader: TappedReader::passthrough(inner),
            sink: None,
        }
    }

    /// Records reads, forwards writes.
    pub fn capturing(inner: T) -> Self {
        Self {
            reader: TappedReader::duplicating(inner).with_label("transcript"),
            sink: None,
        }
    }

    /// Replays `transcript` on the read side and discards writes.
    pub fn replaying(inner: T, transcript: Vec<u8>, policy: FallbackPolicy) -> Self {
        Self {
            reader: TappedReader::replaying(inner, transcript, policy).with_label("transcript"),
            sink: Some(DiscardingSink::new()),
        }
    }

    /// Returns the read-side tap.
    pub const fn reader(&self) -> &TappedReader<T> {
        &self.reader
    }

    /// Returns the discarding sink, if writes are currently discarded.
    pub const fn sink(&self) -> Option<&DiscardingSink> {
        self.sink.as_ref()
    }

    /// Reports whether either side is still intercepted.
    pub const fn is_attached(&self) -> bool {
        self.reader.is_attached() || self.sink.is_some()
    }

    /// Turns both sides into pass-throughs and reports what they observed.
    pub fn detach(&mut self) -> StreamTapReport {
        StreamTapReport {
            read: self.reader.detach(),
            discarded: self.sink.take().map(|sink| sink.discarded_bytes()),
        }
    }

    /// Detaches both sides and drops whatever they held.
    pub fn discard(&mut self) {
        self.reader.discard();
        self.sink = None;
    }

    /// Returns a shared reference to the transport.
    pub const fn get_ref(&self) -> &T {
        self.reader.get_ref()
    }

    /// Returns a mutable reference to the transport.
    ///
    /// I/O through this reference bypasses both taps.
    pub const fn get_mut(&mut self) -> &mut T {
        self.reader.get_mut()
    }

    /// Releases the transport.
    pub fn into_inner(self) -> T {
        self.reader.into_inner()
    }
}

impl<T: Read> Read for TappedStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl<T: Write> Write for TappedStream<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.sink {
            Some(sink) => sink.write(buf),
            None => self.reader.get_mut().write(buf),
        }
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        match &mut self.sink {
            Some(sink) => sink.write_vectored(bufs),
            None => self.reader.get_mut().write_vectored(bufs),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Some(sink) => sink.flush(),
            None => self.reader.get_mut().flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[derive(Debug, Default)]
    struct MemoryTransport {
        reader: Cursor<Vec<u8>>,
        written: Vec<u8>,
        flushes: usize,
    }

    impl MemoryTransport {
        fn new(input: &[u8]) -> Self {
            Self {
                reader: Cursor::new(input.to_vec()),
                ..Self::default()
            }
        }
    }

    impl Read for MemoryTransport {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reader.read(buf)
        }
    }

    impl Write for MemoryTransport {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn capturing_forwards_writes() {
        let mut stream = TappedStream::capturing(MemoryTransport::new(b"server hello"));
        stream.write_all(b"client hello").expect("write");
        stream.flush().expect("flush");

        let mut reply = [0u8; 12];
        stream.read_exact(&mut reply).expect("read");

        let report = stream.detach();
        assert_eq!(report.discarded, None);
        assert_eq!(
            &report.read.into_captured().expect("captured")[..],
            b"server hello"
        );
        assert_eq!(stream.get_ref().written, b"client hello");
        assert_eq!(stream.get_ref().flushes, 1);
    }

    #[test]
    fn replaying_discards_writes_until_detached() {
        let mut stream = TappedStream::replaying(
            MemoryTransport::new(b""),
            b"server hello".to_vec(),
            FallbackPolicy::Deny,
        );
        stream.write_all(b"client hello").expect("write discarded");
        stream.flush().expect("flush discarded");
        assert_eq!(stream.sink().map(DiscardingSink::discarded_bytes), Some(12));

        let mut reply = [0u8; 12];
        stream.read_exact(&mut reply).expect("replayed read");
        assert_eq!(&reply, b"server hello");

        let report = stream.detach();
        assert_eq!(report.discarded, Some(12));
        assert!(!stream.is_attached());

        stream.write_all(b"app").expect("live write");
        assert_eq!(stream.get_ref().written, b"app");
        assert_eq!(stream.get_ref().flushes, 0);
    }
}
