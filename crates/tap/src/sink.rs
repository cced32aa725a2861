use std::io::{self, IoSlice, Write};

/// Write destination that drops every byte.
///
/// Unlike [`std::io::Sink`] it counts what it swallowed so a replayed
/// handshake can report how much it would have transmitted.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DiscardingSink {
    bytes: u64,
    writes: u64,
}

impl DiscardingSink {
    /// Creates a sink with zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: 0, writes: 0 }
    }

    /// Total bytes discarded.
    #[must_use]
    pub const fn discarded_bytes(&self) -> u64 {
        self.bytes
    }

    /// Number of write calls observed.
    #[must_use]
    pub const fn writes(&self) -> u64 {
        self.writes
    }
}

impl Write for DiscardingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes += buf.len() as u64;
        self.writes += 1;
        Ok(buf.len())
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        let total: usize = bufs.iter().map(|slice| slice.len()).sum();
        self.bytes += total as u64;
        self.writes += 1;
        Ok(total)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
