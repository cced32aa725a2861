use std::io::{self, Read};

/// Live randomness source backed by the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsEntropy;

impl Read for OsEntropy {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        getrandom::fill(buf).map_err(|err| io::Error::other(err.to_string()))?;
        Ok(buf.len())
    }
}
