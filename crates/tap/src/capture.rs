use zeroize::Zeroizing;

/// Bytes recorded by a duplicating tap.
///
/// The storage is zeroized on drop since a recorded entropy stream contains
/// private key material.
#[derive(Clone, Debug, Default)]
pub struct CaptureBuffer {
    bytes: Zeroizing<Vec<u8>>,
}

impl CaptureBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes observed by the tap.
    pub fn record(&mut self, observed: &[u8]) {
        self.bytes.extend_from_slice(observed);
    }

    /// Returns the recorded bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of recorded bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Reports whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Releases the recording.
    #[must_use]
    pub fn into_bytes(self) -> Zeroizing<Vec<u8>> {
        self.bytes
    }
}
