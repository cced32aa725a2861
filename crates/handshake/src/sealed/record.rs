use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use zeroize::Zeroizing;

use super::frame::{FrameKind, encode_header};
use super::schedule::{DirectionKeys, KeySchedule};
use crate::counters::SequenceCounters;
use crate::error::{EngineError, EngineResult};
use crate::role::Role;

/// Authentication tag appended to every sealed record.
pub(crate) const TAG_LEN: usize = 16;

/// Key, IV and sequence counter for one direction.
///
/// The counter is stored in the 8-byte big-endian form used to build nonces,
/// which is also the form exposed through [`SequenceCounters`].
struct RecordDirection {
    key: Zeroizing<[u8; 32]>,
    iv: [u8; 12],
    seq: [u8; 8],
}

impl RecordDirection {
    fn new(keys: &DirectionKeys) -> Self {
        Self {
            key: keys.key.clone(),
            iv: keys.iv,
            seq: [0; 8],
        }
    }

    fn nonce(&self) -> [u8; 12] {
        let mut nonce = self.iv;
        for (byte, seq) in nonce[4..].iter_mut().zip(self.seq) {
            *byte ^= seq;
        }
        nonce
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(self.key.as_slice()))
    }

    /// Returns the successor counter without applying it, so an exhausted
    /// counter is detected before its nonce is used.
    fn next_seq(&self) -> EngineResult<[u8; 8]> {
        u64::from_be_bytes(self.seq)
            .checked_add(1)
            .map(u64::to_be_bytes)
            .ok_or(EngineError::SequenceExhausted)
    }
}

/// Record protection for an established session.
pub(crate) struct RecordLayer {
    read: RecordDirection,
    write: RecordDirection,
    max_plaintext: usize,
}

impl RecordLayer {
    pub(crate) fn new(role: Role, schedule: &KeySchedule, max_plaintext: usize) -> Self {
        let (write, read) = match role {
            Role::Client => (&schedule.client, &schedule.server),
            Role::Server => (&schedule.server, &schedule.client),
        };
        Self {
            read: RecordDirection::new(read),
            write: RecordDirection::new(write),
            max_plaintext,
        }
    }

    pub(crate) const fn max_plaintext(&self) -> usize {
        self.max_plaintext
    }

    pub(crate) const fn counters(&self) -> SequenceCounters {
        SequenceCounters::new(self.read.seq, self.write.seq)
    }

    pub(crate) const fn set_counters(&mut self, counters: SequenceCounters) {
        self.read.seq = counters.inbound;
        self.write.seq = counters.outbound;
    }

    /// Encrypts `plaintext` into a complete frame and advances the write counter.
    pub(crate) fn seal(&mut self, kind: FrameKind, plaintext: &[u8]) -> EngineResult<Vec<u8>> {
        if plaintext.len() > self.max_plaintext {
            return Err(EngineError::RecordTooLarge {
                len: plaintext.len(),
                max: self.max_plaintext,
            });
        }

        let next = self.write.next_seq()?;
        let header = encode_header(kind, plaintext.len() + TAG_LEN)?;
        let ciphertext = self
            .write
            .cipher()
            .encrypt(
                Nonce::from_slice(&self.write.nonce()),
                Payload {
                    msg: plaintext,
                    aad: &header,
                },
            )
            .map_err(|_| EngineError::Crypto("record encryption failed"))?;
        self.write.seq = next;

        let mut frame = Vec::with_capacity(header.len() + ciphertext.len());
        frame.extend_from_slice(&header);
        frame.extend_from_slice(&ciphertext);
        Ok(frame)
    }

    /// Authenticates and decrypts a record body and advances the read counter.
    pub(crate) fn open(&mut self, header: &[u8], body: &[u8]) -> EngineResult<Zeroizing<Vec<u8>>> {
        let next = self.read.next_seq()?;
        let plaintext = self
            .read
            .cipher()
            .decrypt(
                Nonce::from_slice(&self.read.nonce()),
                Payload {
                    msg: body,
                    aad: header,
                },
            )
            .map_err(|_| EngineError::Crypto("record authentication failed"))?;
        self.read.seq = next;
        Ok(Zeroizing::new(plaintext))
    }
}
